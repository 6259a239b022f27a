use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "nccl-bisect",
    about = "Localize slow host groups by bisecting an all-reduce benchmark."
)]
pub struct Opt {
    /// Hostfile, one hostname per line
    pub hostfile: std::path::PathBuf,

    /// Bus bandwidth threshold in GB/s, groups at or below it are split further
    pub threshold: f64,

    /// Measurement settings
    #[structopt(short = "c", long = "config")]
    pub config: Option<std::path::PathBuf>,
}
