use structopt::StructOpt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Role {
    Client,
    Server,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "server" => Ok(Role::Server),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
        }
    }
}

#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "ib-bench", about = "Run one RDMA perftest process per local NIC.")]
pub struct Opt {
    /// Role of this node
    #[structopt(possible_values = &["client", "server"])]
    pub role: Role,

    /// Server IP to connect to, client only
    #[structopt(long, required_if("role", "client"))]
    pub remote: Option<String>,

    /// Benchmark command line
    #[structopt(long, default_value = "ib_write_bw --report_gbits")]
    pub cmd: String,

    /// Restrict the run to these devices
    #[structopt(long, use_delimiter = true)]
    pub devices: Vec<String>,

    /// Restrict the run to devices on this NUMA node
    #[structopt(long)]
    pub numa: Option<i32>,

    /// Number of concurrent tasks, defaults to one per device
    #[structopt(long)]
    pub concurrency: Option<usize>,

    /// Extra arguments appended to every benchmark command
    #[structopt(long, default_value = "")]
    pub args: String,

    /// Keep only devices with this link rate, in Gb/s
    #[structopt(long)]
    pub rate: Option<u32>,
}
