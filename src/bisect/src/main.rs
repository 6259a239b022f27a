use anyhow::Context;
use structopt::StructOpt;

use bisect::argument::Opt;
use bisect::config::{read_config, JobConfig};
use bisect::hostfile;
use bisect::mpirun::MpirunRunner;
use bisect::search;

fn main() -> anyhow::Result<()> {
    logging::init_log();

    let opt = Opt::from_args();
    log::info!("options: {:?}", opt);

    let config = match &opt.config {
        Some(path) => {
            read_config(path).with_context(|| format!("fail to read config {:?}", path))?
        }
        None => JobConfig::default(),
    };

    let hostfile = hostfile::parse_from_file(&opt.hostfile)
        .with_context(|| format!("fail to read hostfile {:?}", opt.hostfile))?;
    log::info!("hostfile: {:?}", hostfile);

    std::fs::create_dir_all(&config.log_dir)?;
    let result_file = config.log_dir.join("result.txt");
    if result_file.exists() {
        std::fs::remove_file(&result_file)?;
    }

    let threshold = opt.threshold;
    let mut runner = MpirunRunner::new(config)?;
    let tree = search::run_search(&hostfile.hosts, threshold, &mut runner)?;

    for node in tree.flatten() {
        let busbw = node
            .busbw
            .map(|bw| bw.to_string())
            .unwrap_or_else(|| "none".to_owned());
        utils::fs::append_to_file(&result_file, &format!("{} {}", busbw, node.hosts.join(",")))?;
    }

    match tree.busbw {
        None => log::warn!("no measurement for the full host set"),
        Some(bw) if bw > threshold => log::info!(
            "aggregate busbw {} GB/s above threshold {}, nothing to localize",
            bw,
            threshold
        ),
        Some(_) => {
            for suspect in tree.suspects(threshold) {
                log::info!(
                    "suspect group at {} GB/s: {}",
                    suspect.busbw.unwrap_or_default(),
                    suspect.hosts.join(",")
                );
            }
        }
    }

    Ok(())
}
