use anyhow::Context;
use rayon::prelude::*;
use structopt::StructOpt;

use ibbench::argument::{Opt, Role};
use ibbench::perftest::{self, BenchCommand};
use ibbench::plan::{self, Selection};
use ibbench::topology::{self, CpuTopology};

fn main() -> anyhow::Result<()> {
    logging::init_log();

    let opt = Opt::from_args();
    log::info!("options: {:?}", opt);

    let remote = match opt.role {
        Role::Client => Some(
            opt.remote
                .clone()
                .context("--remote is required in client mode")?,
        ),
        Role::Server => None,
    };

    let mut devices = topology::rdma_devices()?;
    log::info!("local RDMA devices: {:?}", devices);
    if let Some(rate) = opt.rate {
        devices.retain(|d| topology::device_rate(d) == Some(rate));
        log::info!("devices at {} Gb/s: {:?}", rate, devices);
    }

    let topo = CpuTopology::probe()?;
    let selection = Selection {
        numa: opt.numa,
        devices: opt.devices.clone(),
    };
    let tasks = plan::assign_tasks(&devices, topology::device_numa_node, &topo, &selection);
    if tasks.is_empty() {
        log::warn!("no eligible device, nothing to run");
        return Ok(());
    }

    let bench = BenchCommand::new(&opt.cmd, &opt.args)?;
    // the server side sizes its pool to the machine, the client side to the
    // task count unless an explicit concurrency is given
    let workers = match opt.role {
        Role::Client => opt.concurrency.unwrap_or_else(|| tasks.len()),
        Role::Server => num_cpus::get(),
    };
    log::info!("running {} tasks on {} workers", tasks.len(), workers);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()?;
    pool.install(|| {
        tasks
            .par_iter()
            .for_each(|task| perftest::run_task(&bench, task, remote.as_deref(), opt.role));
    });

    Ok(())
}
