use std::process::Command;

use lazy_static::lazy_static;
use regex::Regex;

use crate::argument::Role;
use crate::plan::Task;
use crate::topology;
use utils::cmd_helper::{get_command_output, get_command_str};

//  #bytes     #iterations    BW peak[Gb/sec]    BW average[Gb/sec]   MsgRate[Mpps]
//  65536      5000             96.55              96.02              0.183105
//
//  #bytes  #iterations    t_min[usec]    t_max[usec]  t_typical[usec]    t_avg[usec]    t_stdev[usec]   99% percentile[usec]   99.9% percentile[usec]
//  2       1000           1.83           4.81         1.89               1.90           0.07           1.99                   4.81
lazy_static! {
    static ref BW_RE: Regex = Regex::new(
        r"#bytes\s+#iterations\s+BW peak\[Gb/sec\]\s+BW average\[Gb/sec\]\s+MsgRate\[Mpps\]\s*\n\s*\d+\s+\d+\s+[\d.]+\s+([\d.]+)\s+[\d.]+"
    )
    .unwrap();
    static ref LAT_RE: Regex = Regex::new(
        r"#bytes\s+#iterations\s+t_min\[usec\]\s+t_max\[usec\]\s+t_typical\[usec\]\s+t_avg\[usec\]\s+t_stdev\[usec\]\s+99%\s+percentile\[usec\]\s+99\.9%\s+percentile\[usec\]\s*\n\s*\d+\s+\d+\s+[\d.]+\s+[\d.]+\s+[\d.]+\s+[\d.]+\s+[\d.]+\s+[\d.]+\s+([\d.]+)"
    )
    .unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BenchResult {
    /// Average bandwidth in Gb/s
    Bandwidth(f64),
    /// 99.9% tail latency in microseconds
    Latency(f64),
}

pub fn parse_output(output: &str) -> Option<BenchResult> {
    if let Some(caps) = BW_RE.captures(output) {
        if let Ok(bw) = caps[1].parse() {
            return Some(BenchResult::Bandwidth(bw));
        }
    }
    if let Some(caps) = LAT_RE.captures(output) {
        if let Ok(lat) = caps[1].parse() {
            return Some(BenchResult::Latency(lat));
        }
    }
    None
}

/// The benchmark command line, split once up front and shared by all tasks.
#[derive(Debug, Clone)]
pub struct BenchCommand {
    program: String,
    args: Vec<String>,
    extra: Vec<String>,
}

impl BenchCommand {
    pub fn new(cmd: &str, extra_args: &str) -> anyhow::Result<Self> {
        let mut tokens = cmd.split_whitespace().map(String::from);
        let program = tokens
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty benchmark command"))?;
        Ok(BenchCommand {
            program,
            args: tokens.collect(),
            extra: extra_args.split_whitespace().map(String::from).collect(),
        })
    }

    // taskset -c <cpu> <cmd...> -d <device> -p <port> [<remote>] <extra...>
    fn command_for(&self, task: &Task, remote: Option<&str>) -> Command {
        let mut cmd = Command::new("taskset");
        cmd.arg("-c").arg(task.cpu.to_string());
        cmd.arg(&self.program);
        cmd.args(&self.args);
        cmd.arg("-d").arg(&task.device);
        cmd.arg("-p").arg(task.port.to_string());
        if let Some(ip) = remote {
            cmd.arg(ip);
        }
        cmd.args(&self.extra);
        cmd
    }
}

/// Run one task to completion. A failure is logged and does not affect
/// sibling tasks.
pub fn run_task(bench: &BenchCommand, task: &Task, remote: Option<&str>, role: Role) {
    let cmd = bench.command_for(task, remote);
    log::info!("exec: {}", get_command_str(&cmd));

    let output = match get_command_output(cmd) {
        Ok(output) => output,
        Err(e) => {
            log::error!("{} command failed on {}: {}", role, task.device, e);
            return;
        }
    };

    let rate = match topology::device_rate(&task.device) {
        Some(rate) => rate.to_string(),
        None => "unknown".to_owned(),
    };
    match parse_output(&output) {
        Some(BenchResult::Bandwidth(bw)) => log::info!(
            "{} NIC {} (rate {}): avg BW {} Gb/s",
            role,
            task.device,
            rate,
            bw
        ),
        Some(BenchResult::Latency(lat)) => log::info!(
            "{} NIC {} (rate {}): 99.9% latency {} us",
            role,
            task.device,
            rate,
            lat
        ),
        None => log::warn!("no data found for {}", task.device),
    }
}
