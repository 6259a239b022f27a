use std::path::PathBuf;
use std::process::Command;

use md5::{Digest, Md5};

use crate::config::JobConfig;
use utils::cmd_helper::{get_command_output, get_command_str};

/// A single all-reduce bandwidth measurement over an ordered set of hosts.
/// `Ok(None)` means the run was skipped or produced no usable result line;
/// `Err` means the benchmark process itself failed.
pub trait Measure {
    fn measure(&mut self, hosts: &[String]) -> anyhow::Result<Option<f64>>;
}

pub struct MpirunRunner {
    config: JobConfig,
    payload_bytes: u64,
    ib_hca: Option<String>,
}

impl MpirunRunner {
    pub fn new(config: JobConfig) -> anyhow::Result<Self> {
        let payload_bytes = config.payload_bytes()?;
        // NCCL_IB_HCA is taken from the driver's own environment and
        // forwarded verbatim to every rank
        let ib_hca = std::env::var("NCCL_IB_HCA").ok();
        Ok(MpirunRunner {
            config,
            payload_bytes,
            ib_hca,
        })
    }

    /// Log file of one run, keyed by the comma-joined host specification.
    /// Same hosts in the same order always map to the same file.
    pub fn log_path(&self, host_spec: &str) -> PathBuf {
        let mut hasher = Md5::new();
        hasher.update(host_spec.as_bytes());
        let digest = hasher.finalize();
        self.config
            .log_dir
            .join(format!("temp_mpirun_{:x}.log", digest))
    }

    fn build_command(&self, np: usize, host_spec: &str) -> Command {
        let c = &self.config;
        let mut cmd = Command::new(&c.mpirun);
        cmd.arg("--allow-run-as-root")
            .arg("--np")
            .arg(np.to_string())
            .arg("--map-by")
            .arg("node")
            .arg("--bind-to")
            .arg("none")
            .arg("--mca")
            .arg("btl")
            .arg("self,tcp")
            .arg("--mca")
            .arg("btl_tcp_if_include")
            .arg(&c.interface)
            .arg("-H")
            .arg(host_spec);
        for (key, value) in &c.envs {
            cmd.arg("-x").arg(format!("{}={}", key, env_value_str(value)));
        }
        cmd.arg("-x")
            .arg(format!("NCCL_SOCKET_IFNAME={}", c.interface));
        if let Some(hca) = &self.ib_hca {
            cmd.arg("-x").arg(format!("NCCL_IB_HCA={}", hca));
        }
        cmd.arg(&c.program)
            .arg("-b")
            .arg(&c.payload)
            .arg("-e")
            .arg(&c.payload)
            .arg("-f")
            .arg("2")
            .arg("-g")
            .arg(c.gpus_per_node.to_string());
        cmd
    }
}

impl Measure for MpirunRunner {
    fn measure(&mut self, hosts: &[String]) -> anyhow::Result<Option<f64>> {
        let np = hosts.len();
        if np < 2 {
            return Ok(None);
        }
        let host_spec = hosts.join(",");
        let log_file = self.log_path(&host_spec);
        log::info!("measuring {} hosts: {}", np, host_spec);
        log::info!("log file: {}", log_file.display());

        let cmd = self.build_command(np, &host_spec);
        log::info!("command: {}", get_command_str(&cmd));
        let output = get_command_output(cmd)?;
        std::fs::write(&log_file, &output)?;

        let busbw = extract_busbw(&output, self.payload_bytes);
        match busbw {
            Some(bw) => log::info!("busbw: {} GB/s", bw),
            None => log::warn!("no result line found, see {}", log_file.display()),
        }
        Ok(busbw)
    }
}

fn env_value_str(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// #       size         count      type   redop    root     time   algbw   busbw #wrong     time   algbw   busbw #wrong
// #        (B)    (elements)                                 (us)  (GB/s)  (GB/s)            (us)  (GB/s)  (GB/s)
//  17179869184    4294967296     float     sum      -1   139460  123.19  230.98      0   139327  123.31  231.20    N/A
fn extract_busbw(output: &str, payload_bytes: u64) -> Option<f64> {
    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 9 && parts[0].parse() == Ok(payload_bytes) {
            if let Ok(busbw) = parts[7].parse() {
                return Some(busbw);
            }
        }
    }
    None
}
