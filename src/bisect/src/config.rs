use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// The launcher binary
    #[serde(default = "default_mpirun")]
    pub mpirun: String,

    /// The benchmark executable started on every rank
    #[serde(default = "default_program")]
    pub program: String,

    /// TCP interface used for the MPI control plane and NCCL sockets
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Directory of the per-run benchmark logs
    #[serde(default = "default_log_dir")]
    pub log_dir: std::path::PathBuf,

    /// Message size passed to the benchmark, K/M/G suffixes in 1024 steps
    #[serde(default = "default_payload")]
    pub payload: String,

    /// GPUs used on every node, the -g argument of the benchmark
    #[serde(default = "default_gpus_per_node")]
    pub gpus_per_node: u32,

    /// Environment variables forwarded to every rank
    #[serde(default = "default_envs")]
    pub envs: toml::value::Table,
}

fn default_mpirun() -> String {
    "mpirun".to_owned()
}

fn default_program() -> String {
    "all_reduce_perf".to_owned()
}

fn default_interface() -> String {
    "bond0".to_owned()
}

fn default_log_dir() -> std::path::PathBuf {
    "nccl-log".into()
}

fn default_payload() -> String {
    "16G".to_owned()
}

fn default_gpus_per_node() -> u32 {
    8
}

fn default_envs() -> toml::value::Table {
    let mut envs = toml::value::Table::new();
    for (key, value) in &[
        ("NCCL_NVLS_ENABLE", "0"),
        ("NCCL_MAX_NCHANNELS", "64"),
        ("NCCL_MIN_NCHANNELS", "32"),
        ("NCCL_DEBUG", "INFO"),
    ] {
        envs.insert((*key).to_owned(), toml::Value::String((*value).to_owned()));
    }
    envs
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            mpirun: default_mpirun(),
            program: default_program(),
            interface: default_interface(),
            log_dir: default_log_dir(),
            payload: default_payload(),
            gpus_per_node: default_gpus_per_node(),
            envs: default_envs(),
        }
    }
}

impl JobConfig {
    pub fn payload_bytes(&self) -> anyhow::Result<u64> {
        parse_size(&self.payload)
    }
}

pub fn read_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(&path)?;
    Ok(toml::from_str(&content)?)
}

pub fn parse_size(s: &str) -> anyhow::Result<u64> {
    let s = s.trim();
    anyhow::ensure!(!s.is_empty() && s.is_ascii(), "invalid size: {:?}", s);
    if let Ok(value) = s.parse::<u64>() {
        return Ok(value);
    }
    let (number, suffix) = s.split_at(s.len() - 1);
    let shift = match suffix {
        "K" | "k" => 10,
        "M" | "m" => 20,
        "G" | "g" => 30,
        _ => anyhow::bail!("unrecognized size suffix: {:?}", s),
    };
    let number: u64 = number
        .trim()
        .parse()
        .with_context(|| format!("invalid size: {:?}", s))?;
    Ok(number << shift)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config: JobConfig = toml::from_str("").unwrap();
        assert_eq!(config.mpirun, "mpirun");
        assert_eq!(config.program, "all_reduce_perf");
        assert_eq!(config.interface, "bond0");
        assert_eq!(config.payload_bytes().unwrap(), 16 << 30);
        assert!(config.envs.contains_key("NCCL_DEBUG"));
    }

    #[test]
    fn overrides_merge_with_defaults() {
        let config: JobConfig =
            toml::from_str("interface = \"eth0\"\npayload = \"512M\"\n").unwrap();
        assert_eq!(config.interface, "eth0");
        assert_eq!(config.payload_bytes().unwrap(), 512 << 20);
        assert_eq!(config.gpus_per_node, 8);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<JobConfig>("iface = \"eth0\"\n").is_err());
    }

    #[test]
    fn sizes_use_binary_suffixes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("4K").unwrap(), 4096);
        assert_eq!(parse_size("16G").unwrap(), 17179869184);
        assert!(parse_size("16Q").is_err());
        assert!(parse_size("").is_err());
    }
}
