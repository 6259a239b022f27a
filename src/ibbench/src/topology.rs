use std::collections::BTreeMap;
use std::process::Command;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use utils::cmd_helper::get_command_output;

lazy_static! {
    static ref RATE_RE: Regex = Regex::new(r"Rate:\s+(\d+)").unwrap();
}

// mlx5_0 port 1 ==> eth2 (Up)
// mlx5_1 port 1 ==> eth3 (Down)
pub fn rdma_devices() -> anyhow::Result<Vec<String>> {
    let cmd = Command::new("ibdev2netdev");
    let output = get_command_output(cmd)?;
    Ok(parse_device_list(&output))
}

fn parse_device_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(String::from)
        .collect()
}

/// Link rate of a device in Gb/s, from `ibstat -v`.
pub fn device_rate(device: &str) -> Option<u32> {
    let mut cmd = Command::new("ibstat");
    cmd.arg("-v").arg(device);
    let output = get_command_output(cmd).ok()?;
    parse_rate(&output)
}

fn parse_rate(output: &str) -> Option<u32> {
    let caps = RATE_RE.captures(output)?;
    caps.get(1)?.as_str().parse().ok()
}

/// NUMA node of a device. The kernel reports -1 when the affinity is
/// unknown; such a node never appears in the CPU topology.
pub fn device_numa_node(device: &str) -> Option<i32> {
    let path = format!("/sys/class/infiniband/{}/device/numa_node", device);
    let content = std::fs::read_to_string(path).ok()?;
    content.trim().parse().ok()
}

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("malformed lscpu line: {0}")]
    MalformedLine(String),
}

/// CPU cores grouped by NUMA node, in `lscpu` enumeration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuTopology {
    nodes: BTreeMap<i32, Vec<usize>>,
}

impl CpuTopology {
    pub fn probe() -> anyhow::Result<Self> {
        let mut cmd = Command::new("lscpu");
        cmd.arg("--parse=NODE,CPU");
        let output = get_command_output(cmd)?;
        Ok(output.parse()?)
    }

    pub fn cpus(&self, node: i32) -> Option<&[usize]> {
        self.nodes.get(&node).map(|v| v.as_slice())
    }

    pub fn nodes(&self) -> impl Iterator<Item = i32> + '_ {
        self.nodes.keys().copied()
    }
}

// # The following is the parsable format, which can be fed to other
// # programs. Each different item in every column has an unique ID
// # starting usually from zero.
// # Node,CPU
// 0,0
// 0,1
// 1,8
// 1,9
impl FromStr for CpuTopology {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut nodes: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (node, cpu) = line
                .split_once(',')
                .ok_or_else(|| TopologyError::MalformedLine(line.to_owned()))?;
            let node = node
                .parse()
                .map_err(|_| TopologyError::MalformedLine(line.to_owned()))?;
            let cpu = cpu
                .parse()
                .map_err(|_| TopologyError::MalformedLine(line.to_owned()))?;
            nodes.entry(node).or_default().push(cpu);
        }
        Ok(CpuTopology { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_list_takes_the_first_token() {
        let output = "mlx5_0 port 1 ==> eth2 (Up)\nmlx5_1 port 1 ==> eth3 (Down)\n\n";
        assert_eq!(
            parse_device_list(output),
            vec!["mlx5_0".to_owned(), "mlx5_1".to_owned()]
        );
    }

    #[test]
    fn rate_comes_from_ibstat() {
        let output = "\
CA 'mlx5_0'
        CA type: MT4123
        Number of ports: 1
        Firmware version: 20.28.1002
        Port 1:
                State: Active
                Physical state: LinkUp
                Rate: 200
                Base lid: 98
";
        assert_eq!(parse_rate(output), Some(200));
        assert_eq!(parse_rate("State: Down\n"), None);
    }

    #[test]
    fn cpus_group_by_node() {
        let topo: CpuTopology = "\
# The following is the parsable format, which can be fed to other
# programs. Each different item in every column has an unique ID
# starting usually from zero.
# Node,CPU
0,0
0,1
1,8
1,9
"
        .parse()
        .unwrap();
        assert_eq!(topo.cpus(0), Some(&[0usize, 1][..]));
        assert_eq!(topo.cpus(1), Some(&[8usize, 9][..]));
        assert_eq!(topo.cpus(2), None);
        assert_eq!(topo.nodes().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!("0;0\n".parse::<CpuTopology>().is_err());
        assert!("zero,0\n".parse::<CpuTopology>().is_err());
    }
}
