use std::collections::BTreeMap;

use crate::topology::CpuTopology;

pub const BASE_PORT: u16 = 18515;

/// One benchmark process: a device pinned to a NUMA-local core with a
/// dedicated TCP port.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub device: String,
    pub cpu: usize,
    pub port: u16,
}

/// Device filters from the command line.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub numa: Option<i32>,
    pub devices: Vec<String>,
}

impl Selection {
    fn admits(&self, device: &str, numa: i32) -> bool {
        if let Some(wanted) = self.numa {
            if numa != wanted {
                return false;
            }
        }
        if !self.devices.is_empty() && !self.devices.iter().any(|d| d == device) {
            return false;
        }
        true
    }
}

/// Pair each admitted device with the next free core of its NUMA node and a
/// unique port, in device enumeration order. A device with no usable node or
/// no core left is skipped with a warning.
pub fn assign_tasks<F>(
    devices: &[String],
    numa_of: F,
    topo: &CpuTopology,
    selection: &Selection,
) -> Vec<Task>
where
    F: Fn(&str) -> Option<i32>,
{
    let mut next_core: BTreeMap<i32, usize> = BTreeMap::new();
    let mut tasks = Vec::new();

    for device in devices {
        let numa = match numa_of(device) {
            Some(numa) => numa,
            None => {
                log::warn!("no NUMA affinity known for {}, skipping", device);
                continue;
            }
        };
        if !selection.admits(device, numa) {
            continue;
        }
        let cpus = match topo.cpus(numa) {
            Some(cpus) => cpus,
            None => {
                log::warn!("no CPUs on NUMA node {} for {}, skipping", numa, device);
                continue;
            }
        };
        let index = next_core.entry(numa).or_insert(0);
        if *index >= cpus.len() {
            log::warn!("NUMA node {} is out of free CPUs, skipping {}", numa, device);
            continue;
        }
        let cpu = cpus[*index];
        *index += 1;

        let port = BASE_PORT + tasks.len() as u16;
        tasks.push(Task {
            device: device.clone(),
            cpu,
            port,
        });
    }

    tasks
}
