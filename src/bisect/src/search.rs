use crate::mpirun::Measure;

/// One measured host group. `children` is non-empty only when the group's
/// bandwidth triggered a further split.
#[derive(Debug, Clone, PartialEq)]
pub struct BisectNode {
    pub hosts: Vec<String>,
    pub busbw: Option<f64>,
    pub children: Vec<BisectNode>,
}

impl BisectNode {
    pub fn is_slow(&self, threshold: f64) -> bool {
        matches!(self.busbw, Some(bw) if bw <= threshold)
    }

    /// Every measured group, in pre-order.
    pub fn flatten(&self) -> Vec<&BisectNode> {
        let mut out = Vec::new();
        self.collect(&mut out);
        out
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a BisectNode>) {
        out.push(self);
        for child in &self.children {
            child.collect(out);
        }
    }

    /// The deepest groups that still measured at or below the threshold.
    pub fn suspects(&self, threshold: f64) -> Vec<&BisectNode> {
        if !self.is_slow(threshold) {
            return Vec::new();
        }
        let below: Vec<&BisectNode> = self
            .children
            .iter()
            .flat_map(|c| c.suspects(threshold))
            .collect();
        if below.is_empty() {
            vec![self]
        } else {
            below
        }
    }
}

/// Measure the full host list once, then bisect while the bandwidth stays at
/// or below the threshold.
pub fn run_search(
    hosts: &[String],
    threshold: f64,
    measure: &mut impl Measure,
) -> anyhow::Result<BisectNode> {
    let busbw = measure.measure(hosts)?;
    let children = match busbw {
        Some(bw) if bw <= threshold => bisect(hosts, threshold, measure)?,
        _ => Vec::new(),
    };
    Ok(BisectNode {
        hosts: hosts.to_vec(),
        busbw,
        children,
    })
}

/// Split the host list at the midpoint and measure both halves. A half is
/// split further only when its measurement is present and at or below the
/// threshold: a low reading is the signal to keep narrowing down the group,
/// a healthy reading stops the descent.
pub fn bisect(
    hosts: &[String],
    threshold: f64,
    measure: &mut impl Measure,
) -> anyhow::Result<Vec<BisectNode>> {
    if hosts.len() <= 1 {
        return Ok(Vec::new());
    }
    let (first_half, second_half) = hosts.split_at(hosts.len() / 2);

    let mut nodes = Vec::with_capacity(2);
    for &half in [first_half, second_half].iter() {
        let busbw = measure.measure(half)?;
        let children = match busbw {
            Some(bw) if bw <= threshold => bisect(half, threshold, measure)?,
            _ => Vec::new(),
        };
        nodes.push(BisectNode {
            hosts: half.to_vec(),
            busbw,
            children,
        });
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct FakeFabric {
        table: HashMap<String, f64>,
        calls: Vec<String>,
    }

    impl FakeFabric {
        fn with(entries: &[(&str, f64)]) -> Self {
            FakeFabric {
                table: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                calls: Vec::new(),
            }
        }
    }

    impl Measure for FakeFabric {
        fn measure(&mut self, hosts: &[String]) -> anyhow::Result<Option<f64>> {
            let key = hosts.join(",");
            self.calls.push(key.clone());
            Ok(self.table.get(&key).copied())
        }
    }

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tiny_lists_are_not_measured() {
        let mut fabric = FakeFabric::default();
        assert!(bisect(&[], 100.0, &mut fabric).unwrap().is_empty());
        assert!(bisect(&hosts(&["h0"]), 100.0, &mut fabric).unwrap().is_empty());
        assert!(fabric.calls.is_empty());
    }

    #[test]
    fn both_halves_measured_exactly_once() {
        // every measurement misses, two hosts still cost two runs
        let mut fabric = FakeFabric::default();
        let nodes = bisect(&hosts(&["h0", "h1"]), 100.0, &mut fabric).unwrap();
        assert_eq!(fabric.calls, vec!["h0".to_owned(), "h1".to_owned()]);
        assert_eq!(nodes.len(), 2);
        assert!(nodes
            .iter()
            .all(|n| n.busbw.is_none() && n.children.is_empty()));
    }

    #[test]
    fn odd_split_is_stable() {
        let all = hosts(&["h0", "h1", "h2", "h3", "h4"]);
        let mut fabric = FakeFabric::with(&[("h0,h1", 150.0), ("h2,h3,h4", 160.0)]);
        let nodes = bisect(&all, 100.0, &mut fabric).unwrap();
        assert_eq!(nodes[0].hosts, hosts(&["h0", "h1"]));
        assert_eq!(nodes[1].hosts, hosts(&["h2", "h3", "h4"]));
        assert_eq!(nodes[0].hosts.len() + nodes[1].hosts.len(), all.len());
        // both halves healthy, the descent stops
        assert!(nodes.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn descends_only_into_the_degraded_half() {
        let all = hosts(&["h0", "h1", "h2", "h3"]);
        let mut fabric = FakeFabric::with(&[
            ("h0,h1,h2,h3", 80.0),
            ("h0,h1", 150.0),
            ("h2,h3", 40.0),
        ]);
        let root = run_search(&all, 100.0, &mut fabric).unwrap();
        let expected: Vec<String> = vec!["h0,h1,h2,h3", "h0,h1", "h2,h3", "h2", "h3"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(fabric.calls, expected);

        assert_eq!(root.busbw, Some(80.0));
        let first = &root.children[0];
        let second = &root.children[1];
        assert!(first.children.is_empty());
        assert_eq!(second.children.len(), 2);

        let suspects = root.suspects(100.0);
        assert_eq!(suspects.len(), 1);
        assert_eq!(suspects[0].hosts, hosts(&["h2", "h3"]));
    }

    #[test]
    fn boundary_reading_still_descends() {
        let all = hosts(&["h0", "h1", "h2", "h3"]);
        let mut fabric = FakeFabric::with(&[("h0,h1", 100.0), ("h2,h3", 100.1)]);
        let nodes = bisect(&all, 100.0, &mut fabric).unwrap();
        assert_eq!(nodes[0].children.len(), 2);
        assert!(nodes[1].children.is_empty());
    }

    #[test]
    fn healthy_whole_stops_immediately() {
        let all = hosts(&["h0", "h1", "h2", "h3"]);
        let mut fabric = FakeFabric::with(&[("h0,h1,h2,h3", 180.0)]);
        let root = run_search(&all, 100.0, &mut fabric).unwrap();
        assert_eq!(fabric.calls.len(), 1);
        assert!(root.children.is_empty());
        assert!(root.suspects(100.0).is_empty());
    }

    #[test]
    fn missing_measurement_stops_without_error() {
        let mut fabric = FakeFabric::default();
        let root = run_search(&hosts(&["h0", "h1"]), 100.0, &mut fabric).unwrap();
        assert_eq!(root.busbw, None);
        assert!(root.children.is_empty());
        assert_eq!(root.flatten().len(), 1);
    }
}
