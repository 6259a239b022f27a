// $ cat hostfile
// host-0001
// host-0002
// # host-0003
// host-0004

#[derive(Debug, Clone, Default)]
pub struct Hostfile {
    pub hosts: Vec<String>,
}

impl Hostfile {
    pub fn parse(content: &str) -> Hostfile {
        let hosts = content
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect();
        Hostfile { hosts }
    }
}

pub fn parse_from_file<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Hostfile> {
    let content = std::fs::read_to_string(path)?;
    Ok(Hostfile::parse(&content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_and_blanks_are_skipped() {
        let content = "host-0001\n\n# host-0003\n  host-0004  \n";
        let hostfile = Hostfile::parse(content);
        assert_eq!(
            hostfile.hosts,
            vec!["host-0001".to_owned(), "host-0004".to_owned()]
        );
    }

    #[test]
    fn order_is_preserved() {
        let hostfile = Hostfile::parse("b\na\nc\n");
        assert_eq!(hostfile.hosts, vec!["b", "a", "c"]);
    }
}
