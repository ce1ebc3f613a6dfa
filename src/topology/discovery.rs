/// Parsing of cluster and sentinel discovery replies
use crate::config::HostAndPort;
use crate::core::{NodeRole, Reply};
use crate::error::{EngineError, EngineResult};

/// A node reported by a discovery command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredNode {
    pub id: String,
    pub host: HostAndPort,
    pub role: NodeRole,
    /// The node answering the discovery command
    pub is_self: bool,
    /// Sentinel master name, empty for cluster nodes
    pub name: String,
}

/// Parse `CLUSTER NODES` output, one node per line:
/// `<id> <ip:port@cport> <flags> <master> ...`
pub fn parse_cluster_nodes(text: &str) -> EngineResult<Vec<DiscoveredNode>> {
    let mut nodes = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut parts = line.split_whitespace();
        let (Some(id), Some(address), Some(flags)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(EngineError::protocol(format!("Invalid cluster nodes line: {}", line)));
        };

        let address = address.split('@').next().unwrap_or(address);
        let host: HostAndPort = address
            .parse()
            .map_err(|_| EngineError::protocol(format!("Invalid node address: {}", address)))?;

        let flags: Vec<&str> = flags.split(',').collect();
        let role = if flags.contains(&"master") {
            NodeRole::Master
        } else if flags.contains(&"slave") || flags.contains(&"replica") {
            NodeRole::Slave
        } else {
            NodeRole::Unknown
        };

        nodes.push(DiscoveredNode {
            id: id.to_string(),
            host,
            role,
            is_self: flags.contains(&"myself"),
            name: String::new(),
        });
    }
    Ok(nodes)
}

/// Parse the `SENTINEL MASTERS` reply: an array of flat field/value arrays
pub fn parse_sentinel_masters(reply: &Reply) -> EngineResult<Vec<DiscoveredNode>> {
    let masters = reply
        .as_array()
        .ok_or_else(|| EngineError::protocol("SENTINEL MASTERS did not return an array"))?;

    let mut nodes = Vec::with_capacity(masters.len());
    for master in masters {
        let fields = master
            .as_array()
            .ok_or_else(|| EngineError::protocol("Invalid sentinel master entry"))?;
        let lookup = |wanted: &str| -> Option<String> {
            fields.chunks(2).find_map(|pair| match pair {
                [Reply::Bulk(key), Reply::Bulk(value)] if &key[..] == wanted.as_bytes() => {
                    Some(String::from_utf8_lossy(value).into_owned())
                }
                _ => None,
            })
        };

        let (Some(name), Some(ip), Some(port)) = (lookup("name"), lookup("ip"), lookup("port"))
        else {
            return Err(EngineError::protocol("Sentinel master entry misses name/ip/port"));
        };
        let port = port
            .parse::<u16>()
            .map_err(|_| EngineError::protocol(format!("Invalid sentinel master port: {}", port)))?;

        nodes.push(DiscoveredNode {
            id: lookup("runid").unwrap_or_default(),
            host: HostAndPort::new(ip, port),
            role: NodeRole::Master,
            is_self: false,
            name,
        });
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cluster_nodes() {
        let text = "\
07c37dfeb235213a872192d90877d0cd55635b91 127.0.0.1:30004@31004 slave e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 0 1426238317239 4 connected
67ed2db8d677e59ec4a4cefb06858cf2a1a89fa1 127.0.0.1:30002@31002 master - 0 1426238316232 2 connected 5461-10922
e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 127.0.0.1:30001@31001 myself,master - 0 0 1 connected 0-5460
";
        let nodes = parse_cluster_nodes(text).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].role, NodeRole::Slave);
        assert_eq!(nodes[1].host, HostAndPort::new("127.0.0.1", 30002));
        assert!(nodes[2].is_self);
        assert_eq!(nodes[2].role, NodeRole::Master);
    }

    #[test]
    fn test_parse_cluster_nodes_rejects_garbage() {
        assert!(parse_cluster_nodes("abc").is_err());
        assert!(parse_cluster_nodes("id nohost master").is_err());
        assert!(parse_cluster_nodes("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_sentinel_masters() {
        let entry = Reply::Array(
            ["name", "mymaster", "ip", "10.0.0.1", "port", "6379", "runid", "abc"]
                .iter()
                .map(Reply::bulk)
                .collect(),
        );
        let nodes = parse_sentinel_masters(&Reply::Array(vec![entry])).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "mymaster");
        assert_eq!(nodes[0].host, HostAndPort::new("10.0.0.1", 6379));
        assert_eq!(nodes[0].id, "abc");

        assert!(parse_sentinel_masters(&Reply::Nil).is_err());
    }
}
