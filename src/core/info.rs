/// Server status documents (`INFO`-style `# Section` / `key:value` text)
use std::fmt;

/// Role of a node inside a cluster or sentinel deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Master,
    Slave,
    Sentinel,
    Unknown,
}

impl NodeRole {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "master" => NodeRole::Master,
            "slave" | "replica" => NodeRole::Slave,
            "sentinel" => NodeRole::Sentinel,
            _ => NodeRole::Unknown,
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Master => write!(f, "master"),
            NodeRole::Slave => write!(f, "slave"),
            NodeRole::Sentinel => write!(f, "sentinel"),
            NodeRole::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InfoSection {
    pub name: String,
    pub fields: Vec<(String, String)>,
}

/// Parsed server status, kept in section order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerInfo {
    sections: Vec<InfoSection>,
}

impl ServerInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section, builder style
    pub fn with_section<S: Into<String>>(mut self, name: S, fields: Vec<(String, String)>) -> Self {
        self.sections.push(InfoSection {
            name: name.into(),
            fields,
        });
        self
    }

    pub fn parse(text: &str) -> Self {
        let mut sections: Vec<InfoSection> = Vec::new();
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if let Some(name) = line.strip_prefix('#') {
                sections.push(InfoSection {
                    name: name.trim().to_string(),
                    fields: Vec::new(),
                });
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            if sections.is_empty() {
                sections.push(InfoSection::default());
            }
            if let Some(section) = sections.last_mut() {
                section.fields.push((key.to_string(), value.to_string()));
            }
        }
        Self { sections }
    }

    pub fn sections(&self) -> &[InfoSection] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|section| section.fields.is_empty())
    }

    /// First field with the given key in any section
    pub fn field(&self, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .flat_map(|section| section.fields.iter())
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn version(&self) -> Option<&str> {
        self.field("redis_version").or_else(|| self.field("version"))
    }

    pub fn role(&self) -> Option<NodeRole> {
        if let Some(role) = self.field("role") {
            return Some(NodeRole::from_name(role));
        }
        match self.field("redis_mode") {
            Some("sentinel") => Some(NodeRole::Sentinel),
            _ => None,
        }
    }
}

impl fmt::Display for ServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, section) in self.sections.iter().enumerate() {
            if index > 0 {
                write!(f, "\r\n")?;
            }
            if !section.name.is_empty() {
                write!(f, "# {}\r\n", section.name)?;
            }
            for (key, value) in &section.fields {
                write!(f, "{}:{}\r\n", key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: &str = "# Server\r\nredis_version:7.2.4\r\nredis_mode:standalone\r\n\r\n# Replication\r\nrole:master\r\nconnected_slaves:0\r\n";

    #[test]
    fn test_parse_info() {
        let info = ServerInfo::parse(INFO);
        assert_eq!(info.sections().len(), 2);
        assert_eq!(info.version(), Some("7.2.4"));
        assert_eq!(info.role(), Some(NodeRole::Master));
        assert_eq!(info.field("connected_slaves"), Some("0"));
    }

    #[test]
    fn test_display_parses_back() {
        let info = ServerInfo::parse(INFO);
        assert_eq!(ServerInfo::parse(&info.to_string()), info);
    }

    #[test]
    fn test_role_detection() {
        let replica = ServerInfo::parse("role:slave\r\n");
        assert_eq!(replica.role(), Some(NodeRole::Slave));

        let sentinel = ServerInfo::parse("# Server\r\nredis_mode:sentinel\r\n");
        assert_eq!(sentinel.role(), Some(NodeRole::Sentinel));

        assert_eq!(ServerInfo::parse("").role(), None);
        assert!(ServerInfo::parse("").is_empty());
    }
}
