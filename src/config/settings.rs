/// Connection, cluster and sentinel settings with their persisted string form
///
/// A connection string looks like
/// `<kind>,<name>,<logging_ms>,<ns_separator>,<ns_strategy>,<config args>[,<ssh block>]`.
/// Cluster and sentinel strings append one `0x1E`-delimited block per node.
use super::ssh::SshInfo;
use super::ConfigError;
use crate::core::console::{join_args, split_text_args};
use crate::core::{BackendKind, NsDisplayStrategy};
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Private delimiter between per-node blocks
pub const NODE_DELIMITER: char = '\x1E';
pub const DEFAULT_NS_SEPARATOR: &str = ":";
pub const DEFAULT_DELIMITER: &str = "\n";

const FIELD_SEPARATOR: char = ',';

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostAndPort {
    pub host: String,
    pub port: u16,
}

impl HostAndPort {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostAndPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for HostAndPort {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::ValidationError(format!("Missing port in address: {}", s)))?;
        if host.is_empty() {
            return Err(ConfigError::ValidationError(format!("Empty host in address: {}", s)));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::ValidationError(format!("Invalid port in address: {}", s)))?;
        Ok(HostAndPort::new(host, port))
    }
}

/// Stable content hash naming the history log of a connection
pub fn content_hash(name: &str) -> String {
    let digest = Sha256::digest(name.as_bytes());
    hex::encode(&digest[..8])
}

/// Name and kind of a connection, plus its content hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionIdentity {
    name: String,
    kind: BackendKind,
    is_remote: bool,
    hash: String,
}

impl ConnectionIdentity {
    pub fn new<S: Into<String>>(name: S, kind: BackendKind) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::ValidationError(
                "Connection name cannot be empty".to_string(),
            ));
        }
        if name.contains(NODE_DELIMITER) {
            return Err(ConfigError::ValidationError(format!(
                "Connection name contains a reserved character: {:?}",
                name
            )));
        }
        let hash = content_hash(&name);
        Ok(Self {
            is_remote: kind.is_remote(),
            name,
            kind,
            hash,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Same identity under a new name, hash recomputed
    pub fn renamed(&self, new_name: &str) -> Result<Self, ConfigError> {
        ConnectionIdentity::new(new_name, self.kind)
    }
}

/// Settings of a file-backed engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub db_path: PathBuf,
    /// Delimiter between values in console output
    pub delimiter: String,
    pub create_if_missing: bool,
}

impl LocalConfig {
    pub fn new<P: Into<PathBuf>>(db_path: P) -> Self {
        Self {
            db_path: db_path.into(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            create_if_missing: true,
        }
    }
}

/// Settings of a network server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub host: HostAndPort,
    pub delimiter: String,
    pub auth: Option<String>,
    pub ssh: Option<SshInfo>,
}

impl RemoteConfig {
    pub fn new(host: HostAndPort) -> Self {
        Self {
            host,
            delimiter: DEFAULT_DELIMITER.to_string(),
            auth: None,
            ssh: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    Local(LocalConfig),
    Remote(RemoteConfig),
}

impl BackendConfig {
    pub fn delimiter(&self) -> &str {
        match self {
            BackendConfig::Local(local) => &local.delimiter,
            BackendConfig::Remote(remote) => &remote.delimiter,
        }
    }

    pub fn ssh(&self) -> Option<&SshInfo> {
        match self {
            BackendConfig::Remote(remote) => remote.ssh.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }

    /// Command-line form of the config (without the SSH block)
    pub fn to_args(&self) -> String {
        let mut args: Vec<String> = Vec::new();
        match self {
            BackendConfig::Local(local) => {
                args.extend(["-f".to_string(), local.db_path.to_string_lossy().into_owned()]);
                args.extend(["-d".to_string(), local.delimiter.clone()]);
                if local.create_if_missing {
                    args.push("-c".to_string());
                }
            }
            BackendConfig::Remote(remote) => {
                args.extend(["-h".to_string(), remote.host.host.clone()]);
                args.extend(["-p".to_string(), remote.host.port.to_string()]);
                args.extend(["-d".to_string(), remote.delimiter.clone()]);
                if let Some(auth) = &remote.auth {
                    args.extend(["-a".to_string(), auth.clone()]);
                }
            }
        }
        join_args(&args)
    }

    pub fn from_args(kind: BackendKind, line: &str, ssh: Option<SshInfo>) -> Result<Self, ConfigError> {
        let args = split_text_args(line).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        let mut path = None;
        let mut host = None;
        let mut port = None;
        let mut auth = None;
        let mut delimiter = DEFAULT_DELIMITER.to_string();
        let mut create_if_missing = false;

        let mut iter = args.into_iter();
        while let Some(flag) = iter.next() {
            if flag == "-c" {
                create_if_missing = true;
                continue;
            }
            let value = iter.next().ok_or_else(|| {
                ConfigError::ParseError(format!("Missing value for option {}", flag))
            })?;
            match flag.as_str() {
                "-f" => path = Some(PathBuf::from(value)),
                "-h" => host = Some(value),
                "-p" => {
                    port = Some(value.parse::<u16>().map_err(|_| {
                        ConfigError::ParseError(format!("Invalid port: {}", value))
                    })?)
                }
                "-a" => auth = Some(value),
                "-d" => delimiter = value,
                other => {
                    return Err(ConfigError::ParseError(format!("Unknown option: {}", other)))
                }
            }
        }

        if kind.is_remote() {
            let (Some(host), Some(port)) = (host, port) else {
                return Err(ConfigError::ValidationError(format!(
                    "{} connections require a host and port",
                    kind
                )));
            };
            Ok(BackendConfig::Remote(RemoteConfig {
                host: HostAndPort::new(host, port),
                delimiter,
                auth,
                ssh,
            }))
        } else {
            if ssh.is_some() {
                return Err(ConfigError::ValidationError(format!(
                    "{} connections cannot use an ssh tunnel",
                    kind
                )));
            }
            let db_path = path.ok_or_else(|| {
                ConfigError::ValidationError(format!("{} connections require a file path", kind))
            })?;
            Ok(BackendConfig::Local(LocalConfig {
                db_path,
                delimiter,
                create_if_missing,
            }))
        }
    }
}

/// Identity and configuration of one backend endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    identity: ConnectionIdentity,
    /// Periodic history logging interval, 0 disables it
    logging_interval_ms: u32,
    ns_separator: String,
    ns_strategy: NsDisplayStrategy,
    config: BackendConfig,
}

impl ConnectionSettings {
    pub fn new<S: Into<String>>(
        name: S,
        kind: BackendKind,
        config: BackendConfig,
    ) -> Result<Self, ConfigError> {
        let identity = ConnectionIdentity::new(name, kind)?;
        match (&config, kind.is_remote()) {
            (BackendConfig::Remote(_), true) | (BackendConfig::Local(_), false) => {}
            (BackendConfig::Local(_), true) => {
                return Err(ConfigError::ValidationError(format!(
                    "{} connections require a host and port",
                    kind
                )))
            }
            (BackendConfig::Remote(_), false) => {
                return Err(ConfigError::ValidationError(format!(
                    "{} connections require a file path",
                    kind
                )))
            }
        }
        Ok(Self {
            identity,
            logging_interval_ms: 0,
            ns_separator: DEFAULT_NS_SEPARATOR.to_string(),
            ns_strategy: NsDisplayStrategy::FullKey,
            config,
        })
    }

    pub fn with_logging_interval(mut self, interval_ms: u32) -> Self {
        self.logging_interval_ms = interval_ms;
        self
    }

    pub fn with_namespace<S: Into<String>>(mut self, separator: S, strategy: NsDisplayStrategy) -> Self {
        self.ns_separator = separator.into();
        self.ns_strategy = strategy;
        self
    }

    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn kind(&self) -> BackendKind {
        self.identity.kind()
    }

    pub fn is_remote(&self) -> bool {
        self.identity.is_remote()
    }

    pub fn hash(&self) -> &str {
        self.identity.hash()
    }

    pub fn logging_interval_ms(&self) -> u32 {
        self.logging_interval_ms
    }

    pub fn logging_enabled(&self) -> bool {
        self.logging_interval_ms > 0
    }

    pub fn ns_separator(&self) -> &str {
        &self.ns_separator
    }

    pub fn ns_strategy(&self) -> NsDisplayStrategy {
        self.ns_strategy
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn delimiter(&self) -> &str {
        self.config.delimiter()
    }

    pub fn host(&self) -> Option<&HostAndPort> {
        match &self.config {
            BackendConfig::Remote(remote) => Some(&remote.host),
            BackendConfig::Local(_) => None,
        }
    }

    /// `<hash><extension>`, relative to the logging directory
    pub fn log_file_name(&self) -> String {
        format!("{}{}", self.hash(), self.kind().log_extension())
    }

    /// Copy under a new name; the content hash follows the name
    pub fn renamed(&self, new_name: &str) -> Result<Self, ConfigError> {
        let mut renamed = self.clone();
        renamed.identity = self.identity.renamed(new_name)?;
        Ok(renamed)
    }

    pub fn to_connection_string(&self) -> String {
        let mut fields = vec![
            self.kind().id().to_string(),
            quote_field(self.name()).into_owned(),
            self.logging_interval_ms.to_string(),
            quote_field(&self.ns_separator).into_owned(),
            self.ns_strategy.id().to_string(),
            quote_field(&self.config.to_args()).into_owned(),
        ];
        if let Some(ssh) = self.config.ssh() {
            fields.push(quote_field(&ssh.to_string()).into_owned());
        }
        fields.join(",")
    }

    pub fn from_connection_string(text: &str) -> Result<Self, ConfigError> {
        let fields = split_fields(text, FIELD_SEPARATOR)?;
        if fields.len() != 6 && fields.len() != 7 {
            return Err(ConfigError::ParseError(format!(
                "Invalid connection string, expected 6 or 7 fields, got {}",
                fields.len()
            )));
        }

        let kind = parse_kind(&fields[0])?;
        let logging_interval_ms = parse_interval(&fields[2])?;
        let ns_strategy = fields[4]
            .parse::<u8>()
            .ok()
            .and_then(NsDisplayStrategy::from_id)
            .ok_or_else(|| {
                ConfigError::ParseError(format!("Invalid namespace strategy: {}", fields[4]))
            })?;
        let ssh = match fields.get(6) {
            Some(block) => Some(SshInfo::parse(block)?),
            None => None,
        };
        let config = BackendConfig::from_args(kind, &fields[5], ssh)?;

        Ok(ConnectionSettings::new(fields[1].clone(), kind, config)?
            .with_logging_interval(logging_interval_ms)
            .with_namespace(fields[3].clone(), ns_strategy))
    }
}

impl fmt::Display for ConnectionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_connection_string())
    }
}

impl FromStr for ConnectionSettings {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionSettings::from_connection_string(s)
    }
}

/// A named, ordered group of cluster nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSettings {
    identity: ConnectionIdentity,
    logging_interval_ms: u32,
    nodes: Vec<Arc<ConnectionSettings>>,
}

impl ClusterSettings {
    pub fn new<S: Into<String>>(
        name: S,
        kind: BackendKind,
        nodes: Vec<ConnectionSettings>,
    ) -> Result<Self, ConfigError> {
        let identity = ConnectionIdentity::new(name, kind)?;
        if !kind.supports_topology() {
            return Err(ConfigError::UnsupportedBackend(kind.to_string()));
        }
        check_node_kinds(kind, &nodes)?;
        Ok(Self {
            identity,
            logging_interval_ms: 0,
            nodes: nodes.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn with_logging_interval(mut self, interval_ms: u32) -> Self {
        self.logging_interval_ms = interval_ms;
        self
    }

    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn kind(&self) -> BackendKind {
        self.identity.kind()
    }

    pub fn logging_interval_ms(&self) -> u32 {
        self.logging_interval_ms
    }

    pub fn nodes(&self) -> &[Arc<ConnectionSettings>] {
        &self.nodes
    }

    pub fn find_node_by_host(&self, host: &HostAndPort) -> Option<&Arc<ConnectionSettings>> {
        self.nodes.iter().find(|node| node.host() == Some(host))
    }

    pub fn to_connection_string(&self) -> String {
        let mut text = base_fields(&self.identity, self.logging_interval_ms);
        for node in &self.nodes {
            text.push(NODE_DELIMITER);
            text.push_str(&quote_field(&node.to_connection_string()));
        }
        text
    }

    pub fn from_connection_string(text: &str) -> Result<Self, ConfigError> {
        let blocks = split_fields(text, NODE_DELIMITER)?;
        let (kind, name, interval) = parse_base_fields(&blocks[0])?;
        let nodes = blocks[1..]
            .iter()
            .map(|block| ConnectionSettings::from_connection_string(block))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ClusterSettings::new(name, kind, nodes)?.with_logging_interval(interval))
    }
}

impl fmt::Display for ClusterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_connection_string())
    }
}

/// A sentinel and the master/replica services it monitors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelEntry {
    pub sentinel: Arc<ConnectionSettings>,
    pub nodes: Vec<Arc<ConnectionSettings>>,
}

impl SentinelEntry {
    pub fn new(sentinel: ConnectionSettings, nodes: Vec<ConnectionSettings>) -> Self {
        Self {
            sentinel: Arc::new(sentinel),
            nodes: nodes.into_iter().map(Arc::new).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelSettings {
    identity: ConnectionIdentity,
    logging_interval_ms: u32,
    sentinels: Vec<SentinelEntry>,
}

impl SentinelSettings {
    pub fn new<S: Into<String>>(
        name: S,
        kind: BackendKind,
        sentinels: Vec<SentinelEntry>,
    ) -> Result<Self, ConfigError> {
        let identity = ConnectionIdentity::new(name, kind)?;
        if !kind.supports_topology() {
            return Err(ConfigError::UnsupportedBackend(kind.to_string()));
        }
        for entry in &sentinels {
            if entry.sentinel.kind() != kind {
                return Err(ConfigError::ValidationError(format!(
                    "Sentinel {} is not a {} connection",
                    entry.sentinel.name(),
                    kind
                )));
            }
            for node in &entry.nodes {
                if node.kind() != kind {
                    return Err(mismatched_node(node, kind));
                }
            }
        }
        Ok(Self {
            identity,
            logging_interval_ms: 0,
            sentinels,
        })
    }

    pub fn with_logging_interval(mut self, interval_ms: u32) -> Self {
        self.logging_interval_ms = interval_ms;
        self
    }

    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn kind(&self) -> BackendKind {
        self.identity.kind()
    }

    pub fn logging_interval_ms(&self) -> u32 {
        self.logging_interval_ms
    }

    pub fn sentinels(&self) -> &[SentinelEntry] {
        &self.sentinels
    }

    pub fn to_connection_string(&self) -> String {
        let mut text = base_fields(&self.identity, self.logging_interval_ms);
        for entry in &self.sentinels {
            let mut fields = vec![quote_field(&entry.sentinel.to_connection_string()).into_owned()];
            fields.extend(
                entry
                    .nodes
                    .iter()
                    .map(|node| quote_field(&node.to_connection_string()).into_owned()),
            );
            text.push(NODE_DELIMITER);
            text.push_str(&quote_field(&fields.join(",")));
        }
        text
    }

    pub fn from_connection_string(text: &str) -> Result<Self, ConfigError> {
        let blocks = split_fields(text, NODE_DELIMITER)?;
        let (kind, name, interval) = parse_base_fields(&blocks[0])?;
        let mut sentinels = Vec::with_capacity(blocks.len() - 1);
        for block in &blocks[1..] {
            let fields = split_fields(block, FIELD_SEPARATOR)?;
            let sentinel = ConnectionSettings::from_connection_string(&fields[0])?;
            let nodes = fields[1..]
                .iter()
                .map(|node| ConnectionSettings::from_connection_string(node))
                .collect::<Result<Vec<_>, _>>()?;
            sentinels.push(SentinelEntry::new(sentinel, nodes));
        }
        Ok(SentinelSettings::new(name, kind, sentinels)?.with_logging_interval(interval))
    }
}

impl fmt::Display for SentinelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_connection_string())
    }
}

fn check_node_kinds(kind: BackendKind, nodes: &[ConnectionSettings]) -> Result<(), ConfigError> {
    match nodes.iter().find(|node| node.kind() != kind) {
        Some(node) => Err(mismatched_node(node, kind)),
        None => Ok(()),
    }
}

fn mismatched_node(node: &ConnectionSettings, kind: BackendKind) -> ConfigError {
    ConfigError::ValidationError(format!(
        "Node {} is a {} connection, expected {}",
        node.name(),
        node.kind(),
        kind
    ))
}

fn base_fields(identity: &ConnectionIdentity, interval: u32) -> String {
    format!(
        "{},{},{},",
        identity.kind().id(),
        quote_field(identity.name()),
        interval
    )
}

fn parse_base_fields(block: &str) -> Result<(BackendKind, String, u32), ConfigError> {
    let fields = split_fields(block, FIELD_SEPARATOR)?;
    if fields.len() < 3 {
        return Err(ConfigError::ParseError(format!(
            "Invalid group header: {:?}",
            block
        )));
    }
    let kind = parse_kind(&fields[0])?;
    let interval = parse_interval(&fields[2])?;
    Ok((kind, fields[1].clone(), interval))
}

fn parse_kind(field: &str) -> Result<BackendKind, ConfigError> {
    field
        .parse::<u8>()
        .ok()
        .and_then(BackendKind::from_id)
        .ok_or_else(|| ConfigError::ParseError(format!("Unknown backend kind: {}", field)))
}

fn parse_interval(field: &str) -> Result<u32, ConfigError> {
    field
        .parse::<u32>()
        .map_err(|_| ConfigError::ParseError(format!("Invalid logging interval: {}", field)))
}

/// Quote a field when it contains a separator, quote, backslash or
/// surrounding spaces
pub(crate) fn quote_field(field: &str) -> Cow<'_, str> {
    let needs_quotes = field.starts_with(' ')
        || field.ends_with(' ')
        || field
            .chars()
            .any(|c| matches!(c, ',' | '"' | '\\') || c == NODE_DELIMITER);
    if !needs_quotes {
        return Cow::Borrowed(field);
    }
    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push('"');
    for c in field.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Split on `separator`, honouring fields quoted by `quote_field`
pub(crate) fn split_fields(text: &str, separator: char) -> Result<Vec<String>, ConfigError> {
    let mut fields = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        let mut field = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            let mut closed = false;
            while let Some(c) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some(escaped) => field.push(escaped),
                        None => break,
                    },
                    '"' => {
                        closed = true;
                        break;
                    }
                    c => field.push(c),
                }
            }
            if !closed {
                return Err(ConfigError::ParseError(
                    "Unterminated quoted field".to_string(),
                ));
            }
            fields.push(field);
            match chars.next() {
                None => return Ok(fields),
                Some(c) if c == separator => continue,
                Some(c) => {
                    return Err(ConfigError::ParseError(format!(
                        "Unexpected character {:?} after quoted field",
                        c
                    )))
                }
            }
        }

        loop {
            match chars.next() {
                None => {
                    fields.push(field);
                    return Ok(fields);
                }
                Some(c) if c == separator => {
                    fields.push(field);
                    break;
                }
                Some(c) => field.push(c),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ssh::SshAuthMethod;

    fn redis_node(name: &str, port: u16) -> ConnectionSettings {
        ConnectionSettings::new(
            name,
            BackendKind::Redis,
            BackendConfig::Remote(RemoteConfig::new(HostAndPort::new("127.0.0.1", port))),
        )
        .unwrap()
    }

    #[test]
    fn test_local_round_trip() {
        let settings = ConnectionSettings::new(
            "local, \"quoted\" store",
            BackendKind::LevelDb,
            BackendConfig::Local(LocalConfig::new("/var/lib/data dir/db")),
        )
        .unwrap()
        .with_logging_interval(1000)
        .with_namespace("::", NsDisplayStrategy::KeyName);

        let text = settings.to_connection_string();
        assert!(text.starts_with("3,"));
        assert_eq!(ConnectionSettings::from_connection_string(&text).unwrap(), settings);
    }

    #[test]
    fn test_remote_round_trip_with_ssh() {
        let mut remote = RemoteConfig::new(HostAndPort::new("10.0.0.5", 6380));
        remote.auth = Some("s3cr,et".to_string());
        remote.delimiter = " | ".to_string();
        remote.ssh = Some(SshInfo {
            host: HostAndPort::new("bastion", 22),
            user: "ops".to_string(),
            password: "pa\"ss".to_string(),
            method: SshAuthMethod::Password,
            ..Default::default()
        });
        let settings =
            ConnectionSettings::new("prod", BackendKind::Redis, BackendConfig::Remote(remote)).unwrap();

        let text = settings.to_string();
        let parsed: ConnectionSettings = text.parse().unwrap();
        assert_eq!(parsed, settings);
        assert_eq!(parsed.config().ssh().map(|s| s.user.as_str()), Some("ops"));
    }

    #[test]
    fn test_cluster_round_trip() {
        let cluster = ClusterSettings::new(
            "cluster",
            BackendKind::Redis,
            vec![redis_node("n1", 7000), redis_node("n2", 7001), redis_node("n3", 7002)],
        )
        .unwrap()
        .with_logging_interval(500);

        let text = cluster.to_connection_string();
        assert_eq!(text.matches(NODE_DELIMITER).count(), 3);
        assert_eq!(ClusterSettings::from_connection_string(&text).unwrap(), cluster);
    }

    #[test]
    fn test_sentinel_round_trip() {
        let sentinel = SentinelSettings::new(
            "sentinel",
            BackendKind::Redis,
            vec![
                SentinelEntry::new(redis_node("s1", 26379), vec![redis_node("m1", 6379), redis_node("r1", 6380)]),
                SentinelEntry::new(redis_node("s2", 26380), vec![]),
            ],
        )
        .unwrap();

        let text = sentinel.to_connection_string();
        assert_eq!(SentinelSettings::from_connection_string(&text).unwrap(), sentinel);
    }

    #[test]
    fn test_kind_determines_config() {
        let local_for_remote = ConnectionSettings::new(
            "bad",
            BackendKind::Redis,
            BackendConfig::Local(LocalConfig::new("/tmp/db")),
        );
        assert!(local_for_remote.is_err());

        let remote_for_local = ConnectionSettings::new(
            "bad",
            BackendKind::Lmdb,
            BackendConfig::Remote(RemoteConfig::new(HostAndPort::new("h", 1))),
        );
        assert!(remote_for_local.is_err());

        assert!(ConnectionSettings::from_connection_string("0,x,0,:,0,-f /tmp/db").is_err());
        assert!(ConnectionSettings::from_connection_string("6,x,0,:,0,-h host -p 1").is_err());
    }

    #[test]
    fn test_malformed_strings() {
        assert!(ConnectionSettings::from_connection_string("").is_err());
        assert!(ConnectionSettings::from_connection_string("42,x,0,:,0,-f /tmp").is_err());
        assert!(ConnectionSettings::from_connection_string("6,\"x,0,:,0,-f /tmp").is_err());
        assert!(ClusterSettings::new("c", BackendKind::Lmdb, vec![]).is_err());
    }

    #[test]
    fn test_rename_recomputes_hash() {
        let settings = redis_node("before", 6379);
        let renamed = settings.renamed("after").unwrap();
        assert_eq!(renamed.name(), "after");
        assert_ne!(renamed.hash(), settings.hash());
        assert_eq!(renamed.hash(), content_hash("after"));
        assert_eq!(renamed.host(), settings.host());
    }

    #[test]
    fn test_log_file_name() {
        let settings = redis_node("cache", 6379);
        let name = settings.log_file_name();
        assert!(name.ends_with(".red"));
        assert_eq!(name.len(), 16 + 4);
    }

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("a,b,,c", ',').unwrap(), vec!["a", "b", "", "c"]);
        assert_eq!(split_fields("\"a,b\",c", ',').unwrap(), vec!["a,b", "c"]);
        assert_eq!(split_fields("", ',').unwrap(), vec![""]);
        assert!(split_fields("\"a\"b", ',').is_err());
        for raw in ["plain", " padded ", "with,comma", "quote\"d", "back\\slash", "\x1Enode"] {
            let quoted = quote_field(raw);
            assert_eq!(split_fields(&quoted, ',').unwrap(), vec![raw.to_string()]);
        }
    }

    #[test]
    fn test_host_and_port() {
        let host: HostAndPort = "127.0.0.1:7000".parse().unwrap();
        assert_eq!(host, HostAndPort::new("127.0.0.1", 7000));
        assert_eq!(host.to_string(), "127.0.0.1:7000");
        assert!("localhost".parse::<HostAndPort>().is_err());
        assert!(":80".parse::<HostAndPort>().is_err());
    }
}
