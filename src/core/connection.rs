/// Backend connection contract implemented by every backend plugin
use crate::config::ConnectionSettings;
use crate::core::info::ServerInfo;
use crate::core::reply::Reply;
use crate::core::value::{Key, KeyValue, TtlSecs};
use crate::core::BackendKind;
use crate::error::{EngineError, EngineResult};
use crate::topology::DiscoveredNode;
use bytes::Bytes;

/// Database as seen by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseInfo {
    pub name: String,
    pub is_default: bool,
    pub key_count: u64,
}

impl DatabaseInfo {
    pub fn new<S: Into<String>>(name: S, is_default: bool, key_count: u64) -> Self {
        Self {
            name: name.into(),
            is_default,
            key_count,
        }
    }
}

/// One page of a cursor-based scan
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanPage {
    pub keys: Vec<Key>,
    /// 0 once the scan is complete
    pub next_cursor: u64,
}

/// Optional capabilities, fixed per backend when its registry is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// GetTTL/SetTTL
    pub ttl: bool,
    /// Select between several databases
    pub multi_db: bool,
    /// CreateDB/RemoveDB
    pub manage_db: bool,
    /// Range listing through `keys`
    pub key_range: bool,
    /// Cluster/sentinel discovery
    pub discovery: bool,
}

/// Side effects reported by handlers, forwarded by the driver as events
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    KeyAdded(KeyValue),
    KeyLoaded(KeyValue),
    KeyDeleted(Key),
    KeyRenamed { key: Key, new_name: Key },
    KeyTtlChanged { key: Key, ttl: TtlSecs },
    KeyTtlLoaded { key: Key, ttl: TtlSecs },
    DatabaseFlushed(String),
    DatabaseChanged(DatabaseInfo),
    DatabaseCreated(String),
    DatabaseRemoved(String),
}

/// A native backend session.
///
/// Calls are synchronous: each driver owns one connection on its own worker
/// thread, so a blocking call only ever stalls that driver. Optional
/// operations default to a "not supported" error.
pub trait BackendConnection: Send {
    fn kind(&self) -> BackendKind;

    fn capabilities(&self) -> Capabilities;

    fn connect(&mut self, settings: &ConnectionSettings) -> EngineResult<()>;

    fn disconnect(&mut self) -> EngineResult<()>;

    fn is_connected(&self) -> bool;

    /// Server version, known once connected
    fn server_version(&self) -> Option<String> {
        None
    }

    /// Run a protocol-native command given as argv
    fn execute_raw(&mut self, argv: &[Bytes]) -> EngineResult<Reply> {
        let _ = argv;
        Err(EngineError::not_supported("raw", self.kind()))
    }

    fn info(&mut self, args: &[String]) -> EngineResult<ServerInfo>;

    fn current_database(&mut self) -> EngineResult<DatabaseInfo>;

    fn databases(&mut self) -> EngineResult<Vec<DatabaseInfo>>;

    fn select(&mut self, name: &str) -> EngineResult<DatabaseInfo>;

    fn create_db(&mut self, name: &str) -> EngineResult<()> {
        let _ = name;
        Err(EngineError::not_supported("create database", self.kind()))
    }

    fn remove_db(&mut self, name: &str) -> EngineResult<()> {
        let _ = name;
        Err(EngineError::not_supported("remove database", self.kind()))
    }

    fn scan(&mut self, cursor: u64, pattern: &str, count: u64) -> EngineResult<ScanPage>;

    fn keys(&mut self, start: &str, end: &str, limit: u64) -> EngineResult<Vec<Key>> {
        let _ = (start, end, limit);
        Err(EngineError::not_supported("keys", self.kind()))
    }

    fn db_key_count(&mut self) -> EngineResult<u64>;

    fn set(&mut self, record: &KeyValue) -> EngineResult<()>;

    fn get(&mut self, key: &Key) -> EngineResult<KeyValue>;

    /// Delete keys, returning the ones that existed
    fn delete(&mut self, keys: &[Key]) -> EngineResult<Vec<Key>>;

    fn rename(&mut self, key: &Key, new_name: &Key) -> EngineResult<()>;

    fn get_ttl(&mut self, key: &Key) -> EngineResult<TtlSecs> {
        let _ = key;
        Err(EngineError::not_supported("get ttl", self.kind()))
    }

    fn set_ttl(&mut self, key: &Key, ttl: TtlSecs) -> EngineResult<()> {
        let _ = (key, ttl);
        Err(EngineError::not_supported("change ttl", self.kind()))
    }

    fn flush_db(&mut self) -> EngineResult<()>;

    fn discover_cluster(&mut self) -> EngineResult<Vec<DiscoveredNode>> {
        Err(EngineError::not_supported("cluster discovery", self.kind()))
    }

    fn discover_sentinel(&mut self) -> EngineResult<Vec<DiscoveredNode>> {
        Err(EngineError::not_supported("sentinel discovery", self.kind()))
    }
}
