pub mod backends;
pub mod config;
/// kvbridge - a uniform client engine for key-value and document databases
///
/// One abstract operation set (connect, select database, get/set/delete/rename
/// keys, TTL, scan, flush and backend-native console commands) over many
/// backends:
/// 1. Drivers: one isolated worker per connection with a FIFO request queue
/// 2. Command registry: arity-checked dispatch of console input to handlers
/// 3. Settings: persisted connection, cluster and sentinel descriptions
/// 4. History log: timestamped server status snapshots per connection
pub mod core;
pub mod driver;
pub mod error;
pub mod history;
pub mod topology;
pub mod utils;

pub use crate::backends::{BackendPlugin, BackendRegistry};
pub use crate::config::{
    ClusterSettings, Config, ConfigError, ConnectionSettings, SentinelSettings, SettingsStore,
};
pub use crate::core::{BackendConnection, BackendKind, CommandRegistry, Reply};
pub use crate::driver::{DriverHandle, DriverOptions, DriverState, Request, Response};
pub use crate::error::{EngineError, EngineResult, ErrorKind};
pub use crate::history::{HistoryLog, HistorySnapshot};
pub use crate::topology::{Cluster, SentinelGroup, ServersManager};

/// Product name used in help banners and "not supported" messages
pub const PROJECT_NAME: &str = "kvbridge";
