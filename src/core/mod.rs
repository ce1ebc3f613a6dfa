/// Core abstractions shared by drivers and backend plugins
pub mod command;
pub mod connection;
pub mod console;
pub mod generic;
pub mod info;
pub mod reply;
pub mod translator;
pub mod value;

pub use command::{
    CommandContext, CommandHandler, CommandHolder, CommandRegistry, CommandType, LoggedCommand,
    LoggingType, UNBOUNDED_ARGS,
};
pub use connection::{BackendConnection, Capabilities, DatabaseInfo, Notification, ScanPage};
pub use info::{NodeRole, ServerInfo};
pub use reply::Reply;
pub use translator::{translator_for, CommandTranslator, KeyCommand};
pub use value::{Key, KeyValue, NsDisplayStrategy, TtlSecs, Value, ValueType, EXPIRED_TTL, NO_TTL};

use std::fmt;
use std::str::FromStr;

/// Backend engine kinds. The numeric ids are part of the persisted
/// connection string format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendKind {
    Redis,
    Memcached,
    Ssdb,
    LevelDb,
    RocksDb,
    UnQLite,
    Lmdb,
    UpscaleDb,
    ForestDb,
    Embedded,
}

impl BackendKind {
    pub const ALL: [BackendKind; 10] = [
        BackendKind::Redis,
        BackendKind::Memcached,
        BackendKind::Ssdb,
        BackendKind::LevelDb,
        BackendKind::RocksDb,
        BackendKind::UnQLite,
        BackendKind::Lmdb,
        BackendKind::UpscaleDb,
        BackendKind::ForestDb,
        BackendKind::Embedded,
    ];

    /// Persisted numeric id
    pub fn id(self) -> u8 {
        match self {
            BackendKind::Redis => 0,
            BackendKind::Memcached => 1,
            BackendKind::Ssdb => 2,
            BackendKind::LevelDb => 3,
            BackendKind::RocksDb => 4,
            BackendKind::UnQLite => 5,
            BackendKind::Lmdb => 6,
            BackendKind::UpscaleDb => 7,
            BackendKind::ForestDb => 8,
            BackendKind::Embedded => 9,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        BackendKind::ALL.iter().copied().find(|kind| kind.id() == id)
    }

    /// Remote kinds are reached over host/port, local kinds through a file path
    pub fn is_remote(self) -> bool {
        matches!(
            self,
            BackendKind::Redis | BackendKind::Memcached | BackendKind::Ssdb
        )
    }

    /// Only Redis-protocol backends form clusters and sentinel groups
    pub fn supports_topology(self) -> bool {
        self == BackendKind::Redis
    }

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Redis => "Redis",
            BackendKind::Memcached => "Memcached",
            BackendKind::Ssdb => "SSDB",
            BackendKind::LevelDb => "LevelDB",
            BackendKind::RocksDb => "RocksDB",
            BackendKind::UnQLite => "UnQLite",
            BackendKind::Lmdb => "LMDB",
            BackendKind::UpscaleDb => "UpscaleDB",
            BackendKind::ForestDb => "ForestDB",
            BackendKind::Embedded => "Embedded",
        }
    }

    /// Extension of the per-connection history log file
    pub fn log_extension(self) -> &'static str {
        match self {
            BackendKind::Redis => ".red",
            BackendKind::Memcached => ".mem",
            BackendKind::Ssdb => ".ssdb",
            BackendKind::LevelDb => ".leveldb",
            BackendKind::RocksDb => ".rocksdb",
            BackendKind::UnQLite => ".unq",
            BackendKind::Lmdb => ".lmdb",
            BackendKind::UpscaleDb => ".upscaledb",
            BackendKind::ForestDb => ".forestdb",
            BackendKind::Embedded => ".emb",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown backend kind: {}", s))
    }
}
