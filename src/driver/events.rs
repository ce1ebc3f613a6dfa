/// Requests accepted by a driver and the events it emits
use crate::core::{
    DatabaseInfo, Key, KeyCommand, LoggedCommand, LoggingType, NodeRole, Notification, Reply,
    ServerInfo,
};
use crate::driver::DriverState;
use crate::error::EngineResult;
use crate::history::HistorySnapshot;

pub type RequestId = u64;

/// Options of a console `Execute` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Skip per-command output events and collected outputs
    pub silent: bool,
    /// Extra runs of the whole script
    pub repeat: u32,
    /// Minimum duration of one run when repeating
    pub repeat_interval_ms: u64,
    /// Whether the commands belong in the user-visible history
    pub history: bool,
    pub logging_type: LoggingType,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            silent: false,
            repeat: 0,
            repeat_interval_ms: 0,
            history: true,
            logging_type: LoggingType::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Connect,
    Disconnect,
    Execute { text: String, options: ExecuteOptions },
    LoadDatabases,
    LoadDatabaseContent { pattern: String, cursor: u64, count: u64 },
    SetDefaultDatabase(String),
    ClearDatabase(String),
    LoadServerInfo,
    LoadServerInfoHistory,
    ClearServerHistory,
    Discover,
    CreateDatabase(String),
    RemoveDatabase(String),
    /// Load, create, edit, delete, rename or change the TTL of one key
    Key(KeyCommand),
}

impl Request {
    /// Console script with default options
    pub fn execute<S: Into<String>>(text: S) -> Self {
        Request::Execute {
            text: text.into(),
            options: ExecuteOptions::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Request::Connect => "connect",
            Request::Disconnect => "disconnect",
            Request::Execute { .. } => "execute",
            Request::LoadDatabases => "load databases",
            Request::LoadDatabaseContent { .. } => "load database content",
            Request::SetDefaultDatabase(_) => "set default database",
            Request::ClearDatabase(_) => "clear database",
            Request::LoadServerInfo => "load server info",
            Request::LoadServerInfoHistory => "load server info history",
            Request::ClearServerHistory => "clear server history",
            Request::Discover => "discover",
            Request::CreateDatabase(_) => "create database",
            Request::RemoveDatabase(_) => "remove database",
            Request::Key(command) => command.name(),
        }
    }
}

/// One command echoed by a non-silent `Execute`
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub command: String,
    pub reply: Reply,
}

/// What `Discover` learns about a node
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryInfo {
    pub server_info: ServerInfo,
    pub database: DatabaseInfo,
    pub role: NodeRole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Connected,
    Disconnected,
    Executed { outputs: Vec<CommandOutput> },
    Databases(Vec<DatabaseInfo>),
    DatabaseContent {
        database: DatabaseInfo,
        keys: Vec<Key>,
        next_cursor: u64,
    },
    DefaultDatabaseSet(DatabaseInfo),
    DatabaseCleared(String),
    ServerInfo(ServerInfo),
    ServerInfoHistory(Vec<HistorySnapshot>),
    ServerHistoryCleared,
    Discovery(DiscoveryInfo),
    DatabaseCreated(String),
    DatabaseRemoved(String),
    KeyCommandDone { command: KeyCommand, reply: Reply },
}

/// Terminal answer to one request
#[derive(Debug)]
pub struct Response {
    pub id: RequestId,
    pub result: EngineResult<Payload>,
}

/// Per-request events, delivered on the sender given with the request
#[derive(Debug)]
pub enum DriverEvent {
    Started { id: RequestId, request: &'static str },
    /// 0 first, monotonic, 100 last
    Progress { id: RequestId, percent: u8 },
    Output { id: RequestId, output: CommandOutput },
    /// Exactly one per request, always last
    Finished(Response),
}

impl DriverEvent {
    pub fn id(&self) -> RequestId {
        match self {
            DriverEvent::Started { id, .. }
            | DriverEvent::Progress { id, .. }
            | DriverEvent::Output { id, .. } => *id,
            DriverEvent::Finished(response) => response.id,
        }
    }
}

/// Driver-wide events broadcast to every subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum DriverNotification {
    CommandLogged(LoggedCommand),
    Backend(Notification),
    ServerInfoSnapshot { timestamp_ms: i64, info: ServerInfo },
    StateChanged(DriverState),
}
