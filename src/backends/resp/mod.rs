/// Redis-protocol backend over a blocking TCP socket
pub mod protocol;

#[cfg(test)]
pub(crate) mod mock;

use self::protocol::{RespEncoder, RespParser, RespValue};
use crate::config::{BackendConfig, ConnectionSettings};
use crate::core::console::{arg_text, parse_commands, split_args};
use crate::core::generic::generic_commands;
use crate::core::translator::RedisTranslator;
use crate::core::{
    BackendConnection, BackendKind, Capabilities, CommandContext, CommandHolder, CommandTranslator,
    CommandType, DatabaseInfo, Key, KeyValue, Notification, Reply, ScanPage, ServerInfo, TtlSecs,
    Value, ValueType, NO_TTL, UNBOUNDED_ARGS,
};
use crate::error::{EngineError, EngineResult};
use crate::topology::discovery::{parse_cluster_nodes, parse_sentinel_masters};
use crate::topology::redirect::RedirectParser;
use crate::topology::DiscoveredNode;
use bytes::{Bytes, BytesMut};
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const IO_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_DATABASES: u32 = 16;
const READ_CHUNK: usize = 16 * 1024;

pub struct RespConnection {
    stream: Option<TcpStream>,
    buffer: BytesMut,
    translator: RedisTranslator,
    database: u32,
    version: Option<String>,
}

impl Default for RespConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl RespConnection {
    pub fn new() -> Self {
        Self {
            stream: None,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            translator: RedisTranslator::new(BackendKind::Redis),
            database: 0,
            version: None,
        }
    }

    fn stream(&mut self) -> EngineResult<&mut TcpStream> {
        self.stream.as_mut().ok_or_else(EngineError::not_connected)
    }

    fn read_reply(&mut self) -> EngineResult<RespValue> {
        loop {
            match RespParser::parse(&mut self.buffer) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) => return Err(EngineError::protocol(e.to_string())),
            }
            let mut chunk = [0u8; READ_CHUNK];
            let read = self.stream()?.read(&mut chunk);
            match read {
                Ok(0) => {
                    self.drop_stream();
                    return Err(EngineError::connection("Connection closed by server"));
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) => {
                    self.drop_stream();
                    return Err(EngineError::connection(e.to_string()));
                }
            }
        }
    }

    fn drop_stream(&mut self) {
        self.stream = None;
        self.buffer.clear();
    }

    /// Send one request and read its reply. Error replies carrying a
    /// MOVED/ASK redirect become `EngineError::Redirect`.
    fn command<S: AsRef<[u8]>>(&mut self, argv: &[S]) -> EngineResult<Reply> {
        let request = RespEncoder::encode_command(argv);
        if let Err(e) = self.stream()?.write_all(&request) {
            self.drop_stream();
            return Err(EngineError::connection(e.to_string()));
        }
        match self.read_reply()? {
            RespValue::Error(message) => match RedirectParser::parse(message.as_bytes()) {
                Some(redirect) => Err(redirect.into()),
                None => Err(EngineError::backend(message)),
            },
            value => Ok(value.into_reply()),
        }
    }

    /// Run every line of translated command text, returning the last reply
    fn run_script(&mut self, text: &str) -> EngineResult<Reply> {
        let mut last = Reply::Nil;
        for line in parse_commands(text) {
            last = self.command(&split_args(&line)?)?;
        }
        Ok(last)
    }
}

impl BackendConnection for RespConnection {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            ttl: true,
            multi_db: true,
            manage_db: false,
            key_range: false,
            discovery: true,
        }
    }

    fn connect(&mut self, settings: &ConnectionSettings) -> EngineResult<()> {
        let BackendConfig::Remote(remote) = settings.config() else {
            return Err(EngineError::connection(format!(
                "{} needs a host and port",
                settings.name()
            )));
        };
        if remote.ssh.as_ref().map_or(false, |ssh| ssh.is_valid()) {
            return Err(EngineError::not_supported("ssh tunnel", self.kind()));
        }

        let address = (remote.host.host.as_str(), remote.host.port)
            .to_socket_addrs()
            .map_err(|e| EngineError::connection(format!("{}: {}", remote.host, e)))?
            .next()
            .ok_or_else(|| EngineError::connection(format!("Cannot resolve {}", remote.host)))?;
        let stream = TcpStream::connect_timeout(&address, CONNECT_TIMEOUT)
            .map_err(|e| EngineError::connection(format!("{}: {}", remote.host, e)))?;
        stream
            .set_read_timeout(Some(IO_TIMEOUT))
            .and_then(|_| stream.set_write_timeout(Some(IO_TIMEOUT)))
            .and_then(|_| stream.set_nodelay(true))
            .map_err(|e| EngineError::connection(e.to_string()))?;
        if let Err(e) = socket2::SockRef::from(&stream).set_keepalive(true) {
            log::warn!("failed to enable keepalive on {}: {}", remote.host, e);
        }

        self.buffer.clear();
        self.stream = Some(stream);
        self.database = 0;

        if let Some(password) = &remote.auth {
            if let Err(e) = self.command(&["AUTH", password.as_str()]) {
                self.drop_stream();
                return Err(e);
            }
        }

        self.version = self
            .info(&["server".to_string()])
            .ok()
            .and_then(|info| info.version().map(str::to_string));
        log::debug!("connected to {} ({:?})", remote.host, self.version);
        Ok(())
    }

    fn disconnect(&mut self) -> EngineResult<()> {
        if let Some(mut stream) = self.stream.take() {
            // Best effort; the server may already be gone
            let _ = stream.write_all(&RespEncoder::encode_command(&["QUIT"]));
        }
        self.buffer.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn server_version(&self) -> Option<String> {
        self.version.clone()
    }

    fn execute_raw(&mut self, argv: &[Bytes]) -> EngineResult<Reply> {
        self.command(argv)
    }

    fn info(&mut self, args: &[String]) -> EngineResult<ServerInfo> {
        let mut argv = vec!["INFO"];
        argv.extend(args.iter().map(String::as_str));
        match self.command(&argv)? {
            Reply::Bulk(text) => Ok(ServerInfo::parse(&String::from_utf8_lossy(&text))),
            other => Err(EngineError::protocol(format!("Unexpected INFO reply: {}", other))),
        }
    }

    fn current_database(&mut self) -> EngineResult<DatabaseInfo> {
        let key_count = self.db_key_count()?;
        Ok(DatabaseInfo::new(self.database.to_string(), true, key_count))
    }

    fn databases(&mut self) -> EngineResult<Vec<DatabaseInfo>> {
        let count = match self.command(&["CONFIG", "GET", "databases"]) {
            Ok(Reply::Array(items)) => items
                .get(1)
                .and_then(Reply::as_integer)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(DEFAULT_DATABASES),
            _ => DEFAULT_DATABASES,
        };
        let current_keys = self.db_key_count()?;
        Ok((0..count)
            .map(|index| {
                let is_default = index == self.database;
                let keys = if is_default { current_keys } else { 0 };
                DatabaseInfo::new(index.to_string(), is_default, keys)
            })
            .collect())
    }

    fn select(&mut self, name: &str) -> EngineResult<DatabaseInfo> {
        let index = name
            .parse::<u32>()
            .map_err(|_| EngineError::invalid_input(format!("Invalid database index: {}", name)))?;
        self.command(&["SELECT", name])?;
        self.database = index;
        self.current_database()
    }

    fn scan(&mut self, cursor: u64, pattern: &str, count: u64) -> EngineResult<ScanPage> {
        let reply = self.command(&[
            "SCAN".to_string(),
            cursor.to_string(),
            "MATCH".to_string(),
            pattern.to_string(),
            "COUNT".to_string(),
            count.to_string(),
        ])?;
        match reply.as_array() {
            Some([next, Reply::Array(keys)]) => {
                let next_cursor = next
                    .as_integer()
                    .and_then(|n| u64::try_from(n).ok())
                    .ok_or_else(|| EngineError::protocol("Invalid SCAN cursor"))?;
                let keys = keys
                    .iter()
                    .filter_map(|key| match key {
                        Reply::Bulk(data) => Some(Key::new(data.clone())),
                        _ => None,
                    })
                    .collect();
                Ok(ScanPage { keys, next_cursor })
            }
            _ => Err(EngineError::protocol(format!("Unexpected SCAN reply: {}", reply))),
        }
    }

    fn db_key_count(&mut self) -> EngineResult<u64> {
        let reply = self.command(&["DBSIZE"])?;
        reply
            .as_integer()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| EngineError::protocol(format!("Unexpected DBSIZE reply: {}", reply)))
    }

    fn set(&mut self, record: &KeyValue) -> EngineResult<()> {
        let text = self.translator.create_key_command(record)?;
        self.run_script(&text)?;
        if record.ttl != NO_TTL {
            self.set_ttl(&record.key, record.ttl)?;
        }
        Ok(())
    }

    fn get(&mut self, key: &Key) -> EngineResult<KeyValue> {
        let type_reply = self.command(&[&b"TYPE"[..], key.as_bytes()])?;
        let type_name = match &type_reply {
            Reply::Status(text) => text.clone(),
            Reply::Bulk(data) => String::from_utf8_lossy(data).into_owned(),
            other => return Err(EngineError::protocol(format!("Unexpected TYPE reply: {}", other))),
        };
        if type_name == "none" {
            return Err(EngineError::backend(format!("Key {} not found", key)));
        }
        let value_type = ValueType::from_type_name(&type_name)
            .ok_or_else(|| EngineError::not_supported(&type_name, self.kind()))?;

        let text = self.translator.load_key_command(key, value_type)?;
        let reply = self.run_script(&text)?;
        let value = Value::from_reply(value_type, &reply)?;
        let ttl = self.get_ttl(key)?;
        Ok(KeyValue::new(key.clone(), value).with_ttl(ttl))
    }

    fn delete(&mut self, keys: &[Key]) -> EngineResult<Vec<Key>> {
        let mut deleted = Vec::new();
        for key in keys {
            let text = self.translator.delete_key_command(key)?;
            if self.run_script(&text)?.as_integer() == Some(1) {
                deleted.push(key.clone());
            }
        }
        Ok(deleted)
    }

    fn rename(&mut self, key: &Key, new_name: &Key) -> EngineResult<()> {
        let text = self.translator.rename_key_command(key, new_name)?;
        self.run_script(&text).map(|_| ())
    }

    fn get_ttl(&mut self, key: &Key) -> EngineResult<TtlSecs> {
        let text = self.translator.load_ttl_command(key)?;
        let reply = self.run_script(&text)?;
        reply
            .as_integer()
            .ok_or_else(|| EngineError::protocol(format!("Unexpected TTL reply: {}", reply)))
    }

    fn set_ttl(&mut self, key: &Key, ttl: TtlSecs) -> EngineResult<()> {
        let text = self.translator.change_ttl_command(key, ttl)?;
        self.run_script(&text).map(|_| ())
    }

    fn flush_db(&mut self) -> EngineResult<()> {
        self.command(&["FLUSHDB"]).map(|_| ())
    }

    fn discover_cluster(&mut self) -> EngineResult<Vec<DiscoveredNode>> {
        match self.command(&["CLUSTER", "NODES"])? {
            Reply::Bulk(text) => parse_cluster_nodes(&String::from_utf8_lossy(&text)),
            other => Err(EngineError::protocol(format!("Unexpected CLUSTER NODES reply: {}", other))),
        }
    }

    fn discover_sentinel(&mut self) -> EngineResult<Vec<DiscoveredNode>> {
        let reply = self.command(&["SENTINEL", "MASTERS"])?;
        parse_sentinel_masters(&reply)
    }
}

/// Pass the argv straight to the server
fn native(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    ctx.connection().execute_raw(argv)
}

fn native_set(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let reply = ctx.connection().execute_raw(argv)?;
    if !matches!(reply, Reply::Nil) {
        ctx.notify(Notification::KeyAdded(KeyValue::new(
            Key::new(argv[1].clone()),
            Value::string(argv[2].clone()),
        )));
    }
    Ok(reply)
}

/// SETEX and PSETEX: key, expiry, value
fn native_setex(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let reply = ctx.connection().execute_raw(argv)?;
    let expiry = arg_text(&argv[2])?.parse::<TtlSecs>().unwrap_or(NO_TTL);
    let ttl = if argv[0].eq_ignore_ascii_case(b"PSETEX") && expiry != NO_TTL {
        expiry / 1000
    } else {
        expiry
    };
    ctx.notify(Notification::KeyAdded(
        KeyValue::new(Key::new(argv[1].clone()), Value::string(argv[3].clone())).with_ttl(ttl),
    ));
    Ok(reply)
}

fn native_setnx(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let reply = ctx.connection().execute_raw(argv)?;
    if reply.as_integer() == Some(1) {
        ctx.notify(Notification::KeyAdded(KeyValue::new(
            Key::new(argv[1].clone()),
            Value::string(argv[2].clone()),
        )));
    }
    Ok(reply)
}

fn native_del(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let keys: Vec<Key> = argv[1..].iter().cloned().map(Key::new).collect();
    let deleted = ctx.connection().delete(&keys)?;
    let count = deleted.len();
    for key in deleted {
        ctx.notify(Notification::KeyDeleted(key));
    }
    Ok(Reply::Integer(count as i64))
}

fn native_rename(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let reply = ctx.connection().execute_raw(argv)?;
    ctx.notify(Notification::KeyRenamed {
        key: Key::new(argv[1].clone()),
        new_name: Key::new(argv[2].clone()),
    });
    Ok(reply)
}

fn native_expire(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let reply = ctx.connection().execute_raw(argv)?;
    if reply.as_integer() == Some(1) {
        let ttl = match argv.get(2) {
            Some(seconds) => arg_text(seconds)?.parse::<TtlSecs>().unwrap_or(NO_TTL),
            None => NO_TTL,
        };
        ctx.notify(Notification::KeyTtlChanged {
            key: Key::new(argv[1].clone()),
            ttl,
        });
    }
    Ok(reply)
}

fn native_select(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let database = ctx.connection().select(arg_text(&argv[1])?)?;
    ctx.notify(Notification::DatabaseChanged(database));
    Ok(Reply::ok())
}

fn native_flushdb(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let database = ctx.connection().current_database()?;
    let reply = ctx.connection().execute_raw(argv)?;
    ctx.notify(Notification::DatabaseFlushed(database.name));
    Ok(reply)
}

/// Native Redis command table plus the generic verbs Redis lacks
pub fn redis_commands(capabilities: Capabilities) -> Vec<CommandHolder> {
    use CommandType::Native;
    let mut commands = vec![
        CommandHolder::new("APPEND", "<key> <value>", "Append a value to a key", 2, 2, Native, native).since("2.0.0"),
        CommandHolder::new("AUTH", "<password>", "Authenticate to the server", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("BGREWRITEAOF", "-", "Asynchronously rewrite the append-only file", 0, 0, Native, native).since("1.0.0"),
        CommandHolder::new("BGSAVE", "[SCHEDULE]", "Asynchronously save the dataset to disk", 0, 1, Native, native).since("1.0.0"),
        CommandHolder::new("BITCOUNT", "<key> [start end]", "Count set bits in a string", 1, 3, Native, native).since("2.6.0"),
        CommandHolder::new("BLPOP", "<key> [key ...] <timeout>", "Remove and get the first element in a list, or block until one is available", 2, UNBOUNDED_ARGS, Native, native).since("2.0.0"),
        CommandHolder::new("BRPOP", "<key> [key ...] <timeout>", "Remove and get the last element in a list, or block until one is available", 2, UNBOUNDED_ARGS, Native, native).since("2.0.0"),
        CommandHolder::new("BRPOPLPUSH", "<source> <destination> <timeout>", "Pop an element from a list, push it to another list and return it; or block until one is available", 3, 3, Native, native).since("2.2.0"),
        CommandHolder::new("CLIENT GETNAME", "-", "Get the current connection name", 0, 0, Native, native).since("2.6.9"),
        CommandHolder::new("CLIENT ID", "-", "Returns the client ID for the current connection", 0, 0, Native, native).since("5.0.0"),
        CommandHolder::new("CLIENT KILL", "<ip:port> | <filter> <value> [filter value ...]", "Kill the connection of a client", 1, UNBOUNDED_ARGS, Native, native).since("2.4.0"),
        CommandHolder::new("CLIENT LIST", "-", "Get the list of client connections", 0, 0, Native, native).since("2.4.0"),
        CommandHolder::new("CLIENT SETNAME", "<connection-name>", "Set the current connection name", 1, 1, Native, native).since("2.6.9"),
        CommandHolder::new("CLUSTER COUNTKEYSINSLOT", "<slot>", "Return the number of local keys in the specified hash slot", 1, 1, Native, native).since("3.0.0"),
        CommandHolder::new("CLUSTER INFO", "-", "Provides info about Redis Cluster node state", 0, 0, Native, native).since("3.0.0"),
        CommandHolder::new("CLUSTER KEYSLOT", "<key>", "Returns the hash slot of the specified key", 1, 1, Native, native).since("3.0.0"),
        CommandHolder::new("CLUSTER MYID", "-", "Return the node id", 0, 0, Native, native).since("3.0.0"),
        CommandHolder::new("CLUSTER NODES", "-", "Get Cluster config for the node", 0, 0, Native, native).since("3.0.0"),
        CommandHolder::new("CLUSTER SLOTS", "-", "Get array of Cluster slot to node mappings", 0, 0, Native, native).since("3.0.0"),
        CommandHolder::new("COMMAND COUNT", "-", "Get total number of Redis commands", 0, 0, Native, native).since("2.8.13"),
        CommandHolder::new("COMMAND INFO", "<command-name> [command-name ...]", "Get array of specific Redis command details", 1, UNBOUNDED_ARGS, Native, native).since("2.8.13"),
        CommandHolder::new("CONFIG GET", "<parameter>", "Get the value of a configuration parameter", 1, 1, Native, native).since("2.0.0"),
        CommandHolder::new("CONFIG RESETSTAT", "-", "Reset the stats returned by INFO", 0, 0, Native, native).since("2.0.0"),
        CommandHolder::new("CONFIG REWRITE", "-", "Rewrite the configuration file with the in memory configuration", 0, 0, Native, native).since("2.8.0"),
        CommandHolder::new("CONFIG SET", "<parameter> <value>", "Set a configuration parameter to the given value", 2, 2, Native, native).since("2.0.0"),
        CommandHolder::new("COPY", "<source> <destination> [DB destination-db] [REPLACE]", "Copy a key", 2, 5, Native, native).since("6.2.0"),
        CommandHolder::new("DBSIZE", "-", "Return the number of keys in the selected database", 0, 0, Native, native).since("1.0.0"),
        CommandHolder::new("DECR", "<key>", "Decrement the integer value of a key by one", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("DECRBY", "<key> <decrement>", "Decrement the integer value of a key by the given number", 2, 2, Native, native).since("1.0.0"),
        CommandHolder::new("DEL", "<key> [key ...]", "Delete a key", 1, UNBOUNDED_ARGS, Native, native_del).since("1.0.0"),
        CommandHolder::new("DISCARD", "-", "Discard all commands issued after MULTI", 0, 0, Native, native).since("2.0.0"),
        CommandHolder::new("DUMP", "<key>", "Return a serialized version of the value stored at the specified key", 1, 1, Native, native).since("2.6.0"),
        CommandHolder::new("ECHO", "<message>", "Echo the given string", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("EVAL", "<script> <numkeys> [key ...] [arg ...]", "Execute a Lua script server side", 2, UNBOUNDED_ARGS, Native, native).since("2.6.0"),
        CommandHolder::new("EVALSHA", "<sha1> <numkeys> [key ...] [arg ...]", "Execute a Lua script server side", 2, UNBOUNDED_ARGS, Native, native).since("2.6.0"),
        CommandHolder::new("EXEC", "-", "Execute all commands issued after MULTI", 0, 0, Native, native).since("1.2.0"),
        CommandHolder::new("EXISTS", "<key> [key ...]", "Determine if a key exists", 1, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("EXPIRE", "<key> <seconds>", "Set a key's time to live in seconds", 2, 2, Native, native_expire).since("1.0.0"),
        CommandHolder::new("EXPIREAT", "<key> <timestamp>", "Set the expiration for a key as a UNIX timestamp", 2, 2, Native, native).since("1.2.0"),
        CommandHolder::new("FLUSHALL", "[ASYNC]", "Remove all keys from all databases", 0, 1, Native, native).since("1.0.0"),
        CommandHolder::new("FLUSHDB", "-", "Remove all keys from the current database", 0, 0, Native, native_flushdb).since("1.0.0"),
        CommandHolder::new("GEOADD", "<key> <longitude> <latitude> <member> [longitude latitude member ...]", "Add one or more geospatial items in the geospatial index represented using a sorted set", 4, UNBOUNDED_ARGS, Native, native).since("3.2.0"),
        CommandHolder::new("GEODIST", "<key> <member1> <member2> [unit]", "Returns the distance between two members of a geospatial index", 3, 4, Native, native).since("3.2.0"),
        CommandHolder::new("GEOHASH", "<key> <member> [member ...]", "Returns members of a geospatial index as standard geohash strings", 1, UNBOUNDED_ARGS, Native, native).since("3.2.0"),
        CommandHolder::new("GEOPOS", "<key> <member> [member ...]", "Returns longitude and latitude of members of a geospatial index", 1, UNBOUNDED_ARGS, Native, native).since("3.2.0"),
        CommandHolder::new("GEORADIUS", "<key> <longitude> <latitude> <radius> <m|km|ft|mi> [WITHCOORD] [WITHDIST] [WITHHASH] [COUNT count] [ASC|DESC]", "Query a sorted set representing a geospatial index to fetch members matching a given maximum distance from a point", 5, UNBOUNDED_ARGS, Native, native).since("3.2.0"),
        CommandHolder::new("GEORADIUSBYMEMBER", "<key> <member> <radius> <m|km|ft|mi> [WITHCOORD] [WITHDIST] [WITHHASH] [COUNT count] [ASC|DESC]", "Query a sorted set representing a geospatial index to fetch members matching a given maximum distance from a member", 4, UNBOUNDED_ARGS, Native, native).since("3.2.0"),
        CommandHolder::new("GET", "<key>", "Get the value of a key", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("GETBIT", "<key> <offset>", "Returns the bit value at offset in the string value stored at key", 2, 2, Native, native).since("2.2.0"),
        CommandHolder::new("GETDEL", "<key>", "Get the value of a key and delete the key", 1, 1, Native, native).since("6.2.0"),
        CommandHolder::new("GETRANGE", "<key> <start> <end>", "Get a substring of the string stored at a key", 3, 3, Native, native).since("2.4.0"),
        CommandHolder::new("GETSET", "<key> <value>", "Set the string value of a key and return its old value", 2, 2, Native, native).since("1.0.0"),
        CommandHolder::new("HDEL", "<key> <field> [field ...]", "Delete one or more hash fields", 2, UNBOUNDED_ARGS, Native, native).since("2.0.0"),
        CommandHolder::new("HEXISTS", "<key> <field>", "Determine if a hash field exists", 2, 2, Native, native).since("2.0.0"),
        CommandHolder::new("HGET", "<key> <field>", "Get the value of a hash field", 2, 2, Native, native).since("2.0.0"),
        CommandHolder::new("HGETALL", "<key>", "Get all the fields and values in a hash", 1, 1, Native, native).since("2.0.0"),
        CommandHolder::new("HINCRBY", "<key> <field> <increment>", "Increment the integer value of a hash field by the given number", 3, 3, Native, native).since("2.0.0"),
        CommandHolder::new("HINCRBYFLOAT", "<key> <field> <increment>", "Increment the float value of a hash field by the given amount", 3, 3, Native, native).since("2.6.0"),
        CommandHolder::new("HKEYS", "<key>", "Get all the fields in a hash", 1, 1, Native, native).since("2.0.0"),
        CommandHolder::new("HLEN", "<key>", "Get the number of fields in a hash", 1, 1, Native, native).since("2.0.0"),
        CommandHolder::new("HMGET", "<key> <field> [field ...]", "Get the values of all the given hash fields", 2, UNBOUNDED_ARGS, Native, native).since("2.0.0"),
        CommandHolder::new("HMSET", "<key> <field> <value> [field value ...]", "Set multiple hash fields to multiple values", 3, UNBOUNDED_ARGS, Native, native).since("2.0.0"),
        CommandHolder::new("HRANDFIELD", "<key> [count [WITHVALUES]]", "Get one or multiple random fields from a hash", 1, 3, Native, native).since("6.2.0"),
        CommandHolder::new("HSCAN", "<key> <cursor> [MATCH pattern] [COUNT count]", "Incrementally iterate hash fields and associated values", 2, 6, Native, native).since("2.8.0"),
        CommandHolder::new("HSET", "<key> <field> <value> [field value ...]", "Set the string value of a hash field", 3, UNBOUNDED_ARGS, Native, native).since("2.0.0"),
        CommandHolder::new("HSETNX", "<key> <field> <value>", "Set the value of a hash field, only if the field does not exist", 3, 3, Native, native).since("2.0.0"),
        CommandHolder::new("HSTRLEN", "<key> <field>", "Get the length of the value of a hash field", 2, 2, Native, native).since("3.2.0"),
        CommandHolder::new("HVALS", "<key>", "Get all the values in a hash", 1, 1, Native, native).since("2.0.0"),
        CommandHolder::new("INCR", "<key>", "Increment the integer value of a key by one", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("INCRBY", "<key> <increment>", "Increment the integer value of a key by the given amount", 2, 2, Native, native).since("1.0.0"),
        CommandHolder::new("INCRBYFLOAT", "<key> <increment>", "Increment the float value of a key by the given amount", 2, 2, Native, native).since("2.6.0"),
        CommandHolder::new("INFO", "[section]", "Get information and statistics about the server", 0, 1, Native, native).since("1.0.0"),
        CommandHolder::new("KEYS", "<pattern>", "Find all keys matching the given pattern", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("LASTSAVE", "-", "Get the UNIX time stamp of the last successful save to disk", 0, 0, Native, native).since("1.0.0"),
        CommandHolder::new("LINDEX", "<key> <index>", "Get an element from a list by its index", 2, 2, Native, native).since("1.0.0"),
        CommandHolder::new("LINSERT", "<key> <BEFORE|AFTER> <pivot> <value>", "Insert an element before or after another element in a list", 4, 4, Native, native).since("2.2.0"),
        CommandHolder::new("LLEN", "<key>", "Get the length of a list", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("LMOVE", "<source> <destination> <LEFT|RIGHT> <LEFT|RIGHT>", "Pop an element from a list, push it to another list and return it", 4, 4, Native, native).since("6.2.0"),
        CommandHolder::new("LPOP", "<key> [count]", "Remove and get the first elements in a list", 1, 2, Native, native).since("1.0.0"),
        CommandHolder::new("LPOS", "<key> <element> [RANK rank] [COUNT num-matches] [MAXLEN len]", "Return the index of matching elements on a list", 2, 8, Native, native).since("6.0.6"),
        CommandHolder::new("LPUSH", "<key> <value> [value ...]", "Prepend one or multiple values to a list", 2, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("LPUSHX", "<key> <value> [value ...]", "Prepend an element to a list, only if the list exists", 2, UNBOUNDED_ARGS, Native, native).since("2.2.0"),
        CommandHolder::new("LRANGE", "<key> <start> <stop>", "Get a range of elements from a list", 3, 3, Native, native).since("1.0.0"),
        CommandHolder::new("LREM", "<key> <count> <value>", "Remove elements from a list", 3, 3, Native, native).since("1.0.0"),
        CommandHolder::new("LSET", "<key> <index> <value>", "Set the value of an element in a list by its index", 3, 3, Native, native).since("1.0.0"),
        CommandHolder::new("LTRIM", "<key> <start> <stop>", "Trim a list to the specified range", 3, 3, Native, native).since("1.0.0"),
        CommandHolder::new("MEMORY STATS", "-", "Show memory usage details", 0, 0, Native, native).since("4.0.0"),
        CommandHolder::new("MEMORY USAGE", "<key> [SAMPLES count]", "Estimate the memory usage of a key", 1, 3, Native, native).since("4.0.0"),
        CommandHolder::new("MGET", "<key> [key ...]", "Get the values of all the given keys", 1, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("MIGRATE", "<host> <port> <key|\"\"> <destination-db> <timeout> [COPY] [REPLACE] [KEYS key ...]", "Atomically transfer a key from a Redis instance to another one", 5, UNBOUNDED_ARGS, Native, native).since("2.6.0"),
        CommandHolder::new("MOVE", "<key> <db>", "Move a key to another database", 2, 2, Native, native).since("1.0.0"),
        CommandHolder::new("MSET", "<key> <value> [key value ...]", "Set multiple keys to multiple values", 2, UNBOUNDED_ARGS, Native, native).since("1.0.1"),
        CommandHolder::new("MSETNX", "<key> <value> [key value ...]", "Set multiple keys to multiple values, only if none of the keys exist", 2, UNBOUNDED_ARGS, Native, native).since("1.0.1"),
        CommandHolder::new("MULTI", "-", "Mark the start of a transaction block", 0, 0, Native, native).since("1.2.0"),
        CommandHolder::new("OBJECT", "<subcommand> [arguments ...]", "Inspect the internals of Redis objects", 1, UNBOUNDED_ARGS, Native, native).since("2.2.3"),
        CommandHolder::new("PERSIST", "<key>", "Remove the expiration from a key", 1, 1, Native, native_expire).since("2.2.0"),
        CommandHolder::new("PEXPIRE", "<key> <milliseconds>", "Set a key's time to live in milliseconds", 2, 2, Native, native).since("2.6.0"),
        CommandHolder::new("PEXPIREAT", "<key> <milliseconds-timestamp>", "Set the expiration for a key as a UNIX timestamp specified in milliseconds", 2, 2, Native, native).since("2.6.0"),
        CommandHolder::new("PFADD", "<key> [element ...]", "Adds the specified elements to the specified HyperLogLog", 1, UNBOUNDED_ARGS, Native, native).since("2.8.9"),
        CommandHolder::new("PFCOUNT", "<key> [key ...]", "Return the approximated cardinality of the set(s) observed by the HyperLogLog at key(s)", 1, UNBOUNDED_ARGS, Native, native).since("2.8.9"),
        CommandHolder::new("PFMERGE", "<destkey> [sourcekey ...]", "Merge N different HyperLogLogs into a single one", 1, UNBOUNDED_ARGS, Native, native).since("2.8.9"),
        CommandHolder::new("PING", "[message]", "Ping the server", 0, 1, Native, native).since("1.0.0"),
        CommandHolder::new("PSETEX", "<key> <milliseconds> <value>", "Set the value and expiration in milliseconds of a key", 3, 3, Native, native_setex).since("2.6.0"),
        CommandHolder::new("PTTL", "<key>", "Get the time to live for a key in milliseconds", 1, 1, Native, native).since("2.6.0"),
        CommandHolder::new("PUBLISH", "<channel> <message>", "Post a message to a channel", 2, 2, Native, native).since("2.0.0"),
        CommandHolder::new("PUBSUB", "<subcommand> [argument ...]", "Inspect the state of the Pub/Sub subsystem", 1, UNBOUNDED_ARGS, Native, native).since("2.8.0"),
        CommandHolder::new("RANDOMKEY", "-", "Return a random key from the keyspace", 0, 0, Native, native).since("1.0.0"),
        CommandHolder::new("READONLY", "-", "Enables read queries for a connection to a cluster replica node", 0, 0, Native, native).since("3.0.0"),
        CommandHolder::new("READWRITE", "-", "Disables read queries for a connection to a cluster replica node", 0, 0, Native, native).since("3.0.0"),
        CommandHolder::new("RENAME", "<key> <newkey>", "Rename a key", 2, 2, Native, native_rename).since("1.0.0"),
        CommandHolder::new("RENAMENX", "<key> <newkey>", "Rename a key, only if the new key does not exist", 2, 2, Native, native).since("1.0.0"),
        CommandHolder::new("REPLICAOF", "<host> <port>", "Make the server a replica of another instance, or promote it as master", 2, 2, Native, native).since("5.0.0"),
        CommandHolder::new("RESTORE", "<key> <ttl> <serialized-value> [REPLACE]", "Create a key using the provided serialized value, previously obtained using DUMP", 3, 4, Native, native).since("2.6.0"),
        CommandHolder::new("ROLE", "-", "Return the role of the instance in the context of replication", 0, 0, Native, native).since("2.8.12"),
        CommandHolder::new("RPOP", "<key> [count]", "Remove and get the last elements in a list", 1, 2, Native, native).since("1.0.0"),
        CommandHolder::new("RPOPLPUSH", "<source> <destination>", "Remove the last element in a list, prepend it to another list and return it", 2, 2, Native, native).since("1.2.0"),
        CommandHolder::new("RPUSH", "<key> <value> [value ...]", "Append one or multiple values to a list", 2, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("RPUSHX", "<key> <value> [value ...]", "Append an element to a list, only if the list exists", 2, UNBOUNDED_ARGS, Native, native).since("2.2.0"),
        CommandHolder::new("SADD", "<key> <member> [member ...]", "Add one or more members to a set", 2, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("SAVE", "-", "Synchronously save the dataset to disk", 0, 0, Native, native).since("1.0.0"),
        CommandHolder::new("SCAN", "<cursor> [MATCH pattern] [COUNT count]", "Incrementally iterate the keys space", 1, 5, Native, native).since("2.8.0"),
        CommandHolder::new("SCARD", "<key>", "Get the number of members in a set", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("SCRIPT EXISTS", "<sha1> [sha1 ...]", "Check existence of scripts in the script cache", 1, UNBOUNDED_ARGS, Native, native).since("2.6.0"),
        CommandHolder::new("SCRIPT FLUSH", "[ASYNC|SYNC]", "Remove all the scripts from the script cache", 0, 1, Native, native).since("2.6.0"),
        CommandHolder::new("SCRIPT KILL", "-", "Kill the script currently in execution", 0, 0, Native, native).since("2.6.0"),
        CommandHolder::new("SCRIPT LOAD", "<script>", "Load the specified Lua script into the script cache", 1, 1, Native, native).since("2.6.0"),
        CommandHolder::new("SDIFF", "<key> [key ...]", "Subtract multiple sets", 1, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("SDIFFSTORE", "<destination> <key> [key ...]", "Subtract multiple sets and store the resulting set in a key", 2, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("SELECT", "<index>", "Change the selected database for the current connection", 1, 1, Native, native_select).since("1.0.0"),
        CommandHolder::new("SENTINEL GET-MASTER-ADDR-BY-NAME", "<master-name>", "Return the ip and port number of the master with that name", 1, 1, Native, native).since("2.8.4"),
        CommandHolder::new("SENTINEL MASTER", "<master-name>", "Show the state and info of the specified master", 1, 1, Native, native).since("2.8.4"),
        CommandHolder::new("SENTINEL MASTERS", "-", "Show a list of monitored masters and their state", 0, 0, Native, native).since("2.8.4"),
        CommandHolder::new("SENTINEL RESET", "<pattern>", "Reset all the masters with matching name", 1, 1, Native, native).since("2.8.4"),
        CommandHolder::new("SENTINEL SLAVES", "<master-name>", "Show a list of replicas for this master, and their state", 1, 1, Native, native).since("2.8.4"),
        CommandHolder::new("SET", "<key> <value> [EX seconds] [PX milliseconds] [NX|XX]", "Set the string value of a key", 2, 7, Native, native_set)
            .since("1.0.0")
            .example("SET key value"),
        CommandHolder::new("SETBIT", "<key> <offset> <value>", "Sets or clears the bit at offset in the string value stored at key", 3, 3, Native, native).since("2.2.0"),
        CommandHolder::new("SETEX", "<key> <seconds> <value>", "Set the value and expiration of a key", 3, 3, Native, native_setex).since("2.0.0"),
        CommandHolder::new("SETNX", "<key> <value>", "Set the value of a key, only if the key does not exist", 2, 2, Native, native_setnx).since("1.0.0"),
        CommandHolder::new("SETRANGE", "<key> <offset> <value>", "Overwrite part of a string at key starting at the specified offset", 3, 3, Native, native).since("2.2.0"),
        CommandHolder::new("SHUTDOWN", "[NOSAVE|SAVE]", "Synchronously save the dataset to disk and then shut down the server", 0, 1, Native, native).since("1.0.0"),
        CommandHolder::new("SINTER", "<key> [key ...]", "Intersect multiple sets", 1, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("SINTERSTORE", "<destination> <key> [key ...]", "Intersect multiple sets and store the resulting set in a key", 2, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("SISMEMBER", "<key> <member>", "Determine if a given value is a member of a set", 2, 2, Native, native).since("1.0.0"),
        CommandHolder::new("SLAVEOF", "<host> <port>", "Make the server a replica of another instance, or promote it as master", 2, 2, Native, native).since("1.0.0"),
        CommandHolder::new("SLOWLOG", "<subcommand> [argument]", "Manages the Redis slow queries log", 1, 2, Native, native).since("2.2.12"),
        CommandHolder::new("SMEMBERS", "<key>", "Get all the members in a set", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("SMISMEMBER", "<key> <member> [member ...]", "Returns the membership associated with the given elements for a set", 2, UNBOUNDED_ARGS, Native, native).since("6.2.0"),
        CommandHolder::new("SMOVE", "<source> <destination> <member>", "Move a member from one set to another", 3, 3, Native, native).since("1.0.0"),
        CommandHolder::new("SORT", "<key> [BY pattern] [LIMIT offset count] [GET pattern ...] [ASC|DESC] [ALPHA] [STORE destination]", "Sort the elements in a list, set or sorted set", 1, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("SPOP", "<key> [count]", "Remove and return one or multiple random members from a set", 1, 2, Native, native).since("1.0.0"),
        CommandHolder::new("SRANDMEMBER", "<key> [count]", "Get one or multiple random members from a set", 1, 2, Native, native).since("1.0.0"),
        CommandHolder::new("SREM", "<key> <member> [member ...]", "Remove one or more members from a set", 2, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("SSCAN", "<key> <cursor> [MATCH pattern] [COUNT count]", "Incrementally iterate Set elements", 2, 6, Native, native).since("2.8.0"),
        CommandHolder::new("STRLEN", "<key>", "Get the length of the value stored in a key", 1, 1, Native, native).since("2.2.0"),
        CommandHolder::new("SUNION", "<key> [key ...]", "Add multiple sets", 1, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("SUNIONSTORE", "<destination> <key> [key ...]", "Add multiple sets and store the resulting set in a key", 2, UNBOUNDED_ARGS, Native, native).since("1.0.0"),
        CommandHolder::new("SWAPDB", "<index1> <index2>", "Swaps two Redis databases", 2, 2, Native, native).since("4.0.0"),
        CommandHolder::new("TIME", "-", "Return the current server time", 0, 0, Native, native).since("2.6.0"),
        CommandHolder::new("TOUCH", "<key> [key ...]", "Alters the last access time of a key(s)", 1, UNBOUNDED_ARGS, Native, native).since("3.2.1"),
        CommandHolder::new("TTL", "<key>", "Get the time to live for a key", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("TYPE", "<key>", "Determine the type stored at key", 1, 1, Native, native).since("1.0.0"),
        CommandHolder::new("UNLINK", "<key> [key ...]", "Delete a key asynchronously in another thread", 1, UNBOUNDED_ARGS, Native, native).since("4.0.0"),
        CommandHolder::new("UNWATCH", "-", "Forget about all watched keys", 0, 0, Native, native).since("2.2.0"),
        CommandHolder::new("WAIT", "<numreplicas> <timeout>", "Wait for the synchronous replication of all the write commands sent in the context of the current connection", 2, 2, Native, native).since("3.0.0"),
        CommandHolder::new("WATCH", "<key> [key ...]", "Watch the given keys to determine execution of the MULTI/EXEC block", 1, UNBOUNDED_ARGS, Native, native).since("2.2.0"),
        CommandHolder::new("XACK", "<key> <group> <ID> [ID ...]", "Marks a pending message as correctly processed", 3, UNBOUNDED_ARGS, Native, native).since("5.0.0"),
        CommandHolder::new("XADD", "<key> <ID> <field> <value> [field value ...]", "Appends a new entry to a stream", 4, UNBOUNDED_ARGS, Native, native).since("5.0.0"),
        CommandHolder::new("XCLAIM", "<key> <group> <consumer> <min-idle-time> <ID> [ID ...]", "Changes (or acquires) ownership of a message in a consumer group", 5, UNBOUNDED_ARGS, Native, native).since("5.0.0"),
        CommandHolder::new("XDEL", "<key> <ID> [ID ...]", "Removes the specified entries from the stream", 2, UNBOUNDED_ARGS, Native, native).since("5.0.0"),
        CommandHolder::new("XGROUP", "<subcommand> [arguments ...]", "Create, destroy, and manage consumer groups", 1, UNBOUNDED_ARGS, Native, native).since("5.0.0"),
        CommandHolder::new("XINFO", "<subcommand> [arguments ...]", "Get information on streams and consumer groups", 1, UNBOUNDED_ARGS, Native, native).since("5.0.0"),
        CommandHolder::new("XLEN", "<key>", "Return the number of entries in a stream", 1, 1, Native, native).since("5.0.0"),
        CommandHolder::new("XPENDING", "<key> <group> [start end count] [consumer]", "Return information and entries from a stream consumer group pending entries list", 2, UNBOUNDED_ARGS, Native, native).since("5.0.0"),
        CommandHolder::new("XRANGE", "<key> <start> <end> [COUNT count]", "Return a range of elements in a stream", 3, 5, Native, native).since("5.0.0"),
        CommandHolder::new("XREAD", "[COUNT count] [BLOCK milliseconds] STREAMS <key> [key ...] <ID> [ID ...]", "Return never seen elements in multiple streams", 3, UNBOUNDED_ARGS, Native, native).since("5.0.0"),
        CommandHolder::new("XREADGROUP", "GROUP <group> <consumer> [COUNT count] [BLOCK milliseconds] STREAMS <key> [key ...] <ID> [ID ...]", "Return new entries from a stream using a consumer group", 6, UNBOUNDED_ARGS, Native, native).since("5.0.0"),
        CommandHolder::new("XREVRANGE", "<key> <end> <start> [COUNT count]", "Return a range of elements in a stream, in reverse order", 3, 5, Native, native).since("5.0.0"),
        CommandHolder::new("XTRIM", "<key> MAXLEN [~] <count>", "Trims the stream to a given number of items", 3, 4, Native, native).since("5.0.0"),
        CommandHolder::new("ZADD", "<key> <score> <member> [score member ...]", "Add one or more members to a sorted set", 3, UNBOUNDED_ARGS, Native, native).since("1.2.0"),
        CommandHolder::new("ZCARD", "<key>", "Get the number of members in a sorted set", 1, 1, Native, native).since("1.2.0"),
        CommandHolder::new("ZCOUNT", "<key> <min> <max>", "Count the members in a sorted set with scores within the given values", 3, 3, Native, native).since("2.0.0"),
        CommandHolder::new("ZINCRBY", "<key> <increment> <member>", "Increment the score of a member in a sorted set", 3, 3, Native, native).since("1.2.0"),
        CommandHolder::new("ZINTERSTORE", "<destination> <numkeys> <key> [key ...] [WEIGHTS weight ...] [AGGREGATE SUM|MIN|MAX]", "Intersect multiple sorted sets and store the resulting sorted set in a new key", 3, UNBOUNDED_ARGS, Native, native).since("2.0.0"),
        CommandHolder::new("ZLEXCOUNT", "<key> <min> <max>", "Count the number of members in a sorted set between a given lexicographical range", 3, 3, Native, native).since("2.8.9"),
        CommandHolder::new("ZMSCORE", "<key> <member> [member ...]", "Get the score associated with the given members in a sorted set", 2, UNBOUNDED_ARGS, Native, native).since("6.2.0"),
        CommandHolder::new("ZPOPMAX", "<key> [count]", "Remove and return members with the highest scores in a sorted set", 1, 2, Native, native).since("5.0.0"),
        CommandHolder::new("ZPOPMIN", "<key> [count]", "Remove and return members with the lowest scores in a sorted set", 1, 2, Native, native).since("5.0.0"),
        CommandHolder::new("ZRANGE", "<key> <start> <stop> [WITHSCORES]", "Return a range of members in a sorted set, by index", 3, 4, Native, native).since("1.2.0"),
        CommandHolder::new("ZRANGEBYLEX", "<key> <min> <max> [LIMIT offset count]", "Return a range of members in a sorted set, by lexicographical range", 3, 6, Native, native).since("2.8.9"),
        CommandHolder::new("ZRANGEBYSCORE", "<key> <min> <max> [WITHSCORES] [LIMIT offset count]", "Return a range of members in a sorted set, by score", 3, 7, Native, native).since("1.0.5"),
        CommandHolder::new("ZRANK", "<key> <member>", "Determine the index of a member in a sorted set", 2, 2, Native, native).since("2.0.0"),
        CommandHolder::new("ZREM", "<key> <member> [member ...]", "Remove one or more members from a sorted set", 2, UNBOUNDED_ARGS, Native, native).since("1.2.0"),
        CommandHolder::new("ZREMRANGEBYLEX", "<key> <min> <max>", "Remove all members in a sorted set between the given lexicographical range", 3, 3, Native, native).since("2.8.9"),
        CommandHolder::new("ZREMRANGEBYRANK", "<key> <start> <stop>", "Remove all members in a sorted set within the given indexes", 3, 3, Native, native).since("2.0.0"),
        CommandHolder::new("ZREMRANGEBYSCORE", "<key> <min> <max>", "Remove all members in a sorted set within the given scores", 3, 3, Native, native).since("1.2.0"),
        CommandHolder::new("ZREVRANGE", "<key> <start> <stop> [WITHSCORES]", "Return a range of members in a sorted set, by index, with scores ordered from high to low", 3, 4, Native, native).since("1.2.0"),
        CommandHolder::new("ZREVRANGEBYSCORE", "<key> <max> <min> [WITHSCORES] [LIMIT offset count]", "Return a range of members in a sorted set, by score, with scores ordered from high to low", 3, 7, Native, native).since("2.2.0"),
        CommandHolder::new("ZREVRANK", "<key> <member>", "Determine the index of a member in a sorted set, with scores ordered from high to low", 2, 2, Native, native).since("2.0.0"),
        CommandHolder::new("ZSCAN", "<key> <cursor> [MATCH pattern] [COUNT count]", "Incrementally iterate sorted sets elements and associated scores", 2, 6, Native, native).since("2.8.0"),
        CommandHolder::new("ZSCORE", "<key> <member>", "Get the score associated with the given member in a sorted set", 2, 2, Native, native).since("1.2.0"),
        CommandHolder::new("ZUNIONSTORE", "<destination> <numkeys> <key> [key ...] [WEIGHTS weight ...] [AGGREGATE SUM|MIN|MAX]", "Add multiple sorted sets and store the resulting sorted set in a new key", 3, UNBOUNDED_ARGS, Native, native).since("2.0.0"),
    ];
    commands.extend(
        generic_commands(capabilities)
            .into_iter()
            .filter(|holder| matches!(holder.name, "HELP" | "DBKCOUNT" | "QUIT")),
    );
    commands
}

#[cfg(test)]
mod tests {
    use super::mock::{MockServer, MockState};
    use super::*;
    use crate::config::{HostAndPort, RemoteConfig};
    use crate::core::CommandRegistry;
    use crate::error::{CommandError, ErrorKind};

    fn settings_for(port: u16) -> ConnectionSettings {
        ConnectionSettings::new(
            "resp",
            BackendKind::Redis,
            BackendConfig::Remote(RemoteConfig::new(HostAndPort::new("127.0.0.1", port))),
        )
        .unwrap()
    }

    fn connected(server: &MockServer) -> RespConnection {
        let mut conn = RespConnection::new();
        conn.connect(&settings_for(server.port())).unwrap();
        conn
    }

    #[test]
    fn test_connect_reads_version() {
        let server = MockServer::redis();
        let conn = connected(&server);
        assert!(conn.is_connected());
        assert_eq!(conn.server_version().as_deref(), Some("7.2.0"));
    }

    #[test]
    fn test_auth_failure_disconnects() {
        let server = MockServer::start(MockState {
            password: Some("secret".to_string()),
            ..Default::default()
        });
        let mut remote = RemoteConfig::new(HostAndPort::new("127.0.0.1", server.port()));
        remote.auth = Some("wrong".to_string());
        let settings =
            ConnectionSettings::new("auth", BackendKind::Redis, BackendConfig::Remote(remote)).unwrap();

        let mut conn = RespConnection::new();
        assert!(conn.connect(&settings).is_err());
        assert!(!conn.is_connected());
    }

    #[test]
    fn test_key_operations() {
        let server = MockServer::redis();
        let mut conn = connected(&server);

        conn.set(&KeyValue::new("a", Value::string("1"))).unwrap();
        let record = conn.get(&Key::from("a")).unwrap();
        assert_eq!(record.value, Value::string("1"));
        assert_eq!(record.ttl, NO_TTL);

        conn.rename(&Key::from("a"), &Key::from("b")).unwrap();
        assert_eq!(conn.db_key_count().unwrap(), 1);
        let deleted = conn.delete(&[Key::from("b"), Key::from("missing")]).unwrap();
        assert_eq!(deleted, vec![Key::from("b")]);
        assert!(conn.get(&Key::from("b")).is_err());
    }

    #[test]
    fn test_binary_keys_reach_server_intact() {
        let server = MockServer::redis();
        let mut conn = connected(&server);
        let key = Key::new(&b"user:\xff\xfe"[..]);
        let renamed = Key::new(&b"user:\xc3("[..]);

        conn.set(&KeyValue::new(key.clone(), Value::string("1"))).unwrap();
        assert!(server.state.lock().unwrap().data.contains_key(key.as_bytes()));

        let page = conn.scan(0, "*", 10).unwrap();
        assert_eq!(page.keys, vec![key.clone()]);
        assert_eq!(conn.get(&page.keys[0]).unwrap().value, Value::string("1"));

        conn.rename(&key, &renamed).unwrap();
        let deleted = conn.delete(&[renamed.clone()]).unwrap();
        assert_eq!(deleted, vec![renamed]);
        assert!(server.state.lock().unwrap().data.is_empty());
    }

    #[test]
    fn test_error_reply_maps_to_redirect() {
        let mut state = MockState::default();
        state.moved.insert(Bytes::from("k"), "127.0.0.1:7001".to_string());
        let server = MockServer::start(state);
        let mut conn = connected(&server);

        let err = conn.execute_raw(&[Bytes::from("GET"), Bytes::from("k")]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Redirect { slot: 0, ask: false, ref target } if target == "127.0.0.1:7001"
        ));

        let err = conn.execute_raw(&[Bytes::from("NOPE")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Command);
        assert!(conn.is_connected());
    }

    #[test]
    fn test_databases_from_config() {
        let server = MockServer::redis();
        let mut conn = connected(&server);
        let databases = conn.databases().unwrap();
        assert_eq!(databases.len(), 4);
        assert!(databases[0].is_default);

        let selected = conn.select("2").unwrap();
        assert_eq!(selected.name, "2");
        assert!(conn.select("two").is_err());
    }

    #[test]
    fn test_discovery() {
        let server = MockServer::start(MockState {
            cluster_nodes: "abc 127.0.0.1:7000@17000 myself,master - 0 0 1 connected 0-16383\n"
                .to_string(),
            ..Default::default()
        });
        let mut conn = connected(&server);
        let nodes = conn.discover_cluster().unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_self);

        let masters = conn.discover_sentinel().unwrap();
        assert_eq!(masters[0].name, "mymaster");
    }

    #[test]
    fn test_registry_dispatch_to_native() {
        let server = MockServer::redis();
        let mut conn = connected(&server);
        let registry = CommandRegistry::new(BackendKind::Redis, redis_commands(conn.capabilities()));

        let argv = split_args("SET a 1").unwrap();
        let mut ctx = CommandContext::new(&mut conn, &registry);
        assert_eq!(registry.execute(&mut ctx, &argv).unwrap(), Reply::ok());
        assert!(matches!(ctx.into_notifications().as_slice(), [Notification::KeyAdded(_)]));

        let argv = split_args("config get databases").unwrap();
        let mut ctx = CommandContext::new(&mut conn, &registry);
        assert!(registry.execute(&mut ctx, &argv).is_ok());

        let argv = split_args("DBKCOUNT").unwrap();
        let mut ctx = CommandContext::new(&mut conn, &registry);
        assert_eq!(registry.execute(&mut ctx, &argv).unwrap(), Reply::Integer(1));
    }

    #[test]
    fn test_command_table_covers_common_verbs() {
        let registry = CommandRegistry::new(
            BackendKind::Redis,
            redis_commands(RespConnection::new().capabilities()),
        );
        let accepted = [
            "HSET user name alice age 30",
            "HGET user name",
            "HDEL user name age",
            "MGET a b c",
            "MSET a 1 b 2",
            "LPOP queue",
            "LPOP queue 3",
            "RPUSH queue x y z",
            "INCRBY counter 5",
            "SETEX session 60 token",
            "EXPIREAT session 1700000000",
            "ZREM board alice bob",
            "SREM tags red",
            "CLIENT SETNAME console",
            "SCRIPT LOAD \"return 1\"",
        ];
        for line in accepted {
            let argv = split_args(line).unwrap();
            let holder = registry.resolve(&argv).unwrap();
            assert!(holder.is_native(), "{} resolved to {}", line, holder.name);
        }

        let rejected = [
            "HSET user name",
            "HGET user",
            "LPOP queue 1 2",
            "INCRBY counter",
            "SETEX session 60",
            "ZREM board",
        ];
        for line in rejected {
            let err = registry.resolve(&split_args(line).unwrap()).unwrap_err();
            assert!(
                matches!(err, EngineError::Command(CommandError::InvalidArgs { .. })),
                "{}: {}",
                line,
                err
            );
        }

        let mut names: Vec<&str> = registry.commands().iter().map(|holder| holder.name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_set_variants_notify_added_keys() {
        let server = MockServer::redis();
        let mut conn = connected(&server);
        let registry = CommandRegistry::new(BackendKind::Redis, redis_commands(conn.capabilities()));

        let argv = split_args("SETEX session 60 token").unwrap();
        let mut ctx = CommandContext::new(&mut conn, &registry);
        assert_eq!(registry.execute(&mut ctx, &argv).unwrap(), Reply::ok());
        let notifications = ctx.into_notifications();
        let [Notification::KeyAdded(added)] = notifications.as_slice() else {
            panic!("unexpected notifications {:?}", notifications);
        };
        assert_eq!(added.ttl, 60);
        assert_eq!(added.value, Value::string(Bytes::from("token")));

        let argv = split_args("PSETEX fast 1500 v").unwrap();
        let mut ctx = CommandContext::new(&mut conn, &registry);
        registry.execute(&mut ctx, &argv).unwrap();
        let notifications = ctx.into_notifications();
        let [Notification::KeyAdded(added)] = notifications.as_slice() else {
            panic!("unexpected notifications {:?}", notifications);
        };
        assert_eq!(added.ttl, 1);

        // SETNX on an existing key changes nothing
        let argv = split_args("SETNX session other").unwrap();
        let mut ctx = CommandContext::new(&mut conn, &registry);
        assert_eq!(registry.execute(&mut ctx, &argv).unwrap(), Reply::Integer(0));
        assert!(ctx.into_notifications().is_empty());

        let argv = split_args("MSET a 1 b 2").unwrap();
        let mut ctx = CommandContext::new(&mut conn, &registry);
        assert_eq!(registry.execute(&mut ctx, &argv).unwrap(), Reply::ok());

        let argv = split_args("MGET a missing b").unwrap();
        let mut ctx = CommandContext::new(&mut conn, &registry);
        assert_eq!(
            registry.execute(&mut ctx, &argv).unwrap(),
            Reply::Array(vec![Reply::bulk("1"), Reply::Nil, Reply::bulk("2")])
        );
    }

    #[test]
    fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = RespConnection::new().connect(&settings_for(port)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }
}
