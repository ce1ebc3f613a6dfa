/// Translation of high-level key operations into backend command text
use crate::core::connection::Notification;
use crate::core::console::{quote_arg, quote_bytes, split_args};
use crate::core::reply::Reply;
use crate::core::value::{Key, KeyValue, TtlSecs, Value, ValueType, NO_TTL};
use crate::core::BackendKind;
use crate::error::{EngineError, EngineResult};
use bytes::Bytes;

/// A structured operation on one key
#[derive(Debug, Clone, PartialEq)]
pub enum KeyCommand {
    Create(KeyValue),
    Edit(KeyValue),
    Load { key: Key, value_type: ValueType },
    Delete(Key),
    Rename { key: Key, new_name: Key },
    ChangeTtl { key: Key, ttl: TtlSecs },
    LoadTtl(Key),
}

impl KeyCommand {
    pub fn name(&self) -> &'static str {
        match self {
            KeyCommand::Create(_) => "create key",
            KeyCommand::Edit(_) => "edit key",
            KeyCommand::Load { .. } => "load key",
            KeyCommand::Delete(_) => "delete key",
            KeyCommand::Rename { .. } => "rename key",
            KeyCommand::ChangeTtl { .. } => "change ttl",
            KeyCommand::LoadTtl(_) => "load ttl",
        }
    }

    /// Notification describing the effect of a successful operation
    pub fn notification(&self, reply: &Reply) -> EngineResult<Notification> {
        Ok(match self {
            KeyCommand::Create(record) | KeyCommand::Edit(record) => {
                Notification::KeyAdded(record.clone())
            }
            KeyCommand::Load { key, value_type } => Notification::KeyLoaded(KeyValue::new(
                key.clone(),
                Value::from_reply(*value_type, reply)?,
            )),
            KeyCommand::Delete(key) => Notification::KeyDeleted(key.clone()),
            KeyCommand::Rename { key, new_name } => Notification::KeyRenamed {
                key: key.clone(),
                new_name: new_name.clone(),
            },
            KeyCommand::ChangeTtl { key, ttl } => Notification::KeyTtlChanged {
                key: key.clone(),
                ttl: *ttl,
            },
            KeyCommand::LoadTtl(key) => Notification::KeyTtlLoaded {
                key: key.clone(),
                ttl: reply.as_integer().unwrap_or(NO_TTL),
            },
        })
    }
}

/// Renders key operations in a backend's console syntax.
///
/// Create and edit share the same command. Keys and values are quoted so the
/// text survives console tokenizing. The produced text may hold several
/// lines, one command each.
pub trait CommandTranslator: Send + Sync {
    fn backend(&self) -> BackendKind;

    fn create_key_command(&self, record: &KeyValue) -> EngineResult<String>;

    fn load_key_command(&self, key: &Key, value_type: ValueType) -> EngineResult<String>;

    fn delete_key_command(&self, key: &Key) -> EngineResult<String>;

    fn rename_key_command(&self, key: &Key, new_name: &Key) -> EngineResult<String>;

    fn change_ttl_command(&self, key: &Key, ttl: TtlSecs) -> EngineResult<String> {
        let _ = (key, ttl);
        Err(EngineError::not_supported("change ttl", self.backend()))
    }

    fn load_ttl_command(&self, key: &Key) -> EngineResult<String> {
        let _ = key;
        Err(EngineError::not_supported("load ttl", self.backend()))
    }

    /// Commands whose single key argument loads a key
    fn load_verbs(&self) -> &'static [&'static str];

    // Console text of the housekeeping the driver runs directly on the
    // connection. Only used for the command log.

    fn server_info_command(&self) -> String {
        "INFO".to_string()
    }

    fn databases_command(&self) -> String {
        "INFO keyspace".to_string()
    }

    fn scan_command(&self, cursor: u64, pattern: &str, count: u64) -> String {
        format!("SCAN {} MATCH {} COUNT {}", cursor, quote_arg(pattern), count)
    }

    fn select_command(&self, name: &str) -> String {
        format!("SELECT {}", quote_arg(name))
    }

    fn flush_command(&self) -> String {
        "FLUSHDB".to_string()
    }

    fn create_db_command(&self, name: &str) -> String {
        format!("CREATEDB {}", quote_arg(name))
    }

    fn remove_db_command(&self, name: &str) -> String {
        format!("REMOVEDB {}", quote_arg(name))
    }

    fn translate(&self, command: &KeyCommand) -> EngineResult<String> {
        match command {
            KeyCommand::Create(record) | KeyCommand::Edit(record) => self.create_key_command(record),
            KeyCommand::Load { key, value_type } => self.load_key_command(key, *value_type),
            KeyCommand::Delete(key) => self.delete_key_command(key),
            KeyCommand::Rename { key, new_name } => self.rename_key_command(key, new_name),
            KeyCommand::ChangeTtl { key, ttl } => self.change_ttl_command(key, *ttl),
            KeyCommand::LoadTtl(key) => self.load_ttl_command(key),
        }
    }

    /// Recognise a load command typed in the console and return its key
    fn is_load_key_command(&self, line: &str) -> Option<Key> {
        let argv = split_args(line).ok()?;
        let (verb, rest) = argv.split_first()?;
        let known = self
            .load_verbs()
            .iter()
            .any(|load| load.as_bytes().eq_ignore_ascii_case(verb));
        if known && !rest.is_empty() {
            Some(Key::new(rest[0].clone()))
        } else {
            None
        }
    }
}

/// Translator factory keyed by backend kind
pub fn translator_for(kind: BackendKind) -> Box<dyn CommandTranslator> {
    match kind {
        BackendKind::Redis | BackendKind::Ssdb => Box::new(RedisTranslator::new(kind)),
        BackendKind::Memcached => Box::new(MemcachedTranslator),
        _ => Box::new(EmbeddedTranslator::new(kind)),
    }
}

fn arg(data: &[u8]) -> String {
    quote_bytes(data).into_owned()
}

fn key_arg(key: &Key) -> String {
    arg(key.as_bytes())
}

fn bytes_args(items: &[Bytes]) -> String {
    items.iter().map(|item| arg(item)).collect::<Vec<_>>().join(" ")
}

/// Redis and SSDB share the typed command set
pub struct RedisTranslator {
    backend: BackendKind,
}

impl RedisTranslator {
    pub fn new(backend: BackendKind) -> Self {
        Self { backend }
    }
}

impl CommandTranslator for RedisTranslator {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    fn create_key_command(&self, record: &KeyValue) -> EngineResult<String> {
        let key = key_arg(&record.key);
        Ok(match &record.value {
            Value::String(value) => format!("SET {} {}", key, arg(value)),
            Value::List(items) => format!("LPUSH {} {}", key, bytes_args(items)),
            Value::Set(members) => format!("SADD {} {}", key, bytes_args(members)),
            Value::ZSet(members) => {
                let pairs: Vec<String> = members
                    .iter()
                    .map(|(member, score)| format!("{} {}", score, arg(member)))
                    .collect();
                format!("ZADD {} {}", key, pairs.join(" "))
            }
            Value::Hash(pairs) => {
                let pairs: Vec<String> = pairs
                    .iter()
                    .map(|(field, value)| format!("{} {}", arg(field), arg(value)))
                    .collect();
                format!("HMSET {} {}", key, pairs.join(" "))
            }
            Value::Stream(entries) => {
                if self.backend != BackendKind::Redis {
                    return Err(EngineError::not_supported("stream", self.backend));
                }
                let lines: Vec<String> = entries
                    .iter()
                    .map(|entry| {
                        let fields: Vec<String> = entry
                            .fields
                            .iter()
                            .map(|(field, value)| format!("{} {}", arg(field), arg(value)))
                            .collect();
                        format!("XADD {} {} {}", key, quote_arg(&entry.id), fields.join(" "))
                    })
                    .collect();
                lines.join("\n")
            }
        })
    }

    fn load_key_command(&self, key: &Key, value_type: ValueType) -> EngineResult<String> {
        let key = key_arg(key);
        Ok(match value_type {
            ValueType::String => format!("GET {}", key),
            ValueType::List => format!("LRANGE {} 0 -1", key),
            ValueType::Set => format!("SMEMBERS {}", key),
            ValueType::ZSet => format!("ZRANGE {} 0 -1 WITHSCORES", key),
            ValueType::Hash => format!("HGETALL {}", key),
            ValueType::Stream => format!("XRANGE {} - +", key),
        })
    }

    fn delete_key_command(&self, key: &Key) -> EngineResult<String> {
        Ok(format!("DEL {}", key_arg(key)))
    }

    fn rename_key_command(&self, key: &Key, new_name: &Key) -> EngineResult<String> {
        Ok(format!("RENAME {} {}", key_arg(key), key_arg(new_name)))
    }

    fn change_ttl_command(&self, key: &Key, ttl: TtlSecs) -> EngineResult<String> {
        if ttl == NO_TTL {
            if self.backend != BackendKind::Redis {
                return Err(EngineError::not_supported("persist", self.backend));
            }
            return Ok(format!("PERSIST {}", key_arg(key)));
        }
        Ok(format!("EXPIRE {} {}", key_arg(key), ttl))
    }

    fn load_ttl_command(&self, key: &Key) -> EngineResult<String> {
        Ok(format!("TTL {}", key_arg(key)))
    }

    fn load_verbs(&self) -> &'static [&'static str] {
        &["GET", "LRANGE", "SMEMBERS", "ZRANGE", "HGETALL", "XRANGE"]
    }

    fn databases_command(&self) -> String {
        "CONFIG GET databases".to_string()
    }
}

pub struct MemcachedTranslator;

impl CommandTranslator for MemcachedTranslator {
    fn backend(&self) -> BackendKind {
        BackendKind::Memcached
    }

    fn create_key_command(&self, record: &KeyValue) -> EngineResult<String> {
        let value = record
            .value
            .as_string()
            .ok_or_else(|| EngineError::not_supported("non-string value", self.backend()))?;
        let expiration = if record.ttl > 0 { record.ttl } else { 0 };
        Ok(format!("SET {} 0 {} {}", key_arg(&record.key), expiration, arg(value)))
    }

    fn load_key_command(&self, key: &Key, value_type: ValueType) -> EngineResult<String> {
        if value_type != ValueType::String {
            return Err(EngineError::not_supported("non-string value", self.backend()));
        }
        Ok(format!("GET {}", key_arg(key)))
    }

    fn delete_key_command(&self, key: &Key) -> EngineResult<String> {
        Ok(format!("DEL {}", key_arg(key)))
    }

    fn rename_key_command(&self, key: &Key, new_name: &Key) -> EngineResult<String> {
        Ok(format!("RENAME {} {}", key_arg(key), key_arg(new_name)))
    }

    fn change_ttl_command(&self, key: &Key, ttl: TtlSecs) -> EngineResult<String> {
        Ok(format!("EXPIRE {} {}", key_arg(key), ttl))
    }

    fn load_ttl_command(&self, key: &Key) -> EngineResult<String> {
        Ok(format!("TTL {}", key_arg(key)))
    }

    fn load_verbs(&self) -> &'static [&'static str] {
        &["GET"]
    }
}

/// Embedded engines: plain string records, no expiry
pub struct EmbeddedTranslator {
    backend: BackendKind,
}

impl EmbeddedTranslator {
    pub fn new(backend: BackendKind) -> Self {
        Self { backend }
    }
}

impl CommandTranslator for EmbeddedTranslator {
    fn backend(&self) -> BackendKind {
        self.backend
    }

    fn create_key_command(&self, record: &KeyValue) -> EngineResult<String> {
        let value = record
            .value
            .as_string()
            .ok_or_else(|| EngineError::not_supported("non-string value", self.backend))?;
        Ok(format!("SET {} {}", key_arg(&record.key), arg(value)))
    }

    fn load_key_command(&self, key: &Key, value_type: ValueType) -> EngineResult<String> {
        if value_type != ValueType::String {
            return Err(EngineError::not_supported("non-string value", self.backend));
        }
        Ok(format!("GET {}", key_arg(key)))
    }

    fn delete_key_command(&self, key: &Key) -> EngineResult<String> {
        Ok(format!("DEL {}", key_arg(key)))
    }

    fn rename_key_command(&self, key: &Key, new_name: &Key) -> EngineResult<String> {
        Ok(format!("RENAME {} {}", key_arg(key), key_arg(new_name)))
    }

    fn load_verbs(&self) -> &'static [&'static str] {
        &["GET"]
    }
}
