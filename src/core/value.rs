/// Key/value records produced by Get/Scan and mutated by Set/Rename/SetTTL
use crate::core::Reply;
use crate::error::{EngineError, EngineResult};
use bytes::Bytes;
use std::fmt;

/// TTL in seconds
pub type TtlSecs = i64;
/// The key exists and never expires
pub const NO_TTL: TtlSecs = -1;
/// The key does not exist (or already expired)
pub const EXPIRED_TTL: TtlSecs = -2;

/// Opaque byte-string key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Bytes);

impl Key {
    pub fn new<B: Into<Bytes>>(raw: B) -> Self {
        Key(raw.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Namespace part of the key (everything before the last separator)
    pub fn namespace(&self, separator: &str) -> Option<String> {
        let text = self.to_string_lossy();
        if separator.is_empty() {
            return None;
        }
        text.rfind(separator).map(|pos| text[..pos].to_string())
    }

    /// Key text as it should be displayed for the given strategy.
    /// Storage always uses the raw key.
    pub fn display_name(&self, separator: &str, strategy: NsDisplayStrategy) -> String {
        let text = self.to_string_lossy();
        match strategy {
            NsDisplayStrategy::FullKey => text,
            NsDisplayStrategy::KeyName => {
                if separator.is_empty() {
                    return text;
                }
                match text.rfind(separator) {
                    Some(pos) => text[pos + separator.len()..].to_string(),
                    None => text,
                }
            }
        }
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key(Bytes::from(value))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

/// How namespaced keys are shown in listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NsDisplayStrategy {
    #[default]
    FullKey,
    KeyName,
}

impl NsDisplayStrategy {
    pub fn id(self) -> u8 {
        match self {
            NsDisplayStrategy::FullKey => 0,
            NsDisplayStrategy::KeyName => 1,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(NsDisplayStrategy::FullKey),
            1 => Some(NsDisplayStrategy::KeyName),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    String,
    List,
    Set,
    Hash,
    ZSet,
    Stream,
}

impl ValueType {
    /// Type names as reported by the `TYPE` command
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(ValueType::String),
            "list" => Some(ValueType::List),
            "set" => Some(ValueType::Set),
            "hash" => Some(ValueType::Hash),
            "zset" => Some(ValueType::ZSet),
            "stream" => Some(ValueType::Stream),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Set => "set",
            ValueType::Hash => "hash",
            ValueType::ZSet => "zset",
            ValueType::Stream => "stream",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamEntry {
    pub id: String,
    pub fields: Vec<(Bytes, Bytes)>,
}

/// Tagged union over the supported value shapes
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Bytes),
    List(Vec<Bytes>),
    Set(Vec<Bytes>),
    Hash(Vec<(Bytes, Bytes)>),
    ZSet(Vec<(Bytes, f64)>),
    Stream(Vec<StreamEntry>),
}

impl Value {
    pub fn string<B: Into<Bytes>>(value: B) -> Self {
        Value::String(value.into())
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::String(_) => ValueType::String,
            Value::List(_) => ValueType::List,
            Value::Set(_) => ValueType::Set,
            Value::Hash(_) => ValueType::Hash,
            Value::ZSet(_) => ValueType::ZSet,
            Value::Stream(_) => ValueType::Stream,
        }
    }

    pub fn as_string(&self) -> Option<&Bytes> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// Rebuild a typed value from the reply of a load command
    pub fn from_reply(value_type: ValueType, reply: &Reply) -> EngineResult<Self> {
        match value_type {
            ValueType::String => match reply {
                Reply::Bulk(data) => Ok(Value::String(data.clone())),
                Reply::Status(text) => Ok(Value::String(Bytes::from(text.clone()))),
                Reply::Integer(n) => Ok(Value::String(Bytes::from(n.to_string()))),
                Reply::Nil => Err(EngineError::backend("Key not found")),
                other => Err(unexpected(value_type, other)),
            },
            ValueType::List => Ok(Value::List(bulk_items(value_type, reply)?)),
            ValueType::Set => Ok(Value::Set(bulk_items(value_type, reply)?)),
            ValueType::Hash => {
                let items = bulk_items(value_type, reply)?;
                if items.len() % 2 != 0 {
                    return Err(unexpected(value_type, reply));
                }
                Ok(Value::Hash(
                    items
                        .chunks(2)
                        .map(|pair| (pair[0].clone(), pair[1].clone()))
                        .collect(),
                ))
            }
            ValueType::ZSet => {
                let items = bulk_items(value_type, reply)?;
                if items.len() % 2 != 0 {
                    return Err(unexpected(value_type, reply));
                }
                let mut members = Vec::with_capacity(items.len() / 2);
                for pair in items.chunks(2) {
                    let score = String::from_utf8_lossy(&pair[1])
                        .parse::<f64>()
                        .map_err(|_| unexpected(value_type, reply))?;
                    members.push((pair[0].clone(), score));
                }
                Ok(Value::ZSet(members))
            }
            ValueType::Stream => {
                let entries = match reply {
                    Reply::Array(entries) => entries,
                    other => return Err(unexpected(value_type, other)),
                };
                let mut stream = Vec::with_capacity(entries.len());
                for entry in entries {
                    match entry {
                        Reply::Array(parts) if parts.len() == 2 => {
                            let id = parts[0].to_string();
                            let fields = bulk_items(value_type, &parts[1])?;
                            stream.push(StreamEntry {
                                id,
                                fields: fields
                                    .chunks(2)
                                    .filter(|pair| pair.len() == 2)
                                    .map(|pair| (pair[0].clone(), pair[1].clone()))
                                    .collect(),
                            });
                        }
                        other => return Err(unexpected(value_type, other)),
                    }
                }
                Ok(Value::Stream(stream))
            }
        }
    }
}

fn bulk_items(value_type: ValueType, reply: &Reply) -> EngineResult<Vec<Bytes>> {
    match reply {
        Reply::Array(items) => items
            .iter()
            .map(|item| match item {
                Reply::Bulk(data) => Ok(data.clone()),
                Reply::Status(text) => Ok(Bytes::from(text.clone())),
                Reply::Integer(n) => Ok(Bytes::from(n.to_string())),
                other => Err(unexpected(value_type, other)),
            })
            .collect(),
        Reply::Nil => Err(EngineError::backend("Key not found")),
        other => Err(unexpected(value_type, other)),
    }
}

fn unexpected(value_type: ValueType, reply: &Reply) -> EngineError {
    EngineError::protocol(format!(
        "Unexpected reply for {} value: {}",
        value_type, reply
    ))
}

/// A key together with its value and TTL
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: Key,
    pub value: Value,
    pub ttl: TtlSecs,
}

impl KeyValue {
    pub fn new<K: Into<Key>>(key: K, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            ttl: NO_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: TtlSecs) -> Self {
        self.ttl = ttl;
        self
    }
}
