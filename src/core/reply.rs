/// Output value tree returned by command handlers
use crate::core::value::Value;
use bytes::Bytes;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Nil,
    Status(String),
    Bulk(Bytes),
    Integer(i64),
    Array(Vec<Reply>),
    Error(String),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    pub fn bulk<S: AsRef<str>>(text: S) -> Self {
        Reply::Bulk(Bytes::copy_from_slice(text.as_ref().as_bytes()))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(n) => Some(*n),
            Reply::Bulk(data) => std::str::from_utf8(data).ok()?.parse().ok(),
            Reply::Status(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Reply]> {
        match self {
            Reply::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Render a loaded value the way a native client would print it
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(data) => Reply::Bulk(data.clone()),
            Value::List(items) | Value::Set(items) => {
                Reply::Array(items.iter().cloned().map(Reply::Bulk).collect())
            }
            Value::Hash(pairs) => Reply::Array(
                pairs
                    .iter()
                    .flat_map(|(field, value)| [Reply::Bulk(field.clone()), Reply::Bulk(value.clone())])
                    .collect(),
            ),
            Value::ZSet(members) => Reply::Array(
                members
                    .iter()
                    .flat_map(|(member, score)| {
                        [Reply::Bulk(member.clone()), Reply::bulk(score.to_string())]
                    })
                    .collect(),
            ),
            Value::Stream(entries) => Reply::Array(
                entries
                    .iter()
                    .map(|entry| {
                        Reply::Array(vec![
                            Reply::bulk(&entry.id),
                            Reply::Array(
                                entry
                                    .fields
                                    .iter()
                                    .flat_map(|(f, v)| [Reply::Bulk(f.clone()), Reply::Bulk(v.clone())])
                                    .collect(),
                            ),
                        ])
                    })
                    .collect(),
            ),
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            Reply::Array(items) if items.is_empty() => write!(f, "(empty list or set)"),
            Reply::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, "\n{:width$}", "", width = indent)?;
                    }
                    let prefix = format!("{}) ", index + 1);
                    write!(f, "{}", prefix)?;
                    item.fmt_nested(f, indent + prefix.len())?;
                }
                Ok(())
            }
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Nil => write!(f, "(nil)"),
            Reply::Status(text) => write!(f, "{}", text),
            Reply::Bulk(data) => write!(f, "{}", String::from_utf8_lossy(data)),
            Reply::Integer(n) => write!(f, "{}", n),
            Reply::Error(message) => write!(f, "(error) {}", message),
            Reply::Array(_) => self.fmt_nested(f, 0),
        }
    }
}
