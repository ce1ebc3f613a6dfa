/// RESP2 parsing and encoding for the Redis-protocol backend
use crate::core::Reply;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::str;

/// RESP data types
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple String (+OK\r\n)
    SimpleString(String),
    /// Error (-ERR message\r\n)
    Error(String),
    /// Integer (:123\r\n)
    Integer(i64),
    /// Bulk String ($5\r\nhello\r\n), None is the null bulk
    BulkString(Option<Bytes>),
    /// Array (*2\r\n...), None is the null array
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// Convert into the backend-neutral reply tree
    pub fn into_reply(self) -> Reply {
        match self {
            RespValue::SimpleString(s) => Reply::Status(s),
            RespValue::Error(e) => Reply::Error(e),
            RespValue::Integer(n) => Reply::Integer(n),
            RespValue::BulkString(Some(data)) => Reply::Bulk(data),
            RespValue::BulkString(None) | RespValue::Array(None) => Reply::Nil,
            RespValue::Array(Some(items)) => {
                Reply::Array(items.into_iter().map(RespValue::into_reply).collect())
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RespParseError {
    #[error("Invalid RESP format: {0}")]
    InvalidFormat(String),
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] str::Utf8Error),
    #[error("Invalid integer: {0}")]
    InvalidInteger(#[from] std::num::ParseIntError),
}

/// RESP parser.
///
/// Parsing walks a cursor over the buffer and only consumes bytes once a
/// whole value is available, so a partial reply leaves the buffer untouched.
pub struct RespParser;

impl RespParser {
    /// Parse one value, consuming it from `buf`. `Ok(None)` means more bytes
    /// are needed.
    pub fn parse(buf: &mut BytesMut) -> Result<Option<RespValue>, RespParseError> {
        match Self::parse_at(&buf[..], 0)? {
            Some((value, consumed)) => {
                buf.advance(consumed);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn parse_at(data: &[u8], pos: usize) -> Result<Option<(RespValue, usize)>, RespParseError> {
        let Some(&first) = data.get(pos) else {
            return Ok(None);
        };
        let Some((line, next)) = Self::read_line(data, pos + 1) else {
            return Ok(None);
        };

        match first {
            b'+' => Ok(Some((RespValue::SimpleString(str::from_utf8(line)?.to_string()), next))),
            b'-' => Ok(Some((RespValue::Error(str::from_utf8(line)?.to_string()), next))),
            b':' => Ok(Some((RespValue::Integer(Self::parse_int(line)?), next))),
            b'$' => {
                let size = Self::parse_int(line)?;
                if size == -1 {
                    return Ok(Some((RespValue::BulkString(None), next)));
                }
                if size < 0 {
                    return Err(RespParseError::InvalidFormat(
                        "Invalid bulk string size".to_string(),
                    ));
                }
                let Some(end) = usize::try_from(size).ok().and_then(|n| next.checked_add(n)) else {
                    return Err(RespParseError::InvalidFormat(
                        "Bulk string size out of range".to_string(),
                    ));
                };
                if data.len() < end.saturating_add(2) {
                    return Ok(None);
                }
                if &data[end..end + 2] != b"\r\n" {
                    return Err(RespParseError::InvalidFormat(
                        "Missing \\r\\n after bulk string".to_string(),
                    ));
                }
                let content = Bytes::copy_from_slice(&data[next..end]);
                Ok(Some((RespValue::BulkString(Some(content)), end + 2)))
            }
            b'*' => {
                let size = Self::parse_int(line)?;
                if size == -1 {
                    return Ok(Some((RespValue::Array(None), next)));
                }
                if size < 0 {
                    return Err(RespParseError::InvalidFormat(
                        "Invalid array size".to_string(),
                    ));
                }
                // every element takes at least three bytes on the wire
                let remaining = data.len().saturating_sub(next);
                let mut elements = Vec::with_capacity((size as usize).min(remaining / 3));
                let mut cursor = next;
                for _ in 0..size {
                    match Self::parse_at(data, cursor)? {
                        Some((element, after)) => {
                            elements.push(element);
                            cursor = after;
                        }
                        None => return Ok(None),
                    }
                }
                Ok(Some((RespValue::Array(Some(elements)), cursor)))
            }
            other => Err(RespParseError::InvalidFormat(format!(
                "Unknown RESP type: {}",
                other as char
            ))),
        }
    }

    fn parse_int(line: &[u8]) -> Result<i64, RespParseError> {
        Ok(str::from_utf8(line)?.parse::<i64>()?)
    }

    /// Line content starting at `start` and the position after its \r\n
    fn read_line(data: &[u8], start: usize) -> Option<(&[u8], usize)> {
        let rest = data.get(start..)?;
        let end = rest.windows(2).position(|w| w == b"\r\n")?;
        Some((&rest[..end], start + end + 2))
    }
}

/// RESP encoder for requests and (in tests) server replies
pub struct RespEncoder;

impl RespEncoder {
    pub fn encode(value: &RespValue) -> Bytes {
        let mut buf = BytesMut::new();
        Self::encode_into(&mut buf, value);
        buf.freeze()
    }

    pub fn encode_into(buf: &mut BytesMut, value: &RespValue) {
        match value {
            RespValue::SimpleString(s) => Self::put_line(buf, b'+', s.as_bytes()),
            RespValue::Error(s) => Self::put_line(buf, b'-', s.as_bytes()),
            RespValue::Integer(n) => Self::put_line(buf, b':', n.to_string().as_bytes()),
            RespValue::BulkString(Some(data)) => {
                Self::put_line(buf, b'$', data.len().to_string().as_bytes());
                buf.extend_from_slice(data);
                buf.put_slice(b"\r\n");
            }
            RespValue::BulkString(None) => buf.put_slice(b"$-1\r\n"),
            RespValue::Array(Some(elements)) => {
                Self::put_line(buf, b'*', elements.len().to_string().as_bytes());
                for element in elements {
                    Self::encode_into(buf, element);
                }
            }
            RespValue::Array(None) => buf.put_slice(b"*-1\r\n"),
        }
    }

    /// Encode an argv as a multi-bulk request
    pub fn encode_command<S: AsRef<[u8]>>(argv: &[S]) -> Bytes {
        let mut buf = BytesMut::new();
        Self::put_line(&mut buf, b'*', argv.len().to_string().as_bytes());
        for arg in argv {
            let arg = arg.as_ref();
            Self::put_line(&mut buf, b'$', arg.len().to_string().as_bytes());
            buf.extend_from_slice(arg);
            buf.put_slice(b"\r\n");
        }
        buf.freeze()
    }

    fn put_line(buf: &mut BytesMut, prefix: u8, content: &[u8]) {
        buf.put_u8(prefix);
        buf.extend_from_slice(content);
        buf.put_slice(b"\r\n");
    }
}
