/// In-process fake RESP server for tests
use super::protocol::{RespEncoder, RespParser, RespValue};
use bytes::{Bytes, BytesMut};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct MockState {
    pub data: BTreeMap<Bytes, Bytes>,
    pub role: String,
    pub cluster_nodes: String,
    pub password: Option<String>,
    /// Keys answered with `-MOVED 0 <target>`
    pub moved: BTreeMap<Bytes, String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            data: BTreeMap::new(),
            role: "master".to_string(),
            cluster_nodes: String::new(),
            password: None,
            moved: BTreeMap::new(),
        }
    }
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<MockState>>,
}

impl MockServer {
    pub fn start(state: MockState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(state));
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || serve(stream, state));
            }
        });
        Self { addr, state }
    }

    pub fn redis() -> Self {
        MockServer::start(MockState::default())
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

fn serve(mut stream: TcpStream, state: Arc<Mutex<MockState>>) {
    let mut buf = BytesMut::new();
    let mut chunk = [0u8; 4096];
    loop {
        match RespParser::parse(&mut buf) {
            Ok(Some(RespValue::Array(Some(items)))) => {
                let argv: Vec<Bytes> = items
                    .into_iter()
                    .map(|item| match item {
                        RespValue::BulkString(Some(data)) => data,
                        _ => Bytes::new(),
                    })
                    .collect();
                let reply = {
                    let mut state = state.lock().unwrap();
                    handle(&argv, &mut state)
                };
                if stream.write_all(&RespEncoder::encode(&reply)).is_err() {
                    return;
                }
                continue;
            }
            Ok(Some(_)) | Err(_) => return,
            Ok(None) => {}
        }
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

fn ok() -> RespValue {
    RespValue::SimpleString("OK".to_string())
}

fn bulk(text: &str) -> RespValue {
    RespValue::BulkString(Some(Bytes::copy_from_slice(text.as_bytes())))
}

fn error(text: &str) -> RespValue {
    RespValue::Error(text.to_string())
}

fn text(arg: &[u8]) -> String {
    String::from_utf8_lossy(arg).into_owned()
}

fn handle(argv: &[Bytes], state: &mut MockState) -> RespValue {
    let Some(command) = argv.first().map(|arg| text(arg)) else {
        return error("ERR empty command");
    };
    if let Some(key) = argv.get(1) {
        if let Some(target) = state.moved.get(key) {
            return error(&format!("MOVED 0 {}", target));
        }
    }
    match (command.to_ascii_uppercase().as_str(), &argv[1..]) {
        ("PING", _) => RespValue::SimpleString("PONG".to_string()),
        ("AUTH", [password]) => match &state.password {
            Some(expected) if expected.as_bytes() == &password[..] => ok(),
            _ => error("ERR invalid password"),
        },
        ("SELECT", [_]) => ok(),
        ("SET", [key, value]) => {
            state.data.insert(key.clone(), value.clone());
            ok()
        }
        ("SETEX", [key, _, value]) | ("PSETEX", [key, _, value]) => {
            state.data.insert(key.clone(), value.clone());
            ok()
        }
        ("SETNX", [key, value]) => {
            let added = !state.data.contains_key(key);
            if added {
                state.data.insert(key.clone(), value.clone());
            }
            RespValue::Integer(added as i64)
        }
        ("MSET", pairs) if !pairs.is_empty() && pairs.len() % 2 == 0 => {
            for pair in pairs.chunks(2) {
                state.data.insert(pair[0].clone(), pair[1].clone());
            }
            ok()
        }
        ("MGET", keys) => RespValue::Array(Some(
            keys.iter()
                .map(|key| RespValue::BulkString(state.data.get(key).cloned()))
                .collect(),
        )),
        ("GET", [key]) => match state.data.get(key) {
            Some(value) => RespValue::BulkString(Some(value.clone())),
            None => RespValue::BulkString(None),
        },
        ("TYPE", [key]) => RespValue::SimpleString(
            if state.data.contains_key(key) { "string" } else { "none" }.to_string(),
        ),
        ("TTL", [key]) => RespValue::Integer(if state.data.contains_key(key) { -1 } else { -2 }),
        ("EXPIRE", [key, _]) | ("PERSIST", [key]) => {
            RespValue::Integer(state.data.contains_key(key) as i64)
        }
        ("DEL", keys) => {
            RespValue::Integer(keys.iter().filter(|k| state.data.remove(*k).is_some()).count() as i64)
        }
        ("RENAME", [key, new_name]) => match state.data.remove(key) {
            Some(value) => {
                state.data.insert(new_name.clone(), value);
                ok()
            }
            None => error("ERR no such key"),
        },
        ("DBSIZE", []) => RespValue::Integer(state.data.len() as i64),
        ("FLUSHDB", []) => {
            state.data.clear();
            ok()
        }
        ("SCAN", [_cursor, ..]) => RespValue::Array(Some(vec![
            bulk("0"),
            RespValue::Array(Some(
                state
                    .data
                    .keys()
                    .map(|k| RespValue::BulkString(Some(k.clone())))
                    .collect(),
            )),
        ])),
        ("INFO", _) => bulk(&format!(
            "# Server\r\nredis_version:7.2.0\r\n\r\n# Replication\r\nrole:{}\r\n",
            state.role
        )),
        ("CONFIG", [sub, name]) if sub.eq_ignore_ascii_case(b"GET") => {
            RespValue::Array(Some(vec![RespValue::BulkString(Some(name.clone())), bulk("4")]))
        }
        ("CLUSTER", [sub]) if sub.eq_ignore_ascii_case(b"NODES") => bulk(&state.cluster_nodes),
        ("SENTINEL", [sub]) if sub.eq_ignore_ascii_case(b"MASTERS") => {
            RespValue::Array(Some(vec![RespValue::Array(Some(
                ["name", "mymaster", "ip", "127.0.0.1", "port", "6379"]
                    .iter()
                    .map(|s| bulk(s))
                    .collect(),
            ))]))
        }
        _ => error(&format!("ERR unknown command '{}'", command)),
    }
}
