/// File-backed embedded key-value store.
///
/// Named databases of string keys and string values, persisted as a TOML
/// document at the configured path after every mutation. There is no expiry
/// concept, so TTL operations keep the trait's "not supported" defaults.
use crate::config::{BackendConfig, ConnectionSettings};
use crate::core::{
    BackendConnection, BackendKind, Capabilities, DatabaseInfo, Key, KeyValue, ScanPage,
    ServerInfo, Value,
};
use crate::error::{EngineError, EngineResult};
use crate::utils::glob_match;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_DATABASE: &str = "0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    databases: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Debug, Default)]
pub struct EmbeddedStore {
    path: Option<PathBuf>,
    data: StoreFile,
    current: String,
    connected: bool,
}

impl EmbeddedStore {
    pub fn new() -> Self {
        Self {
            current: DEFAULT_DATABASE.to_string(),
            ..Default::default()
        }
    }

    fn persist(&self) -> EngineResult<()> {
        let Some(path) = &self.path else {
            return Err(EngineError::not_connected());
        };
        let content = toml::to_string_pretty(&self.data)
            .map_err(|e| EngineError::internal(format!("Failed to serialize store: {}", e)))?;
        fs::write(path, content)
            .map_err(|e| EngineError::connection(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn current_db(&self) -> EngineResult<&BTreeMap<String, String>> {
        self.data
            .databases
            .get(&self.current)
            .ok_or_else(|| EngineError::backend(format!("Database {} does not exist", self.current)))
    }

    fn current_db_mut(&mut self) -> EngineResult<&mut BTreeMap<String, String>> {
        let current = &self.current;
        self.data
            .databases
            .get_mut(current)
            .ok_or_else(|| EngineError::backend(format!("Database {} does not exist", current)))
    }

    fn database_info(&self, name: &str) -> DatabaseInfo {
        let key_count = self
            .data
            .databases
            .get(name)
            .map_or(0, |db| db.len() as u64);
        DatabaseInfo::new(name, name == self.current, key_count)
    }
}

fn key_text(key: &Key) -> EngineResult<String> {
    String::from_utf8(key.as_bytes().to_vec())
        .map_err(|_| EngineError::invalid_input("Embedded keys must be valid UTF-8"))
}

impl BackendConnection for EmbeddedStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Embedded
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            ttl: false,
            multi_db: true,
            manage_db: true,
            key_range: true,
            discovery: false,
        }
    }

    fn connect(&mut self, settings: &ConnectionSettings) -> EngineResult<()> {
        let BackendConfig::Local(local) = settings.config() else {
            return Err(EngineError::connection(format!(
                "{} needs a local file path",
                settings.name()
            )));
        };

        let data = if local.db_path.exists() {
            let content = fs::read_to_string(&local.db_path).map_err(|e| {
                EngineError::connection(format!("Failed to read {}: {}", local.db_path.display(), e))
            })?;
            toml::from_str::<StoreFile>(&content).map_err(|e| {
                EngineError::connection(format!("Corrupt store {}: {}", local.db_path.display(), e))
            })?
        } else if local.create_if_missing {
            StoreFile::default()
        } else {
            return Err(EngineError::connection(format!(
                "Database file {} does not exist",
                local.db_path.display()
            )));
        };

        self.path = Some(local.db_path.clone());
        self.data = data;
        self.data
            .databases
            .entry(DEFAULT_DATABASE.to_string())
            .or_default();
        self.current = DEFAULT_DATABASE.to_string();
        self.persist()?;
        self.connected = true;
        log::debug!("embedded store opened at {}", local.db_path.display());
        Ok(())
    }

    fn disconnect(&mut self) -> EngineResult<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn server_version(&self) -> Option<String> {
        Some(env!("CARGO_PKG_VERSION").to_string())
    }

    fn info(&mut self, _args: &[String]) -> EngineResult<ServerInfo> {
        let db_path = self
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let keyspace = self
            .data
            .databases
            .iter()
            .map(|(name, db)| (format!("db{}", name), format!("keys={}", db.len())))
            .collect();
        Ok(ServerInfo::new()
            .with_section(
                "Server",
                vec![
                    ("engine".to_string(), "embedded".to_string()),
                    ("version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
                    ("db_path".to_string(), db_path),
                ],
            )
            .with_section("Replication", vec![("role".to_string(), "master".to_string())])
            .with_section("Keyspace", keyspace))
    }

    fn current_database(&mut self) -> EngineResult<DatabaseInfo> {
        Ok(self.database_info(&self.current))
    }

    fn databases(&mut self) -> EngineResult<Vec<DatabaseInfo>> {
        Ok(self
            .data
            .databases
            .keys()
            .map(|name| self.database_info(name))
            .collect())
    }

    fn select(&mut self, name: &str) -> EngineResult<DatabaseInfo> {
        if !self.data.databases.contains_key(name) {
            return Err(EngineError::backend(format!("Database {} does not exist", name)));
        }
        self.current = name.to_string();
        Ok(self.database_info(name))
    }

    fn create_db(&mut self, name: &str) -> EngineResult<()> {
        if self.data.databases.contains_key(name) {
            return Err(EngineError::backend(format!("Database {} already exists", name)));
        }
        self.data.databases.insert(name.to_string(), BTreeMap::new());
        self.persist()
    }

    fn remove_db(&mut self, name: &str) -> EngineResult<()> {
        if name == self.current {
            return Err(EngineError::backend(format!(
                "Database {} is selected and cannot be removed",
                name
            )));
        }
        if self.data.databases.remove(name).is_none() {
            return Err(EngineError::backend(format!("Database {} does not exist", name)));
        }
        self.persist()
    }

    fn scan(&mut self, cursor: u64, pattern: &str, count: u64) -> EngineResult<ScanPage> {
        let matching: Vec<&String> = self
            .current_db()?
            .keys()
            .filter(|key| glob_match(pattern, key))
            .collect();
        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(matching.len());
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let end = start.saturating_add(count).min(matching.len());

        let keys = matching[start..end]
            .iter()
            .map(|key| Key::from(key.as_str()))
            .collect();
        let next_cursor = if end < matching.len() { end as u64 } else { 0 };
        Ok(ScanPage { keys, next_cursor })
    }

    fn keys(&mut self, start: &str, end: &str, limit: u64) -> EngineResult<Vec<Key>> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(self
            .current_db()?
            .keys()
            .filter(|key| key.as_str() >= start && key.as_str() <= end)
            .take(limit)
            .map(|key| Key::from(key.as_str()))
            .collect())
    }

    fn db_key_count(&mut self) -> EngineResult<u64> {
        Ok(self.current_db()?.len() as u64)
    }

    fn set(&mut self, record: &KeyValue) -> EngineResult<()> {
        let Value::String(value) = &record.value else {
            return Err(EngineError::not_supported(
                record.value.value_type().name(),
                BackendKind::Embedded,
            ));
        };
        let key = key_text(&record.key)?;
        let value = String::from_utf8(value.to_vec())
            .map_err(|_| EngineError::invalid_input("Embedded values must be valid UTF-8"))?;
        self.current_db_mut()?.insert(key, value);
        self.persist()
    }

    fn get(&mut self, key: &Key) -> EngineResult<KeyValue> {
        let name = key_text(key)?;
        let value = self
            .current_db()?
            .get(&name)
            .ok_or_else(|| EngineError::backend(format!("Key {} not found", name)))?;
        Ok(KeyValue::new(key.clone(), Value::string(value.clone())))
    }

    fn delete(&mut self, keys: &[Key]) -> EngineResult<Vec<Key>> {
        let db = self.current_db_mut()?;
        let mut deleted = Vec::new();
        for key in keys {
            if let Ok(name) = key_text(key) {
                if db.remove(&name).is_some() {
                    deleted.push(key.clone());
                }
            }
        }
        if !deleted.is_empty() {
            self.persist()?;
        }
        Ok(deleted)
    }

    fn rename(&mut self, key: &Key, new_name: &Key) -> EngineResult<()> {
        let old = key_text(key)?;
        let new = key_text(new_name)?;
        let db = self.current_db_mut()?;
        let value = db
            .remove(&old)
            .ok_or_else(|| EngineError::backend(format!("Key {} not found", old)))?;
        db.insert(new, value);
        self.persist()
    }

    fn flush_db(&mut self) -> EngineResult<()> {
        self.current_db_mut()?.clear();
        self.persist()
    }
}
