/// Explicit settings context: connections, clusters, sentinels and the
/// history logging directory
use super::settings::{ClusterSettings, ConnectionSettings, SentinelSettings};
use super::{Config, ConfigError};
use crate::core::BackendKind;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    logging_dir: Option<PathBuf>,
    connections: Vec<Arc<ConnectionSettings>>,
    clusters: Vec<Arc<ClusterSettings>>,
    sentinels: Vec<Arc<SentinelSettings>>,
}

impl SettingsStore {
    pub fn new(logging_dir: Option<PathBuf>) -> Self {
        Self {
            logging_dir,
            ..Default::default()
        }
    }

    /// Build a store from the persisted strings of a config
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let logging_dir = config
            .history
            .enabled
            .then(|| PathBuf::from(&config.history.directory));
        let mut store = SettingsStore::new(logging_dir);

        for text in &config.connections {
            store.add_connection(ConnectionSettings::from_connection_string(text)?)?;
        }
        for text in &config.clusters {
            store.add_cluster(ClusterSettings::from_connection_string(text)?)?;
        }
        for text in &config.sentinels {
            store.add_sentinel(SentinelSettings::from_connection_string(text)?)?;
        }
        Ok(store)
    }

    /// Write the store back into `config`, leaving other sections untouched
    pub fn to_config(&self, config: &mut Config) {
        config.connections = self
            .connections
            .iter()
            .map(|c| c.to_connection_string())
            .collect();
        config.clusters = self.clusters.iter().map(|c| c.to_connection_string()).collect();
        config.sentinels = self.sentinels.iter().map(|s| s.to_connection_string()).collect();
    }

    pub fn logging_dir(&self) -> Option<&PathBuf> {
        self.logging_dir.as_ref()
    }

    /// `<logging dir>/<hash><ext>`, or None when history is disabled
    pub fn logging_path(&self, settings: &ConnectionSettings) -> Option<PathBuf> {
        self.logging_dir
            .as_ref()
            .map(|dir| dir.join(settings.log_file_name()))
    }

    pub fn connections(&self) -> &[Arc<ConnectionSettings>] {
        &self.connections
    }

    pub fn clusters(&self) -> &[Arc<ClusterSettings>] {
        &self.clusters
    }

    pub fn sentinels(&self) -> &[Arc<SentinelSettings>] {
        &self.sentinels
    }

    pub fn find_connection(&self, name: &str) -> Option<Arc<ConnectionSettings>> {
        self.connections.iter().find(|c| c.name() == name).cloned()
    }

    pub fn find_cluster(&self, name: &str) -> Option<Arc<ClusterSettings>> {
        self.clusters.iter().find(|c| c.name() == name).cloned()
    }

    pub fn find_sentinel(&self, name: &str) -> Option<Arc<SentinelSettings>> {
        self.sentinels.iter().find(|s| s.name() == name).cloned()
    }

    pub fn add_connection(
        &mut self,
        settings: ConnectionSettings,
    ) -> Result<Arc<ConnectionSettings>, ConfigError> {
        ensure_unique(
            self.connections.iter().map(|c| (c.name(), c.kind())),
            settings.name(),
            settings.kind(),
        )?;
        let settings = Arc::new(settings);
        self.connections.push(Arc::clone(&settings));
        Ok(settings)
    }

    pub fn remove_connection(&mut self, name: &str) -> Option<Arc<ConnectionSettings>> {
        let index = self.connections.iter().position(|c| c.name() == name)?;
        Some(self.connections.remove(index))
    }

    /// Replace a connection by a renamed copy. Holders of the old `Arc`
    /// keep seeing the old name.
    pub fn rename_connection(
        &mut self,
        name: &str,
        new_name: &str,
    ) -> Result<Arc<ConnectionSettings>, ConfigError> {
        let index = self
            .connections
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| ConfigError::ValidationError(format!("Unknown connection: {}", name)))?;
        let kind = self.connections[index].kind();
        ensure_unique(
            self.connections
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .map(|(_, c)| (c.name(), c.kind())),
            new_name,
            kind,
        )?;
        let renamed = Arc::new(self.connections[index].renamed(new_name)?);
        log::info!("renamed connection {} to {}", name, new_name);
        self.connections[index] = Arc::clone(&renamed);
        Ok(renamed)
    }

    pub fn add_cluster(&mut self, cluster: ClusterSettings) -> Result<Arc<ClusterSettings>, ConfigError> {
        ensure_unique(
            self.clusters.iter().map(|c| (c.name(), c.kind())),
            cluster.name(),
            cluster.kind(),
        )?;
        let cluster = Arc::new(cluster);
        self.clusters.push(Arc::clone(&cluster));
        Ok(cluster)
    }

    pub fn remove_cluster(&mut self, name: &str) -> Option<Arc<ClusterSettings>> {
        let index = self.clusters.iter().position(|c| c.name() == name)?;
        Some(self.clusters.remove(index))
    }

    pub fn add_sentinel(
        &mut self,
        sentinel: SentinelSettings,
    ) -> Result<Arc<SentinelSettings>, ConfigError> {
        ensure_unique(
            self.sentinels.iter().map(|s| (s.name(), s.kind())),
            sentinel.name(),
            sentinel.kind(),
        )?;
        let sentinel = Arc::new(sentinel);
        self.sentinels.push(Arc::clone(&sentinel));
        Ok(sentinel)
    }

    pub fn remove_sentinel(&mut self, name: &str) -> Option<Arc<SentinelSettings>> {
        let index = self.sentinels.iter().position(|s| s.name() == name)?;
        Some(self.sentinels.remove(index))
    }
}

fn ensure_unique<'a, I>(existing: I, name: &str, kind: BackendKind) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (&'a str, BackendKind)>,
{
    if existing.into_iter().any(|(n, k)| n == name && k == kind) {
        return Err(ConfigError::ValidationError(format!(
            "A {} connection named {} already exists",
            kind, name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{BackendConfig, HostAndPort, LocalConfig, RemoteConfig};

    fn embedded(name: &str) -> ConnectionSettings {
        ConnectionSettings::new(
            name,
            BackendKind::Embedded,
            BackendConfig::Local(LocalConfig::new(format!("/tmp/{}.toml", name))),
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_connection_rejected() {
        let mut store = SettingsStore::new(None);
        store.add_connection(embedded("a")).unwrap();
        assert!(store.add_connection(embedded("a")).is_err());

        let redis = ConnectionSettings::new(
            "a",
            BackendKind::Redis,
            BackendConfig::Remote(RemoteConfig::new(HostAndPort::new("localhost", 6379))),
        )
        .unwrap();
        assert!(store.add_connection(redis).is_ok());
        assert_eq!(store.connections().len(), 2);
    }

    #[test]
    fn test_rename_replaces_arc() {
        let mut store = SettingsStore::new(Some(PathBuf::from("/var/log/kv")));
        let original = store.add_connection(embedded("before")).unwrap();
        let old_path = store.logging_path(&original).unwrap();

        let renamed = store.rename_connection("before", "after").unwrap();
        assert_eq!(original.name(), "before");
        assert_eq!(renamed.name(), "after");
        assert!(store.find_connection("before").is_none());
        assert_ne!(store.logging_path(&renamed).unwrap(), old_path);

        store.add_connection(embedded("other")).unwrap();
        assert!(store.rename_connection("other", "after").is_err());
    }

    #[test]
    fn test_logging_path() {
        let store = SettingsStore::new(Some(PathBuf::from("/logs")));
        let settings = embedded("x");
        let path = store.logging_path(&settings).unwrap();
        assert_eq!(path, PathBuf::from("/logs").join(settings.log_file_name()));
        assert!(SettingsStore::new(None).logging_path(&settings).is_none());
    }

    #[test]
    fn test_config_round_trip() {
        let mut store = SettingsStore::new(None);
        store.add_connection(embedded("one")).unwrap();
        store.add_connection(embedded("two")).unwrap();

        let mut config = Config::default();
        store.to_config(&mut config);
        assert_eq!(config.connections.len(), 2);

        let restored = SettingsStore::from_config(&config).unwrap();
        assert_eq!(restored.connections().len(), 2);
        assert_eq!(restored.connections()[1].name(), "two");
        assert_eq!(restored.logging_dir(), Some(&PathBuf::from("history")));
    }
}
