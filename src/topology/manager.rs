/// Creates and tracks the drivers behind servers, clusters and sentinels
use super::{Cluster, DiscoveredNode, SentinelGroup, SentinelNode, TopologyNode};
use crate::backends::BackendRegistry;
use crate::config::{
    ClusterSettings, ConfigError, ConnectionSettings, SentinelSettings, SettingsStore,
};
use crate::core::BackendConnection;
use crate::driver::{DriverHandle, DriverOptions};
use crate::error::{EngineError, EngineResult};
use fnv::FnvHashMap;
use std::sync::Arc;

pub struct ServersManager {
    backends: BackendRegistry,
    max_redirects: u8,
    servers: FnvHashMap<String, DriverHandle>,
}

impl ServersManager {
    pub fn new(backends: BackendRegistry, max_redirects: u8) -> Self {
        Self {
            backends,
            max_redirects,
            servers: FnvHashMap::default(),
        }
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    /// Number of live drivers
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Spawn a driver for one connection. History goes to the store's
    /// logging directory when it is enabled.
    pub fn create_server(
        &mut self,
        settings: Arc<ConnectionSettings>,
        store: &SettingsStore,
    ) -> EngineResult<DriverHandle> {
        let options = DriverOptions {
            logging_dir: store.logging_dir().cloned(),
        };
        let driver = self.backends.spawn_driver(settings, options)?;
        self.servers.insert(driver.id().to_string(), driver.clone());
        Ok(driver)
    }

    pub fn create_cluster(
        &mut self,
        settings: Arc<ClusterSettings>,
        store: &SettingsStore,
    ) -> EngineResult<Cluster> {
        let mut drivers = Vec::with_capacity(settings.nodes().len());
        for node in settings.nodes() {
            self.create_node(node, store, &mut drivers)?;
        }
        log::info!("created cluster {} with {} nodes", settings.name(), drivers.len());
        Ok(Cluster::new(settings, drivers, self.max_redirects))
    }

    pub fn create_sentinel(
        &mut self,
        settings: Arc<SentinelSettings>,
        store: &SettingsStore,
    ) -> EngineResult<SentinelGroup> {
        let mut created = Vec::new();
        let mut sentinels = Vec::with_capacity(settings.sentinels().len());
        for entry in settings.sentinels() {
            let sentinel = self.create_node(&entry.sentinel, store, &mut created)?;
            let mut nodes = Vec::with_capacity(entry.nodes.len());
            for node in &entry.nodes {
                nodes.push(TopologyNode::new(self.create_node(node, store, &mut created)?));
            }
            sentinels.push(SentinelNode { sentinel, nodes });
        }
        log::info!("created sentinel group {}", settings.name());
        Ok(SentinelGroup::new(settings, sentinels))
    }

    /// Spawn one driver of a topology and record it in `created`. If the
    /// spawn fails, every driver in `created` is closed before returning.
    fn create_node(
        &mut self,
        settings: &Arc<ConnectionSettings>,
        store: &SettingsStore,
        created: &mut Vec<DriverHandle>,
    ) -> EngineResult<DriverHandle> {
        match self.create_server(Arc::clone(settings), store) {
            Ok(driver) => {
                created.push(driver.clone());
                Ok(driver)
            }
            Err(e) => {
                log::warn!(
                    "failed to create {}, closing {} drivers already created",
                    settings.name(),
                    created.len()
                );
                for driver in created.drain(..) {
                    self.close_server(&driver);
                }
                Err(e)
            }
        }
    }

    /// Connect and disconnect a throwaway session
    pub async fn test_connection(&self, settings: Arc<ConnectionSettings>) -> EngineResult<()> {
        self.with_connection(settings, |connection| Ok(connection.server_version()))
            .await
            .map(|version| {
                if let Some(version) = version {
                    log::debug!("test connection reached server {}", version);
                }
            })
    }

    /// Nodes reported by `CLUSTER NODES` on the given seed node
    pub async fn discover_cluster(
        &self,
        settings: Arc<ConnectionSettings>,
    ) -> EngineResult<Vec<DiscoveredNode>> {
        ensure_topology(&settings)?;
        self.with_connection(settings, |connection| connection.discover_cluster())
            .await
    }

    /// Masters reported by `SENTINEL MASTERS` on the given sentinel
    pub async fn discover_sentinel(
        &self,
        settings: Arc<ConnectionSettings>,
    ) -> EngineResult<Vec<DiscoveredNode>> {
        ensure_topology(&settings)?;
        self.with_connection(settings, |connection| connection.discover_sentinel())
            .await
    }

    /// Run `f` on a fresh connection off the async runtime
    async fn with_connection<T, F>(&self, settings: Arc<ConnectionSettings>, f: F) -> EngineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn BackendConnection) -> EngineResult<T> + Send + 'static,
    {
        let mut connection = self.backends.plugin(settings.kind())?.create_connection();
        tokio::task::spawn_blocking(move || {
            connection.connect(&settings)?;
            let result = f(connection.as_mut());
            if let Err(e) = connection.disconnect() {
                log::warn!("failed to disconnect {}: {}", settings.name(), e);
            }
            result
        })
        .await
        .map_err(|e| EngineError::internal(format!("connection task failed: {}", e)))?
    }

    pub fn close_server(&mut self, driver: &DriverHandle) {
        if let Some(driver) = self.servers.remove(driver.id()) {
            driver.stop();
        }
    }

    pub fn close_cluster(&mut self, cluster: &Cluster) {
        for node in cluster.nodes() {
            self.close_server(&node.driver);
        }
    }

    pub fn close_sentinel(&mut self, group: &SentinelGroup) {
        for entry in group.sentinels() {
            self.close_server(&entry.sentinel);
            for node in &entry.nodes {
                self.close_server(&node.driver);
            }
        }
    }

    /// Stop every driver
    pub fn clear(&mut self) {
        for (_, driver) in self.servers.drain() {
            driver.stop();
        }
    }
}

fn ensure_topology(settings: &ConnectionSettings) -> EngineResult<()> {
    if settings.kind().supports_topology() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError("Not supported setting type".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::resp::mock::{MockServer, MockState};
    use crate::config::{BackendConfig, HostAndPort, LocalConfig, RemoteConfig};
    use crate::core::{BackendKind, NodeRole};
    use crate::driver::{DriverState, Request};
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn redis_settings(name: &str, port: u16) -> Arc<ConnectionSettings> {
        Arc::new(
            ConnectionSettings::new(
                name,
                BackendKind::Redis,
                BackendConfig::Remote(RemoteConfig::new(HostAndPort::new("127.0.0.1", port))),
            )
            .unwrap(),
        )
    }

    fn manager() -> ServersManager {
        ServersManager::new(BackendRegistry::with_builtin(), 3)
    }

    #[tokio::test]
    async fn test_server_history_uses_store_directory() {
        let dir = TempDir::new().unwrap();
        let logs = TempDir::new().unwrap();
        let store = SettingsStore::new(Some(logs.path().to_path_buf()));
        let settings = Arc::new(
            ConnectionSettings::new(
                "local",
                BackendKind::Embedded,
                BackendConfig::Local(LocalConfig::new(dir.path().join("db.toml"))),
            )
            .unwrap()
            .with_logging_interval(20),
        );

        let mut manager = manager();
        let driver = manager.create_server(Arc::clone(&settings), &store).unwrap();
        driver.call(Request::Connect).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        driver.call(Request::Disconnect).await.unwrap();

        assert!(logs.path().join(settings.log_file_name()).exists());
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_close_and_clear_stop_drivers() {
        let master = MockServer::redis();
        let replica = MockServer::start(MockState {
            role: "slave".to_string(),
            ..MockState::default()
        });
        let cluster_settings = Arc::new(
            ClusterSettings::new(
                "cluster",
                BackendKind::Redis,
                vec![
                    (*redis_settings("a", master.port())).clone(),
                    (*redis_settings("b", replica.port())).clone(),
                ],
            )
            .unwrap(),
        );
        let store = SettingsStore::default();

        let mut manager = manager();
        let mut cluster = manager.create_cluster(cluster_settings, &store).unwrap();
        let single = manager
            .create_server(redis_settings("single", master.port()), &store)
            .unwrap();
        assert_eq!(manager.len(), 3);

        cluster.discover_roles().await;
        assert_eq!(cluster.nodes()[1].role, Some(NodeRole::Slave));

        manager.close_cluster(&cluster);
        assert_eq!(manager.len(), 1);
        manager.clear();
        assert!(manager.is_empty());

        // a stopped driver refuses new work once its worker exits
        let mut notifications = single.subscribe();
        if single.state() != DriverState::Stopped {
            while let Ok(note) = notifications.recv().await {
                if note == crate::driver::DriverNotification::StateChanged(DriverState::Stopped) {
                    break;
                }
            }
        }
        assert_eq!(single.state(), DriverState::Stopped);
    }

    #[tokio::test]
    async fn test_failed_topology_node_closes_created_drivers() {
        let master = MockServer::redis();
        let dir = TempDir::new().unwrap();
        let unregistered = Arc::new(
            ConnectionSettings::new(
                "lmdb",
                BackendKind::Lmdb,
                BackendConfig::Local(LocalConfig::new(dir.path().join("data.lmdb"))),
            )
            .unwrap(),
        );
        let store = SettingsStore::default();
        let mut manager = manager();
        let kept = manager
            .create_server(redis_settings("kept", master.port()), &store)
            .unwrap();

        let mut created = Vec::new();
        let first = manager
            .create_node(&redis_settings("a", master.port()), &store, &mut created)
            .unwrap();
        manager
            .create_node(&redis_settings("b", master.port()), &store, &mut created)
            .unwrap();
        assert_eq!(manager.len(), 3);

        let err = manager
            .create_node(&unregistered, &store, &mut created)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(created.is_empty());
        assert_eq!(manager.len(), 1);
        assert_ne!(kept.state(), DriverState::Stopped);

        let mut notifications = first.subscribe();
        if first.state() != DriverState::Stopped {
            while let Ok(note) = notifications.recv().await {
                if note == crate::driver::DriverNotification::StateChanged(DriverState::Stopped) {
                    break;
                }
            }
        }
        assert_eq!(first.state(), DriverState::Stopped);
        manager.clear();
    }

    #[tokio::test]
    async fn test_connection_check() {
        let server = MockServer::redis();
        let manager = manager();
        manager
            .test_connection(redis_settings("check", server.port()))
            .await
            .unwrap();

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let closed_port = listener.local_addr().unwrap().port();
        drop(listener);
        let err = manager
            .test_connection(redis_settings("closed", closed_port))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
    }

    #[tokio::test]
    async fn test_discover_cluster_nodes() {
        let server = MockServer::start(MockState {
            cluster_nodes: "07c37dfeb235213a872192d90877d0cd55635b91 127.0.0.1:30004@31004 slave e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 0 1426238317239 4 connected\n\
                            e7d1eecce10fd6bb5eb35b9f99a514335d9ba9ca 127.0.0.1:30001@31001 myself,master - 0 0 1 connected 0-5460\n"
                .to_string(),
            ..MockState::default()
        });

        let nodes = manager()
            .discover_cluster(redis_settings("seed", server.port()))
            .await
            .unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].role, NodeRole::Master);
        assert!(nodes[1].is_self);
        assert_eq!(nodes[0].host, HostAndPort::new("127.0.0.1", 30004));
    }

    #[tokio::test]
    async fn test_discover_sentinel_masters() {
        let server = MockServer::redis();
        let nodes = manager()
            .discover_sentinel(redis_settings("sentinel", server.port()))
            .await
            .unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "mymaster");
        assert_eq!(nodes[0].host, HostAndPort::new("127.0.0.1", 6379));
    }

    #[tokio::test]
    async fn test_discovery_rejects_local_backends() {
        let dir = TempDir::new().unwrap();
        let settings = Arc::new(
            ConnectionSettings::new(
                "local",
                BackendKind::Embedded,
                BackendConfig::Local(LocalConfig::new(dir.path().join("db.toml"))),
            )
            .unwrap(),
        );
        let err = manager().discover_cluster(settings).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("Not supported setting type"));
    }
}
