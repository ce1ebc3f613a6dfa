/// Multi-node topologies: Redis clusters and sentinel groups.
///
/// A topology owns one driver per node. Roles are learned by querying every
/// node concurrently with `Discover`, and requests are routed to the master,
/// following MOVED/ASK redirects to the node that owns the key.
pub mod discovery;
pub mod manager;
pub mod redirect;

pub use discovery::DiscoveredNode;
pub use manager::ServersManager;

use crate::config::{ClusterSettings, HostAndPort, SentinelSettings};
use crate::core::NodeRole;
use crate::driver::{DriverEvent, DriverHandle, Payload, Request, RequestId};
use crate::error::{EngineError, EngineResult};
use futures::future::join_all;
use redirect::RedirectionContext;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One driver of a topology with its last discovered role
#[derive(Debug, Clone)]
pub struct TopologyNode {
    pub driver: DriverHandle,
    pub role: Option<NodeRole>,
}

impl TopologyNode {
    pub fn new(driver: DriverHandle) -> Self {
        Self { driver, role: None }
    }

    pub fn host(&self) -> Option<&HostAndPort> {
        self.driver.settings().host()
    }

    fn is_master(&self) -> bool {
        self.role == Some(NodeRole::Master)
    }
}

async fn fetch_role(driver: DriverHandle) -> EngineResult<NodeRole> {
    if !driver.is_connected() {
        driver.call(Request::Connect).await?;
    }
    match driver.call(Request::Discover).await? {
        Payload::Discovery(info) => Ok(info.role),
        other => Err(EngineError::internal(format!(
            "unexpected discovery payload: {:?}",
            other
        ))),
    }
}

/// Query all nodes concurrently. A node that cannot be reached keeps no role.
async fn discover_roles(nodes: &mut [TopologyNode]) {
    let queries = nodes.iter().map(|node| fetch_role(node.driver.clone()));
    let results = join_all(queries).await;
    for (node, result) in nodes.iter_mut().zip(results) {
        node.role = match result {
            Ok(role) => Some(role),
            Err(e) => {
                log::warn!("failed to discover role of {}: {}", node.driver.settings().name(), e);
                None
            }
        };
    }
}

fn first_master<'a>(nodes: &'a [TopologyNode], name: &str) -> EngineResult<&'a DriverHandle> {
    nodes
        .iter()
        .find(|node| node.is_master())
        .map(|node| &node.driver)
        .ok_or_else(|| EngineError::missing_master(name))
}

/// Slot-sharded Redis cluster
#[derive(Debug)]
pub struct Cluster {
    settings: Arc<ClusterSettings>,
    nodes: Vec<TopologyNode>,
    max_redirects: u8,
}

impl Cluster {
    pub fn new(settings: Arc<ClusterSettings>, drivers: Vec<DriverHandle>, max_redirects: u8) -> Self {
        Self {
            settings,
            nodes: drivers.into_iter().map(TopologyNode::new).collect(),
            max_redirects,
        }
    }

    pub fn name(&self) -> &str {
        self.settings.name()
    }

    pub fn settings(&self) -> &Arc<ClusterSettings> {
        &self.settings
    }

    pub fn nodes(&self) -> &[TopologyNode] {
        &self.nodes
    }

    pub async fn discover_roles(&mut self) {
        discover_roles(&mut self.nodes).await;
    }

    /// The first node whose discovered role is master
    pub fn root(&self) -> EngineResult<&DriverHandle> {
        first_master(&self.nodes, self.name())
    }

    pub fn find_node(&self, host: &HostAndPort) -> Option<&DriverHandle> {
        self.nodes
            .iter()
            .find(|node| node.host() == Some(host))
            .map(|node| &node.driver)
    }

    /// Re-submit `request` to the node at `target`, connecting it first if
    /// needed. Unknown targets are refused with `Ok(None)`.
    pub async fn redirect_request(
        &self,
        target: &HostAndPort,
        request: Request,
        reply_to: mpsc::UnboundedSender<DriverEvent>,
    ) -> EngineResult<Option<RequestId>> {
        let Some(driver) = self.find_node(target) else {
            log::warn!("redirect target {} is not a node of cluster {}", target, self.name());
            return Ok(None);
        };
        if !driver.is_connected() {
            driver.call(Request::Connect).await?;
        }
        driver.submit(request, reply_to).map(Some)
    }

    /// Run `request` on the root node, following redirects
    pub async fn call(&self, request: Request) -> EngineResult<Payload> {
        let mut context = RedirectionContext::new(self.max_redirects);
        let mut driver = self.root()?;
        loop {
            match driver.call(request.clone()).await {
                Err(EngineError::Redirect { slot, target, ask }) => {
                    context.add_redirect(&target)?;
                    log::info!("-> Redirected to slot [{}] located at {}", slot, target);
                    if ask {
                        log::debug!("slot {} is migrating to {}", slot, target);
                    }

                    let host: HostAndPort = target.parse()?;
                    driver = self.find_node(&host).ok_or_else(|| {
                        log::warn!("redirect target {} is not a node of cluster {}", target, self.name());
                        EngineError::connection(format!("Unknown redirect target {}", target))
                    })?;
                    if !driver.is_connected() {
                        driver.call(Request::Connect).await?;
                    }
                }
                other => return other,
            }
        }
    }

    pub fn stop(&self) {
        for node in &self.nodes {
            node.driver.stop();
        }
    }
}

/// A sentinel and the nodes it monitors
#[derive(Debug)]
pub struct SentinelNode {
    pub sentinel: DriverHandle,
    pub nodes: Vec<TopologyNode>,
}

/// Sentinel-managed group with a flat list of monitored nodes
#[derive(Debug)]
pub struct SentinelGroup {
    settings: Arc<SentinelSettings>,
    sentinels: Vec<SentinelNode>,
}

impl SentinelGroup {
    pub fn new(settings: Arc<SentinelSettings>, sentinels: Vec<SentinelNode>) -> Self {
        Self { settings, sentinels }
    }

    pub fn name(&self) -> &str {
        self.settings.name()
    }

    pub fn settings(&self) -> &Arc<SentinelSettings> {
        &self.settings
    }

    pub fn sentinels(&self) -> &[SentinelNode] {
        &self.sentinels
    }

    pub async fn discover_roles(&mut self) {
        for entry in &mut self.sentinels {
            discover_roles(&mut entry.nodes).await;
        }
    }

    /// The first monitored node whose discovered role is master
    pub fn root(&self) -> EngineResult<&DriverHandle> {
        self.sentinels
            .iter()
            .flat_map(|entry| entry.nodes.iter())
            .find(|node| node.is_master())
            .map(|node| &node.driver)
            .ok_or_else(|| EngineError::missing_master(self.name()))
    }

    pub fn stop(&self) {
        for entry in &self.sentinels {
            entry.sentinel.stop();
            for node in &entry.nodes {
                node.driver.stop();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::resp::mock::{MockServer, MockState};
    use crate::backends::BackendRegistry;
    use crate::config::{BackendConfig, ConnectionSettings, RemoteConfig, SentinelEntry};
    use crate::core::{BackendKind, Reply};
    use crate::driver::DriverOptions;
    use crate::error::ErrorKind;
    use bytes::Bytes;

    fn node_settings(name: &str, server: &MockServer) -> ConnectionSettings {
        ConnectionSettings::new(
            name,
            BackendKind::Redis,
            BackendConfig::Remote(RemoteConfig::new(HostAndPort::new("127.0.0.1", server.port()))),
        )
        .unwrap()
    }

    fn spawn_cluster(servers: &[&MockServer]) -> Cluster {
        let nodes = servers
            .iter()
            .enumerate()
            .map(|(i, server)| node_settings(&format!("node{}", i), server))
            .collect();
        let settings = Arc::new(ClusterSettings::new("cluster", BackendKind::Redis, nodes).unwrap());
        let backends = BackendRegistry::with_builtin();
        let drivers = settings
            .nodes()
            .iter()
            .map(|node| backends.spawn_driver(Arc::clone(node), DriverOptions::default()).unwrap())
            .collect();
        Cluster::new(settings, drivers, 3)
    }

    fn replica() -> MockServer {
        MockServer::start(MockState {
            role: "slave".to_string(),
            ..MockState::default()
        })
    }

    #[tokio::test]
    async fn test_root_is_first_master() {
        let slave = replica();
        let master = MockServer::redis();
        let mut cluster = spawn_cluster(&[&slave, &master]);
        cluster.discover_roles().await;

        assert_eq!(cluster.nodes()[0].role, Some(NodeRole::Slave));
        let root = cluster.root().unwrap();
        assert_eq!(root.settings().host().unwrap().port, master.port());
    }

    #[tokio::test]
    async fn test_root_without_master_fails() {
        let a = replica();
        let b = replica();
        let mut cluster = spawn_cluster(&[&a, &b]);
        cluster.discover_roles().await;

        let err = cluster.root().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("Not found master for cluster"));
    }

    #[tokio::test]
    async fn test_call_follows_moved() {
        let owner = replica();
        owner
            .state
            .lock()
            .unwrap()
            .data
            .insert(Bytes::from("k"), Bytes::from("v"));
        let mut state = MockState::default();
        state
            .moved
            .insert(Bytes::from("k"), format!("127.0.0.1:{}", owner.port()));
        let root = MockServer::start(state);

        let mut cluster = spawn_cluster(&[&root, &owner]);
        cluster.discover_roles().await;

        let payload = cluster.call(Request::execute("GET k")).await.unwrap();
        let Payload::Executed { outputs } = payload else {
            panic!("unexpected payload {:?}", payload);
        };
        assert_eq!(outputs[0].reply, Reply::bulk("v"));
    }

    #[tokio::test]
    async fn test_redirect_loop_is_bounded() {
        let root = MockServer::redis();
        let target = format!("127.0.0.1:{}", root.port());
        root.state.lock().unwrap().moved.insert(Bytes::from("k"), target);
        let other = replica();

        let mut cluster = spawn_cluster(&[&root, &other]);
        cluster.discover_roles().await;

        let err = cluster.call(Request::execute("GET k")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(err.to_string().contains("Max redirects exceeded"));
    }

    #[tokio::test]
    async fn test_redirect_to_unknown_host_is_refused() {
        let master = MockServer::redis();
        let cluster = spawn_cluster(&[&master]);
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = cluster
            .redirect_request(&HostAndPort::new("10.0.0.1", 7000), Request::LoadServerInfo, tx)
            .await
            .unwrap();
        assert!(id.is_none());
    }

    #[tokio::test]
    async fn test_sentinel_root_among_monitored_nodes() {
        let sentinel = MockServer::redis();
        let slave = replica();
        let master = MockServer::redis();
        let entry = SentinelEntry::new(
            node_settings("sentinel", &sentinel),
            vec![node_settings("slave", &slave), node_settings("master", &master)],
        );
        let settings =
            Arc::new(SentinelSettings::new("group", BackendKind::Redis, vec![entry]).unwrap());

        let backends = BackendRegistry::with_builtin();
        let spawn = |settings: &Arc<ConnectionSettings>| {
            backends
                .spawn_driver(Arc::clone(settings), DriverOptions::default())
                .unwrap()
        };
        let sentinels = settings
            .sentinels()
            .iter()
            .map(|entry| SentinelNode {
                sentinel: spawn(&entry.sentinel),
                nodes: entry.nodes.iter().map(|n| TopologyNode::new(spawn(n))).collect(),
            })
            .collect();
        let mut group = SentinelGroup::new(Arc::clone(&settings), sentinels);
        group.discover_roles().await;

        let root = group.root().unwrap();
        assert_eq!(root.settings().name(), "master");
    }
}
