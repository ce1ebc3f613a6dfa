/// Backend plugins and the registry that spawns drivers for them

pub mod embedded;
pub mod resp;

use crate::config::ConnectionSettings;
use crate::core::generic::generic_commands;
use crate::core::{
    translator_for, BackendConnection, BackendKind, CommandHolder, CommandRegistry,
    CommandTranslator,
};
use crate::driver::{DriverHandle, DriverOptions};
use crate::error::{EngineError, EngineResult};
use embedded::EmbeddedStore;
use fnv::FnvHashMap;
use resp::RespConnection;
use std::sync::Arc;

/// Everything the engine needs to drive one backend kind
pub trait BackendPlugin: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Fresh, unconnected session
    fn create_connection(&self) -> Box<dyn BackendConnection>;

    /// Ordered command table for the console
    fn commands(&self) -> Vec<CommandHolder>;

    fn translator(&self) -> Arc<dyn CommandTranslator>;
}

/// Redis protocol over TCP
pub struct RespPlugin;

impl BackendPlugin for RespPlugin {
    fn kind(&self) -> BackendKind {
        BackendKind::Redis
    }

    fn create_connection(&self) -> Box<dyn BackendConnection> {
        Box::new(RespConnection::new())
    }

    fn commands(&self) -> Vec<CommandHolder> {
        resp::redis_commands(RespConnection::new().capabilities())
    }

    fn translator(&self) -> Arc<dyn CommandTranslator> {
        Arc::from(translator_for(BackendKind::Redis))
    }
}

/// File-backed local store
pub struct EmbeddedPlugin;

impl BackendPlugin for EmbeddedPlugin {
    fn kind(&self) -> BackendKind {
        BackendKind::Embedded
    }

    fn create_connection(&self) -> Box<dyn BackendConnection> {
        Box::new(EmbeddedStore::new())
    }

    fn commands(&self) -> Vec<CommandHolder> {
        generic_commands(EmbeddedStore::new().capabilities())
    }

    fn translator(&self) -> Arc<dyn CommandTranslator> {
        Arc::from(translator_for(BackendKind::Embedded))
    }
}

#[derive(Clone)]
struct Registered {
    plugin: Arc<dyn BackendPlugin>,
    commands: Arc<CommandRegistry>,
}

/// Plugins by backend kind. Command registries are built once per kind at
/// registration and shared by every driver of that kind.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    plugins: Arc<FnvHashMap<BackendKind, Registered>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every plugin shipped in this crate
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RespPlugin));
        registry.register(Arc::new(EmbeddedPlugin));
        registry
    }

    /// Add or replace the plugin for its kind
    pub fn register(&mut self, plugin: Arc<dyn BackendPlugin>) {
        let kind = plugin.kind();
        let commands = Arc::new(CommandRegistry::new(kind, plugin.commands()));
        log::debug!(
            "registered {} backend with {} commands",
            kind,
            commands.commands().len()
        );
        Arc::make_mut(&mut self.plugins).insert(kind, Registered { plugin, commands });
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        let mut kinds: Vec<BackendKind> = self.plugins.keys().copied().collect();
        kinds.sort();
        kinds
    }

    pub fn plugin(&self, kind: BackendKind) -> EngineResult<&Arc<dyn BackendPlugin>> {
        self.plugins
            .get(&kind)
            .map(|registered| &registered.plugin)
            .ok_or_else(|| EngineError::unsupported_backend(kind))
    }

    pub fn commands(&self, kind: BackendKind) -> EngineResult<Arc<CommandRegistry>> {
        self.plugins
            .get(&kind)
            .map(|registered| Arc::clone(&registered.commands))
            .ok_or_else(|| EngineError::unsupported_backend(kind))
    }

    /// Spawn a driver with a fresh connection for `settings`
    pub fn spawn_driver(
        &self,
        settings: Arc<ConnectionSettings>,
        options: DriverOptions,
    ) -> EngineResult<DriverHandle> {
        let registered = self
            .plugins
            .get(&settings.kind())
            .ok_or_else(|| EngineError::unsupported_backend(settings.kind()))?;
        DriverHandle::spawn(
            settings,
            registered.plugin.create_connection(),
            Arc::clone(&registered.commands),
            registered.plugin.translator(),
            options,
        )
    }
}
