/// Per-connection drivers.
///
/// A driver owns one backend connection and serves requests strictly in
/// submission order on a dedicated worker thread. Callers interact through a
/// cloneable [`DriverHandle`]: requests go in over a channel, per-request
/// events come back on the sender supplied with each request, and driver-wide
/// notifications are broadcast to subscribers.
pub mod events;
mod worker;

pub use events::{
    CommandOutput, DiscoveryInfo, DriverEvent, DriverNotification, ExecuteOptions, Payload,
    Request, RequestId, Response,
};

use crate::config::ConnectionSettings;
use crate::core::{BackendConnection, CommandRegistry, CommandTranslator};
use crate::error::{EngineError, EngineResult};
use crate::utils::generate_id;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use worker::Worker;

const NOTIFICATION_CAPACITY: usize = 256;

/// Lifecycle of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Created,
    Starting,
    Idle,
    Executing,
    Stopping,
    Stopped,
}

impl DriverState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DriverState::Created,
            1 => DriverState::Starting,
            2 => DriverState::Idle,
            3 => DriverState::Executing,
            4 => DriverState::Stopping,
            _ => DriverState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            DriverState::Created => 0,
            DriverState::Starting => 1,
            DriverState::Idle => 2,
            DriverState::Executing => 3,
            DriverState::Stopping => 4,
            DriverState::Stopped => 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    /// Directory holding the server info history logs. History is disabled
    /// when unset or when the directory does not exist.
    pub logging_dir: Option<PathBuf>,
}

/// State shared between handles and the worker
pub(crate) struct DriverStatus {
    state: AtomicU8,
    pub(crate) connected: AtomicBool,
    pub(crate) interrupt: AtomicBool,
}

impl DriverStatus {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(DriverState::Created.as_u8()),
            connected: AtomicBool::new(false),
            interrupt: AtomicBool::new(false),
        }
    }

    pub(crate) fn state(&self) -> DriverState {
        DriverState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_state(&self, state: DriverState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }
}

pub(crate) enum Envelope {
    Request {
        id: RequestId,
        request: Request,
        reply_to: mpsc::UnboundedSender<DriverEvent>,
    },
    Stop,
}

struct Shared {
    id: String,
    settings: Arc<ConnectionSettings>,
    status: Arc<DriverStatus>,
    requests: mpsc::UnboundedSender<Envelope>,
    notifications: broadcast::Sender<DriverNotification>,
    next_request: AtomicU64,
}

/// Cloneable handle to a running driver. The worker shuts down once every
/// handle is dropped or [`DriverHandle::stop`] is called.
#[derive(Clone)]
pub struct DriverHandle {
    shared: Arc<Shared>,
}

impl DriverHandle {
    pub fn spawn(
        settings: Arc<ConnectionSettings>,
        connection: Box<dyn BackendConnection>,
        registry: Arc<CommandRegistry>,
        translator: Arc<dyn CommandTranslator>,
        options: DriverOptions,
    ) -> EngineResult<DriverHandle> {
        let status = Arc::new(DriverStatus::new());
        let (requests, receiver) = mpsc::unbounded_channel();
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let worker = Worker::new(
            Arc::clone(&status),
            Arc::clone(&settings),
            connection,
            registry,
            translator,
            notifications.clone(),
            options.logging_dir.as_deref(),
        );

        status.set_state(DriverState::Starting);
        let thread_status = Arc::clone(&status);
        std::thread::Builder::new()
            .name(format!("driver-{}", settings.name()))
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(worker.run(receiver)),
                    Err(e) => {
                        log::error!("failed to build driver runtime: {}", e);
                        thread_status.set_state(DriverState::Stopped);
                    }
                }
            })
            .map_err(|e| EngineError::internal(format!("failed to spawn driver thread: {}", e)))?;

        let id = generate_id("driver");
        log::info!("spawned driver {} for {}", id, settings.name());

        Ok(DriverHandle {
            shared: Arc::new(Shared {
                id,
                settings,
                status,
                requests,
                notifications,
                next_request: AtomicU64::new(1),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn settings(&self) -> &Arc<ConnectionSettings> {
        &self.shared.settings
    }

    pub fn state(&self) -> DriverState {
        self.shared.status.state()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.status.connected.load(Ordering::SeqCst)
    }

    /// Ask the running `Execute` to stop before its next command
    pub fn interrupt(&self) {
        self.shared.status.interrupt.store(true, Ordering::SeqCst);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DriverNotification> {
        self.shared.notifications.subscribe()
    }

    /// Queue a request. Its events, ending with exactly one
    /// [`DriverEvent::Finished`], arrive on `reply_to`.
    pub fn submit(
        &self,
        request: Request,
        reply_to: mpsc::UnboundedSender<DriverEvent>,
    ) -> EngineResult<RequestId> {
        let id = self.shared.next_request.fetch_add(1, Ordering::SeqCst);
        self.shared
            .requests
            .send(Envelope::Request {
                id,
                request,
                reply_to,
            })
            .map_err(|_| EngineError::internal("Driver stopped"))?;
        Ok(id)
    }

    /// Submit a request and wait for its result
    pub async fn call(&self, request: Request) -> EngineResult<Payload> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.submit(request, tx)?;
        while let Some(event) = rx.recv().await {
            if let DriverEvent::Finished(response) = event {
                return response.result;
            }
        }
        Err(EngineError::internal("Driver stopped"))
    }

    /// Stop after the requests already queued
    pub fn stop(&self) {
        let _ = self.shared.requests.send(Envelope::Stop);
    }
}

impl std::fmt::Debug for DriverHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverHandle")
            .field("id", &self.shared.id)
            .field("connection", &self.shared.settings.name())
            .field("state", &self.state())
            .finish()
    }
}
