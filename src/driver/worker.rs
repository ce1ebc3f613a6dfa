/// Driver worker loop: one per connection, on its own thread
use super::events::{
    CommandOutput, DiscoveryInfo, DriverEvent, DriverNotification, ExecuteOptions, Payload,
    Request, RequestId, Response,
};
use super::{DriverState, DriverStatus, Envelope};
use crate::config::ConnectionSettings;
use crate::core::console::{parse_commands, split_args};
use crate::core::{
    BackendConnection, CommandContext, CommandRegistry, CommandTranslator, KeyCommand,
    LoggedCommand, LoggingType, NodeRole, Notification, Reply,
};
use crate::error::{EngineError, EngineResult};
use crate::history::HistoryLog;
use crate::utils::now_millis;
use std::io;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::Instrument;

/// Monotonic 0..=100 progress reporter for one request
struct Progress<'a> {
    id: RequestId,
    sink: &'a mpsc::UnboundedSender<DriverEvent>,
    last: u8,
}

impl<'a> Progress<'a> {
    fn start(id: RequestId, sink: &'a mpsc::UnboundedSender<DriverEvent>) -> Self {
        let _ = sink.send(DriverEvent::Progress { id, percent: 0 });
        Self { id, sink, last: 0 }
    }

    fn report(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent > self.last {
            self.last = percent;
            let _ = self.sink.send(DriverEvent::Progress {
                id: self.id,
                percent,
            });
        }
    }

    fn finish(mut self) {
        self.report(100);
    }
}

pub(crate) struct Worker {
    status: Arc<DriverStatus>,
    settings: Arc<ConnectionSettings>,
    connection: Box<dyn BackendConnection>,
    registry: Arc<CommandRegistry>,
    translator: Arc<dyn CommandTranslator>,
    notifications: broadcast::Sender<DriverNotification>,
    history: Option<HistoryLog>,
    timer: Option<Interval>,
    /// When the last request finished; ticks due before it are skipped
    busy_until: Option<Instant>,
}

impl Worker {
    pub(crate) fn new(
        status: Arc<DriverStatus>,
        settings: Arc<ConnectionSettings>,
        connection: Box<dyn BackendConnection>,
        registry: Arc<CommandRegistry>,
        translator: Arc<dyn CommandTranslator>,
        notifications: broadcast::Sender<DriverNotification>,
        logging_dir: Option<&Path>,
    ) -> Self {
        let history = logging_dir.and_then(|dir| {
            if dir.is_dir() {
                Some(HistoryLog::new(dir.join(settings.log_file_name())))
            } else {
                log::warn!(
                    "history directory {} does not exist, history disabled for {}",
                    dir.display(),
                    settings.name()
                );
                None
            }
        });
        Self {
            status,
            settings,
            connection,
            registry,
            translator,
            notifications,
            history,
            timer: None,
            busy_until: None,
        }
    }

    pub(crate) async fn run(mut self, mut requests: mpsc::UnboundedReceiver<Envelope>) {
        self.set_state(DriverState::Idle);
        tracing::debug!("driver {} started", self.settings.name());

        loop {
            tokio::select! {
                biased;
                Some(deadline) = next_tick(&mut self.timer) => self.on_tick(deadline),
                envelope = requests.recv() => match envelope {
                    Some(Envelope::Request { id, request, reply_to }) => {
                        self.handle(id, request, reply_to).await
                    }
                    Some(Envelope::Stop) | None => break,
                },
            }
        }

        self.shutdown();
    }

    fn set_state(&self, state: DriverState) {
        self.status.set_state(state);
        let _ = self
            .notifications
            .send(DriverNotification::StateChanged(state));
    }

    fn notify(&self, notification: Notification) {
        let _ = self
            .notifications
            .send(DriverNotification::Backend(notification));
    }

    fn sync_connected(&self) {
        self.status
            .connected
            .store(self.connection.is_connected(), Ordering::SeqCst);
    }

    fn ensure_connected(&self) -> EngineResult<()> {
        if self.connection.is_connected() {
            Ok(())
        } else {
            Err(EngineError::not_connected())
        }
    }

    fn on_tick(&mut self, deadline: Instant) {
        if self.busy_until.map_or(false, |busy| deadline < busy) {
            tracing::trace!("skipping history tick that fell during execution");
            return;
        }
        if !self.connection.is_connected() {
            return;
        }

        self.log_command(&self.translator.server_info_command(), LoggingType::Internal, false);
        match self.connection.info(&[]) {
            Ok(info) => {
                let timestamp_ms = now_millis();
                if let Some(history) = self.history.as_mut() {
                    if let Err(e) = history.append(timestamp_ms, &info.to_string()) {
                        tracing::warn!("failed to append history for {}: {}", self.settings.name(), e);
                    }
                }
                let _ = self
                    .notifications
                    .send(DriverNotification::ServerInfoSnapshot { timestamp_ms, info });
            }
            Err(e) => tracing::warn!("history tick failed for {}: {}", self.settings.name(), e),
        }
    }

    async fn handle(
        &mut self,
        id: RequestId,
        request: Request,
        reply_to: mpsc::UnboundedSender<DriverEvent>,
    ) {
        self.status.interrupt.store(false, Ordering::SeqCst);
        self.set_state(DriverState::Executing);
        let _ = reply_to.send(DriverEvent::Started {
            id,
            request: request.name(),
        });

        let span = tracing::debug_span!(
            "request",
            driver = %self.settings.name(),
            id,
            kind = request.name()
        );
        let mut progress = Progress::start(id, &reply_to);
        let result = self
            .dispatch(id, request, &mut progress, &reply_to)
            .instrument(span)
            .await;
        progress.finish();

        if let Err(e) = &result {
            tracing::debug!("request {} on {} failed: {}", id, self.settings.name(), e);
        }
        let _ = reply_to.send(DriverEvent::Finished(Response { id, result }));

        self.sync_connected();
        self.busy_until = Some(Instant::now());
        self.set_state(DriverState::Idle);
    }

    async fn dispatch(
        &mut self,
        id: RequestId,
        request: Request,
        progress: &mut Progress<'_>,
        reply_to: &mpsc::UnboundedSender<DriverEvent>,
    ) -> EngineResult<Payload> {
        match request {
            Request::Connect => self.connect(),
            Request::Disconnect => self.disconnect(),
            Request::Execute { text, options } => {
                self.execute(id, &text, &options, progress, reply_to).await
            }
            Request::LoadDatabases => {
                self.ensure_connected()?;
                self.log_inner(self.translator.databases_command());
                Ok(Payload::Databases(self.connection.databases()?))
            }
            Request::LoadDatabaseContent {
                pattern,
                cursor,
                count,
            } => {
                self.ensure_connected()?;
                self.log_inner(self.translator.scan_command(cursor, &pattern, count));
                let database = self.connection.current_database()?;
                let page = self.connection.scan(cursor, &pattern, count)?;
                Ok(Payload::DatabaseContent {
                    database,
                    keys: page.keys,
                    next_cursor: page.next_cursor,
                })
            }
            Request::SetDefaultDatabase(name) => {
                self.ensure_connected()?;
                self.log_inner(self.translator.select_command(&name));
                let database = self.connection.select(&name)?;
                self.notify(Notification::DatabaseChanged(database.clone()));
                Ok(Payload::DefaultDatabaseSet(database))
            }
            Request::ClearDatabase(name) => self.clear_database(name),
            Request::LoadServerInfo => {
                self.ensure_connected()?;
                self.log_inner(self.translator.server_info_command());
                Ok(Payload::ServerInfo(self.connection.info(&[])?))
            }
            Request::LoadServerInfoHistory => {
                let history = self.history.as_mut().ok_or_else(history_not_found)?;
                let snapshots = history.read_all().map_err(|e| match e.kind() {
                    io::ErrorKind::NotFound => history_not_found(),
                    _ => EngineError::History(e),
                })?;
                Ok(Payload::ServerInfoHistory(snapshots))
            }
            Request::ClearServerHistory => {
                if let Some(history) = self.history.as_mut() {
                    history
                        .clear()
                        .map_err(|e| EngineError::History(io::Error::new(e.kind(), "Clear file error!")))?;
                }
                Ok(Payload::ServerHistoryCleared)
            }
            Request::Discover => self.discover(),
            Request::CreateDatabase(name) => {
                self.ensure_connected()?;
                self.log_inner(self.translator.create_db_command(&name));
                self.connection.create_db(&name)?;
                self.notify(Notification::DatabaseCreated(name.clone()));
                Ok(Payload::DatabaseCreated(name))
            }
            Request::RemoveDatabase(name) => {
                self.ensure_connected()?;
                self.log_inner(self.translator.remove_db_command(&name));
                self.connection.remove_db(&name)?;
                self.notify(Notification::DatabaseRemoved(name.clone()));
                Ok(Payload::DatabaseRemoved(name))
            }
            Request::Key(command) => self.key_command(command),
        }
    }

    fn connect(&mut self) -> EngineResult<Payload> {
        if self.connection.is_connected() {
            return Ok(Payload::Connected);
        }
        self.connection.connect(&self.settings)?;
        self.sync_connected();
        log::info!("connected {}", self.settings.name());

        let interval_ms = self.settings.logging_interval_ms();
        if interval_ms > 0 {
            let period = Duration::from_millis(u64::from(interval_ms));
            let mut timer = tokio::time::interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            self.timer = Some(timer);
        }
        Ok(Payload::Connected)
    }

    fn disconnect(&mut self) -> EngineResult<Payload> {
        self.timer = None;
        self.connection.disconnect()?;
        self.sync_connected();
        log::info!("disconnected {}", self.settings.name());
        Ok(Payload::Disconnected)
    }

    async fn execute(
        &mut self,
        id: RequestId,
        text: &str,
        options: &ExecuteOptions,
        progress: &mut Progress<'_>,
        reply_to: &mpsc::UnboundedSender<DriverEvent>,
    ) -> EngineResult<Payload> {
        self.ensure_connected()?;
        let commands = parse_commands(text);
        let runs = u64::from(options.repeat) + 1;
        let total = commands.len() as u64 * runs;
        let interval = Duration::from_millis(options.repeat_interval_ms);

        let mut outputs = Vec::new();
        let mut done = 0u64;
        for run in 0..runs {
            let started = Instant::now();
            for line in &commands {
                if self.status.interrupt.load(Ordering::SeqCst) {
                    return Err(EngineError::Interrupted);
                }
                let (reply, _) = self.execute_line(line, options.logging_type, options.history)?;
                if !options.silent {
                    let output = CommandOutput {
                        command: line.clone(),
                        reply,
                    };
                    let _ = reply_to.send(DriverEvent::Output {
                        id,
                        output: output.clone(),
                    });
                    outputs.push(output);
                }
                done += 1;
                progress.report((done * 99 / total) as u8);
            }

            let elapsed = started.elapsed();
            if run + 1 < runs && elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }

        Ok(Payload::Executed { outputs })
    }

    /// Record a command in the `commands` log and the notification stream
    /// before it runs
    fn log_command(&self, text: &str, logging_type: LoggingType, record_history: bool) {
        log::debug!(target: "commands", "[{}] {:?}: {}", self.settings.name(), logging_type, text);
        let _ = self
            .notifications
            .send(DriverNotification::CommandLogged(LoggedCommand {
                timestamp_ms: now_millis(),
                connection: self.settings.name().to_string(),
                text: text.to_string(),
                logging_type,
                record_history,
            }));
    }

    fn log_inner(&self, text: String) {
        self.log_command(&text, LoggingType::Inner, false);
    }

    /// Log, tokenize and dispatch one command line. Returns the reply and
    /// the number of notifications the handler raised.
    fn execute_line(
        &mut self,
        line: &str,
        logging_type: LoggingType,
        record_history: bool,
    ) -> EngineResult<(Reply, usize)> {
        self.log_command(line, logging_type, record_history);
        let argv = split_args(line)?;
        let registry = Arc::clone(&self.registry);
        let mut ctx = CommandContext::new(self.connection.as_mut(), &registry);
        let result = registry.execute(&mut ctx, &argv);
        let notifications = ctx.into_notifications();
        let count = notifications.len();
        for notification in notifications {
            self.notify(notification);
        }
        self.sync_connected();

        result.map(|reply| (reply, count))
    }

    fn clear_database(&mut self, name: String) -> EngineResult<Payload> {
        self.ensure_connected()?;
        let current = self.connection.current_database()?;
        let switch = current.name != name;
        if switch {
            self.log_inner(self.translator.select_command(&name));
            self.connection.select(&name)?;
        }
        self.log_inner(self.translator.flush_command());
        let flushed = self.connection.flush_db();
        if switch {
            self.log_inner(self.translator.select_command(&current.name));
            self.connection.select(&current.name)?;
        }
        flushed?;
        self.notify(Notification::DatabaseFlushed(name.clone()));
        Ok(Payload::DatabaseCleared(name))
    }

    fn discover(&mut self) -> EngineResult<Payload> {
        if !self.connection.is_connected() {
            return Err(EngineError::connection(
                "Not connected to server, impossible to get discovery info!",
            ));
        }
        self.log_command(&self.translator.server_info_command(), LoggingType::Internal, false);
        let server_info = self.connection.info(&[])?;
        let database = self.connection.current_database()?;
        let role = server_info.role().unwrap_or(NodeRole::Unknown);
        Ok(Payload::Discovery(DiscoveryInfo {
            server_info,
            database,
            role,
        }))
    }

    /// Key operations go through the translator and the registry, like
    /// typed commands, logged as `Inner`
    fn key_command(&mut self, command: KeyCommand) -> EngineResult<Payload> {
        self.ensure_connected()?;
        let text = self.translator.translate(&command)?;
        let mut reply = Reply::Nil;
        let mut raised = 0;
        for line in parse_commands(&text) {
            let (line_reply, count) = self.execute_line(&line, LoggingType::Inner, false)?;
            reply = line_reply;
            raised += count;
        }
        if raised == 0 {
            self.notify(command.notification(&reply)?);
        }
        Ok(Payload::KeyCommandDone { command, reply })
    }

    fn shutdown(&mut self) {
        self.set_state(DriverState::Stopping);
        self.timer = None;
        if self.connection.is_connected() {
            if let Err(e) = self.connection.disconnect() {
                tracing::warn!("failed to disconnect {}: {}", self.settings.name(), e);
            }
        }
        self.sync_connected();
        self.set_state(DriverState::Stopped);
        tracing::debug!("driver {} stopped", self.settings.name());
    }
}

async fn next_tick(timer: &mut Option<Interval>) -> Option<Instant> {
    match timer {
        Some(timer) => Some(timer.tick().await),
        None => std::future::pending().await,
    }
}

fn history_not_found() -> EngineError {
    EngineError::History(io::Error::new(io::ErrorKind::NotFound, "History file not found"))
}
