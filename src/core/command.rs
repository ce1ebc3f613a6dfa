/// Command registry: arity-checked dispatch of console input to handlers
use crate::core::connection::{BackendConnection, Notification};
use crate::core::reply::Reply;
use crate::core::BackendKind;
use crate::error::{EngineError, EngineResult};
use bytes::Bytes;
use std::fmt;

/// Sentinel for commands without an upper argument bound
pub const UNBOUNDED_ARGS: usize = usize::MAX;

/// Handler invoked with the full argv (command name words included)
pub type CommandHandler = fn(&mut CommandContext<'_>, &[Bytes]) -> EngineResult<Reply>;

/// Where a command comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    /// Protocol-native command passed straight to the backend
    Native,
    /// Generic verb implemented on top of `BackendConnection`
    Extended,
}

/// Logging classification of a dispatched command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingType {
    /// Typed by the user
    #[default]
    User,
    /// Generated by the engine on behalf of a high-level operation
    Inner,
    /// Housekeeping the user never asked for
    Internal,
}

/// Audit entry recorded before a command executes
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedCommand {
    pub timestamp_ms: i64,
    pub connection: String,
    pub text: String,
    pub logging_type: LoggingType,
    /// Whether the entry belongs in the user-visible command history
    pub record_history: bool,
}

/// Registry entry describing one command
#[derive(Clone, Copy)]
pub struct CommandHolder {
    pub name: &'static str,
    pub params: &'static str,
    pub summary: &'static str,
    pub since: &'static str,
    pub example: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub command_type: CommandType,
    pub handler: CommandHandler,
}

impl CommandHolder {
    pub fn new(
        name: &'static str,
        params: &'static str,
        summary: &'static str,
        min_args: usize,
        max_args: usize,
        command_type: CommandType,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            params,
            summary,
            since: "",
            example: "",
            min_args,
            max_args,
            command_type,
            handler,
        }
    }

    pub fn since(mut self, since: &'static str) -> Self {
        self.since = since;
        self
    }

    pub fn example(mut self, example: &'static str) -> Self {
        self.example = example;
        self
    }

    /// Number of whitespace-separated words in the name
    pub fn name_words(&self) -> usize {
        self.name.split_whitespace().count()
    }

    pub fn is_native(&self) -> bool {
        self.command_type == CommandType::Native
    }

    /// Case-insensitive match of the name against the leading tokens
    pub fn matches(&self, argv: &[Bytes]) -> bool {
        let words = self.name_words();
        argv.len() >= words
            && self
                .name
                .split_whitespace()
                .zip(argv)
                .all(|(word, token)| word.as_bytes().eq_ignore_ascii_case(token))
    }

    /// Check the number of arguments following the name
    pub fn test_args(&self, argv: &[Bytes]) -> EngineResult<()> {
        let given = argv.len().saturating_sub(self.name_words());
        let too_many = self.max_args != UNBOUNDED_ARGS && given > self.max_args;
        if given < self.min_args || too_many {
            return Err(EngineError::invalid_args(self.name, self.params));
        }
        Ok(())
    }
}

impl fmt::Debug for CommandHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHolder")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("command_type", &self.command_type)
            .finish()
    }
}

/// Execution context handed to command handlers
pub struct CommandContext<'a> {
    conn: &'a mut dyn BackendConnection,
    registry: &'a CommandRegistry,
    notifications: Vec<Notification>,
}

impl<'a> CommandContext<'a> {
    pub fn new(conn: &'a mut dyn BackendConnection, registry: &'a CommandRegistry) -> Self {
        Self {
            conn,
            registry,
            notifications: Vec::new(),
        }
    }

    pub fn connection(&mut self) -> &mut (dyn BackendConnection + 'a) {
        &mut *self.conn
    }

    pub fn registry(&self) -> &'a CommandRegistry {
        self.registry
    }

    pub fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    pub fn into_notifications(self) -> Vec<Notification> {
        self.notifications
    }
}

/// Static, per-backend ordered list of commands
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    backend: BackendKind,
    commands: Vec<CommandHolder>,
}

impl CommandRegistry {
    pub fn new(backend: BackendKind, commands: Vec<CommandHolder>) -> Self {
        Self { backend, commands }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn commands(&self) -> &[CommandHolder] {
        &self.commands
    }

    /// Look up a command by its full name
    pub fn find(&self, name: &str) -> Option<&CommandHolder> {
        let words: Vec<&str> = name.split_whitespace().collect();
        self.commands.iter().find(|holder| {
            let mut parts = holder.name.split_whitespace();
            words.len() == holder.name_words()
                && words
                    .iter()
                    .all(|word| parts.next().map_or(false, |part| part.eq_ignore_ascii_case(word)))
        })
    }

    /// Resolve argv to its command, preferring the longest matching name,
    /// and validate the argument count
    pub fn resolve(&self, argv: &[Bytes]) -> EngineResult<&CommandHolder> {
        let mut best: Option<&CommandHolder> = None;
        for holder in &self.commands {
            if holder.matches(argv) && best.map_or(true, |b| holder.name_words() > b.name_words()) {
                best = Some(holder);
            }
        }
        let holder = best
            .filter(|_| !argv.is_empty())
            .ok_or_else(|| EngineError::unknown_sequence(display_argv(argv)))?;
        holder.test_args(argv)?;
        Ok(holder)
    }

    /// Resolve and run a command against the context's connection
    pub fn execute(&self, ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
        let holder = self.resolve(argv)?;
        if !ctx.connection().is_connected() {
            return Err(EngineError::not_connected());
        }
        log::trace!("dispatching {} to {} handler", holder.name, self.backend);
        (holder.handler)(ctx, argv)
    }
}

fn display_argv(argv: &[Bytes]) -> String {
    argv.iter()
        .map(|arg| String::from_utf8_lossy(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CommandError, ErrorKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counting_handler(_ctx: &mut CommandContext<'_>, _argv: &[Bytes]) -> EngineResult<Reply> {
        CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(Reply::ok())
    }

    fn argv(line: &str) -> Vec<Bytes> {
        line.split_whitespace()
            .map(|word| Bytes::copy_from_slice(word.as_bytes()))
            .collect()
    }

    fn test_registry() -> CommandRegistry {
        CommandRegistry::new(
            BackendKind::Redis,
            vec![
                CommandHolder::new("SET", "<key> <value>", "Set the string value of a key", 2, 2, CommandType::Native, counting_handler),
                CommandHolder::new("GET CONFIG", "<parameter>", "Get a configuration parameter", 1, 1, CommandType::Native, counting_handler),
                CommandHolder::new("CONFIG", "<subcommand>", "Server configuration", 1, UNBOUNDED_ARGS, CommandType::Native, counting_handler),
                CommandHolder::new("CONFIG GET", "<parameter>", "Get a configuration parameter", 1, 1, CommandType::Native, counting_handler),
            ],
        )
    }

    #[test]
    fn test_resolve_arity() {
        let registry = test_registry();
        assert!(registry.resolve(&argv("SET alex palec")).is_ok());
        assert!(registry.resolve(&argv("set alex palec")).is_ok());
        assert!(registry.resolve(&argv("SET alex")).is_err());
        assert!(registry.resolve(&argv("GET CONFIG alex")).is_ok());
        assert!(registry.resolve(&argv("GET CONFIG last alex")).is_err());
    }

    #[test]
    fn test_resolve_unknown() {
        let registry = test_registry();
        let err = registry.resolve(&argv("GET alex")).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Command(CommandError::UnknownSequence(ref seq)) if seq == "GET alex"
        ));
        assert!(registry.resolve(&[]).is_err());
    }

    #[test]
    fn test_resolve_prefers_two_word_names() {
        let registry = test_registry();
        let holder = registry.resolve(&argv("config get maxmemory")).unwrap();
        assert_eq!(holder.name, "CONFIG GET");

        let holder = registry.resolve(&argv("CONFIG RESETSTAT")).unwrap();
        assert_eq!(holder.name, "CONFIG");
    }

    #[test]
    fn test_arity_error_names_command_and_syntax() {
        let registry = test_registry();
        let err = registry.resolve(&argv("SET alex")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Command);
        let message = err.to_string();
        assert!(message.contains("SET"));
        assert!(message.contains("<key> <value>"));
    }

    #[test]
    fn test_rejected_arity_never_invokes_handler() {
        let registry = test_registry();
        let before = CALLS.load(Ordering::SeqCst);
        for holder in registry.commands() {
            let too_few: Vec<Bytes> = holder
                .name
                .split_whitespace()
                .map(str::to_string)
                .chain((0..holder.min_args.saturating_sub(1)).map(|i| format!("arg{}", i)))
                .map(Bytes::from)
                .collect();
            if holder.min_args > 0 {
                assert!(holder.test_args(&too_few).is_err());
            }
            if holder.max_args != UNBOUNDED_ARGS {
                let too_many: Vec<Bytes> = holder
                    .name
                    .split_whitespace()
                    .map(str::to_string)
                    .chain((0..=holder.max_args).map(|i| format!("arg{}", i)))
                    .map(Bytes::from)
                    .collect();
                assert!(holder.test_args(&too_many).is_err());
            }
        }
        assert_eq!(CALLS.load(Ordering::SeqCst), before);
    }

    #[test]
    fn test_find_by_name() {
        let registry = test_registry();
        assert_eq!(registry.find("config get").map(|h| h.name), Some("CONFIG GET"));
        assert!(registry.find("DEL").is_none());
    }
}
