/// Generic high-level verbs written once against `BackendConnection`.
///
/// Backends without a native command set build their registry from
/// `generic_commands`; backends with one add the verbs they lack.
use crate::core::command::{CommandContext, CommandHolder, CommandType, UNBOUNDED_ARGS};
use crate::core::connection::{Capabilities, Notification};
use crate::core::console::arg_text;
use crate::core::reply::Reply;
use crate::core::value::{Key, KeyValue, Value};
use crate::error::{EngineError, EngineResult};
use crate::PROJECT_NAME;
use bytes::Bytes;

/// Page size used when SCAN is given no COUNT
pub const NO_KEYS_LIMIT: u64 = i32::MAX as u64;

/// Generic command table for a backend with the given capabilities
pub fn generic_commands(capabilities: Capabilities) -> Vec<CommandHolder> {
    let mut commands = vec![
        CommandHolder::new("HELP", "[command]", "Return how to use command", 0, UNBOUNDED_ARGS, CommandType::Extended, help)
            .example("HELP SCAN"),
        CommandHolder::new("SCAN", "<cursor> [MATCH pattern] [COUNT count]", "Incrementally iterate the keys space", 1, 5, CommandType::Extended, scan)
            .example("SCAN 0 MATCH * COUNT 10"),
        CommandHolder::new("DBKCOUNT", "-", "Return the number of keys in the selected database", 0, 0, CommandType::Extended, db_key_count),
        CommandHolder::new("FLUSHDB", "-", "Remove all keys from the current database", 0, 0, CommandType::Extended, flush_db),
        CommandHolder::new("SET", "<key> <value>", "Set the value of a key", 2, 2, CommandType::Extended, set)
            .example("SET key value"),
        CommandHolder::new("GET", "<key>", "Get the value of a key", 1, 1, CommandType::Extended, get)
            .example("GET key"),
        CommandHolder::new("DEL", "<key> [key ...]", "Delete key", 1, UNBOUNDED_ARGS, CommandType::Extended, delete),
        CommandHolder::new("RENAME", "<key> <newkey>", "Rename a key", 2, 2, CommandType::Extended, rename),
        CommandHolder::new("QUIT", "-", "Close the connection", 0, 0, CommandType::Extended, quit),
    ];
    if capabilities.key_range {
        commands.push(
            CommandHolder::new("KEYS", "<key_start> <key_end> <limit>", "Find all keys matching the given limits", 3, 3, CommandType::Extended, keys)
                .example("KEYS a z 10"),
        );
    }
    if capabilities.multi_db {
        commands.push(CommandHolder::new("SELECT", "<name>", "Change the selected database", 1, 1, CommandType::Extended, select));
    }
    if capabilities.manage_db {
        commands.push(CommandHolder::new("CREATEDB", "<name>", "Create database", 1, 1, CommandType::Extended, create_db));
        commands.push(CommandHolder::new("REMOVEDB", "<name>", "Remove database", 1, 1, CommandType::Extended, remove_db));
    }
    if capabilities.ttl {
        commands.push(CommandHolder::new("TTL", "<key>", "Get the time to live for a key", 1, 1, CommandType::Extended, get_ttl));
        commands.push(CommandHolder::new("EXPIRE", "<key> <seconds>", "Set a key's time to live in seconds", 2, 2, CommandType::Extended, set_ttl));
    }
    commands
}

pub fn help(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let registry = ctx.registry();
    if argv.len() < 2 {
        let version = ctx
            .connection()
            .server_version()
            .unwrap_or_else(|| "unknown".to_string());
        return Ok(Reply::bulk(format!(
            "{} based on {} {}\r\nType: \"help <command>\" for help on <command>",
            PROJECT_NAME,
            registry.backend(),
            version
        )));
    }

    let name = argv[1..]
        .iter()
        .map(|word| arg_text(word))
        .collect::<EngineResult<Vec<_>>>()?
        .join(" ");
    let holder = registry
        .find(&name)
        .ok_or_else(|| EngineError::unknown_sequence(name.clone()))?;
    Ok(Reply::bulk(format!(
        "name: {}\r\nsummary: {}\r\nparams: {}\r\nsince: {}\r\nexample: {}",
        holder.name, holder.summary, holder.params, holder.since, holder.example
    )))
}

pub fn scan(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let cursor = parse_u64(&argv[1], "cursor")?;
    let mut pattern = "*";
    let mut count = NO_KEYS_LIMIT;

    let mut options = argv[2..].iter();
    while let Some(option) = options.next() {
        let option = arg_text(option)?;
        let value = options
            .next()
            .ok_or_else(|| EngineError::invalid_input(format!("Missing value for {}", option)))?;
        if option.eq_ignore_ascii_case("MATCH") {
            pattern = arg_text(value)?;
        } else if option.eq_ignore_ascii_case("COUNT") {
            count = parse_u64(value, "count")?;
        } else {
            return Err(EngineError::invalid_input(format!("Unknown SCAN option: {}", option)));
        }
    }

    let page = ctx.connection().scan(cursor, pattern, count)?;
    Ok(Reply::Array(vec![
        Reply::bulk(page.next_cursor.to_string()),
        Reply::Array(page.keys.into_iter().map(|key| Reply::Bulk(key.to_bytes())).collect()),
    ]))
}

pub fn keys(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let limit = parse_u64(&argv[3], "limit")?;
    let keys = ctx
        .connection()
        .keys(arg_text(&argv[1])?, arg_text(&argv[2])?, limit)?;
    Ok(Reply::Array(keys.into_iter().map(|key| Reply::Bulk(key.to_bytes())).collect()))
}

pub fn db_key_count(ctx: &mut CommandContext<'_>, _argv: &[Bytes]) -> EngineResult<Reply> {
    let count = ctx.connection().db_key_count()?;
    Ok(Reply::Integer(count as i64))
}

pub fn create_db(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let name = arg_text(&argv[1])?;
    ctx.connection().create_db(name)?;
    ctx.notify(Notification::DatabaseCreated(name.to_string()));
    Ok(Reply::ok())
}

pub fn remove_db(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let name = arg_text(&argv[1])?;
    ctx.connection().remove_db(name)?;
    ctx.notify(Notification::DatabaseRemoved(name.to_string()));
    Ok(Reply::ok())
}

pub fn select(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let database = ctx.connection().select(arg_text(&argv[1])?)?;
    ctx.notify(Notification::DatabaseChanged(database));
    Ok(Reply::ok())
}

pub fn flush_db(ctx: &mut CommandContext<'_>, _argv: &[Bytes]) -> EngineResult<Reply> {
    let database = ctx.connection().current_database()?;
    ctx.connection().flush_db()?;
    ctx.notify(Notification::DatabaseFlushed(database.name));
    Ok(Reply::ok())
}

pub fn set(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let record = KeyValue::new(Key::new(argv[1].clone()), Value::string(argv[2].clone()));
    ctx.connection().set(&record)?;
    ctx.notify(Notification::KeyAdded(record));
    Ok(Reply::ok())
}

pub fn get(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let record = ctx.connection().get(&Key::new(argv[1].clone()))?;
    let reply = Reply::from_value(&record.value);
    ctx.notify(Notification::KeyLoaded(record));
    Ok(reply)
}

pub fn delete(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let keys: Vec<Key> = argv[1..].iter().cloned().map(Key::new).collect();
    let deleted = ctx.connection().delete(&keys)?;
    let count = deleted.len();
    for key in deleted {
        ctx.notify(Notification::KeyDeleted(key));
    }
    Ok(Reply::Integer(count as i64))
}

pub fn rename(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let key = Key::new(argv[1].clone());
    let new_name = Key::new(argv[2].clone());
    ctx.connection().rename(&key, &new_name)?;
    ctx.notify(Notification::KeyRenamed { key, new_name });
    Ok(Reply::ok())
}

pub fn get_ttl(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let key = Key::new(argv[1].clone());
    let ttl = ctx.connection().get_ttl(&key)?;
    ctx.notify(Notification::KeyTtlLoaded { key, ttl });
    Ok(Reply::Integer(ttl))
}

pub fn set_ttl(ctx: &mut CommandContext<'_>, argv: &[Bytes]) -> EngineResult<Reply> {
    let key = Key::new(argv[1].clone());
    let text = arg_text(&argv[2])?;
    let ttl = text
        .parse::<i64>()
        .map_err(|_| EngineError::invalid_input(format!("Invalid ttl: {}", text)))?;
    ctx.connection().set_ttl(&key, ttl)?;
    ctx.notify(Notification::KeyTtlChanged { key, ttl });
    Ok(Reply::ok())
}

pub fn quit(ctx: &mut CommandContext<'_>, _argv: &[Bytes]) -> EngineResult<Reply> {
    ctx.connection().disconnect()?;
    Ok(Reply::ok())
}

fn parse_u64(value: &[u8], what: &str) -> EngineResult<u64> {
    let value = arg_text(value)?;
    value
        .parse::<u64>()
        .map_err(|_| EngineError::invalid_input(format!("Invalid {}: {}", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::embedded::EmbeddedStore;
    use crate::config::{BackendConfig, ConnectionSettings, LocalConfig};
    use crate::core::command::CommandRegistry;
    use crate::core::connection::BackendConnection;
    use crate::core::console::split_args;
    use crate::core::BackendKind;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn connected_store(dir: &TempDir) -> EmbeddedStore {
        let settings = ConnectionSettings::new(
            "generic",
            BackendKind::Embedded,
            BackendConfig::Local(LocalConfig::new(dir.path().join("store.toml"))),
        )
        .unwrap();
        let mut store = EmbeddedStore::new();
        store.connect(&settings).unwrap();
        store
    }

    fn run(
        registry: &CommandRegistry,
        store: &mut EmbeddedStore,
        line: &str,
    ) -> (EngineResult<Reply>, Vec<Notification>) {
        let argv = split_args(line).unwrap();
        let mut ctx = CommandContext::new(store, registry);
        let result = registry.execute(&mut ctx, &argv);
        (result, ctx.into_notifications())
    }

    fn registry_for(store: &EmbeddedStore) -> CommandRegistry {
        CommandRegistry::new(BackendKind::Embedded, generic_commands(store.capabilities()))
    }

    #[test]
    fn test_set_then_get() {
        let dir = TempDir::new().unwrap();
        let mut store = connected_store(&dir);
        let registry = registry_for(&store);

        let (result, notes) = run(&registry, &mut store, "SET a 1");
        assert_eq!(result.unwrap(), Reply::ok());
        assert!(matches!(notes.as_slice(), [Notification::KeyAdded(_)]));

        let (result, _) = run(&registry, &mut store, "GET a");
        assert_eq!(result.unwrap(), Reply::bulk("1"));
    }

    #[test]
    fn test_scan_empty_database() {
        let dir = TempDir::new().unwrap();
        let mut store = connected_store(&dir);
        let registry = registry_for(&store);

        let (result, _) = run(&registry, &mut store, "SCAN 0 MATCH * COUNT 10");
        assert_eq!(
            result.unwrap(),
            Reply::Array(vec![Reply::bulk("0"), Reply::Array(vec![])])
        );
    }

    #[test]
    fn test_delete_counts_existing_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = connected_store(&dir);
        let registry = registry_for(&store);

        run(&registry, &mut store, "SET a 1").0.unwrap();
        run(&registry, &mut store, "SET b 2").0.unwrap();
        let (result, notes) = run(&registry, &mut store, "DEL a b c");
        assert_eq!(result.unwrap(), Reply::Integer(2));
        assert_eq!(notes.len(), 2);

        let (result, _) = run(&registry, &mut store, "DBKCOUNT");
        assert_eq!(result.unwrap(), Reply::Integer(0));
    }

    #[test]
    fn test_ttl_verbs_absent_without_capability() {
        let dir = TempDir::new().unwrap();
        let mut store = connected_store(&dir);
        let registry = registry_for(&store);

        let (result, _) = run(&registry, &mut store, "TTL a");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Command);
    }

    #[test]
    fn test_help_banner_and_command_help() {
        let dir = TempDir::new().unwrap();
        let mut store = connected_store(&dir);
        let registry = registry_for(&store);

        let banner = run(&registry, &mut store, "HELP").0.unwrap().to_string();
        assert!(banner.starts_with("kvbridge based on Embedded"));
        assert!(banner.contains("Type: \"help <command>\""));

        let scan_help = run(&registry, &mut store, "help scan").0.unwrap().to_string();
        assert!(scan_help.contains("name: SCAN"));
        assert!(scan_help.contains("SCAN 0 MATCH * COUNT 10"));

        assert!(run(&registry, &mut store, "HELP NOPE").0.is_err());
    }

    #[test]
    fn test_commands_require_connection() {
        let dir = TempDir::new().unwrap();
        let mut store = connected_store(&dir);
        let registry = registry_for(&store);
        store.disconnect().unwrap();

        let (result, _) = run(&registry, &mut store, "GET a");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::Connectivity);
    }

    #[test]
    fn test_quoted_values_survive_dispatch() {
        let dir = TempDir::new().unwrap();
        let mut store = connected_store(&dir);
        let registry = registry_for(&store);

        run(&registry, &mut store, r#"SET alex '{"test":1}'"#).0.unwrap();
        let (result, _) = run(&registry, &mut store, "GET alex");
        assert_eq!(result.unwrap(), Reply::bulk(r#"{"test":1}"#));
    }
}
