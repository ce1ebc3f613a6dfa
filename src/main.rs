use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use kvbridge::config::{Config, ConfigError, ConnectionSettings, SettingsStore};
use kvbridge::driver::{DriverEvent, ExecuteOptions, Payload, Request};
use kvbridge::{BackendRegistry, ServersManager, PROJECT_NAME};
use log::info;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "kvbridge")]
#[command(about = "A uniform client engine for key-value and document databases")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "kvbridge team")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to a saved connection and run console commands
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "config/dev.toml")]
        config: PathBuf,
        /// Name of the saved connection
        #[arg(short = 'n', long)]
        connection: String,
        /// Commands to run, one per line; read from stdin when omitted
        #[arg(short, long)]
        execute: Option<String>,
        /// Extra runs of the whole script
        #[arg(long, default_value_t = 0)]
        repeat: u32,
        /// Minimum duration of one run when repeating
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
    /// Generate example configuration files
    Config {
        /// Backend of the example connection (redis or embedded)
        #[arg(short, long)]
        backend: String,
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Validate configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print or clear the server info history of a saved connection
    History {
        #[arg(short, long, default_value = "config/dev.toml")]
        config: PathBuf,
        #[arg(short = 'n', long)]
        connection: String,
        /// Remove the history file instead of printing it
        #[arg(long)]
        clear: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            connection,
            execute,
            repeat,
            interval_ms,
        } => {
            let options = ExecuteOptions {
                repeat,
                repeat_interval_ms: interval_ms,
                ..ExecuteOptions::default()
            };
            run_script(config, &connection, execute, options).await?;
        }
        Commands::Config { backend, output } => {
            generate_config(&backend, output)?;
        }
        Commands::Validate { config } => {
            validate_config(config)?;
        }
        Commands::History {
            config,
            connection,
            clear,
        } => {
            show_history(config, &connection, clear).await?;
        }
        Commands::Version => {
            show_version();
        }
    }

    Ok(())
}

fn load(config_path: &PathBuf) -> Result<(Config, SettingsStore)> {
    let config = Config::load_from_file(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    init_logging(&config)?;
    let store = SettingsStore::from_config(&config)?;
    Ok((config, store))
}

fn find_connection(store: &SettingsStore, name: &str) -> Result<Arc<ConnectionSettings>> {
    store
        .find_connection(name)
        .ok_or_else(|| anyhow!("No saved connection named '{}'", name))
}

async fn run_script(
    config_path: PathBuf,
    name: &str,
    script: Option<String>,
    options: ExecuteOptions,
) -> Result<()> {
    let (config, store) = load(&config_path)?;
    let settings = find_connection(&store, name)?;

    let script = match script {
        Some(script) => script,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read commands from stdin")?;
            text
        }
    };

    let mut manager = ServersManager::new(BackendRegistry::with_builtin(), config.driver.max_redirects);
    let driver = manager.create_server(settings, &store)?;
    info!("Connecting to {}", driver.settings().name());
    driver.call(Request::Connect).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    driver.submit(
        Request::Execute {
            text: script,
            options,
        },
        tx,
    )?;

    let mut result = Ok(());
    while let Some(event) = rx.recv().await {
        match event {
            DriverEvent::Output { output, .. } => {
                println!("> {}", output.command);
                println!("{}", output.reply);
            }
            DriverEvent::Finished(response) => {
                if let Err(e) = response.result {
                    result = Err(anyhow!(e));
                }
                break;
            }
            _ => {}
        }
    }

    driver.call(Request::Disconnect).await?;
    manager.clear();
    result
}

async fn show_history(config_path: PathBuf, name: &str, clear: bool) -> Result<()> {
    let (config, store) = load(&config_path)?;
    let settings = find_connection(&store, name)?;
    if store.logging_dir().is_none() {
        bail!("History is disabled in {:?}", config_path);
    }

    let mut manager = ServersManager::new(BackendRegistry::with_builtin(), config.driver.max_redirects);
    let driver = manager.create_server(settings, &store)?;

    if clear {
        driver.call(Request::ClearServerHistory).await?;
        println!("History of '{}' cleared", name);
    } else if let Payload::ServerInfoHistory(snapshots) =
        driver.call(Request::LoadServerInfoHistory).await?
    {
        for snapshot in snapshots {
            println!("[{}]", snapshot.timestamp_ms);
            println!("{}", snapshot.status);
        }
    }

    manager.clear();
    Ok(())
}

fn generate_config(backend: &str, output: PathBuf) -> Result<()> {
    println!("Generating {} configuration file: {:?}", backend, output);

    Config::create_example_config(&output, backend).context("Failed to generate config")?;

    println!("Configuration file generated successfully!");
    println!("Edit the file to match your environment and run:");
    println!("  {} run --config {:?} --connection <name>", PROJECT_NAME, output);

    Ok(())
}

fn validate_config(config_path: PathBuf) -> Result<()> {
    println!("Validating configuration file: {:?}", config_path);

    match Config::load_from_file(&config_path) {
        Ok(config) => {
            println!("✓ Configuration file is valid");
            println!("  Connections: {}", config.connections.len());
            for (i, connection) in config.connections.iter().enumerate() {
                if let Ok(settings) = ConnectionSettings::from_connection_string(connection) {
                    println!("    {}: {} ({})", i + 1, settings.name(), settings.kind());
                }
            }
            println!("  Clusters: {}", config.clusters.len());
            println!("  Sentinels: {}", config.sentinels.len());
            if config.history.enabled {
                println!("  History directory: {}", config.history.directory);
            }
        }
        Err(e) => {
            eprintln!("✗ Configuration file validation failed:");
            match &e {
                ConfigError::IoError(msg) => eprintln!("  File error: {}", msg),
                ConfigError::ParseError(msg) => eprintln!("  Parse error: {}", msg),
                ConfigError::ValidationError(msg) => eprintln!("  Validation error: {}", msg),
                ConfigError::SerializeError(msg) => eprintln!("  Serialization error: {}", msg),
                other => eprintln!("  {}", other),
            }
            return Err(e.into());
        }
    }

    Ok(())
}

fn show_version() {
    println!("{} v{}", PROJECT_NAME, env!("CARGO_PKG_VERSION"));
    println!("A uniform client engine for key-value and document databases");
    println!();
    println!("Target: {}", std::env::consts::ARCH);
    println!();
    println!("Backends:");
    for kind in BackendRegistry::with_builtin().kinds() {
        println!("  • {}", kind);
    }
}

fn init_logging(config: &Config) -> Result<()> {
    let log_level = match config.logging.level.as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    // Driver workers emit tracing spans and events
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.format == "json" {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!("Logging initialized at level: {:?}", log_level);
    Ok(())
}
