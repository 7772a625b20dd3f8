//! famelist CLI
//!
//! Command line front end for the famelist catalog. Builds a `DataSync`
//! from the config, subscribes to its events and runs one command.
//!
//! ## Usage
//!
//! ```bash
//! # Load (cache first, network if stale, demo data as a last resort)
//! famelist load
//!
//! # Search media records mentioning "demo"
//! famelist search demo --category media
//!
//! # Export the catalog as CSV
//! famelist export --format csv --output catalog.csv
//!
//! # Follow sync events until Ctrl-C
//! famelist watch
//! ```

mod output;

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::channel::mpsc;
use futures::StreamExt;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use famelist_core::{
    ApiClient, CacheManager, CategoryFilter, Config, DataSync, RemoteSource, SyncEvent,
};

/// famelist - catalog sync and search
#[derive(Parser)]
#[command(name = "famelist")]
#[command(version)]
#[command(about = "Browse, search and export the famelist catalog")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Cache directory (default: ~/.cache/famelist)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Site root serving data/personalities.json (overrides config and env)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Never touch the network; use the cache and demo data only
    #[arg(long, global = true)]
    offline: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the catalog and report where it came from
    Load {
        /// Skip the fresh-cache check and go to the network
        #[arg(short, long)]
        force: bool,
    },

    /// Force a validated resync
    Sync,

    /// List records
    List {
        /// Category tag, or "all"
        #[arg(short, long, default_value = "all")]
        category: String,
    },

    /// Show one record in full
    Show {
        id: i64,
    },

    /// Search names and bios (case-insensitive)
    Search {
        query: String,

        /// Category tag, or "all"
        #[arg(short, long, default_value = "all")]
        category: String,
    },

    /// Per-category counts
    Stats,

    /// Export the catalog
    Export {
        /// json or csv
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the catalog with a JSON file
    Import {
        path: PathBuf,
    },

    /// Cache management
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Start background sync and print events until Ctrl-C
    Watch,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache timestamp, size and expiry
    Info,
    /// Remove the cached catalog
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
}

/// Initialize the tracing subscriber for logging.
///
/// `-v` flags take precedence over RUST_LOG. The returned guard must stay
/// alive for the file writer to flush.
fn init_tracing(verbose: u8, log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            let name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

/// Effective config: file, then env, then command line flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(ref url) = cli.base_url {
        config.set_base_url(url);
    }
    if cli.offline {
        config.offline_mode = true;
    }
    Ok(config)
}

fn build_sync(cli: &Cli, config: &Config) -> Result<DataSync> {
    let cache_dir = match cli.cache_dir {
        Some(ref dir) => dir.clone(),
        None => config.cache_dir()?,
    };
    let cache = CacheManager::new(cache_dir)?;

    let remote = match config.remote_url() {
        Some(url) => {
            let client = ApiClient::with_timeout(url, config.request_timeout())?;
            info!(url = client.data_url(), "Using remote catalog");
            Some(Arc::new(client) as Arc<dyn RemoteSource>)
        }
        None => None,
    };

    Ok(DataSync::new(cache, remote, config.sync_options()))
}

/// Collect event names fired while a command runs.
fn record_events(sync: &DataSync) -> Arc<Mutex<Vec<SyncEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let _ = sync.add_listener(move |event| {
        if let Ok(mut events) = sink.lock() {
            events.push(event.clone());
        }
    });
    events
}

fn print_events(events: &Mutex<Vec<SyncEvent>>) {
    if let Ok(events) = events.lock() {
        for event in events.iter() {
            println!("{}", output::describe_event(event));
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose, cli.log_file.as_ref())?;
    info!("famelist starting");

    let config = load_config(&cli)?;

    if let Commands::Config {
        action: ConfigAction::Show,
    } = cli.command
    {
        println!("# {}", Config::config_path()?.display());
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let sync = build_sync(&cli, &config)?;
    if sync.is_restricted() {
        info!("No base URL configured or offline; using cache and demo data only");
    }

    match cli.command {
        Commands::Load { force } => {
            let events = record_events(&sync);
            let data = sync.load_data(force).await;
            print_events(&events);
            println!("Loaded {} records", data.len());
        }

        Commands::Sync => {
            let events = record_events(&sync);
            sync.sync_data().await;
            print_events(&events);
            let failed = events
                .lock()
                .map(|events| {
                    events
                        .iter()
                        .any(|e| matches!(e, SyncEvent::SyncFailed(_)))
                })
                .unwrap_or(false);
            if failed {
                bail!("Sync failed");
            }
        }

        Commands::List { ref category } => {
            sync.get_data().await;
            let filter: CategoryFilter = category.parse()?;
            output::print_people(&sync.search_data("", &filter));
        }

        Commands::Show { id } => {
            let data = sync.get_data().await;
            match data.iter().find(|p| p.id == id) {
                Some(person) => output::print_person(person),
                None => bail!("No record with id {}", id),
            }
        }

        Commands::Search {
            ref query,
            ref category,
        } => {
            sync.get_data().await;
            let filter: CategoryFilter = category.parse()?;
            output::print_people(&sync.search_data(query, &filter));
        }

        Commands::Stats => {
            sync.get_data().await;
            match sync.get_stats() {
                Some(stats) => output::print_stats(&stats),
                None => println!("No data"),
            }
        }

        Commands::Export {
            ref format,
            ref output,
        } => {
            sync.get_data().await;
            let Some(text) = sync.export_data(format)? else {
                bail!("No data to export");
            };
            match output {
                Some(path) => {
                    std::fs::write(path, &text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Exported to {}", path.display());
                }
                None => println!("{}", text),
            }
        }

        Commands::Import { ref path } => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let data = sync
                .import_data(&json)
                .with_context(|| format!("Rejected {}", path.display()))?;
            println!("Imported {} records", data.len());
        }

        Commands::Cache { ref action } => match action {
            CacheAction::Info => output::print_cache_info(&sync.get_cache_info()),
            CacheAction::Clear => {
                sync.clear_cache()?;
                println!("Cache cleared");
            }
        },

        Commands::Config { .. } => {}

        Commands::Watch => watch(&sync).await?,
    }

    info!("famelist shutting down");
    Ok(())
}

/// Print every sync event until Ctrl-C.
async fn watch(sync: &DataSync) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded::<SyncEvent>();
    let subscription = sync.add_listener(move |event| {
        // Receiver gone means we are shutting down
        let _ = tx.unbounded_send(event.clone());
    });

    sync.init().await;
    eprintln!("Watching for sync events, press Ctrl-C to stop");

    loop {
        tokio::select! {
            event = rx.next() => match event {
                Some(event) => println!("{}", output::timestamped(&event)),
                None => break,
            },
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    sync.shutdown();
    subscription.unsubscribe();
    Ok(())
}
