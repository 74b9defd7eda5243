//! Websession CLI
//!
//! Simulates page views against a file-backed session store.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use websession::{
    Clock, DataMode, FileStore, Location, ManualClock, ManualLocator, Payload, SessionOptions,
    SessionStorage, SystemClock, WebSession,
};

/// Websession - track visits and campaign attribution
#[derive(Parser, Debug)]
#[command(name = "websession")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the persisted session records
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// TOML file with session options
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage key of the session record
    #[arg(long, global = true)]
    name: Option<String>,

    /// Idle timeout in minutes
    #[arg(long, global = true)]
    duration: Option<u32>,

    /// Maximum campaign history entries (0 = unbounded)
    #[arg(long, global = true)]
    history_size: Option<usize>,

    /// IANA timezone, e.g. America/New_York
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Verbose output: debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a page view and print the resulting session
    Visit {
        /// Page URL, absolute or root-relative
        href: String,

        /// Referrer of the page view
        #[arg(long, default_value = "")]
        referrer: String,

        /// Time of the page view (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,

        /// JSON object to store on the session
        #[arg(long)]
        data: Option<String>,

        /// Replace the stored data instead of merging into it
        #[arg(long)]
        replace: bool,
    },

    /// Print the stored session
    Show,

    /// Remove the stored session
    Reset,

    /// List the session keys held in the store directory
    List,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = resolve_options(&cli)?;
    let store_dir = match &cli.store_dir {
        Some(dir) => dir.clone(),
        None => default_store_dir()?,
    };
    debug!("Store directory: {:?}", store_dir);
    let store = Arc::new(FileStore::new(store_dir));

    match cli.command {
        Command::Visit {
            href,
            referrer,
            at,
            data,
            replace,
        } => {
            let clock: Arc<dyn Clock> = match at {
                Some(at) => {
                    let at = DateTime::parse_from_rfc3339(&at)
                        .with_context(|| format!("invalid --at timestamp: {}", at))?;
                    Arc::new(ManualClock::new(at.with_timezone(&Utc)))
                }
                None => Arc::new(SystemClock),
            };
            let locator = Arc::new(ManualLocator::new(
                Location::parse(&href)
                    .with_context(|| format!("invalid page URL: {}", href))?
                    .with_referrer(referrer),
            ));

            let mut session = WebSession::new(options, clock, locator, store);
            let payload = data.as_deref().map(parse_payload).transpose()?;
            if payload.is_some() || replace {
                let mode = if replace { DataMode::Replace } else { DataMode::Merge };
                session.update(payload, mode);
            }

            print_json(session.session())?;
        }
        Command::Show => {
            let storage = SessionStorage::new(store);
            print_json(storage.load(&options.name).as_ref())?;
        }
        Command::Reset => {
            let storage = SessionStorage::new(store);
            storage.remove(&options.name);
            info!("Removed session '{}'", options.name);
        }
        Command::List => {
            for name in stored_names(&store)? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

/// Config file first, then command-line overrides
fn resolve_options(cli: &Cli) -> anyhow::Result<SessionOptions> {
    let mut options = match &cli.config {
        Some(path) => SessionOptions::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SessionOptions::default(),
    };

    if let Some(name) = &cli.name {
        options = options.with_name(name.as_str())?;
    }
    if let Some(duration) = cli.duration {
        options = options.with_duration(duration);
    }
    if let Some(history_size) = cli.history_size {
        options = options.with_history_size(history_size);
    }
    if let Some(timezone) = &cli.timezone {
        options = options.with_timezone(timezone)?;
    }

    Ok(options)
}

/// Get the default store directory
fn default_store_dir() -> anyhow::Result<PathBuf> {
    // Check WEBSESSION_HOME env var
    if let Ok(home) = std::env::var("WEBSESSION_HOME") {
        return Ok(PathBuf::from(home));
    }

    let data = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
    Ok(data.join("websession"))
}

fn stored_names(store: &FileStore) -> anyhow::Result<Vec<String>> {
    store
        .names()
        .with_context(|| format!("failed to read store directory {}", store.dir().display()))
}

fn parse_payload(raw: &str) -> anyhow::Result<Payload> {
    match serde_json::from_str::<Value>(raw).context("--data must be valid JSON")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--data must be a JSON object, got {}", other),
    }
}

fn print_json<T: serde::Serialize>(value: Option<&T>) -> anyhow::Result<()> {
    let rendered = match value {
        Some(value) => serde_json::to_string_pretty(value)?,
        None => "{}".to_string(),
    };
    println!("{}", rendered);
    Ok(())
}
