//! Websession - visitor session tracking
//!
//! Decides, on every page view, whether the visitor is still in the same
//! visit, whether they arrived through a new marketing campaign, and keeps a
//! bounded history of campaign-driven visits:
//! - Idle timeout and calendar-day rollover expire a visit
//! - `utm_*` and `gclid*` query parameters drive campaign attribution
//! - One JSON record per storage key survives page loads

pub mod campaign;
pub mod clock;
pub mod config;
pub mod engine;
pub mod location;
pub mod record;
pub mod session;
pub mod storage;

pub use campaign::{extract_campaign, parse_query, Campaign};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{SessionCallback, SessionOptions};
pub use engine::{transition, Observation, Transition};
pub use location::{Location, Locator, ManualLocator};
pub use record::{CurrentVisit, DataMode, HistoryEntry, Origin, Payload, SessionRecord};
pub use session::WebSession;
pub use storage::{FileStore, MemoryStore, SessionStorage, Store};

/// Result type for Websession operations
pub type Result<T> = std::result::Result<T, WebSessionError>;

/// Errors that can occur in Websession
#[derive(Debug, thiserror::Error)]
pub enum WebSessionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("Storage error for '{name}': {message}")]
    Storage { name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl WebSessionError {
    pub fn storage(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            name: name.into(),
            message: message.into(),
        }
    }
}
