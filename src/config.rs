//! Operating parameters for a [`WebSession`](crate::WebSession).
//!
//! Options can be built in code with the `with_*` methods or read from a
//! TOML file. The notification callback is code-only.

use crate::record::SessionRecord;
use crate::{Result, WebSessionError};
use chrono::Duration;
use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Default idle timeout in minutes
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Default cap on campaign history entries
pub const DEFAULT_HISTORY_SIZE: usize = 50;

/// Default persistence key
pub const DEFAULT_STORAGE_NAME: &str = "WebSessionData";

/// Hook invoked with the resulting record after every update
pub type SessionCallback = Arc<dyn Fn(&SessionRecord) + Send + Sync>;

#[derive(Clone)]
pub struct SessionOptions {
    /// Idle timeout in minutes
    pub duration: u32,

    /// Maximum number of history entries kept (0 = unbounded)
    pub history_size: usize,

    /// Key the record is persisted under
    pub name: String,

    /// Zone used for timestamps and calendar-day rollover
    pub timezone: Tz,

    callback: Option<SessionCallback>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION_MINUTES,
            history_size: DEFAULT_HISTORY_SIZE,
            name: DEFAULT_STORAGE_NAME.to_string(),
            timezone: Tz::UTC,
            callback: None,
        }
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("duration", &self.duration)
            .field("history_size", &self.history_size)
            .field("name", &self.name)
            .field("timezone", &self.timezone)
            .field("callback", &self.callback.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// On-disk shape. Accepts both snake_case and the camelCase option names.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct OptionsFile {
    duration: Option<u32>,
    #[serde(alias = "historySize")]
    history_size: Option<usize>,
    name: Option<String>,
    timezone: Option<String>,
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: OptionsFile = toml::from_str(content)?;
        let mut options = Self::default();

        if let Some(duration) = file.duration {
            options.duration = duration;
        }
        if let Some(history_size) = file.history_size {
            options.history_size = history_size;
        }
        if let Some(name) = file.name {
            options = options.with_name(name)?;
        }
        if let Some(timezone) = file.timezone {
            options = options.with_timezone(&timezone)?;
        }

        Ok(options)
    }

    /// Load options from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration = minutes;
        self
    }

    pub fn with_history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(WebSessionError::Config(
                "storage name must not be empty".to_string(),
            ));
        }
        self.name = name;
        Ok(self)
    }

    /// Set the zone from an IANA name such as `America/New_York`
    pub fn with_timezone(mut self, zone: &str) -> Result<Self> {
        self.timezone = zone
            .parse::<Tz>()
            .map_err(|_| WebSessionError::InvalidTimezone(zone.to_string()))?;
        Ok(self)
    }

    pub fn with_tz(mut self, zone: Tz) -> Self {
        self.timezone = zone;
        self
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SessionRecord) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Overlay another set of options; the callback is kept unless `other` sets one.
    pub fn merge(mut self, other: SessionOptions) -> Self {
        let callback = other.callback.or(self.callback.take());
        Self { callback, ..other }
    }

    /// Idle timeout as a chrono duration
    pub fn idle_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration))
    }

    /// Invoke the notification hook, if any
    pub fn notify(&self, record: &SessionRecord) {
        if let Some(callback) = &self.callback {
            callback(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SessionOptions::default();
        assert_eq!(options.duration, 30);
        assert_eq!(options.history_size, 50);
        assert_eq!(options.name, "WebSessionData");
        assert_eq!(options.timezone, Tz::UTC);
        assert_eq!(options.idle_duration(), Duration::minutes(30));
    }

    #[test]
    fn test_from_toml_str() {
        let options = SessionOptions::from_toml_str(
            r#"
            duration = 60
            historySize = 2
            name = "Tracking"
            timezone = "America/New_York"
            "#,
        )
        .unwrap();

        assert_eq!(options.duration, 60);
        assert_eq!(options.history_size, 2);
        assert_eq!(options.name, "Tracking");
        assert_eq!(options.timezone, chrono_tz::America::New_York);
    }

    #[test]
    fn test_from_toml_snake_case_and_defaults() {
        let options = SessionOptions::from_toml_str("history_size = 0").unwrap();
        assert_eq!(options.history_size, 0);
        assert_eq!(options.duration, 30);
        assert_eq!(options.name, "WebSessionData");
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let err = SessionOptions::new().with_timezone("Mars/Olympus").unwrap_err();
        assert!(matches!(err, WebSessionError::InvalidTimezone(ref z) if z == "Mars/Olympus"));

        let err = SessionOptions::from_toml_str(r#"timezone = "Nowhere""#).unwrap_err();
        assert!(matches!(err, WebSessionError::InvalidTimezone(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = SessionOptions::from_toml_str("colour = 1").unwrap_err();
        assert!(matches!(err, WebSessionError::Toml(_)));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(SessionOptions::new().with_name("  ").is_err());
    }

    #[test]
    fn test_merge_keeps_callback() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let base = SessionOptions::new().with_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let merged = base.merge(SessionOptions::new().with_duration(5));
        assert_eq!(merged.duration, 5);
        assert!(merged.callback.is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
