//! Current-page locator.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use url::Url;

/// Base that relative hrefs are resolved against
const RELATIVE_BASE: &str = "http://localhost/";

/// Where the visitor currently is, browser style: `search` keeps its leading
/// `?` and `hash` its leading `#`, both empty when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
    pub referrer: String,
}

impl Location {
    /// Split an absolute or root-relative URL into its path, query and fragment.
    ///
    /// Scheme and host are dropped. Relative hrefs resolve against the site
    /// root. The query text is kept as it appears, without decoding.
    pub fn parse(href: &str) -> Result<Self> {
        let url = match Url::parse(href) {
            Ok(url) => url,
            Err(_) => Url::parse(RELATIVE_BASE)?.join(href)?,
        };

        let search = match url.query() {
            Some(query) if !query.is_empty() => format!("?{}", query),
            _ => String::new(),
        };
        let hash = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => format!("#{}", fragment),
            _ => String::new(),
        };

        Ok(Self {
            pathname: url.path().to_string(),
            search,
            hash,
            referrer: String::new(),
        })
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = referrer.into();
        self
    }

    /// Path, query and fragment as one string
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }
}

pub trait Locator: Send + Sync {
    fn location(&self) -> Location;
}

/// A locator that changes page only on [`ManualLocator::navigate`].
#[derive(Debug, Default)]
pub struct ManualLocator {
    current: RwLock<Location>,
}

impl ManualLocator {
    pub fn new(location: Location) -> Self {
        Self {
            current: RwLock::new(location),
        }
    }

    pub fn navigate(&self, location: Location) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = location;
    }
}

impl Locator for ManualLocator {
    fn location(&self) -> Location {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
