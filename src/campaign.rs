//! Campaign attribution from query strings.
//!
//! `utm_*` parameters are recorded with the prefix stripped, `gclid*`
//! parameters verbatim. Values are taken literally: no percent-decoding, and
//! duplicate keys resolve to the last occurrence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const UTM_PREFIX: &str = "utm_";
const GCLID_PREFIX: &str = "gclid";

/// Attribution parameters in effect for a visit.
///
/// Backed by an ordered map, so equality is structural and independent of
/// the order parameters appeared in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Campaign(BTreeMap<String, String>);

impl Campaign {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Campaign {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Split a `?a=1&b=2` query string into raw key/value pairs.
///
/// The leading character is dropped unconditionally. A segment without `=`
/// has no value; anything after a second `=` is discarded.
pub fn parse_query(search: &str) -> Vec<(String, Option<String>)> {
    let mut chars = search.chars();
    chars.next();

    chars
        .as_str()
        .split('&')
        .map(|segment| {
            let mut parts = segment.split('=');
            let key = parts.next().unwrap_or_default().to_string();
            let value = parts.next().map(str::to_string);
            (key, value)
        })
        .collect()
}

/// Campaign in effect for the page whose query string is `search`.
///
/// Falls back to `previous` when the query carries no tracking parameters,
/// so plain navigation keeps the current attribution.
pub fn extract_campaign(search: &str, previous: &Campaign) -> Campaign {
    if search.is_empty() {
        return previous.clone();
    }

    let mut next = Campaign::new();
    for (key, value) in parse_query(search) {
        let Some(value) = value else {
            continue;
        };

        if let Some(stripped) = key.strip_prefix(UTM_PREFIX) {
            next.insert(stripped, value);
        } else if key.starts_with(GCLID_PREFIX) {
            next.insert(key, value);
        }
    }

    if next.is_empty() {
        previous.clone()
    } else {
        next
    }
}
