//! Persisted session record.
//!
//! The JSON shape is part of the storage contract: camelCase keys, ISO-8601
//! timestamps with milliseconds. `data` is absent only on a record that has
//! not been through an update yet, or after a replace with no payload.

use crate::campaign::Campaign;
use crate::location::Location;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary caller data carried on the record
pub type Payload = Map<String, Value>;

/// How the session started. Written once, never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    pub created_at: String,
    pub href: String,
    pub referrer: String,
}

/// One campaign-driven visit
pub type HistoryEntry = Origin;

/// The visit in effect right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentVisit {
    pub campaign: Campaign,
    pub expires_at: String,
    pub href: String,
    pub referrer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub origin: Origin,
    pub current: CurrentVisit,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub visits: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
}

impl SessionRecord {
    /// Record for a visitor with nothing persisted yet. `visits` starts at 0;
    /// the first update turns it into the first session.
    pub fn initial(
        now: &DateTime<Tz>,
        location: &Location,
        campaign: Campaign,
        expires_at: String,
    ) -> Self {
        let href = location.href();
        Self {
            origin: Origin {
                created_at: format_timestamp(now),
                href: href.clone(),
                referrer: location.referrer.clone(),
            },
            current: CurrentVisit {
                campaign,
                expires_at,
                href,
                referrer: location.referrer.clone(),
            },
            history: Vec::new(),
            visits: 0,
            data: None,
        }
    }
}

/// Whether an update payload is merged into `data` or replaces it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataMode {
    #[default]
    Merge,
    Replace,
}

/// Combine the previous `data` with an update payload.
///
/// Merge overwrites keys shallowly; replace makes the payload the whole of
/// `data`. A merge always yields an object, empty if there was nothing to
/// merge; a replace without payload clears `data`.
pub fn merge_data(previous: Option<&Payload>, payload: Option<Payload>, mode: DataMode) -> Option<Payload> {
    match mode {
        DataMode::Replace => payload,
        DataMode::Merge => match (previous, payload) {
            (prev, None) => Some(prev.cloned().unwrap_or_default()),
            (None, Some(next)) => Some(next),
            (Some(prev), Some(next)) => {
                let mut merged = prev.clone();
                merged.extend(next);
                Some(merged)
            }
        },
    }
}

/// ISO-8601 with milliseconds. UTC renders as `Z`, any other zone as an offset.
pub fn format_timestamp(at: &DateTime<Tz>) -> String {
    let use_z = at.timezone() == Tz::UTC;
    at.fixed_offset()
        .to_rfc3339_opts(SecondsFormat::Millis, use_z)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(tz: Tz, h: u32, m: u32) -> DateTime<Tz> {
        chrono::Utc
            .with_ymd_and_hms(1999, 12, 31, h, m, 0)
            .unwrap()
            .with_timezone(&tz)
    }

    #[test]
    fn test_format_timestamp_utc() {
        assert_eq!(format_timestamp(&at(Tz::UTC, 23, 45)), "1999-12-31T23:45:00.000Z");
    }

    #[test]
    fn test_format_timestamp_zone_offset() {
        assert_eq!(
            format_timestamp(&at(chrono_tz::America::New_York, 23, 45)),
            "1999-12-31T18:45:00.000-05:00"
        );
        // Zero offset outside UTC still carries an explicit offset
        assert_eq!(
            format_timestamp(&at(chrono_tz::Europe::London, 23, 45)),
            "1999-12-31T23:45:00.000+00:00"
        );
    }

    #[test]
    fn test_parse_timestamp() {
        let parsed = parse_timestamp("1999-12-31T18:45:00.000-05:00").unwrap();
        assert_eq!(parsed, at(Tz::UTC, 23, 45));
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_initial_record_json_shape() {
        let now = at(Tz::UTC, 23, 15);
        let record = SessionRecord::initial(
            &now,
            &Location::parse("/").unwrap(),
            Campaign::new(),
            "1999-12-31T23:45:00.000Z".to_string(),
        );

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "origin": { "createdAt": "1999-12-31T23:15:00.000Z", "href": "/", "referrer": "" },
                "current": {
                    "campaign": {},
                    "expiresAt": "1999-12-31T23:45:00.000Z",
                    "href": "/",
                    "referrer": ""
                },
                "history": [],
                "visits": 0
            })
        );
    }

    #[test]
    fn test_merge_data() {
        let a: Payload = json!({ "a": 1 }).as_object().unwrap().clone();
        let b: Payload = json!({ "b": 2, "a": 3 }).as_object().unwrap().clone();

        let merged = merge_data(Some(&a), Some(b.clone()), DataMode::Merge).unwrap();
        assert_eq!(Value::Object(merged), json!({ "a": 3, "b": 2 }));

        assert_eq!(merge_data(Some(&a), None, DataMode::Merge), Some(a.clone()));
        assert_eq!(merge_data(None, None, DataMode::Merge), Some(Payload::new()));
        assert_eq!(merge_data(Some(&a), Some(Payload::new()), DataMode::Replace), Some(Payload::new()));
        assert_eq!(merge_data(Some(&a), None, DataMode::Replace), None);
    }
}
