//! Session lifecycle decisions.
//!
//! Everything here is a pure function of the previous record, one set of
//! adapter readings and the options. [`transition`] produces the next record;
//! the caller owns persistence and notification.

use crate::campaign::{extract_campaign, Campaign};
use crate::config::SessionOptions;
use crate::location::Location;
use crate::record::{
    format_timestamp, merge_data, parse_timestamp, CurrentVisit, DataMode, HistoryEntry, Payload,
    SessionRecord,
};
use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use tracing::debug;

/// Adapter readings for one update
#[derive(Debug, Clone)]
pub struct Observation {
    /// Current instant in the configured zone
    pub now: DateTime<Tz>,
    pub location: Location,
    /// Whether a record is persisted under the configured key right now
    pub has_session: bool,
}

/// Result of one update
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub record: SessionRecord,
    pub new_session: bool,
    pub campaign_changed: bool,
}

/// Expiry timestamp for a visit issued at `now`
pub fn expiration(now: &DateTime<Tz>, duration: Duration) -> String {
    format_timestamp(&(*now + duration))
}

/// A visit lapses when its expiry is strictly in the past, or when `now`
/// falls on a different calendar day (in `now`'s zone) than the visit was
/// issued on. An unreadable expiry counts as lapsed.
pub fn is_expired(expires_at: &str, now: &DateTime<Tz>, duration: Duration) -> bool {
    let Some(expires_at) = parse_timestamp(expires_at) else {
        return true;
    };

    let issued_at = (expires_at - duration).with_timezone(&now.timezone());
    issued_at.date_naive() != now.date_naive() || expires_at < now.fixed_offset()
}

pub fn has_new_campaign(current: &Campaign, next: &Campaign) -> bool {
    current != next
}

pub fn is_new_session(has_session: bool, campaign_changed: bool, expired: bool) -> bool {
    !has_session || campaign_changed || expired
}

/// Keep the most recent `cap` entries; 0 means unbounded
pub fn trim_history(history: &mut Vec<HistoryEntry>, cap: usize) {
    if cap > 0 && history.len() > cap {
        let excess = history.len() - cap;
        history.drain(..excess);
    }
}

/// Compute the record that follows `previous` for this observation.
pub fn transition(
    previous: &SessionRecord,
    observation: &Observation,
    options: &SessionOptions,
    payload: Option<Payload>,
    mode: DataMode,
) -> Transition {
    let duration = options.idle_duration();
    let now = &observation.now;
    let href = observation.location.href();
    let referrer = &observation.location.referrer;
    let expires_at = expiration(now, duration);

    let campaign = extract_campaign(&observation.location.search, &previous.current.campaign);
    let campaign_changed = has_new_campaign(&previous.current.campaign, &campaign);
    let expired = is_expired(&previous.current.expires_at, now, duration);
    let new_session = is_new_session(observation.has_session, campaign_changed, expired);

    let mut record = SessionRecord {
        origin: previous.origin.clone(),
        current: CurrentVisit {
            expires_at: expires_at.clone(),
            ..previous.current.clone()
        },
        history: previous.history.clone(),
        visits: previous.visits,
        data: merge_data(previous.data.as_ref(), payload, mode),
    };

    if new_session {
        debug!(
            has_session = observation.has_session,
            campaign_changed, expired, "Starting new session"
        );
        record.current = CurrentVisit {
            campaign,
            expires_at,
            href: href.clone(),
            referrer: referrer.clone(),
        };
        record.visits += 1;
    }

    if campaign_changed {
        debug!("Campaign changed, recording history entry for {}", href);
        record.history.push(HistoryEntry {
            created_at: format_timestamp(now),
            href,
            referrer: referrer.clone(),
        });
        trim_history(&mut record.history, options.history_size);
    }

    Transition {
        record,
        new_session,
        campaign_changed,
    }
}
