//! The page-lifetime session object.
//!
//! A [`WebSession`] is created once per page load. Construction loads the
//! persisted record (or starts a fresh one) and immediately runs one update,
//! so the stored record always reflects the latest page view.

use crate::clock::Clock;
use crate::campaign::{extract_campaign, Campaign};
use crate::config::SessionOptions;
use crate::engine::{expiration, transition, Observation};
use crate::location::Locator;
use crate::record::{DataMode, Payload, SessionRecord};
use crate::storage::{SessionStorage, Store};
use chrono::DateTime;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info};

pub struct WebSession {
    options: SessionOptions,
    clock: Arc<dyn Clock>,
    locator: Arc<dyn Locator>,
    storage: SessionStorage,
    record: SessionRecord,
}

impl WebSession {
    pub fn new(
        options: SessionOptions,
        clock: Arc<dyn Clock>,
        locator: Arc<dyn Locator>,
        store: Arc<dyn Store>,
    ) -> Self {
        let storage = SessionStorage::new(store);
        let mut session = Self {
            record: Self::load_record(&options, clock.as_ref(), locator.as_ref(), &storage),
            options,
            clock,
            locator,
            storage,
        };
        session.touch();
        session
    }

    /// Re-evaluate the session against the current clock and location.
    ///
    /// `payload` is merged into or replaces the record's `data` per `mode`.
    /// The result is persisted, passed to the callback and kept in memory.
    pub fn update(&mut self, payload: Option<Payload>, mode: DataMode) -> &SessionRecord {
        let observation = Observation {
            now: self.now(),
            location: self.locator.location(),
            has_session: self.storage.exists(&self.options.name),
        };

        let next = transition(&self.record, &observation, &self.options, payload, mode);
        if next.new_session {
            info!(
                visits = next.record.visits,
                "New session for {}",
                next.record.current.href
            );
        }

        self.storage.save(&self.options.name, &next.record);
        self.options.notify(&next.record);
        self.record = next.record;
        &self.record
    }

    /// Update without touching `data`
    pub fn touch(&mut self) -> &SessionRecord {
        self.update(None, DataMode::Merge)
    }

    /// The current record, or `None` when storage is unavailable
    pub fn session(&self) -> Option<&SessionRecord> {
        self.storage.is_supported().then_some(&self.record)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Whether records survive past this instance
    pub fn is_persistent(&self) -> bool {
        self.storage.is_supported()
    }

    /// Switch to new options, reload the record from storage and run an
    /// update. The existing callback is kept unless `options` carries one.
    pub fn reconfigure(&mut self, options: SessionOptions) -> &SessionRecord {
        let current = std::mem::take(&mut self.options);
        self.options = current.merge(options);
        self.record = Self::load_record(
            &self.options,
            self.clock.as_ref(),
            self.locator.as_ref(),
            &self.storage,
        );
        self.touch()
    }

    /// Remove the persisted record. The in-memory record is left as is; the
    /// next update starts a new session.
    pub fn clear(&mut self) {
        debug!("Removing session record '{}'", self.options.name);
        self.storage.remove(&self.options.name);
    }

    fn now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.options.timezone)
    }

    fn load_record(
        options: &SessionOptions,
        clock: &dyn Clock,
        locator: &dyn Locator,
        storage: &SessionStorage,
    ) -> SessionRecord {
        if let Some(record) = storage.load(&options.name) {
            debug!("Loaded session record '{}'", options.name);
            return record;
        }

        let now = clock.now().with_timezone(&options.timezone);
        let location = locator.location();
        let campaign = extract_campaign(&location.search, &Campaign::new());
        SessionRecord::initial(
            &now,
            &location,
            campaign,
            expiration(&now, options.idle_duration()),
        )
    }
}

impl std::fmt::Debug for WebSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSession")
            .field("options", &self.options)
            .field("storage", &self.storage)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::location::{Location, ManualLocator};
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone, Utc};

    fn fixture() -> (Arc<ManualClock>, Arc<ManualLocator>, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2020, 3, 1, 9, 0, 0).unwrap(),
        ));
        let locator = Arc::new(ManualLocator::new(Location::parse("/").unwrap()));
        (clock, locator, Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_second_page_load_resumes_record() {
        let (clock, locator, store) = fixture();
        let first = WebSession::new(
            SessionOptions::default(),
            clock.clone(),
            locator.clone(),
            store.clone(),
        );
        let origin = first.session().unwrap().origin.clone();

        clock.advance(Duration::minutes(3));
        locator.navigate(Location::parse("/next").unwrap());
        let second = WebSession::new(SessionOptions::default(), clock, locator, store);

        let record = second.session().unwrap();
        assert_eq!(record.visits, 1);
        assert_eq!(record.origin, origin);
        assert_eq!(record.current.expires_at, "2020-03-01T09:33:00.000Z");
    }

    #[test]
    fn test_clear_starts_new_session() {
        let (clock, locator, store) = fixture();
        let mut session = WebSession::new(SessionOptions::default(), clock, locator, store.clone());

        session.clear();
        assert!(store.is_empty());

        assert_eq!(session.touch().visits, 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reconfigure_switches_key() {
        let (clock, locator, store) = fixture();
        let mut session = WebSession::new(SessionOptions::default(), clock, locator, store.clone());
        assert_eq!(session.session().unwrap().visits, 1);

        let record = session.reconfigure(SessionOptions::default().with_name("Other").unwrap());
        assert_eq!(record.visits, 1);
        assert_eq!(session.options().name, "Other");
        assert_eq!(store.len(), 2);
    }
}
