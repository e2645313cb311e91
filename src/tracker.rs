//! Event tracker
//!
//! Events are counted in Redis hashes. A persisted event lives under
//! `insyte::<name>` forever; an ephemeral event lives under
//! `insyte::<name>::<dd/MM/yyyy>` and expires after the retention window.
//! Each hash field is the canonical JSON `{"event": ...}` and its value is the
//! number of times that exact event was tracked.

use futures::future::try_join_all;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::TrackerConfig;
use crate::date::{self, Clock, SystemClock};
use crate::error::TrackerResult;
use crate::event::{Event, EventEnvelope};
use crate::storage::CounterStore;

/// Prefix shared by every key the tracker writes
pub const KEY_PREFIX: &str = "insyte";

/// Key of a persisted counter hash
pub fn persisted_key(name: &str) -> String {
    format!("{KEY_PREFIX}::{name}")
}

/// Key of a single day's counter hash
pub fn ephemeral_key(name: &str, date: &str) -> String {
    format!("{KEY_PREFIX}::{name}::{date}")
}

/// Hash field an event is counted under
pub fn event_field(event: &Event) -> TrackerResult<String> {
    Ok(serde_json::to_string(&EventEnvelope { event })?)
}

/// One counted event: serialized event field and its count
///
/// Serializes as a single-key object, `{"<field>": count}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCount {
    pub field: String,
    pub count: i64,
}

impl Serialize for EventCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &self.count)?;
        map.end()
    }
}

/// Counts recorded for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrieveResult {
    pub date: String,
    /// Order follows the store's hash enumeration and is unspecified
    pub event: Vec<EventCount>,
}

/// Records and reads event counters
pub struct EventTracker<S> {
    store: S,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
}

impl<S: CounterStore> EventTracker<S> {
    /// Create a tracker with the default retention and the system clock
    pub fn new(store: S) -> Self {
        Self::with_config(store, TrackerConfig::default())
    }

    pub fn with_config(store: S, config: TrackerConfig) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    /// Replace the clock used to decide what "today" is
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn retention(&self) -> u64 {
        self.config.retention
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Count one occurrence of `event` under `name`
    ///
    /// Ephemeral events go to today's key and (re)set its TTL to the
    /// retention window. Persisted events never get a TTL.
    pub async fn track(&self, name: &str, event: &Event, persist: bool) -> TrackerResult<()> {
        let key = if persist {
            persisted_key(name)
        } else {
            ephemeral_key(name, &date::format_date(self.clock.today()))
        };

        let field = event_field(event).inspect_err(|e| {
            error!("Failed to serialize event for {}: {}", key, e);
        })?;

        debug!("Tracking event on {}", key);
        let count = self
            .store
            .hincr(&key, &field, 1)
            .await
            .inspect_err(|e| error!("Failed to track event on {}: {}", key, e))?;

        // After the increment, so a key created just now still gets its TTL
        if !persist {
            self.store
                .expire(&key, self.config.retention)
                .await
                .inspect_err(|e| error!("Failed to set expiry on {}: {}", key, e))?;
        }

        debug!("{} now at {} for field {}", key, count, field);
        Ok(())
    }

    /// Counts for `name` on `date` (`dd/MM/yyyy`)
    pub async fn retrieve(&self, name: &str, date: &str) -> TrackerResult<RetrieveResult> {
        let key = ephemeral_key(name, date);
        debug!("Retrieving {}", key);

        let fields = self
            .store
            .hgetall(&key)
            .await
            .inspect_err(|e| error!("Failed to retrieve {}: {}", key, e))?;

        Ok(RetrieveResult {
            date: date.to_string(),
            event: into_counts(fields),
        })
    }

    /// Counts for `name` over the last `n_days` days, today included,
    /// oldest first
    ///
    /// All days are fetched concurrently; the first failure fails the call.
    pub async fn retrieve_days(&self, name: &str, n_days: u32) -> TrackerResult<Vec<RetrieveResult>> {
        let today = self.clock.today();
        // The oldest day bounds the range; if it exists, every later one does
        if let Some(oldest) = n_days.checked_sub(1) {
            date::days_ago(today, oldest)
                .inspect_err(|e| error!("Cannot go back {} day(s) for {}: {}", n_days, name, e))?;
        }
        let dates = (0..n_days)
            .map(|offset| date::days_ago(today, offset).map(date::format_date))
            .collect::<TrackerResult<Vec<String>>>()?;

        debug!("Retrieving {} day(s) of {}", dates.len(), name);

        let mut results = try_join_all(dates.iter().map(|day| self.retrieve(name, day)))
            .await
            .inspect_err(|e| error!("Failed to retrieve {} day(s) of {}: {}", n_days, name, e))?;

        // Dates here were produced by format_date, so they always parse
        results.sort_by_cached_key(|result| date::parse_date(&result.date).ok());
        Ok(results)
    }

    /// Counts accumulated under the persisted key for `name`
    pub async fn retrieve_persisted(&self, name: &str) -> TrackerResult<Vec<EventCount>> {
        let key = persisted_key(name);
        debug!("Retrieving {}", key);

        let fields = self
            .store
            .hgetall(&key)
            .await
            .inspect_err(|e| error!("Failed to retrieve {}: {}", key, e))?;

        Ok(into_counts(fields))
    }
}

fn into_counts(fields: Vec<(String, i64)>) -> Vec<EventCount> {
    fields
        .into_iter()
        .map(|(field, count)| EventCount { field, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::FixedClock;
    use crate::storage::MemoryStore;
    use chrono::NaiveDate;

    fn new_year() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    fn tracker(store: &MemoryStore) -> EventTracker<MemoryStore> {
        EventTracker::new(store.clone()).with_clock(new_year())
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(persisted_key("page-view"), "insyte::page-view");
        assert_eq!(
            ephemeral_key("page-view", "01/01/2024"),
            "insyte::page-view::01/01/2024"
        );
    }

    #[test]
    fn test_event_field_is_enveloped_json() {
        let field = event_field(&Event::page("/")).unwrap();
        assert_eq!(field, r#"{"event":{"page":"/"}}"#);
    }

    #[test]
    fn test_event_count_serializes_as_single_key_object() {
        let result = RetrieveResult {
            date: "01/01/2024".to_string(),
            event: vec![EventCount {
                field: r#"{"event":{"page":"/"}}"#.to_string(),
                count: 2,
            }],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "date": "01/01/2024",
                "event": [{ "{\"event\":{\"page\":\"/\"}}": 2 }]
            })
        );
    }

    #[tokio::test]
    async fn test_track_twice_counts_two() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        let event = Event::page("/");

        tracker.track("page-view", &event, false).await.unwrap();
        tracker.track("page-view", &event, false).await.unwrap();

        let result = tracker.retrieve("page-view", "01/01/2024").await.unwrap();
        assert_eq!(result.date, "01/01/2024");
        assert_eq!(
            result.event,
            vec![EventCount {
                field: r#"{"event":{"page":"/"}}"#.to_string(),
                count: 2,
            }]
        );
    }

    #[tokio::test]
    async fn test_distinct_events_get_distinct_fields() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);

        tracker.track("page-view", &Event::page("/"), false).await.unwrap();
        tracker
            .track("page-view", &Event::page("/").with_country("NL"), false)
            .await
            .unwrap();

        let result = tracker.retrieve("page-view", "01/01/2024").await.unwrap();
        assert_eq!(result.event.len(), 2);
        assert!(result.event.iter().all(|entry| entry.count == 1));
    }

    #[tokio::test]
    async fn test_ephemeral_key_gets_default_retention() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);

        tracker.track("page-view", &Event::page("/"), false).await.unwrap();

        let ttl = store.ttl("insyte::page-view::01/01/2024").await.unwrap();
        assert_eq!(ttl, Some(604_800));
    }

    #[tokio::test]
    async fn test_custom_retention() {
        let store = MemoryStore::new();
        let config = TrackerConfig::with_retention(120).unwrap();
        let tracker = EventTracker::with_config(store.clone(), config)
            .with_clock(new_year());

        tracker.track("signup", &Event::page("/join"), false).await.unwrap();

        assert_eq!(tracker.retention(), 120);
        assert_eq!(store.ttl("insyte::signup::01/01/2024").await.unwrap(), Some(120));
    }

    #[tokio::test]
    async fn test_persisted_key_has_no_ttl() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        let event = Event::page("/");

        for _ in 0..3 {
            tracker.track("page-view", &event, true).await.unwrap();
        }

        assert_eq!(store.ttl("insyte::page-view").await.unwrap(), None);
        assert_eq!(store.keys().await, vec!["insyte::page-view".to_string()]);

        let totals = tracker.retrieve_persisted("page-view").await.unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].count, 3);
    }

    #[tokio::test]
    async fn test_retrieve_unknown_day_is_empty() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);

        let result = tracker.retrieve("page-view", "15/06/2023").await.unwrap();
        assert_eq!(result.date, "15/06/2023");
        assert!(result.event.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_days_oldest_first() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);

        store
            .hincr("insyte::page-view::31/12/2023", r#"{"event":{"page":"/"}}"#, 4)
            .await
            .unwrap();
        tracker.track("page-view", &Event::page("/"), false).await.unwrap();

        let results = tracker.retrieve_days("page-view", 3).await.unwrap();
        let dates: Vec<&str> = results.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["30/12/2023", "31/12/2023", "01/01/2024"]);

        assert!(results[0].event.is_empty());
        assert_eq!(results[1].event[0].count, 4);
        assert_eq!(results[2].event[0].count, 1);
    }

    #[tokio::test]
    async fn test_retrieve_days_past_calendar_start_fails() {
        let store = MemoryStore::new();
        let tracker = EventTracker::new(store.clone())
            .with_clock(FixedClock(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));

        let err = tracker.retrieve_days("page-view", u32::MAX).await.unwrap_err();
        assert!(matches!(err, crate::error::TrackerError::InvalidDate(_)));

        let early = EventTracker::new(store).with_clock(FixedClock(NaiveDate::MIN));
        assert!(early.retrieve_days("page-view", 2).await.is_err());
    }

    #[tokio::test]
    async fn test_retrieve_zero_days() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        assert!(tracker.retrieve_days("page-view", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MemoryStore::new();
        let tracker = tracker(&store);
        store.fail_with("ERR auth failed").await;

        let err = tracker
            .track("page-view", &Event::page("/"), false)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Store error: ERR auth failed");

        assert!(tracker.retrieve("page-view", "01/01/2024").await.is_err());
        assert!(tracker.retrieve_days("page-view", 2).await.is_err());
        assert!(tracker.retrieve_persisted("page-view").await.is_err());
    }
}
