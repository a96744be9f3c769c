use std::collections::HashMap;
use std::sync::Arc;

use calendar_core::{Event, EventDate, UserId};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::StoreError;

/// In-memory event store partitioned by user.
///
/// One `parking_lot::RwLock` guards every partition: mutations hold the
/// write lock for their whole scan-and-mutate, reads share the read lock.
/// Cloning is cheap and every clone sees the same events.
#[derive(Clone, Default)]
pub struct EventStore {
    partitions: Arc<RwLock<HashMap<UserId, Vec<Event>>>>,
}

/// Totals across all partitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub users: usize,
    pub events: usize,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to its user's partition. Duplicates are allowed.
    #[instrument(skip_all, fields(user_id = %event.user_id, date = %event.date))]
    pub fn create(&self, event: Event) {
        let mut partitions = self.partitions.write();
        partitions.entry(event.user_id).or_default().push(event);
        debug!("event created");
    }

    /// Replace title and text of the first event on exactly `date`.
    #[instrument(skip(self, title, text), fields(user_id = %user_id, date = %date))]
    pub fn update(
        &self,
        user_id: UserId,
        date: EventDate,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write();
        let event = partitions
            .get_mut(&user_id)
            .and_then(|events| events.iter_mut().find(|e| e.date == date))
            .ok_or(StoreError::NotFound { user_id, date })?;

        event.title = title.into();
        event.text = text.into();
        debug!("event updated");
        Ok(())
    }

    /// Remove the first event on exactly `date`, keeping the order of the rest.
    #[instrument(skip(self), fields(user_id = %user_id, date = %date))]
    pub fn delete(&self, user_id: UserId, date: EventDate) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write();
        let events = partitions
            .get_mut(&user_id)
            .ok_or(StoreError::NotFound { user_id, date })?;
        let pos = events
            .iter()
            .position(|e| e.date == date)
            .ok_or(StoreError::NotFound { user_id, date })?;

        events.remove(pos);
        debug!("event deleted");
        Ok(())
    }

    /// Events with `start <= date <= end`, in insertion order.
    ///
    /// Unknown users yield an empty vector.
    #[instrument(skip(self), fields(user_id = %user_id, start = %start, end = %end))]
    pub fn query_range(&self, user_id: UserId, start: EventDate, end: EventDate) -> Vec<Event> {
        let partitions = self.partitions.read();
        partitions
            .get(&user_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.within(&start, &end))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of events held for a user.
    pub fn count(&self, user_id: UserId) -> usize {
        self.partitions.read().get(&user_id).map_or(0, Vec::len)
    }

    pub fn stats(&self) -> StoreStats {
        let partitions = self.partitions.read();
        StoreStats {
            users: partitions.len(),
            events: partitions.values().map(Vec::len).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::thread;

    fn day(d: u32) -> EventDate {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn uid(raw: i64) -> UserId {
        UserId::new(raw)
    }

    fn titles(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.title.as_str()).collect()
    }

    #[test]
    fn create_appends_to_partition() {
        let store = EventStore::new();
        let event = Event::new(1, day(10), "Test Event", "Test Description");
        store.create(event.clone());

        assert_eq!(store.count(uid(1)), 1);
        assert_eq!(store.query_range(uid(1), day(10), day(10)), vec![event]);
    }

    #[test]
    fn create_accumulates_duplicates() {
        let store = EventStore::new();
        for i in 0..5 {
            store.create(Event::new(1, day(10), format!("dup {i}"), "same day"));
        }
        assert_eq!(store.count(uid(1)), 5);
    }

    #[test]
    fn unknown_user_is_empty() {
        let store = EventStore::new();
        assert_eq!(store.count(uid(3)), 0);
        assert!(store.query_range(uid(3), day(1), day(31)).is_empty());
    }

    #[test]
    fn update_replaces_title_and_text_only() {
        let store = EventStore::new();
        store.create(Event::new(1, day(10), "Initial Title", "Initial Text"));
        store.create(Event::new(1, day(11), "Other", "untouched"));

        store
            .update(uid(1), day(10), "Updated Title", "Updated Text")
            .unwrap();

        let events = store.query_range(uid(1), day(1), day(31));
        assert_eq!(events[0].title, "Updated Title");
        assert_eq!(events[0].text, "Updated Text");
        assert_eq!(events[0].user_id, uid(1));
        assert_eq!(events[0].date, day(10));
        assert_eq!(events[1], Event::new(1, day(11), "Other", "untouched"));
    }

    #[test]
    fn update_only_first_duplicate() {
        let store = EventStore::new();
        store.create(Event::new(1, day(10), "first", "a"));
        store.create(Event::new(1, day(10), "second", "b"));

        store.update(uid(1), day(10), "changed", "c").unwrap();

        let events = store.query_range(uid(1), day(10), day(10));
        assert_eq!(titles(&events), vec!["changed", "second"]);
    }

    #[test]
    fn update_missing_is_not_found() {
        let store = EventStore::new();
        store.create(Event::new(1, day(10), "Title", "Text"));

        let err = store.update(uid(1), day(11), "Title", "Text").unwrap_err();
        assert_eq!(err, StoreError::NotFound { user_id: uid(1), date: day(11) });
        assert_eq!(err.to_string(), "event not found");

        let err = store.update(uid(2), day(10), "Title", "Text").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        assert_eq!(
            store.query_range(uid(1), day(10), day(10)),
            vec![Event::new(1, day(10), "Title", "Text")]
        );
    }

    #[test]
    fn update_matches_exact_instant() {
        let store = EventStore::new();
        store.create(Event::new(1, day(10), "midnight", "a"));

        let later_same_day = day(10) + Duration::hours(9);
        assert!(store.update(uid(1), later_same_day, "x", "y").is_err());
    }

    #[test]
    fn delete_removes_event() {
        let store = EventStore::new();
        store.create(Event::new(1, day(10), "Test Event", "Test Description"));

        store.delete(uid(1), day(10)).unwrap();
        assert_eq!(store.count(uid(1)), 0);

        let err = store.delete(uid(1), day(10)).unwrap_err();
        assert_eq!(err.to_string(), "event not found");
    }

    #[test]
    fn delete_removes_exactly_one_duplicate() {
        let store = EventStore::new();
        store.create(Event::new(1, day(10), "first", "a"));
        store.create(Event::new(1, day(10), "second", "b"));
        store.create(Event::new(1, day(10), "third", "c"));

        store.delete(uid(1), day(10)).unwrap();

        let events = store.query_range(uid(1), day(10), day(10));
        assert_eq!(titles(&events), vec!["second", "third"]);
    }

    #[test]
    fn delete_preserves_order_of_remaining() {
        let store = EventStore::new();
        store.create(Event::new(1, day(12), "c", ""));
        store.create(Event::new(1, day(10), "a", ""));
        store.create(Event::new(1, day(11), "b", ""));

        store.delete(uid(1), day(10)).unwrap();

        let events = store.query_range(uid(1), day(1), day(31));
        assert_eq!(titles(&events), vec!["c", "b"]);
    }

    #[test]
    fn delete_missing_leaves_store_unchanged() {
        let store = EventStore::new();
        store.create(Event::new(1, day(10), "keep", ""));

        assert!(store.delete(uid(1), day(11)).is_err());
        assert!(store.delete(uid(9), day(10)).is_err());
        assert_eq!(store.count(uid(1)), 1);
    }

    #[test]
    fn query_range_cases() {
        let store = EventStore::new();
        let today = day(10);
        let tomorrow = day(11);
        let next_week = day(17);

        store.create(Event::new(1, today, "Today 1", "Event today"));
        store.create(Event::new(1, today, "Today 2", "Another event today"));
        store.create(Event::new(1, tomorrow, "Tomorrow", "Event tomorrow"));
        store.create(Event::new(1, next_week, "Next Week", "Event next week"));
        store.create(Event::new(2, today, "User 2 Event", "Different user"));

        let cases: Vec<(&str, i64, EventDate, EventDate, Vec<&str>)> = vec![
            ("single day", 1, today, today, vec!["Today 1", "Today 2"]),
            ("two days", 1, today, tomorrow, vec!["Today 1", "Today 2", "Tomorrow"]),
            (
                "week range",
                1,
                today,
                next_week,
                vec!["Today 1", "Today 2", "Tomorrow", "Next Week"],
            ),
            ("excludes earlier", 1, tomorrow, next_week, vec!["Tomorrow", "Next Week"]),
            ("excludes later", 1, day(1), day(9), vec![]),
            ("different user", 2, today, today, vec!["User 2 Event"]),
            ("no events", 3, today, today, vec![]),
        ];

        for (name, user, start, end, expected) in cases {
            let result = store.query_range(uid(user), start, end);
            assert_eq!(titles(&result), expected, "case: {name}");
        }
    }

    #[test]
    fn query_range_keeps_insertion_order() {
        let store = EventStore::new();
        store.create(Event::new(1, day(15), "later", ""));
        store.create(Event::new(1, day(12), "earlier", ""));

        let events = store.query_range(uid(1), day(10), day(20));
        assert_eq!(titles(&events), vec!["later", "earlier"]);
    }

    #[test]
    fn partitions_are_isolated() {
        let store = EventStore::new();
        store.create(Event::new(2, day(10), "theirs", "x"));

        store.create(Event::new(1, day(10), "mine", "y"));
        store.update(uid(1), day(10), "mine 2", "y2").unwrap();
        store.delete(uid(1), day(10)).unwrap();

        assert_eq!(
            store.query_range(uid(2), day(10), day(10)),
            vec![Event::new(2, day(10), "theirs", "x")]
        );
    }

    #[test]
    fn clones_share_state() {
        let store = EventStore::new();
        let other = store.clone();
        other.create(Event::new(1, day(10), "shared", ""));
        assert_eq!(store.count(uid(1)), 1);
    }

    #[test]
    fn stats_totals() {
        let store = EventStore::new();
        assert_eq!(store.stats(), StoreStats::default());

        store.create(Event::new(1, day(10), "a", ""));
        store.create(Event::new(1, day(11), "b", ""));
        store.create(Event::new(2, day(10), "c", ""));

        assert_eq!(store.stats(), StoreStats { users: 2, events: 3 });
    }

    #[test]
    fn end_to_end_example() {
        let store = EventStore::new();
        store.create(Event::new(1, day(10), "A", "a"));
        store.create(Event::new(1, day(11), "B", "b"));

        assert_eq!(titles(&store.query_range(uid(1), day(10), day(10))), vec!["A"]);
        assert_eq!(titles(&store.query_range(uid(1), day(10), day(11))), vec!["A", "B"]);

        store.update(uid(1), day(10), "A2", "a2").unwrap();
        let updated = store.query_range(uid(1), day(10), day(10));
        assert_eq!(updated[0].title, "A2");
        assert_eq!(updated[0].text, "a2");

        store.delete(uid(1), day(11)).unwrap();
        assert!(matches!(
            store.delete(uid(1), day(11)),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn concurrent_creates_and_deletes() {
        let store = EventStore::new();
        let date = day(10);
        let event = Event::new(1, date, "Concurrent Event", "Test concurrent access");

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let s = store.clone();
                let e = event.clone();
                thread::spawn(move || s.create(e))
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.count(uid(1)), 100);

        let reader = {
            let s = store.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let seen = s.query_range(uid(1), date, date).len();
                    assert!((50..=100).contains(&seen));
                }
            })
        };

        let deleters: Vec<_> = (0..50)
            .map(|_| {
                let s = store.clone();
                thread::spawn(move || s.delete(uid(1), date))
            })
            .collect();
        let succeeded = deleters
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Result::is_ok)
            .count();
        reader.join().unwrap();

        assert_eq!(succeeded, 50);
        assert_eq!(store.count(uid(1)), 50);
    }
}
