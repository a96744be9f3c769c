use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Instant an event is keyed on. Compared by exact value, so two events
/// share a date only if their timestamps are identical.
pub type EventDate = DateTime<Utc>;

/// A single calendar entry.
///
/// `user_id` and `date` are fixed at creation; only `title` and `text`
/// change afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: UserId,
    pub date: EventDate,
    pub title: String,
    pub text: String,
}

impl Event {
    pub fn new(
        user_id: impl Into<UserId>,
        date: EventDate,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            title: title.into(),
            text: text.into(),
        }
    }

    /// Whether this event falls inside `[start, end]`, both ends inclusive.
    pub fn within(&self, start: &EventDate, end: &EventDate) -> bool {
        *start <= self.date && self.date <= *end
    }
}
