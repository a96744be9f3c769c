use calendar_core::{EventDate, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("event not found")]
    NotFound { user_id: UserId, date: EventDate },
}

impl StoreError {
    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
        }
    }
}
