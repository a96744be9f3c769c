pub mod event;
pub mod ids;

pub use event::{Event, EventDate};
pub use ids::UserId;
