pub mod store;

pub use store::{
    DeadLetterCursor, ListDeadLetterParams, ListDeadLetterResult, get_dead_letter_events,
    list_dead_letter_events, retry_dead_letter_event,
};
