//! Concurrent batch filtering.

mod coordinator;
mod throttle;
mod types;

pub use coordinator::Coordinator;
pub use throttle::Throttle;
pub use types::{BatchError, BatchReport, CandidateItem, ItemError, ItemFailure, ItemOutcome};
