//! Promotion filtering for NexusPHP-family private trackers.
//!
//! The crate fetches tracker detail pages with a user-supplied session
//! cookie, extracts promotion state through per-site adapters and
//! decides each candidate against a configured filter policy. Batches
//! run on a bounded, throttled worker pool; outcomes are returned in
//! submission order and mirrored to an injected report sink.

pub mod adapter;
pub mod config;
pub mod extract;
pub mod fetcher;
pub mod metrics;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod testing;

pub use adapter::{AdapterError, AdapterRegistry, ExtractError, SiteAdapter};
pub use config::{validate_config, Config, ConfigError, SanitizedConfig};
pub use extract::{DiscountLabel, ExtractionResult, PeerRecord};
pub use fetcher::{FetchError, Fetcher, HttpFetcher, Page, Session};
pub use pipeline::{BatchError, BatchReport, CandidateItem, Coordinator, ItemOutcome};
pub use policy::{evaluate, Decision, FilterPolicy};
pub use report::{ReportEnvelope, ReportEvent, ReportHandle};
