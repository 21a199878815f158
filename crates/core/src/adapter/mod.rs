//! Per-site extraction rules and their resolution.

mod ajax;
mod builtin;
mod registry;
mod types;

pub use ajax::AjaxPromotionExtractor;
pub use registry::AdapterRegistry;
pub use types::{
    AdapterError, DiscountExtractor, DiscountFinding, ExtractError, PatternExtractor,
    PeerPageRule, SiteAdapter,
};
