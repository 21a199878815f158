//! Pure parsing of fetched tracker pages.

mod discount;
mod hit_run;
mod peers;
mod types;

pub use discount::{parse_discount, parse_expiry, DiscountRule};
pub use hit_run::detect_hit_and_run;
pub use peers::parse_peer_list;
pub use types::{DiscountLabel, ExtractionResult, PeerRecord};
