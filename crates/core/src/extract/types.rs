use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Promotion category of a tracker item.
///
/// The wire strings are the labels NexusPHP sites advertise and what
/// filter configs refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscountLabel {
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "2x")]
    TwoX,
    #[serde(rename = "2xfree")]
    TwoXFree,
    #[serde(rename = "30%")]
    ThirtyPercent,
    #[serde(rename = "50%")]
    HalfDown,
    #[serde(rename = "2x50%")]
    TwoXHalfDown,
}

impl DiscountLabel {
    /// All labels, in the order built-in rule tables list them.
    pub const ALL: [DiscountLabel; 6] = [
        DiscountLabel::Free,
        DiscountLabel::TwoX,
        DiscountLabel::TwoXFree,
        DiscountLabel::ThirtyPercent,
        DiscountLabel::HalfDown,
        DiscountLabel::TwoXHalfDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountLabel::Free => "free",
            DiscountLabel::TwoX => "2x",
            DiscountLabel::TwoXFree => "2xfree",
            DiscountLabel::ThirtyPercent => "30%",
            DiscountLabel::HalfDown => "50%",
            DiscountLabel::TwoXHalfDown => "2x50%",
        }
    }
}

impl std::fmt::Display for DiscountLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a seeder or leecher table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub name: String,
    pub connectable: bool,
    /// Display string as shown by the site, e.g. "1.5 GB". Never parsed
    /// into a number here.
    pub uploaded: String,
    pub downloaded: String,
    /// Download progress in `[0.0, 1.0]`.
    pub completed: f32,
}

impl PeerRecord {
    /// Record substituted for a row whose cells could not be read.
    pub fn placeholder() -> Self {
        Self {
            name: String::new(),
            connectable: false,
            uploaded: String::new(),
            downloaded: String::new(),
            completed: 0.0,
        }
    }
}

/// Everything the parsers pulled out of an item's pages.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub discount: Option<DiscountLabel>,
    /// When the promotion ends, if the page said so. Tracker-local time.
    pub expiry: Option<NaiveDateTime>,
    pub hit_and_run: bool,
    pub seeders: Vec<PeerRecord>,
    pub leechers: Vec<PeerRecord>,
}
