//! Promotion state extraction from detail-page markup.

use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::DiscountLabel;

/// Timestamp embedded in promotion markup, e.g. "2024-6-5 21:30:00".
/// Sites are inconsistent about zero padding.
static EXPIRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})(-\d{1,2}){2}\s\d{1,2}(:\d{1,2}){2}").expect("expiry pattern must compile")
});

const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single matching rule: pattern over the detail body, label on match.
#[derive(Debug, Clone)]
pub struct DiscountRule {
    pattern: Regex,
    label: DiscountLabel,
}

impl DiscountRule {
    pub fn new(pattern: &str, label: DiscountLabel) -> Result<Self, regex_lite::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            label,
        })
    }

    pub fn label(&self) -> DiscountLabel {
        self.label
    }
}

/// Match a page body against ordered rules; the first hit wins.
///
/// The body is flattened (newlines stripped) before matching so that
/// patterns can span what the site renders as multiple lines. When the
/// matched region carries a timestamp, it is returned as the promotion
/// end time. No rule matching is a normal outcome, not an error.
pub fn parse_discount(
    body: &str,
    rules: &[DiscountRule],
) -> (Option<DiscountLabel>, Option<NaiveDateTime>) {
    let flat = body.replace('\n', "");
    for rule in rules {
        if let Some(found) = rule.pattern.find(&flat) {
            return (Some(rule.label), parse_expiry(found.as_str()));
        }
    }
    (None, None)
}

/// Pull the promotion end time out of a matched region, if present.
///
/// Unparsable timestamps degrade to `None` rather than failing the
/// whole extraction.
pub fn parse_expiry(matched: &str) -> Option<NaiveDateTime> {
    let ts = EXPIRY_RE.find(matched)?;
    NaiveDateTime::parse_from_str(ts.as_str(), EXPIRY_FORMAT).ok()
}
