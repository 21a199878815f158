use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use regex_lite::Regex;
use thiserror::Error;

use crate::extract::{self, parse_discount, DiscountLabel, DiscountRule};
use crate::fetcher::{FetchError, Fetcher, Page, Session};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Discount token '{pattern}' is not a valid pattern: {source}")]
    InvalidToken {
        pattern: String,
        source: regex_lite::Error,
    },
}

/// Failures from discount extraction procedures that go beyond pattern
/// matching on an already-fetched body.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The promotion API refused the session. This poisons the whole
    /// batch, not just the item that tripped it.
    #[error("Promotion API rejected the session (status {status})")]
    CredentialRejected { status: i64 },

    #[error("Detail page carries no {0} token")]
    MissingToken(&'static str),

    #[error("No item id found in link: {0}")]
    MissingItemId(String),

    #[error("Promotion API returned no entry for item {0}")]
    MissingEntry(String),

    #[error("Promotion API response malformed: {0}")]
    Malformed(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ExtractError {
    pub fn is_credential_rejection(&self) -> bool {
        matches!(self, ExtractError::CredentialRejected { .. })
    }
}

/// What a discount extraction procedure found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscountFinding {
    pub discount: Option<DiscountLabel>,
    pub expiry: Option<NaiveDateTime>,
}

/// Discount extraction procedure for one site family.
///
/// Most sites need nothing beyond an ordered pattern table over the
/// detail body. A few render promotion state client-side and need a
/// follow-up request, hence the fetcher and session parameters.
#[async_trait]
pub trait DiscountExtractor: Send + Sync {
    async fn extract(
        &self,
        link: &str,
        page: &Page,
        fetcher: &dyn Fetcher,
        session: &Session,
    ) -> Result<DiscountFinding, ExtractError>;
}

/// Ordered regex rules over the detail body; first match wins.
pub struct PatternExtractor {
    rules: Vec<DiscountRule>,
}

impl PatternExtractor {
    pub fn new(rules: Vec<DiscountRule>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl DiscountExtractor for PatternExtractor {
    async fn extract(
        &self,
        _link: &str,
        page: &Page,
        _fetcher: &dyn Fetcher,
        _session: &Session,
    ) -> Result<DiscountFinding, ExtractError> {
        let (discount, expiry) = parse_discount(&page.body, &self.rules);
        Ok(DiscountFinding { discount, expiry })
    }
}

/// How a site's peer roster page is reached.
#[derive(Debug)]
pub enum PeerPageRule {
    /// `details.php` becomes `viewpeerlist.php` on the same query.
    Standard,
    /// Path rewrite for sites that split detail pages per category
    /// (`details_movie.php`, `details_music.php`, ...).
    Rewrite {
        pattern: Regex,
        replacement: &'static str,
    },
    /// Rosters are embedded in the detail page itself.
    Embedded,
    /// The site serves no peer list at all.
    Unavailable,
}

impl PeerPageRule {
    /// Derive the roster URL from the detail link, when a separate
    /// request is needed.
    pub fn derive(&self, link: &str) -> Option<String> {
        match self {
            PeerPageRule::Standard => Some(link.replacen("details.php", "viewpeerlist.php", 1)),
            PeerPageRule::Rewrite {
                pattern,
                replacement,
            } => Some(pattern.replace(link, *replacement).into_owned()),
            PeerPageRule::Embedded | PeerPageRule::Unavailable => None,
        }
    }
}

/// Extraction rules for one tracker family.
pub struct SiteAdapter {
    name: &'static str,
    matcher: &'static str,
    discount: Arc<dyn DiscountExtractor>,
    hit_run: Option<fn(&str) -> bool>,
    peer_page: PeerPageRule,
    detail_rewrite: Option<(&'static str, &'static str)>,
}

impl SiteAdapter {
    /// New adapter with the standard peer-page derivation and the
    /// default hit-and-run markers.
    pub fn new(
        name: &'static str,
        matcher: &'static str,
        discount: Arc<dyn DiscountExtractor>,
    ) -> Self {
        Self {
            name,
            matcher,
            discount,
            hit_run: None,
            peer_page: PeerPageRule::Standard,
            detail_rewrite: None,
        }
    }

    pub fn with_hit_run(mut self, predicate: fn(&str) -> bool) -> Self {
        self.hit_run = Some(predicate);
        self
    }

    pub fn with_peer_page(mut self, rule: PeerPageRule) -> Self {
        self.peer_page = rule;
        self
    }

    /// Rewrite applied to the detail link before fetching it.
    pub fn with_detail_rewrite(mut self, from: &'static str, to: &'static str) -> Self {
        self.detail_rewrite = Some((from, to));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, link: &str) -> bool {
        link.contains(self.matcher)
    }

    /// URL actually fetched for the detail page.
    pub fn detail_url(&self, link: &str) -> String {
        match self.detail_rewrite {
            Some((from, to)) => link.replacen(from, to, 1),
            None => link.to_string(),
        }
    }

    pub fn peer_rule(&self) -> &PeerPageRule {
        &self.peer_page
    }

    /// URL of the peer roster page, when the site serves one.
    pub fn peer_url(&self, link: &str) -> Option<String> {
        self.peer_page.derive(link)
    }

    pub async fn extract_discount(
        &self,
        link: &str,
        page: &Page,
        fetcher: &dyn Fetcher,
        session: &Session,
    ) -> Result<DiscountFinding, ExtractError> {
        self.discount.extract(link, page, fetcher, session).await
    }

    /// Hit-and-run badge check, via the site's own predicate when it
    /// has one.
    pub fn detect_hit_and_run(&self, body: &str) -> bool {
        match self.hit_run {
            Some(predicate) => predicate(body),
            None => extract::detect_hit_and_run(body),
        }
    }
}

impl fmt::Debug for SiteAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteAdapter")
            .field("name", &self.name)
            .field("matcher", &self.matcher)
            .field("peer_page", &self.peer_page)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DiscountRule;

    fn pattern_adapter(name: &'static str, matcher: &'static str) -> SiteAdapter {
        let rules = vec![DiscountRule::new(r"pro_free", DiscountLabel::Free).unwrap()];
        SiteAdapter::new(name, matcher, Arc::new(PatternExtractor::new(rules)))
    }

    #[test]
    fn test_matcher_is_substring_containment() {
        let adapter = pattern_adapter("u2.dmhy", "u2.dmhy");
        assert!(adapter.matches("https://u2.dmhy.org/details.php?id=7"));
        assert!(!adapter.matches("https://elsewhere.example/details.php?id=7"));
    }

    #[test]
    fn test_empty_matcher_matches_everything() {
        let adapter = pattern_adapter("generic", "");
        assert!(adapter.matches("https://any.example/details.php?id=1"));
    }

    #[test]
    fn test_standard_peer_url_substitutes_path_once() {
        let adapter = pattern_adapter("site", "site");
        assert_eq!(
            adapter.peer_url("https://site.example/details.php?id=9").as_deref(),
            Some("https://site.example/viewpeerlist.php?id=9"),
        );
    }

    #[test]
    fn test_rewrite_peer_rule_handles_category_paths() {
        let rule = PeerPageRule::Rewrite {
            pattern: Regex::new(r"details_\w+\.php").unwrap(),
            replacement: "viewpeerlist.php",
        };
        assert_eq!(
            rule.derive("https://lemonhd.org/details_movie.php?id=3").as_deref(),
            Some("https://lemonhd.org/viewpeerlist.php?id=3"),
        );
    }

    #[test]
    fn test_unavailable_peer_rule_yields_no_url() {
        let adapter =
            pattern_adapter("totheglory", "totheglory").with_peer_page(PeerPageRule::Unavailable);
        assert_eq!(adapter.peer_url("https://totheglory.im/t/123"), None);
    }

    #[test]
    fn test_detail_rewrite_applies_before_fetch() {
        let adapter =
            pattern_adapter("open.cd", "open.cd").with_detail_rewrite("details.php", "plugin_details.php");
        assert_eq!(
            adapter.detail_url("https://open.cd/details.php?id=4"),
            "https://open.cd/plugin_details.php?id=4",
        );
        // peer derivation still works off the original link
        assert_eq!(
            adapter.peer_url("https://open.cd/details.php?id=4").as_deref(),
            Some("https://open.cd/viewpeerlist.php?id=4"),
        );
    }

    #[test]
    fn test_custom_hit_run_predicate_overrides_markers() {
        fn custom(body: &str) -> bool {
            body.contains("<b>H&R")
        }
        let adapter = pattern_adapter("chdbits", "chdbits").with_hit_run(custom);
        assert!(adapter.detect_hit_and_run("x <b>H&R</b> y"));
        // default markers are ignored once a custom predicate is set
        assert!(!adapter.detect_hit_and_run("x hit_run.gif y"));
    }
}
