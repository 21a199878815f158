//! Promotion extraction for sites that render discount state
//! client-side.
//!
//! The detail page only plants a CSRF token; the promotion markup comes
//! from a JSON endpoint keyed by item id. The returned snippet is then
//! matched like any other discount body.

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::extract::{parse_discount, DiscountRule};
use crate::fetcher::{Fetcher, Page, Session};
use crate::metrics;

use super::types::{DiscountExtractor, DiscountFinding, ExtractError};

static CSRF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"name="x-csrf" content="(.*?)""#).expect("csrf pattern must compile")
});

static ITEM_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"id=(\d+)").expect("item id pattern must compile"));

const ENDPOINT_PATH: &str = "/ajax_promotion.php";

/// The endpoint answers `{"status": 200, "message": {"<id>": "<html>"}}`
/// on success; any other status means the cookie was not honored.
#[derive(Debug, Deserialize)]
struct PromotionResponse {
    status: i64,
    #[serde(default)]
    message: HashMap<String, String>,
}

pub struct AjaxPromotionExtractor {
    rules: Vec<DiscountRule>,
}

impl AjaxPromotionExtractor {
    pub fn new(rules: Vec<DiscountRule>) -> Self {
        Self { rules }
    }

    fn endpoint(link: &str) -> Result<String, ExtractError> {
        let url = reqwest::Url::parse(link)
            .map_err(|e| ExtractError::Malformed(format!("bad link {link}: {e}")))?;
        Ok(format!("{}{}", url.origin().ascii_serialization(), ENDPOINT_PATH))
    }
}

#[async_trait]
impl DiscountExtractor for AjaxPromotionExtractor {
    async fn extract(
        &self,
        link: &str,
        page: &Page,
        fetcher: &dyn Fetcher,
        session: &Session,
    ) -> Result<DiscountFinding, ExtractError> {
        let csrf = CSRF_RE
            .captures(&page.body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or(ExtractError::MissingToken("x-csrf"))?;
        let item_id = ITEM_ID_RE
            .captures(link)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ExtractError::MissingItemId(link.to_string()))?;

        let endpoint = Self::endpoint(link)?;
        let form = vec![
            ("ids[]".to_string(), item_id.clone()),
            ("csrf".to_string(), csrf),
        ];
        debug!(endpoint = %endpoint, item_id = %item_id, "Fetching promotion state");

        let timer = metrics::FETCH_DURATION
            .with_label_values(&["promotion"])
            .start_timer();
        let response = fetcher.post_form(&endpoint, session, &form).await?;
        timer.observe_duration();

        let parsed: PromotionResponse = serde_json::from_str(&response.body)
            .map_err(|e| ExtractError::Malformed(e.to_string()))?;
        if parsed.status != 200 {
            return Err(ExtractError::CredentialRejected {
                status: parsed.status,
            });
        }
        let snippet = parsed
            .message
            .get(&item_id)
            .ok_or(ExtractError::MissingEntry(item_id))?;

        let (discount, expiry) = parse_discount(snippet, &self.rules);
        Ok(DiscountFinding { discount, expiry })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DiscountLabel;
    use crate::testing::MockFetcher;

    const LINK: &str = "https://hdchina.org/details.php?id=333&hit=1";
    const ENDPOINT: &str = "https://hdchina.org/ajax_promotion.php";

    fn extractor() -> AjaxPromotionExtractor {
        AjaxPromotionExtractor::new(vec![
            DiscountRule::new("pro_free2up", DiscountLabel::TwoXFree).unwrap(),
            DiscountRule::new("pro_free", DiscountLabel::Free).unwrap(),
        ])
    }

    fn detail_page() -> Page {
        Page::new(
            LINK,
            200,
            r#"<head><meta name="x-csrf" content="tok123"/></head><body></body>"#,
        )
    }

    fn session() -> Session {
        Session::new("uid=1", "test-agent")
    }

    #[tokio::test]
    async fn test_posts_id_and_token_to_promotion_endpoint() {
        let fetcher = MockFetcher::new();
        fetcher
            .set_body(
                ENDPOINT,
                r#"{"status": 200, "message": {"333": "<h2><img class=\"pro_free\"/></h2>"}}"#,
            )
            .await;

        let finding = extractor()
            .extract(LINK, &detail_page(), &fetcher, &session())
            .await
            .unwrap();
        assert_eq!(finding.discount, Some(DiscountLabel::Free));

        let requests = fetcher.recorded_requests().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].url, ENDPOINT);
        let form = requests[0].form.clone().unwrap();
        assert!(form.contains(&("ids[]".to_string(), "333".to_string())));
        assert!(form.contains(&("csrf".to_string(), "tok123".to_string())));
    }

    #[tokio::test]
    async fn test_expiry_read_from_snippet() {
        let fetcher = MockFetcher::new();
        fetcher
            .set_body(
                ENDPOINT,
                r#"{"status": 200, "message": {"333": "pro_free2up ends 2030-01-02 03:04:05"}}"#,
            )
            .await;

        let finding = extractor()
            .extract(LINK, &detail_page(), &fetcher, &session())
            .await
            .unwrap();
        assert_eq!(finding.discount, Some(DiscountLabel::TwoXFree));
        assert!(finding.expiry.is_some());
    }

    #[tokio::test]
    async fn test_non_200_status_is_a_credential_rejection() {
        let fetcher = MockFetcher::new();
        fetcher
            .set_body(ENDPOINT, r#"{"status": 403, "message": {}}"#)
            .await;

        let err = extractor()
            .extract(LINK, &detail_page(), &fetcher, &session())
            .await
            .unwrap_err();
        assert!(err.is_credential_rejection());
    }

    #[tokio::test]
    async fn test_missing_csrf_token_is_soft() {
        let fetcher = MockFetcher::new();
        let bare = Page::new(LINK, 200, "<head></head>");
        let err = extractor()
            .extract(LINK, &bare, &fetcher, &session())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::MissingToken("x-csrf")));
        assert!(!err.is_credential_rejection());
        assert_eq!(fetcher.request_count().await, 0);
    }

    #[tokio::test]
    async fn test_link_without_item_id_is_soft() {
        let fetcher = MockFetcher::new();
        let err = extractor()
            .extract("https://hdchina.org/details.php", &detail_page(), &fetcher, &session())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::MissingItemId(_)));
    }

    #[tokio::test]
    async fn test_missing_message_entry_is_soft() {
        let fetcher = MockFetcher::new();
        fetcher
            .set_body(ENDPOINT, r#"{"status": 200, "message": {"999": "pro_free"}}"#)
            .await;

        let err = extractor()
            .extract(LINK, &detail_page(), &fetcher, &session())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::MissingEntry(_)));
    }

    #[tokio::test]
    async fn test_unparsable_response_is_soft() {
        let fetcher = MockFetcher::new();
        fetcher.set_body(ENDPOINT, "<html>maintenance</html>").await;

        let err = extractor()
            .extract(LINK, &detail_page(), &fetcher, &session())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }
}
