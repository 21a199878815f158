//! Testing utilities and mock implementations for integration tests.
//!
//! This module provides a mock fetcher and canned tracker pages, allowing
//! comprehensive testing of the filter pipeline without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use peersift_core::testing::{fixtures, MockFetcher};
//!
//! let fetcher = MockFetcher::new();
//! fetcher.set_body(
//!     "https://example.org/details.php?id=1",
//!     &fixtures::free_detail_body(),
//! ).await;
//!
//! // Use with a Coordinator...
//! ```

mod mock_fetcher;

pub use mock_fetcher::{MockFetcher, RecordedRequest};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::fetcher::Page;
    use crate::pipeline::CandidateItem;

    /// Candidate item with just a link.
    pub fn candidate(link: &str) -> CandidateItem {
        CandidateItem {
            link: link.to_string(),
            metadata: serde_json::Value::Null,
            comment: None,
        }
    }

    /// Detail body with a promotion badge in the stock NexusPHP heading
    /// layout, using the given badge class and caption glyph.
    pub fn detail_body(class: &str, caption: &str) -> String {
        format!(
            "<html><body><h1 id='top'>Some.Release.2160p \
             <img class='{class}' src='pic/trans.gif' alt=''/> {caption}</h1>\
             <table><tr><td>details</td></tr></table></body></html>"
        )
    }

    /// Detail body carrying a free promotion.
    pub fn free_detail_body() -> String {
        detail_body("free", "免")
    }

    /// Detail body carrying a free promotion with a deadline inside the
    /// heading, e.g. `2029-12-31 23:59:59`.
    pub fn free_detail_body_with_expiry(expiry: &str) -> String {
        format!(
            "<html><body><h1 id='top'>Some.Release.2160p \
             <img class='free' src='pic/trans.gif' alt=''/> 免 \
             <b>剩余时间：{expiry}</b></h1></body></html>"
        )
    }

    /// Detail body with no promotion at all.
    pub fn plain_detail_body() -> String {
        "<html><body><h1 id='top'>Some.Release.2160p</h1>\
         <table><tr><td>details</td></tr></table></body></html>"
            .to_string()
    }

    /// Detail body flagged as hit-and-run.
    pub fn hr_detail_body(class: &str, caption: &str) -> String {
        format!(
            "<html><body><h1 id='top'>Some.Release.2160p \
             <img class='{class}' src='pic/trans.gif' alt=''/> {caption}</h1>\
             <img class=\"hitandrun\" src=\"pic/hit_run.gif\" title=\"Hit and Run\"/>\
             </body></html>"
        )
    }

    /// Detail body for sites that plant a CSRF token and render the
    /// promotion state client-side.
    pub fn csrf_detail_body(token: &str) -> String {
        format!(
            "<html><head><meta name=\"x-csrf\" content=\"{token}\"/></head>\
             <body><h1>Some.Release.2160p</h1></body></html>"
        )
    }

    /// The page a tracker serves when the session cookie is stale: the
    /// request lands on the login portal instead of the detail page.
    pub fn login_redirect() -> Page {
        Page::new(
            "https://example.org/login.php?returnto=details.php",
            200,
            "<html><body>please log in</body></html>",
        )
    }

    /// AJAX promotion endpoint response carrying an HTML snippet for one
    /// item id.
    pub fn ajax_promotion_body(item_id: &str, snippet: &str) -> String {
        let mut message = serde_json::Map::new();
        message.insert(
            item_id.to_string(),
            serde_json::Value::String(snippet.to_string()),
        );
        serde_json::json!({"status": 200, "message": message}).to_string()
    }

    /// AJAX promotion endpoint response for a rejected session.
    pub fn ajax_rejection_body() -> String {
        serde_json::json!({"status": 403, "message": {}}).to_string()
    }

    /// Peer page with one table per roster. Rows are (name, completed),
    /// with `completed` a percentage string such as `"100%"`; every row
    /// reports as connectable with fixed transfer volumes.
    pub fn peer_page(seeders: &[(&str, &str)], leechers: &[(&str, &str)]) -> String {
        format!(
            "<html><body>{}{}</body></html>",
            peer_table(seeders),
            peer_table(leechers)
        )
    }

    fn peer_table(rows: &[(&str, &str)]) -> String {
        let mut html = String::from(
            "<table><tr><td>用户</td><td>可连接</td><td>上传</td>\
             <td>下载</td><td>完成</td></tr>",
        );
        for (name, completed) in rows {
            html.push_str(&format!(
                "<tr><td>{name}</td><td>是</td><td>10.5 GB</td>\
                 <td>0 B</td><td>{completed}</td></tr>"
            ));
        }
        html.push_str("</table>");
        html
    }
}
