//! Batch pipeline data types.

use serde::Deserialize;
use thiserror::Error;

use crate::adapter::ExtractError;
use crate::fetcher::FetchError;
use crate::policy::Decision;

/// A candidate waiting to be filtered.
///
/// `metadata` is an opaque payload carried through to the outcome
/// untouched; callers feeding search results through the filter keep
/// their fields without the pipeline knowing about them.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateItem {
    pub link: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub comment: Option<String>,
}

impl CandidateItem {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            metadata: serde_json::Value::Null,
            comment: None,
        }
    }
}

/// A candidate together with the verdict reached for it.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    pub item: CandidateItem,
    pub decision: Decision,
}

/// A candidate the pipeline could not decide.
#[derive(Debug)]
pub struct ItemFailure {
    pub link: String,
    pub error: ItemError,
}

/// Why a single candidate failed. Never aborts the batch.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

/// Everything a finished batch produced. Outcomes keep the order the
/// candidates were submitted in.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
    pub failures: Vec<ItemFailure>,
}

impl BatchReport {
    pub fn accepted_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.decision.is_accepted())
            .count()
    }

    pub fn rejected_count(&self) -> usize {
        self.outcomes.len() - self.accepted_count()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

/// Errors that end the whole batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// A candidate arrived without a link. Caught before any request
    /// goes out.
    #[error("Candidate at position {index} has an empty link")]
    MissingLink { index: usize },

    /// The tracker no longer honors the configured cookie. Decisions
    /// made under a rejected session are not returned.
    #[error("Tracker rejected the session cookie at {link}")]
    CookieRejected { link: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_deserializes_with_link_only() {
        let item: CandidateItem = serde_json::from_str(r#"{"link": "https://x/details.php?id=1"}"#).unwrap();
        assert_eq!(item.link, "https://x/details.php?id=1");
        assert!(item.metadata.is_null());
        assert!(item.comment.is_none());
    }

    #[test]
    fn test_candidate_keeps_opaque_metadata() {
        let item: CandidateItem = serde_json::from_str(
            r#"{"link": "https://x/details.php?id=1", "metadata": {"size": 1234, "title": "t"}}"#,
        )
        .unwrap();
        assert_eq!(item.metadata["size"], 1234);
    }

    #[test]
    fn test_report_counts() {
        let accepted = ItemOutcome {
            item: CandidateItem::new("a"),
            decision: Decision::Accepted,
        };
        let rejected = ItemOutcome {
            item: CandidateItem::new("b"),
            decision: Decision::Rejected {
                reason: "none does not match discount".to_string(),
                remember: true,
            },
        };
        let report = BatchReport {
            outcomes: vec![accepted, rejected],
            failures: vec![ItemFailure {
                link: "c".to_string(),
                error: ItemError::Fetch(FetchError::Timeout),
            }],
        };
        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.rejected_count(), 1);
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn test_batch_error_messages() {
        let missing = BatchError::MissingLink { index: 2 };
        assert_eq!(missing.to_string(), "Candidate at position 2 has an empty link");
        let rejected = BatchError::CookieRejected {
            link: "https://x/details.php?id=1".to_string(),
        };
        assert!(rejected.to_string().contains("rejected the session cookie"));
    }
}
