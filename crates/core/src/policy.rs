//! Accept/reject policy over extracted item state.
//!
//! Checks run in a fixed order and the first failure decides the
//! rejection reason; later checks never run. Every check only applies
//! when its policy field is configured, so an empty policy accepts
//! everything.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::Interval;
use crate::extract::{DiscountLabel, ExtractionResult};

fn default_true() -> bool {
    true
}

fn default_max_peers() -> u32 {
    100_000
}

fn default_max_complete() -> f32 {
    1.0
}

/// Inclusive bounds on a roster size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PeerRange {
    #[serde(default)]
    pub min: u32,
    #[serde(default = "default_max_peers")]
    pub max: u32,
}

/// Leecher roster bounds plus the completion ceiling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeecherPolicy {
    #[serde(default)]
    pub min: u32,
    #[serde(default = "default_max_peers")]
    pub max: u32,
    /// Highest download progress any leecher may have, in `[0, 1]`.
    #[serde(default = "default_max_complete")]
    pub max_complete: f32,
}

/// The user's acceptance criteria for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterPolicy {
    /// Allowed discount categories. Absent means no restriction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<Vec<DiscountLabel>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeders: Option<PeerRange>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leechers: Option<LeecherPolicy>,

    /// Minimum promotion time remaining, e.g. "2 hours".
    #[serde(rename = "left-time", default, skip_serializing_if = "Option::is_none")]
    pub left_time: Option<Interval>,

    /// When false, items flagged hit-and-run are rejected.
    #[serde(default = "default_true")]
    pub hr: bool,

    /// Default remember flag on rejections. The hit-and-run check
    /// ignores this and always remembers.
    #[serde(default = "default_true")]
    pub remember: bool,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            discount: None,
            seeders: None,
            leechers: None,
            left_time: None,
            hr: true,
            remember: true,
        }
    }
}

impl FilterPolicy {
    /// Peer rosters are only fetched when some peer check needs them.
    pub fn wants_peers(&self) -> bool {
        self.seeders.is_some() || self.leechers.is_some()
    }
}

/// Outcome for a single candidate. Assigned exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    Rejected { reason: String, remember: bool },
}

impl Decision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Decision::Accepted)
    }
}

/// Evaluate one candidate's extraction against the policy.
///
/// `now` is passed in rather than read from the clock so the time
/// check is reproducible.
pub fn evaluate(policy: &FilterPolicy, extraction: &ExtractionResult, now: NaiveDateTime) -> Decision {
    let remember = policy.remember;

    if let Some(allowed) = &policy.discount {
        let matched = extraction
            .discount
            .map(|discount| allowed.contains(&discount))
            .unwrap_or(false);
        if !matched {
            let label = extraction
                .discount
                .map(|discount| discount.to_string())
                .unwrap_or_else(|| "none".to_string());
            return Decision::Rejected {
                reason: format!("{label} does not match discount"),
                remember,
            };
        }
    }

    if let (Some(min_left), Some(expiry)) = (policy.left_time, extraction.expiry) {
        let remaining = expiry - now;
        if remaining < min_left_threshold(min_left) {
            return Decision::Rejected {
                reason: format!("its discount time only left [{}]", format_remaining(remaining)),
                remember,
            };
        }
    }

    if !policy.hr && extraction.hit_and_run {
        return Decision::Rejected {
            reason: "it is HR".to_string(),
            remember: true,
        };
    }

    if let Some(range) = policy.seeders {
        let count = extraction.seeders.len();
        if count < range.min as usize || count > range.max as usize {
            return Decision::Rejected {
                reason: format!("{count} is out of range of seeder"),
                remember,
            };
        }
    }

    if let Some(range) = policy.leechers {
        let count = extraction.leechers.len();
        if count < range.min as usize || count > range.max as usize {
            return Decision::Rejected {
                reason: format!("{count} is out of range of leecher"),
                remember,
            };
        }
        let max_completed = extraction
            .leechers
            .iter()
            .map(|peer| peer.completed)
            .fold(0.0f32, f32::max);
        if max_completed > range.max_complete {
            return Decision::Rejected {
                reason: format!("{max_completed} is more than max_complete"),
                remember,
            };
        }
    }

    Decision::Accepted
}

fn min_left_threshold(interval: Interval) -> Duration {
    i64::try_from(interval.as_secs())
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Render a remaining duration as `H:MM:SS`; negative when the
/// promotion already ended.
fn format_remaining(remaining: Duration) -> String {
    let total = remaining.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.abs();
    format!("{}{}:{:02}:{:02}", sign, total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PeerRecord;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn leecher(completed: f32) -> PeerRecord {
        PeerRecord {
            name: "peer".into(),
            connectable: true,
            uploaded: "1GB".into(),
            downloaded: "1GB".into(),
            completed,
        }
    }

    fn free_extraction() -> ExtractionResult {
        ExtractionResult {
            discount: Some(DiscountLabel::Free),
            ..ExtractionResult::default()
        }
    }

    #[test]
    fn test_empty_policy_accepts_everything() {
        let decision = evaluate(&FilterPolicy::default(), &ExtractionResult::default(), now());
        assert_eq!(decision, Decision::Accepted);
    }

    #[test]
    fn test_discount_allow_set_accepts_member() {
        let policy = FilterPolicy {
            discount: Some(vec![DiscountLabel::Free, DiscountLabel::TwoXFree]),
            ..FilterPolicy::default()
        };
        assert_eq!(evaluate(&policy, &free_extraction(), now()), Decision::Accepted);
    }

    #[test]
    fn test_discount_mismatch_names_the_label() {
        let policy = FilterPolicy {
            discount: Some(vec![DiscountLabel::TwoXFree]),
            ..FilterPolicy::default()
        };
        let decision = evaluate(&policy, &free_extraction(), now());
        assert_eq!(
            decision,
            Decision::Rejected {
                reason: "free does not match discount".into(),
                remember: true,
            }
        );
    }

    #[test]
    fn test_missing_discount_reports_none() {
        let policy = FilterPolicy {
            discount: Some(vec![DiscountLabel::Free]),
            ..FilterPolicy::default()
        };
        let decision = evaluate(&policy, &ExtractionResult::default(), now());
        match decision {
            Decision::Rejected { reason, .. } => {
                assert_eq!(reason, "none does not match discount")
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_enough_time_remaining_passes() {
        let policy = FilterPolicy {
            left_time: Some(Interval::from_secs(3600)),
            ..FilterPolicy::default()
        };
        let extraction = ExtractionResult {
            expiry: Some(now() + Duration::hours(3)),
            ..ExtractionResult::default()
        };
        assert_eq!(evaluate(&policy, &extraction, now()), Decision::Accepted);
    }

    #[test]
    fn test_short_time_remaining_rejects_with_countdown() {
        let policy = FilterPolicy {
            left_time: Some(Interval::from_secs(2 * 3600)),
            ..FilterPolicy::default()
        };
        let extraction = ExtractionResult {
            expiry: Some(now() + Duration::minutes(90)),
            ..ExtractionResult::default()
        };
        let decision = evaluate(&policy, &extraction, now());
        match decision {
            Decision::Rejected { reason, .. } => {
                assert_eq!(reason, "its discount time only left [1:30:00]")
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_expired_promotion_shows_negative_countdown() {
        let policy = FilterPolicy {
            left_time: Some(Interval::from_secs(60)),
            ..FilterPolicy::default()
        };
        let extraction = ExtractionResult {
            expiry: Some(now() - Duration::minutes(5)),
            ..ExtractionResult::default()
        };
        match evaluate(&policy, &extraction, now()) {
            Decision::Rejected { reason, .. } => {
                assert_eq!(reason, "its discount time only left [-0:05:00]")
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_expiry_skips_the_time_check() {
        let policy = FilterPolicy {
            left_time: Some(Interval::from_secs(3600)),
            ..FilterPolicy::default()
        };
        assert_eq!(
            evaluate(&policy, &ExtractionResult::default(), now()),
            Decision::Accepted
        );
    }

    #[test]
    fn test_hr_rejection_always_remembers() {
        let policy = FilterPolicy {
            hr: false,
            remember: false,
            ..FilterPolicy::default()
        };
        let extraction = ExtractionResult {
            hit_and_run: true,
            ..ExtractionResult::default()
        };
        assert_eq!(
            evaluate(&policy, &extraction, now()),
            Decision::Rejected {
                reason: "it is HR".into(),
                remember: true,
            }
        );
    }

    #[test]
    fn test_hr_allowed_passes_flagged_items() {
        let extraction = ExtractionResult {
            hit_and_run: true,
            ..ExtractionResult::default()
        };
        assert_eq!(
            evaluate(&FilterPolicy::default(), &extraction, now()),
            Decision::Accepted
        );
    }

    #[test]
    fn test_seeder_range_bounds_are_inclusive() {
        let policy = FilterPolicy {
            seeders: Some(PeerRange { min: 1, max: 2 }),
            ..FilterPolicy::default()
        };
        for count in [1, 2] {
            let extraction = ExtractionResult {
                seeders: vec![leecher(1.0); count],
                ..ExtractionResult::default()
            };
            assert_eq!(evaluate(&policy, &extraction, now()), Decision::Accepted);
        }
        let too_many = ExtractionResult {
            seeders: vec![leecher(1.0); 3],
            ..ExtractionResult::default()
        };
        match evaluate(&policy, &too_many, now()) {
            Decision::Rejected { reason, .. } => assert_eq!(reason, "3 is out of range of seeder"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_seeder_roster_below_min_rejects() {
        let policy = FilterPolicy {
            seeders: Some(PeerRange { min: 1, max: 30 }),
            ..FilterPolicy::default()
        };
        match evaluate(&policy, &ExtractionResult::default(), now()) {
            Decision::Rejected { reason, .. } => assert_eq!(reason, "0 is out of range of seeder"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_leecher_range_reports_count() {
        let policy = FilterPolicy {
            leechers: Some(LeecherPolicy {
                min: 0,
                max: 1,
                max_complete: 1.0,
            }),
            ..FilterPolicy::default()
        };
        let extraction = ExtractionResult {
            leechers: vec![leecher(0.1), leecher(0.2)],
            ..ExtractionResult::default()
        };
        match evaluate(&policy, &extraction, now()) {
            Decision::Rejected { reason, .. } => assert_eq!(reason, "2 is out of range of leecher"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_completion_ceiling_rejects_nearly_done_swarms() {
        let policy = FilterPolicy {
            leechers: Some(LeecherPolicy {
                min: 0,
                max: 100,
                max_complete: 0.8,
            }),
            ..FilterPolicy::default()
        };
        let extraction = ExtractionResult {
            leechers: vec![leecher(0.5), leecher(0.85)],
            ..ExtractionResult::default()
        };
        match evaluate(&policy, &extraction, now()) {
            Decision::Rejected { reason, .. } => assert_eq!(reason, "0.85 is more than max_complete"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_leecher_roster_has_zero_completion() {
        let policy = FilterPolicy {
            leechers: Some(LeecherPolicy {
                min: 0,
                max: 100,
                max_complete: 0.0,
            }),
            ..FilterPolicy::default()
        };
        // nobody leeching: max completion is 0, which is not above 0.0
        assert_eq!(
            evaluate(&policy, &ExtractionResult::default(), now()),
            Decision::Accepted
        );
    }

    #[test]
    fn test_first_failing_check_wins() {
        // both the discount and the seeder checks would fail; the
        // discount check runs first
        let policy = FilterPolicy {
            discount: Some(vec![DiscountLabel::TwoX]),
            seeders: Some(PeerRange { min: 5, max: 10 }),
            ..FilterPolicy::default()
        };
        match evaluate(&policy, &free_extraction(), now()) {
            Decision::Rejected { reason, .. } => {
                assert_eq!(reason, "free does not match discount")
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_remember_flag_follows_policy_for_non_hr_checks() {
        let policy = FilterPolicy {
            discount: Some(vec![DiscountLabel::TwoX]),
            remember: false,
            ..FilterPolicy::default()
        };
        match evaluate(&policy, &free_extraction(), now()) {
            Decision::Rejected { remember, .. } => assert!(!remember),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_narrowing_a_policy_never_accepts_more() {
        let extraction = ExtractionResult {
            discount: Some(DiscountLabel::Free),
            expiry: Some(now() + Duration::hours(10)),
            hit_and_run: true,
            seeders: vec![leecher(1.0); 5],
            leechers: vec![leecher(0.5); 2],
        };
        let loose = FilterPolicy {
            discount: Some(vec![DiscountLabel::Free, DiscountLabel::TwoX]),
            seeders: Some(PeerRange { min: 0, max: 10 }),
            leechers: Some(LeecherPolicy {
                min: 0,
                max: 10,
                max_complete: 0.9,
            }),
            left_time: Some(Interval::from_secs(3600)),
            hr: true,
            remember: true,
        };
        assert_eq!(evaluate(&loose, &extraction, now()), Decision::Accepted);

        let narrowings = [
            FilterPolicy {
                discount: Some(vec![DiscountLabel::TwoX]),
                ..loose.clone()
            },
            FilterPolicy {
                seeders: Some(PeerRange { min: 6, max: 10 }),
                ..loose.clone()
            },
            FilterPolicy {
                leechers: Some(LeecherPolicy {
                    min: 0,
                    max: 1,
                    max_complete: 0.9,
                }),
                ..loose.clone()
            },
            FilterPolicy {
                leechers: Some(LeecherPolicy {
                    min: 0,
                    max: 10,
                    max_complete: 0.4,
                }),
                ..loose.clone()
            },
            FilterPolicy {
                left_time: Some(Interval::from_secs(11 * 3600)),
                ..loose.clone()
            },
            FilterPolicy {
                hr: false,
                ..loose.clone()
            },
        ];
        for narrowed in narrowings {
            assert!(
                !evaluate(&narrowed, &extraction, now()).is_accepted(),
                "narrowed policy unexpectedly accepted: {narrowed:?}"
            );
        }
    }
}
