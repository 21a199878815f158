//! Batch filtering coordinator.
//!
//! Drives a list of candidates through fetch, extraction and policy
//! evaluation on a bounded worker pool. Submission is paced by the
//! configured throttle; candidates that fail individually are reported
//! and skipped, while a rejected session cookie stops the whole batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::adapter::{AdapterRegistry, PeerPageRule, SiteAdapter};
use crate::config::{Config, MalformedRowMode};
use crate::extract::{parse_peer_list, ExtractionResult, PeerRecord};
use crate::fetcher::{FetchError, Fetcher, Page, Session};
use crate::metrics;
use crate::policy::{evaluate, Decision};
use crate::report::{ReportEvent, ReportHandle};

use super::throttle::Throttle;
use super::types::{
    BatchError, BatchReport, CandidateItem, ItemError, ItemFailure, ItemOutcome,
};

/// Paths that a stale session gets bounced to instead of the page it
/// asked for.
const LOGIN_MARKERS: [&str; 2] = ["login", "portal.php"];

/// What one worker task produced.
enum TaskResult {
    Decided(ItemOutcome),
    Failed(ItemFailure),
    /// The tracker refused the session. Flags the batch for abort.
    Fatal,
}

/// Runs filter batches against a tracker.
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    registry: Arc<AdapterRegistry>,
    session: Session,
    throttle: Throttle,
    semaphore: Arc<Semaphore>,
    report: ReportHandle,
}

impl Coordinator {
    pub fn new(config: Config, fetcher: Arc<dyn Fetcher>, registry: AdapterRegistry) -> Self {
        let session = config.session();
        let throttle = Throttle::from_config(&config.pipeline.throttle);
        let semaphore = Arc::new(Semaphore::new(config.pipeline.workers.max(1)));
        Self {
            config: Arc::new(config),
            fetcher,
            registry: Arc::new(registry),
            session,
            throttle,
            semaphore,
            report: ReportHandle::null(),
        }
    }

    /// Sets the report handle batch events are emitted to.
    pub fn with_report(mut self, report: ReportHandle) -> Self {
        self.report = report;
        self
    }

    /// Filter a batch of candidates.
    ///
    /// Outcomes keep submission order. Returns `Err` without touching
    /// the network when a candidate has no link, and `Err` with the
    /// offending link when the tracker rejects the session cookie
    /// mid-batch; in-flight workers are allowed to finish but their
    /// decisions are discarded.
    pub async fn run(&self, items: Vec<CandidateItem>) -> Result<BatchReport, BatchError> {
        for (index, item) in items.iter().enumerate() {
            if item.link.trim().is_empty() {
                return Err(BatchError::MissingLink { index });
            }
        }

        let total = items.len();
        tracing::info!(total, "starting filter batch");
        self.report.emit(ReportEvent::BatchStarted { total }).await;

        let mut items = items;
        if self.config.comment {
            for item in &mut items {
                item.comment = Some(item.link.clone());
            }
        }

        if let Some(first) = items.first() {
            self.warm_up(&first.link).await;
        }

        let aborted = Arc::new(AtomicBool::new(false));
        let mut handles: Vec<(String, JoinHandle<TaskResult>)> = Vec::with_capacity(total);

        for item in items {
            if aborted.load(Ordering::SeqCst) {
                break;
            }
            self.throttle.acquire().await;
            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            if aborted.load(Ordering::SeqCst) {
                break;
            }

            let link = item.link.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let registry = Arc::clone(&self.registry);
            let config = Arc::clone(&self.config);
            let session = self.session.clone();
            let report = self.report.clone();
            let abort_flag = Arc::clone(&aborted);
            let handle = tokio::spawn(async move {
                let result =
                    Self::process_item(item, fetcher, registry, config, session, report, abort_flag)
                        .await;
                drop(permit);
                result
            });
            handles.push((link, handle));
        }

        let mut outcomes = Vec::new();
        let mut failures = Vec::new();
        let mut fatal_link: Option<String> = None;

        let (links, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let results = futures::future::join_all(handles).await;
        for (link, result) in links.into_iter().zip(results) {
            match result {
                Ok(TaskResult::Decided(outcome)) => outcomes.push(outcome),
                Ok(TaskResult::Failed(failure)) => failures.push(failure),
                Ok(TaskResult::Fatal) => {
                    fatal_link.get_or_insert(link);
                }
                Err(error) => {
                    tracing::error!(link = %link, %error, "filter task did not complete");
                }
            }
        }

        if let Some(link) = fatal_link {
            let undecided = total - outcomes.len() - failures.len();
            metrics::BATCH_ABORTS.inc();
            tracing::error!(link = %link, undecided, "batch aborted, tracker rejected the session cookie");
            self.report
                .emit(ReportEvent::BatchAborted {
                    link: link.clone(),
                    undecided,
                })
                .await;
            return Err(BatchError::CookieRejected { link });
        }

        let report = BatchReport { outcomes, failures };
        let accepted = report.accepted_count();
        let rejected = report.rejected_count();
        let failed = report.failed_count();
        tracing::info!(accepted, rejected, failed, "filter batch finished");
        self.report
            .emit(ReportEvent::BatchFinished {
                accepted,
                rejected,
                failed,
            })
            .await;
        Ok(report)
    }

    /// One request ahead of the batch so the session is exercised on a
    /// known link. Failures are tolerated; the batch itself will
    /// surface anything persistent.
    async fn warm_up(&self, link: &str) {
        let adapter = self.registry.resolve(link);
        let url = adapter.detail_url(link);
        match timed_get(self.fetcher.as_ref(), &url, &self.session, "warmup").await {
            Ok(_) => tracing::debug!(url = %url, "warm-up request done"),
            Err(error) => {
                tracing::debug!(url = %url, %error, "warm-up request failed");
                self.report
                    .emit(ReportEvent::WarmupFailed {
                        error: error.to_string(),
                    })
                    .await;
            }
        }
    }

    async fn process_item(
        item: CandidateItem,
        fetcher: Arc<dyn Fetcher>,
        registry: Arc<AdapterRegistry>,
        config: Arc<Config>,
        session: Session,
        report: ReportHandle,
        aborted: Arc<AtomicBool>,
    ) -> TaskResult {
        let link = item.link.clone();
        let adapter = registry.resolve(&link);
        tracing::debug!(link = %link, site = adapter.name(), "processing candidate");

        let detail_url = adapter.detail_url(&link);
        let page = match timed_get(fetcher.as_ref(), &detail_url, &session, "detail").await {
            Ok(page) => page,
            Err(error) => return Self::item_failed(&report, link, error.into()).await,
        };

        if landed_on_login(&page.final_url) {
            aborted.store(true, Ordering::SeqCst);
            tracing::error!(link = %link, final_url = %page.final_url, "request landed on the login page");
            return TaskResult::Fatal;
        }

        let finding = match adapter
            .extract_discount(&link, &page, fetcher.as_ref(), &session)
            .await
        {
            Ok(finding) => finding,
            Err(error) if error.is_credential_rejection() => {
                aborted.store(true, Ordering::SeqCst);
                tracing::error!(link = %link, %error, "session credentials refused");
                return TaskResult::Fatal;
            }
            Err(error) => return Self::item_failed(&report, link, error.into()).await,
        };

        let hit_and_run = adapter.detect_hit_and_run(&page.body);

        let (seeders, leechers) = if config.policy.wants_peers() {
            let rosters = fetch_peers(
                adapter,
                &link,
                &page,
                fetcher.as_ref(),
                &session,
                config.pipeline.malformed_peer_rows,
            )
            .await;
            match rosters {
                Ok(rosters) => rosters,
                Err(error) => return Self::item_failed(&report, link, error.into()).await,
            }
        } else {
            (Vec::new(), Vec::new())
        };

        let extraction = ExtractionResult {
            discount: finding.discount,
            expiry: finding.expiry,
            hit_and_run,
            seeders,
            leechers,
        };
        let decision = evaluate(&config.policy, &extraction, Local::now().naive_local());

        let (accepted, reason, remember) = match &decision {
            Decision::Accepted => (true, None, None),
            Decision::Rejected { reason, remember } => {
                (false, Some(reason.clone()), Some(*remember))
            }
        };
        let result = if accepted { "accepted" } else { "rejected" };
        metrics::ITEMS_DECIDED.with_label_values(&[result]).inc();
        tracing::info!(link = %link, site = adapter.name(), result, "candidate decided");
        report
            .emit(ReportEvent::ItemDecided {
                link,
                site: adapter.name().to_string(),
                accepted,
                reason,
                remember,
            })
            .await;

        TaskResult::Decided(ItemOutcome { item, decision })
    }

    async fn item_failed(report: &ReportHandle, link: String, error: ItemError) -> TaskResult {
        metrics::ITEM_FAILURES.inc();
        tracing::warn!(link = %link, %error, "candidate failed");
        report
            .emit(ReportEvent::ItemFailed {
                link: link.clone(),
                error: error.to_string(),
            })
            .await;
        TaskResult::Failed(ItemFailure { link, error })
    }
}

fn landed_on_login(final_url: &str) -> bool {
    LOGIN_MARKERS.iter().any(|marker| final_url.contains(marker))
}

async fn timed_get(
    fetcher: &dyn Fetcher,
    url: &str,
    session: &Session,
    kind: &str,
) -> Result<Page, FetchError> {
    let timer = metrics::FETCH_DURATION
        .with_label_values(&[kind])
        .start_timer();
    let result = fetcher.get(url, session).await;
    timer.observe_duration();
    result
}

async fn fetch_peers(
    adapter: &SiteAdapter,
    link: &str,
    detail_page: &Page,
    fetcher: &dyn Fetcher,
    session: &Session,
    mode: MalformedRowMode,
) -> Result<(Vec<PeerRecord>, Vec<PeerRecord>), FetchError> {
    match adapter.peer_rule() {
        PeerPageRule::Embedded => Ok(parse_peer_list(&detail_page.body, mode)),
        PeerPageRule::Unavailable => Ok((Vec::new(), Vec::new())),
        PeerPageRule::Standard | PeerPageRule::Rewrite { .. } => match adapter.peer_url(link) {
            Some(url) => {
                let page = timed_get(fetcher, &url, session, "peers").await?;
                Ok(parse_peer_list(&page.body, mode))
            }
            None => Ok((Vec::new(), Vec::new())),
        },
    }
}
