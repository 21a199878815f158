//! Structured batch events for callers that want more than the final
//! tally.
//!
//! The coordinator emits these through an injected [`ReportHandle`]
//! rather than global logger state, so embedders can route them
//! wherever they like. Every event is also logged through tracing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Batch event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportEvent {
    BatchStarted {
        total: usize,
    },
    /// The warm-up request failed. Informational: the batch goes on.
    WarmupFailed {
        error: String,
    },
    ItemDecided {
        link: String,
        site: String,
        accepted: bool,
        /// Rejection reason, absent on accept.
        reason: Option<String>,
        remember: Option<bool>,
    },
    /// The item stayed undecided after a non-fatal failure.
    ItemFailed {
        link: String,
        error: String,
    },
    /// A credential rejection stopped the batch.
    BatchAborted {
        link: String,
        undecided: usize,
    },
    BatchFinished {
        accepted: usize,
        rejected: usize,
        failed: usize,
    },
}

impl ReportEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::BatchStarted { .. } => "batch_started",
            Self::WarmupFailed { .. } => "warmup_failed",
            Self::ItemDecided { .. } => "item_decided",
            Self::ItemFailed { .. } => "item_failed",
            Self::BatchAborted { .. } => "batch_aborted",
            Self::BatchFinished { .. } => "batch_finished",
        }
    }
}

/// Envelope wrapping a report event with metadata
#[derive(Debug, Clone)]
pub struct ReportEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: ReportEvent,
}

/// Handle for emitting report events
///
/// This is cheaply cloneable and can be shared across tasks. Events
/// are sent through an async channel read by the embedding caller.
#[derive(Clone)]
pub struct ReportHandle {
    tx: Option<mpsc::Sender<ReportEnvelope>>,
}

impl ReportHandle {
    /// Create a new report handle from a channel sender
    pub fn new(tx: mpsc::Sender<ReportEnvelope>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A handle that silently drops every event, for callers that only
    /// care about the returned batch report.
    pub fn null() -> Self {
        Self { tx: None }
    }

    /// Emit a report event asynchronously
    ///
    /// This is non-blocking failure-wise. If the channel is full or
    /// closed, the error is logged but the caller is not failed.
    pub async fn emit(&self, event: ReportEvent) {
        let Some(tx) = &self.tx else { return };
        let envelope = ReportEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = tx.send(envelope).await {
            tracing::error!("Failed to emit report event: {}", e);
        }
    }

    /// Try to emit a report event without blocking
    ///
    /// Returns true if the event was sent successfully, false otherwise.
    pub fn try_emit(&self, event: ReportEvent) -> bool {
        let Some(tx) = &self.tx else { return true };
        let envelope = ReportEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to emit report event: {}", e);
                false
            }
        }
    }
}
