// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for live scrape telemetry.
//!
//! The pipeline and limiter emit `ProgressEvent`s, which flow through a
//! `tokio::sync::broadcast` channel to all subscribers (CLI status line,
//! tests). When no subscriber exists, events are silently dropped.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A progress event emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Monotonically increasing sequence number.
    pub seq: u64,
    /// The kind of progress event.
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// A phase has started.
    PhaseStarted { phase: Phase },
    /// A phase finished with `records` records in hand.
    PhaseCompleted {
        phase: Phase,
        records: usize,
        duration_ms: u64,
    },
    /// A listing card was turned into a record.
    ListingCollected { index: usize, name: String },
    /// A detail fetch was launched.
    DetailStarted { index: usize, url: String },
    /// A detail fetch finished, possibly with empty fields.
    DetailEnriched {
        index: usize,
        merchant_found: bool,
        rating_found: bool,
    },
    /// A detail fetch failed fatally.
    DetailFailed { index: usize, error: String },
    /// The run finished and output was written.
    RunComplete {
        records: usize,
        merchants_found: usize,
        ratings_found: usize,
        elapsed_ms: u64,
    },
    /// A non-fatal warning occurred.
    Warning { message: String },
}

/// Pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Phase one: catalog page listings.
    Listing,
    /// Phase two: concurrent detail-page fetches.
    Enrichment,
    /// Writing the output file.
    Output,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listing => write!(f, "Listing"),
            Self::Enrichment => write!(f, "Enrichment"),
            Self::Output => write!(f, "Output"),
        }
    }
}

/// Sender handle for emitting progress events.
///
/// Backed by a `tokio::sync::broadcast` channel so multiple listeners can
/// subscribe independently.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
///
/// 1024 events covers a full catalog page (a start and an end event per
/// listing plus phase markers) without lagging a slow reader.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(1024)
}

/// Cloneable emitter shared by the pipeline stages.
///
/// Sequence numbers are shared across clones so events from every stage
/// stay totally ordered.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    tx: Option<ProgressSender>,
    seq: Arc<AtomicU64>,
}

impl ProgressReporter {
    pub fn new(tx: ProgressSender) -> Self {
        Self {
            tx: Some(tx),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A reporter that drops every event.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Emit an event, ignoring send errors (no receivers listening).
    pub fn emit(&self, event: ProgressEventKind) {
        if let Some(ref sender) = self.tx {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = sender.send(ProgressEvent { seq, event });
        }
    }
}
