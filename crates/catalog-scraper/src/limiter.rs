// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded-concurrency fan-out of record enrichment.
//!
//! Each record gets its own task; at most `max_concurrent` run at once. The
//! limiter waits for every launched task before returning and collects a
//! tagged outcome per record instead of racing on the first error.

use crate::error::ScrapeError;
use crate::fetcher::Enricher;
use crate::progress::{ProgressEventKind, ProgressReporter};
use crate::record::{FieldWarning, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// How one record's enrichment ended.
#[derive(Debug)]
pub enum TaskOutcome {
    /// Both fields were read.
    Success,
    /// Finished, with some fields left empty.
    Warned(Vec<FieldWarning>),
    /// Failed in a way that aborts the batch.
    Fatal(ScrapeError),
    /// Never launched because the batch was already aborting.
    NotAttempted,
}

impl TaskOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Records after enrichment, with one outcome per record (same order).
#[derive(Debug)]
pub struct BatchReport {
    pub records: Vec<Record>,
    pub outcomes: Vec<TaskOutcome>,
}

impl BatchReport {
    pub fn fatal_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_fatal()).count()
    }

    pub fn not_attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TaskOutcome::NotAttempted))
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                TaskOutcome::Warned(w) => w.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn is_aborted(&self) -> bool {
        self.fatal_count() > 0
    }

    /// Split into the records and, if any task was fatal, the abort error.
    pub fn into_parts(self) -> (Vec<Record>, Option<ScrapeError>) {
        let fatal = self.fatal_count();
        let not_attempted = self.not_attempted();
        let first = self.outcomes.into_iter().find_map(|o| match o {
            TaskOutcome::Fatal(e) => Some(e),
            _ => None,
        });
        let error = first.map(|first| ScrapeError::EnrichmentAborted {
            fatal,
            not_attempted,
            first: Box::new(first),
        });
        (self.records, error)
    }
}

/// Raises the abort flag if a task unwinds.
struct AbortOnPanic(Arc<AtomicBool>);

impl Drop for AbortOnPanic {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.store(true, Ordering::SeqCst);
        }
    }
}

/// The panic payload as text, falling back to the join error itself.
fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Caps how many enrichment tasks run at once.
pub struct ConcurrencyLimiter {
    max_concurrent: usize,
    progress: ProgressReporter,
}

impl ConcurrencyLimiter {
    /// A limit of zero is treated as one.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Enrich every record, at most `max_concurrent` at a time.
    ///
    /// Returns once all launched tasks have finished. After the first fatal
    /// outcome no new tasks are launched; the rest are `NotAttempted`.
    pub async fn run_all(&self, records: Vec<Record>, enricher: Arc<dyn Enricher>) -> BatchReport {
        let total = records.len();
        let slots = Arc::new(Semaphore::new(self.max_concurrent));
        let abort = Arc::new(AtomicBool::new(false));
        let mut handles: Vec<(usize, JoinHandle<(Record, TaskOutcome)>)> = Vec::with_capacity(total);
        let mut outcomes: Vec<Option<TaskOutcome>> = (0..total).map(|_| None).collect();

        info!(total, max_concurrent = self.max_concurrent, "enriching records");

        for (index, record) in records.iter().enumerate() {
            let permit = match Arc::clone(&slots).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            if abort.load(Ordering::SeqCst) {
                drop(permit);
                warn!(index, "batch aborting; not launching remaining records");
                break;
            }

            debug!(index, url = %record.detail_reference, "launching detail fetch");
            self.progress.emit(ProgressEventKind::DetailStarted {
                index,
                url: record.detail_reference.clone(),
            });

            let mut owned = record.clone();
            let enricher = Arc::clone(&enricher);
            let abort = Arc::clone(&abort);
            let handle = tokio::spawn(async move {
                let _permit = permit;
                let _guard = AbortOnPanic(Arc::clone(&abort));
                let outcome = match enricher.enrich(&mut owned).await {
                    Ok(o) if o.is_clean() => TaskOutcome::Success,
                    Ok(o) => TaskOutcome::Warned(o.warnings),
                    Err(e) => {
                        abort.store(true, Ordering::SeqCst);
                        TaskOutcome::Fatal(e)
                    }
                };
                (owned, outcome)
            });
            handles.push((index, handle));
        }

        let mut records = records;
        for (index, handle) in handles {
            let outcome = match handle.await {
                Ok((record, outcome)) => {
                    records[index] = record;
                    outcome
                }
                Err(e) => TaskOutcome::Fatal(ScrapeError::TaskPanicked {
                    index,
                    message: panic_message(e),
                }),
            };

            let kind = match &outcome {
                TaskOutcome::Fatal(e) => ProgressEventKind::DetailFailed {
                    index,
                    error: e.to_string(),
                },
                _ => ProgressEventKind::DetailEnriched {
                    index,
                    merchant_found: records[index].merchant.is_some(),
                    rating_found: records[index].rating.is_some(),
                },
            };
            self.progress.emit(kind);
            outcomes[index] = Some(outcome);
        }

        let outcomes: Vec<TaskOutcome> = outcomes
            .into_iter()
            .map(|o| o.unwrap_or(TaskOutcome::NotAttempted))
            .collect();

        BatchReport { records, outcomes }
    }
}
