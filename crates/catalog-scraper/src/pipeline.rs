// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pipeline orchestrator: collect, enrich, write.

use crate::collector::ListingCollector;
use crate::config::{PartialPolicy, ScrapeConfig};
use crate::error::Result;
use crate::fetcher::{DetailFetcher, Enricher};
use crate::limiter::ConcurrencyLimiter;
use crate::output;
use crate::progress::{Phase, ProgressEventKind, ProgressReporter};
use crate::record::Record;
use crate::renderer::Renderer;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub records: usize,
    pub merchants_found: usize,
    pub ratings_found: usize,
    pub warnings: usize,
    pub output: PathBuf,
    pub elapsed_ms: u64,
}

impl RunReport {
    fn new(records: &[Record], warnings: usize, output: PathBuf, elapsed_ms: u64) -> Self {
        Self {
            records: records.len(),
            merchants_found: records.iter().filter(|r| r.merchant.is_some()).count(),
            ratings_found: records.iter().filter(|r| r.rating.is_some()).count(),
            warnings,
            output,
            elapsed_ms,
        }
    }
}

/// Runs the two scrape phases against a shared renderer and writes the result.
pub struct Pipeline {
    renderer: Arc<dyn Renderer>,
    config: ScrapeConfig,
    enricher: Option<Arc<dyn Enricher>>,
    progress: ProgressReporter,
}

impl Pipeline {
    pub fn new(renderer: Arc<dyn Renderer>, config: ScrapeConfig) -> Self {
        Self {
            renderer,
            config,
            enricher: None,
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Replace the detail-page enricher (defaults to [`DetailFetcher`]).
    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();

        // Phase 1
        let phase = Instant::now();
        self.progress.emit(ProgressEventKind::PhaseStarted {
            phase: Phase::Listing,
        });
        let collector = ListingCollector::new(
            Arc::clone(&self.renderer),
            self.config.selectors.clone(),
            self.config.settle.clone(),
        )
        .with_progress(self.progress.clone());
        let records = collector.collect(&self.config.page_url).await?;
        let collected = records.len();
        info!("records after listing phase: {collected}");
        self.progress.emit(ProgressEventKind::PhaseCompleted {
            phase: Phase::Listing,
            records: collected,
            duration_ms: phase.elapsed().as_millis() as u64,
        });

        // Phase 2
        let phase = Instant::now();
        self.progress.emit(ProgressEventKind::PhaseStarted {
            phase: Phase::Enrichment,
        });
        let enricher: Arc<dyn Enricher> = match &self.enricher {
            Some(enricher) => Arc::clone(enricher),
            None => Arc::new(DetailFetcher::new(
                Arc::clone(&self.renderer),
                self.config.selectors.clone(),
                self.config.settle.clone(),
            )),
        };
        let limiter = ConcurrencyLimiter::new(self.config.max_concurrent)
            .with_progress(self.progress.clone());
        let batch = limiter.run_all(records, enricher).await;
        let warnings = batch.warning_count();
        let (records, aborted) = batch.into_parts();
        debug_assert_eq!(records.len(), collected);
        info!(
            warnings,
            "records after enrichment phase: {}",
            records.len()
        );
        self.progress.emit(ProgressEventKind::PhaseCompleted {
            phase: Phase::Enrichment,
            records: records.len(),
            duration_ms: phase.elapsed().as_millis() as u64,
        });

        if let Some(err) = aborted {
            error!("enrichment aborted: {err}");
            if self.config.partial == PartialPolicy::WritePartial {
                let path = output::partial_path(&self.config.output);
                warn!("writing partial results to {}", path.display());
                // The abort stays the reported error even if this write fails.
                let message = match output::write_csv(&path, &records) {
                    Ok(()) => format!("run aborted; partial results in {}", path.display()),
                    Err(write_err) => {
                        error!("partial results not saved: {write_err}");
                        format!("run aborted; partial results not saved: {write_err}")
                    }
                };
                self.progress.emit(ProgressEventKind::Warning { message });
            }
            return Err(err);
        }

        // Output
        let phase = Instant::now();
        self.progress.emit(ProgressEventKind::PhaseStarted {
            phase: Phase::Output,
        });
        output::write_csv(&self.config.output, &records)?;
        self.progress.emit(ProgressEventKind::PhaseCompleted {
            phase: Phase::Output,
            records: records.len(),
            duration_ms: phase.elapsed().as_millis() as u64,
        });

        let report = RunReport::new(
            &records,
            warnings,
            self.config.output.clone(),
            started.elapsed().as_millis() as u64,
        );
        self.progress.emit(ProgressEventKind::RunComplete {
            records: report.records,
            merchants_found: report.merchants_found,
            ratings_found: report.ratings_found,
            elapsed_ms: report.elapsed_ms,
        });
        Ok(report)
    }
}
