// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Detail-page enrichment of a single record.

use crate::config::{Selectors, SettleConfig};
use crate::error::{Result, ScrapeError};
use crate::record::{Field, FieldWarning, Record};
use crate::renderer::{RenderContext, RenderResult, Renderer};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// What one enrichment produced, beyond the fields written to the record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichOutcome {
    /// Fields that could not be read and were left empty.
    pub warnings: Vec<FieldWarning>,
}

impl EnrichOutcome {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Fills detail fields of one record in place.
///
/// Implementations return `Err` only for failures that should abort the
/// whole batch; per-field misses belong in [`EnrichOutcome::warnings`].
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, record: &mut Record) -> Result<EnrichOutcome>;
}

/// Reads merchant and rating from a record's detail page.
pub struct DetailFetcher {
    renderer: Arc<dyn Renderer>,
    selectors: Selectors,
    settle: SettleConfig,
}

impl DetailFetcher {
    pub fn new(renderer: Arc<dyn Renderer>, selectors: Selectors, settle: SettleConfig) -> Self {
        Self {
            renderer,
            selectors,
            settle,
        }
    }

    async fn read_merchant(&self, ctx: &mut dyn RenderContext, url: &str) -> RenderResult<String> {
        ctx.navigate(url, self.settle.navigation_timeout).await?;
        ctx.wait_visible(&self.selectors.merchant, self.settle.visibility_timeout)
            .await?;
        self.settle.merchant.settle(ctx).await?;
        ctx.text(&self.selectors.merchant).await
    }
}

#[async_trait]
impl Enricher for DetailFetcher {
    async fn enrich(&self, record: &mut Record) -> Result<EnrichOutcome> {
        let url = record.detail_reference.clone();
        let mut ctx = self
            .renderer
            .new_context()
            .await
            .map_err(|source| ScrapeError::ContextSetup {
                url: url.clone(),
                source,
            })?;

        let mut outcome = EnrichOutcome::default();

        match self.read_merchant(ctx.as_mut(), &url).await {
            Ok(merchant) => record.merchant = Some(merchant.trim().to_string()),
            Err(e) => {
                warn!(product = %record.name, "merchant not found: {e}");
                outcome.warnings.push(FieldWarning {
                    field: Field::Merchant,
                    reason: e.to_string(),
                });
            }
        }

        match ctx.text(&self.selectors.rating).await {
            Ok(rating) => record.rating = Some(rating.trim().to_string()),
            Err(e) => {
                warn!(product = %record.name, "rating not found: {e}");
                outcome.warnings.push(FieldWarning {
                    field: Field::Rating,
                    reason: e.to_string(),
                });
            }
        }

        if let Err(e) = ctx.close().await {
            debug!("closing detail context for {url}: {e}");
        }

        Ok(outcome)
    }
}
