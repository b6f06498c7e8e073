// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Phase one: turn the catalog page's listing cards into records.
//!
//! The collector is strict: any card missing a field aborts the run.

use crate::config::{Selectors, SettleConfig};
use crate::error::{Result, ScrapeError};
use crate::progress::{ProgressEventKind, ProgressReporter};
use crate::record::{Field, Record};
use crate::redirect;
use crate::renderer::{ElementHandle, RenderContext, RenderError, Renderer};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

pub struct ListingCollector {
    renderer: Arc<dyn Renderer>,
    selectors: Selectors,
    settle: SettleConfig,
    progress: ProgressReporter,
}

impl ListingCollector {
    pub fn new(renderer: Arc<dyn Renderer>, selectors: Selectors, settle: SettleConfig) -> Self {
        Self {
            renderer,
            selectors,
            settle,
            progress: ProgressReporter::disabled(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Load `page_url` and extract one record per listing card, in DOM order.
    pub async fn collect(&self, page_url: &str) -> Result<Vec<Record>> {
        let mut ctx = self
            .renderer
            .new_context()
            .await
            .map_err(|source| ScrapeError::ContextSetup {
                url: page_url.to_string(),
                source,
            })?;

        let result = self.collect_in(ctx.as_mut(), page_url).await;

        if let Err(e) = ctx.close().await {
            debug!("closing listing context: {e}");
        }
        result
    }

    async fn collect_in(&self, ctx: &mut dyn RenderContext, page_url: &str) -> Result<Vec<Record>> {
        info!("navigating to {page_url}");
        let nav_err = |source: RenderError| ScrapeError::Navigation {
            url: page_url.to_string(),
            source,
        };
        let nav = ctx
            .navigate(page_url, self.settle.navigation_timeout)
            .await
            .map_err(nav_err)?;
        debug!(load_ms = nav.load_time_ms, "catalog page loaded");

        self.settle.listing.settle(ctx).await.map_err(nav_err)?;

        let cards = ctx
            .query_all(&self.selectors.card)
            .await
            .map_err(nav_err)?;
        if cards.is_empty() {
            return Err(ScrapeError::NoListings {
                selector: self.selectors.card.clone(),
            });
        }
        info!(cards = cards.len(), "listing cards found");

        let base = Url::parse(page_url).ok();
        let mut records = Vec::with_capacity(cards.len());
        for (index, card) in cards.into_iter().enumerate() {
            let record = self.extract(ctx, index, card, base.as_ref()).await?;
            debug!(index, name = %record.name, url = %record.detail_reference, "listing collected");
            self.progress.emit(ProgressEventKind::ListingCollected {
                index,
                name: record.name.clone(),
            });
            records.push(record);
        }
        Ok(records)
    }

    async fn extract(
        &self,
        ctx: &dyn RenderContext,
        index: usize,
        card: ElementHandle,
        base: Option<&Url>,
    ) -> Result<Record> {
        let s = &self.selectors;
        let failed = |field: Field| move |source: RenderError| ScrapeError::Extraction {
            index,
            field,
            source,
        };

        let name = ctx
            .text_in(card, &s.name)
            .await
            .map_err(failed(Field::Name))?;
        let price = ctx
            .text_in(card, &s.price)
            .await
            .map_err(failed(Field::Price))?;
        let image_url = ctx
            .attribute_in(card, &s.image, &s.image_attr)
            .await
            .map_err(failed(Field::ImageUrl))?;
        let link = ctx
            .attribute_in(card, &s.link, &s.link_attr)
            .await
            .map_err(failed(Field::DetailReference))?;

        let detail_reference = resolve_detail_reference(index, &link, base)?;

        Ok(Record::listing(
            name.trim(),
            price.trim(),
            image_url.trim(),
            detail_reference,
        ))
    }
}

/// Unwrap a redirect-wrapped link and make it an absolute http(s) URL.
pub fn resolve_detail_reference(index: usize, link: &str, base: Option<&Url>) -> Result<String> {
    let link = link.trim();
    let unwrapped = if redirect::is_wrapped(link) {
        redirect::unwrap_link(link).map_err(|source| ScrapeError::RedirectDecode {
            index,
            link: link.to_string(),
            source,
        })?
    } else {
        link.to_string()
    };

    let invalid = |reason: String| ScrapeError::InvalidDetailReference {
        index,
        link: unwrapped.clone(),
        reason,
    };

    // Absolute links are kept verbatim; only relative ones take the joined form.
    let (parsed, resolved) = match Url::parse(&unwrapped) {
        Ok(url) => (url, unwrapped.clone()),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => {
                let joined = base.join(&unwrapped).map_err(|e| invalid(e.to_string()))?;
                let text = joined.to_string();
                (joined, text)
            }
            None => return Err(invalid("relative link without a base URL".into())),
        },
        Err(e) => return Err(invalid(e.to_string())),
    };

    match parsed.scheme() {
        "http" | "https" => Ok(resolved),
        other => Err(invalid(format!("unsupported scheme `{other}`"))),
    }
}
