// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Compiled-in scrape configuration.
//!
//! Every value has a fixed default; the CLI may override a handful of them.

use crate::settle::SettlePolicy;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Catalog page scraped in phase one.
pub const DEFAULT_PAGE_URL: &str = "https://www.tokopedia.com/p/handphone-tablet/handphone?page=0";

/// Pause after navigating to the catalog page.
pub const LISTING_SETTLE: Duration = Duration::from_millis(5000);

/// Pause between the merchant heading appearing and reading it.
pub const MERCHANT_SETTLE: Duration = Duration::from_millis(2000);

/// Upper bound on waiting for the merchant heading to become visible.
pub const VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a single page navigation.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of concurrent detail-page fetches.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Default output file.
pub const DEFAULT_OUTPUT: &str = "scraped_data.csv";

/// Full configuration for one run.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeConfig {
    pub page_url: String,
    pub selectors: Selectors,
    pub settle: SettleConfig,
    pub browser: BrowserOptions,
    pub max_concurrent: usize,
    pub output: PathBuf,
    pub partial: PartialPolicy,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            selectors: Selectors::default(),
            settle: SettleConfig::default(),
            browser: BrowserOptions::default(),
            max_concurrent: DEFAULT_CONCURRENCY,
            output: PathBuf::from(DEFAULT_OUTPUT),
            partial: PartialPolicy::Discard,
        }
    }
}

/// CSS selectors and attribute names for both pages.
#[derive(Debug, Clone, Serialize)]
pub struct Selectors {
    /// One match per listing card on the catalog page.
    pub card: String,
    pub name: String,
    pub price: String,
    pub image: String,
    pub image_attr: String,
    pub link: String,
    pub link_attr: String,
    /// Merchant heading on the detail page.
    pub merchant: String,
    /// Rating number on the detail page.
    pub rating: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            card: ".e1nlzfl2".into(),
            name: ".css-20kt3o".into(),
            price: ".css-pp6b3e".into(),
            image: r#"img[class="success fade"]"#.into(),
            image_attr: "src".into(),
            link: r#"a[data-testid="lnkProductContainer"]"#.into(),
            link_attr: "href".into(),
            merchant: ".css-1wdzqxj-unf-heading".into(),
            rating: r#"span[data-testid="lblPDPDetailProductRatingNumber"]"#.into(),
        }
    }
}

/// Settle policies and wait bounds.
#[derive(Debug, Clone, Serialize)]
pub struct SettleConfig {
    /// Applied after navigating to the catalog page.
    pub listing: SettlePolicy,
    /// Applied after the merchant heading is visible.
    pub merchant: SettlePolicy,
    pub visibility_timeout: Duration,
    pub navigation_timeout: Duration,
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            listing: SettlePolicy::delay(LISTING_SETTLE),
            merchant: SettlePolicy::delay(MERCHANT_SETTLE),
            visibility_timeout: VISIBILITY_TIMEOUT,
            navigation_timeout: NAVIGATION_TIMEOUT,
        }
    }
}

impl SettleConfig {
    /// No pauses at all; used against in-memory renderers.
    pub fn immediate() -> Self {
        Self {
            listing: SettlePolicy::Immediate,
            merchant: SettlePolicy::Immediate,
            visibility_timeout: Duration::from_millis(500),
            navigation_timeout: Duration::from_secs(5),
        }
    }
}

/// Chromium launch options.
#[derive(Debug, Clone, Serialize)]
pub struct BrowserOptions {
    pub headless: bool,
    pub disable_http2: bool,
    pub disable_extensions: bool,
    pub fullscreen: bool,
    /// Explicit browser binary; discovered when `None`.
    pub executable: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            disable_http2: true,
            disable_extensions: true,
            fullscreen: true,
            executable: None,
        }
    }
}

impl BrowserOptions {
    /// Command-line switches passed to Chromium.
    pub fn args(&self) -> Vec<&'static str> {
        let mut args = Vec::new();
        if self.disable_http2 {
            args.push("--disable-http2");
        }
        if self.disable_extensions {
            args.push("--disable-extensions");
        }
        if self.fullscreen {
            args.push("--start-fullscreen");
        }
        args
    }
}

/// What to do with completed records when enrichment aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialPolicy {
    /// Write nothing.
    Discard,
    /// Write what was gathered to a `.partial` sibling of the output path.
    WritePartial,
}
