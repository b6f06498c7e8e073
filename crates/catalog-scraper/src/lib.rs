// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Catalog scraper library: two-phase product listing extraction.
//!
//! Phase one collects listing cards from a JavaScript-rendered catalog page.
//! Phase two visits every listing's detail page with bounded concurrency to
//! read the merchant and rating, tolerating per-field misses. The merged
//! records are written as CSV.

pub mod collector;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod limiter;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod redirect;
pub mod renderer;
pub mod settle;

pub use config::ScrapeConfig;
pub use error::ScrapeError;
pub use pipeline::{Pipeline, RunReport};
pub use record::Record;
