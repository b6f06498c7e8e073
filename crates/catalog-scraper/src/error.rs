// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fatal errors that abort a scrape run.
//!
//! Recoverable detail-page misses never appear here; they are reported as
//! [`FieldWarning`](crate::record::FieldWarning)s instead.

use crate::record::Field;
use crate::redirect::RedirectError;
use crate::renderer::RenderError;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    #[error("failed to start browser: {0}")]
    Browser(#[source] RenderError),

    #[error("failed to load catalog page {url}")]
    Navigation {
        url: String,
        #[source]
        source: RenderError,
    },

    #[error("listing {index}: could not extract {field}")]
    Extraction {
        index: usize,
        field: Field,
        #[source]
        source: RenderError,
    },

    #[error("listing {index}: could not decode redirect link {link}")]
    RedirectDecode {
        index: usize,
        link: String,
        #[source]
        source: RedirectError,
    },

    #[error("listing {index}: detail reference {link} is not navigable: {reason}")]
    InvalidDetailReference {
        index: usize,
        link: String,
        reason: String,
    },

    #[error("no listings match `{selector}`")]
    NoListings { selector: String },

    #[error("could not open browser context for {url}")]
    ContextSetup {
        url: String,
        #[source]
        source: RenderError,
    },

    #[error("enrichment task for listing {index} panicked: {message}")]
    TaskPanicked { index: usize, message: String },

    #[error("enrichment aborted: {fatal} fatal error(s), {not_attempted} listing(s) not attempted")]
    EnrichmentAborted {
        fatal: usize,
        not_attempted: usize,
        #[source]
        first: Box<ScrapeError>,
    },

    #[error("failed to write {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
