// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Renderer abstraction for browser-based page rendering.
//!
//! A `Renderer` is the shared browser session; a `RenderContext` is one
//! isolated tab derived from it. Concurrent tasks each open their own
//! context so page state never leaks between them.

pub mod chromium;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Failures reported by the rendering engine.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("no element matches `{selector}`")]
    NotFound { selector: String },

    #[error("element `{selector}` has no `{name}` attribute")]
    MissingAttribute { selector: String, name: String },

    #[error("`{selector}` not visible after {}ms", .after.as_millis())]
    Timeout { selector: String, after: Duration },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("unknown element handle {0}")]
    StaleHandle(usize),

    #[error("browser context error: {0}")]
    Context(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("script evaluation failed: {0}")]
    Script(String),
}

pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// Opaque reference to an element matched by [`RenderContext::query_all`].
///
/// Only valid within the context that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub usize);

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new isolated browser context (tab).
    async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> RenderResult<()>;
    /// Number of currently open contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> RenderResult<NavigationResult>;
    /// Wait until an element matching `selector` is rendered and visible.
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> RenderResult<()>;
    /// Match every element for `selector` on the current page.
    async fn query_all(&mut self, selector: &str) -> RenderResult<Vec<ElementHandle>>;
    /// Text of the first element matching `selector` on the page.
    async fn text(&self, selector: &str) -> RenderResult<String>;
    /// Text of the first descendant of `handle` matching `selector`.
    async fn text_in(&self, handle: ElementHandle, selector: &str) -> RenderResult<String>;
    /// Attribute `name` of the first descendant of `handle` matching `selector`.
    async fn attribute_in(
        &self,
        handle: ElementHandle,
        selector: &str,
        name: &str,
    ) -> RenderResult<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> RenderResult<()>;
}

/// A renderer that refuses to open contexts.
///
/// Used where no browser is available; every run against it fails at the
/// first context request.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>> {
        Err(RenderError::Context("browser not available".into()))
    }
    async fn shutdown(&self) -> RenderResult<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_renderer_refuses_contexts() {
        let renderer = NoopRenderer;
        let err = renderer.new_context().await.err().unwrap();
        assert!(matches!(err, RenderError::Context(_)));
        assert_eq!(renderer.active_contexts(), 0);
    }

    #[test]
    fn test_timeout_message_reports_millis() {
        let err = RenderError::Timeout {
            selector: ".heading".into(),
            after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "`.heading` not visible after 1500ms");
    }
}
