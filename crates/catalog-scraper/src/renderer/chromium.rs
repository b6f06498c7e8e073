// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium-based renderer using chromiumoxide.

use super::{ElementHandle, NavigationResult, RenderContext, RenderError, RenderResult, Renderer};
use crate::config::BrowserOptions;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::CloseParams;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Interval between visibility probes.
const VISIBILITY_POLL: Duration = Duration::from_millis(100);

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    // 1. CATALOG_SCRAPER_CHROMIUM env
    if let Ok(p) = std::env::var("CATALOG_SCRAPER_CHROMIUM") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. user cache dir
    if let Some(cache) = dirs::cache_dir() {
        let base = cache.join("catalog-scraper");
        let candidates = if cfg!(target_os = "macos") {
            vec![
                base.join("chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                base.join("chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                base.join("chrome"),
            ]
        } else {
            vec![base.join("chrome-linux64/chrome"), base.join("chrome")]
        };
        if let Some(found) = candidates.into_iter().find(|c| c.exists()) {
            return Some(found);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer: one browser process shared by every context.
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch Chromium with the given options.
    pub async fn launch(options: &BrowserOptions) -> RenderResult<Self> {
        let chrome_path = find_chromium(options.executable.as_deref()).ok_or_else(|| {
            RenderError::Browser(
                "Chromium not found. Set CATALOG_SCRAPER_CHROMIUM or install google-chrome."
                    .into(),
            )
        })?;
        debug!("using Chromium at {}", chrome_path.display());

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        builder = if options.headless {
            builder.new_headless_mode()
        } else {
            builder.with_head()
        };
        if options.fullscreen {
            builder = builder.viewport(None::<Viewport>);
        }
        for arg in options.args() {
            builder = builder.arg(arg);
        }
        let config = builder
            .build()
            .map_err(|e| RenderError::Browser(format!("failed to build browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Browser(format!("failed to launch Chromium: {e}")))?;

        // Drive the CDP connection until the browser goes away.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {e}");
                }
            }
        });

        Ok(Self {
            browser,
            handler,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Context(format!("failed to create new page: {e}")))?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page: Some(page),
            elements: Vec::new(),
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> RenderResult<()> {
        let closed = self
            .browser
            .execute(CloseParams::default())
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Browser(format!("failed to close browser: {e}")));
        // The process itself is reaped when the Browser is dropped.
        self.handler.abort();
        closed
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium tab.
///
/// Closing is explicit; a context dropped without `close` (panic, task
/// abort) schedules the tab close on the runtime instead.
pub struct ChromiumContext {
    page: Option<Page>,
    /// Elements matched by `query_all`, indexed by `ElementHandle`.
    elements: Vec<Element>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumContext {
    fn page(&self) -> RenderResult<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::Context("context already closed".into()))
    }

    fn element(&self, handle: ElementHandle) -> RenderResult<&Element> {
        self.elements
            .get(handle.0)
            .ok_or(RenderError::StaleHandle(handle.0))
    }

    async fn child(&self, handle: ElementHandle, selector: &str) -> RenderResult<Element> {
        self.element(handle)?
            .find_element(selector)
            .await
            .map_err(|_| RenderError::NotFound {
                selector: selector.to_string(),
            })
    }

    async fn is_visible(&self, selector: &str) -> RenderResult<bool> {
        let quoted = serde_json::to_string(selector)
            .map_err(|e| RenderError::Script(format!("bad selector: {e}")))?;
        let script = format!(
            "(() => {{ const el = document.querySelector({quoted}); if (!el) return false; \
             const r = el.getBoundingClientRect(); const s = window.getComputedStyle(el); \
             return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }})()"
        );
        let result = self
            .page()?
            .evaluate(script)
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?;
        result
            .into_value::<bool>()
            .map_err(|e| RenderError::Script(format!("failed to convert JS result: {e:?}")))
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> RenderResult<NavigationResult> {
        let start = Instant::now();
        self.elements.clear();
        let page = self.page()?;

        let result = tokio::time::timeout(timeout, page.goto(url)).await;
        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => Err(RenderError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(RenderError::Navigation {
                url: url.to_string(),
                reason: format!("timed out after {}ms", timeout.as_millis()),
            }),
        }
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> RenderResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            // Probe errors mid-load are expected; keep polling until the deadline.
            if let Ok(true) = self.is_visible(selector).await {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(RenderError::Timeout {
                    selector: selector.to_string(),
                    after: timeout,
                });
            }
            tokio::time::sleep(VISIBILITY_POLL).await;
        }
    }

    async fn query_all(&mut self, selector: &str) -> RenderResult<Vec<ElementHandle>> {
        let found = self
            .page()?
            .find_elements(selector)
            .await
            .map_err(|_| RenderError::NotFound {
                selector: selector.to_string(),
            })?;

        let start = self.elements.len();
        self.elements.extend(found);
        Ok((start..self.elements.len()).map(ElementHandle).collect())
    }

    async fn text(&self, selector: &str) -> RenderResult<String> {
        let element = self
            .page()?
            .find_element(selector)
            .await
            .map_err(|_| RenderError::NotFound {
                selector: selector.to_string(),
            })?;
        let text = element
            .inner_text()
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn text_in(&self, handle: ElementHandle, selector: &str) -> RenderResult<String> {
        let text = self
            .child(handle, selector)
            .await?
            .inner_text()
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute_in(
        &self,
        handle: ElementHandle,
        selector: &str,
        name: &str,
    ) -> RenderResult<String> {
        self.child(handle, selector)
            .await?
            .attribute(name)
            .await
            .map_err(|e| RenderError::Script(e.to_string()))?
            .ok_or_else(|| RenderError::MissingAttribute {
                selector: selector.to_string(),
                name: name.to_string(),
            })
    }

    async fn close(mut self: Box<Self>) -> RenderResult<()> {
        self.elements.clear();
        if let Some(page) = self.page.take() {
            self.active_count.fetch_sub(1, Ordering::Relaxed);
            page.close()
                .await
                .map_err(|e| RenderError::Context(format!("failed to close page: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        warn!("failed to close abandoned page: {e}");
                    }
                });
            }
            Err(_) => warn!("page dropped outside the runtime; leaving it to the browser"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_missing_executable_is_not_found() {
        let missing = Path::new("/definitely/not/a/chrome");
        assert!(find_chromium(Some(missing)).is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_query_and_extract() {
        let options = BrowserOptions {
            headless: true,
            fullscreen: false,
            ..BrowserOptions::default()
        };
        let renderer = ChromiumRenderer::launch(&options)
            .await
            .expect("failed to launch renderer");
        let mut ctx = renderer
            .new_context()
            .await
            .expect("failed to create context");

        ctx.navigate(
            "data:text/html,<div class='card'><span class='n'>Phone</span>\
             <a href='https://shop.example/p/1'>x</a></div><h1 class='m'>Toko</h1>",
            Duration::from_secs(10),
        )
        .await
        .expect("navigation failed");

        ctx.wait_visible(".m", Duration::from_secs(5))
            .await
            .expect("heading never visible");
        assert_eq!(ctx.text(".m").await.unwrap(), "Toko");

        let cards = ctx.query_all(".card").await.expect("query failed");
        assert_eq!(cards.len(), 1);
        assert_eq!(ctx.text_in(cards[0], ".n").await.unwrap(), "Phone");
        assert_eq!(
            ctx.attribute_in(cards[0], "a", "href").await.unwrap(),
            "https://shop.example/p/1"
        );
        assert!(matches!(
            ctx.attribute_in(cards[0], "a", "data-missing").await,
            Err(RenderError::MissingAttribute { .. })
        ));

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);

        renderer.shutdown().await.expect("shutdown failed");
    }
}
