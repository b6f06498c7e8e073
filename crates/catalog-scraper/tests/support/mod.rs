//! In-memory renderer serving a scripted catalog page and detail pages.

#![allow(dead_code)]

use async_trait::async_trait;
use catalog_scraper::config::Selectors;
use catalog_scraper::renderer::{
    ElementHandle, NavigationResult, RenderContext, RenderError, RenderResult, Renderer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const CATALOG_URL: &str = "https://shop.example/catalog?page=0";

/// One listing card on the catalog page. `None` fields are absent from the DOM.
#[derive(Debug, Clone)]
pub struct Card {
    pub name: Option<String>,
    pub price: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
}

impl Card {
    pub fn new(name: &str, link: &str) -> Self {
        Self {
            name: Some(format!("  {name}\n")),
            price: Some("Rp1.999.000".into()),
            image: Some(format!("https://img.example/{name}.jpg")),
            link: Some(link.into()),
        }
    }
}

/// A detail page and which of its fields exist.
#[derive(Debug, Clone, Default)]
pub struct Detail {
    pub merchant: Option<String>,
    pub rating: Option<String>,
}

impl Detail {
    pub fn full(merchant: &str, rating: &str) -> Self {
        Self {
            merchant: Some(merchant.into()),
            rating: Some(rating.into()),
        }
    }
}

#[derive(Default)]
struct Counters {
    open: AtomicUsize,
    opened: AtomicUsize,
    navigating: AtomicUsize,
    max_navigating: AtomicUsize,
}

struct Site {
    selectors: Selectors,
    cards: Vec<Card>,
    details: HashMap<String, Detail>,
    nav_delay: Duration,
    /// 1-based index of the context request that fails.
    fail_context: Option<usize>,
    visited: Mutex<Vec<String>>,
}

/// Scripted renderer with instrumentation counters.
pub struct StubRenderer {
    site: Arc<Site>,
    counters: Arc<Counters>,
}

impl StubRenderer {
    pub fn new(cards: Vec<Card>) -> Self {
        Self {
            site: Arc::new(Site {
                selectors: Selectors::default(),
                cards,
                details: HashMap::new(),
                nav_delay: Duration::ZERO,
                fail_context: None,
                visited: Mutex::new(Vec::new()),
            }),
            counters: Arc::new(Counters::default()),
        }
    }

    fn site_mut(&mut self) -> &mut Site {
        Arc::get_mut(&mut self.site).expect("configure before use")
    }

    pub fn with_detail(mut self, url: &str, detail: Detail) -> Self {
        self.site_mut().details.insert(url.to_string(), detail);
        self
    }

    pub fn with_nav_delay(mut self, delay: Duration) -> Self {
        self.site_mut().nav_delay = delay;
        self
    }

    pub fn failing_context(mut self, nth: usize) -> Self {
        self.site_mut().fail_context = Some(nth);
        self
    }

    /// Highest number of navigations observed in flight at once.
    pub fn max_concurrent_navigations(&self) -> usize {
        self.counters.max_navigating.load(Ordering::SeqCst)
    }

    pub fn contexts_opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.site.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn new_context(&self) -> RenderResult<Box<dyn RenderContext>> {
        let nth = self.counters.opened.fetch_add(1, Ordering::SeqCst) + 1;
        if self.site.fail_context == Some(nth) {
            return Err(RenderError::Context(format!("context {nth} refused")));
        }
        self.counters.open.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubContext {
            site: Arc::clone(&self.site),
            counters: Arc::clone(&self.counters),
            page: Page::Blank,
        }))
    }

    async fn shutdown(&self) -> RenderResult<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.counters.open.load(Ordering::SeqCst)
    }
}

enum Page {
    Blank,
    Catalog,
    Detail(Detail),
}

struct StubContext {
    site: Arc<Site>,
    counters: Arc<Counters>,
    page: Page,
}

impl StubContext {
    fn card(&self, handle: ElementHandle) -> RenderResult<&Card> {
        match self.page {
            Page::Catalog => self
                .site
                .cards
                .get(handle.0)
                .ok_or(RenderError::StaleHandle(handle.0)),
            _ => Err(RenderError::StaleHandle(handle.0)),
        }
    }
}

fn not_found(selector: &str) -> RenderError {
    RenderError::NotFound {
        selector: selector.to_string(),
    }
}

#[async_trait]
impl RenderContext for StubContext {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> RenderResult<NavigationResult> {
        let now = self.counters.navigating.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_navigating.fetch_max(now, Ordering::SeqCst);
        if !self.site.nav_delay.is_zero() {
            tokio::time::sleep(self.site.nav_delay).await;
        }
        self.counters.navigating.fetch_sub(1, Ordering::SeqCst);
        self.site.visited.lock().unwrap().push(url.to_string());

        let page = if url == CATALOG_URL {
            Some(Page::Catalog)
        } else {
            self.site.details.get(url).cloned().map(Page::Detail)
        };
        match page {
            Some(page) => self.page = page,
            None => {
                self.page = Page::Blank;
                return Err(RenderError::Navigation {
                    url: url.to_string(),
                    reason: "404".into(),
                });
            }
        }
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: self.site.nav_delay.as_millis() as u64,
        })
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> RenderResult<()> {
        let visible = match &self.page {
            Page::Catalog => true,
            Page::Detail(d) => selector == self.site.selectors.merchant && d.merchant.is_some(),
            Page::Blank => false,
        };
        if visible {
            Ok(())
        } else {
            Err(RenderError::Timeout {
                selector: selector.to_string(),
                after: timeout,
            })
        }
    }

    async fn query_all(&mut self, selector: &str) -> RenderResult<Vec<ElementHandle>> {
        match self.page {
            Page::Catalog if selector == self.site.selectors.card => {
                Ok((0..self.site.cards.len()).map(ElementHandle).collect())
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn text(&self, selector: &str) -> RenderResult<String> {
        let Page::Detail(detail) = &self.page else {
            return Err(not_found(selector));
        };
        let s = &self.site.selectors;
        let value = if selector == s.merchant {
            detail.merchant.clone()
        } else if selector == s.rating {
            detail.rating.clone()
        } else {
            None
        };
        value.ok_or_else(|| not_found(selector))
    }

    async fn text_in(&self, handle: ElementHandle, selector: &str) -> RenderResult<String> {
        let card = self.card(handle)?;
        let s = &self.site.selectors;
        let value = if selector == s.name {
            card.name.clone()
        } else if selector == s.price {
            card.price.clone()
        } else {
            None
        };
        value.ok_or_else(|| not_found(selector))
    }

    async fn attribute_in(
        &self,
        handle: ElementHandle,
        selector: &str,
        name: &str,
    ) -> RenderResult<String> {
        let card = self.card(handle)?;
        let s = &self.site.selectors;
        let value = if selector == s.image && name == s.image_attr {
            card.image.clone()
        } else if selector == s.link && name == s.link_attr {
            card.link.clone()
        } else {
            None
        };
        value.ok_or_else(|| RenderError::MissingAttribute {
            selector: selector.to_string(),
            name: name.to_string(),
        })
    }

    async fn close(self: Box<Self>) -> RenderResult<()> {
        Ok(())
    }
}

impl Drop for StubContext {
    fn drop(&mut self) {
        self.counters.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `count` cards linking to `https://shop.example/p/{i}`, each with a full detail page.
pub fn full_catalog(count: usize) -> StubRenderer {
    let cards = (0..count)
        .map(|i| Card::new(&format!("Phone {i}"), &format!("https://shop.example/p/{i}")))
        .collect();
    (0..count).fold(StubRenderer::new(cards), |stub, i| {
        stub.with_detail(
            &format!("https://shop.example/p/{i}"),
            Detail::full(&format!("Toko {i}"), "4.9"),
        )
    })
}
