//! In-memory renderer serving pre-captured pages
//!
//! Used to replay saved storefront pages and to drive the crawl runner in tests
//! without a network.

use crate::renderer::{parse_target, PageRenderer, RenderError, RenderedPage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Fixture {
    Page(String),
    Failure(u16),
}

/// Renderer that answers from a URL-to-HTML map
///
/// Unknown URLs answer with HTTP 404.
#[derive(Debug, Default)]
pub struct StaticRenderer {
    pages: HashMap<String, Fixture>,
    visits: Mutex<Vec<String>>,
    closed: AtomicBool,
}

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `html` for `url`
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), Fixture::Page(html.into()));
        self
    }

    /// Answers `url` with the given HTTP status
    pub fn with_failure(mut self, url: impl Into<String>, status: u16) -> Self {
        self.pages.insert(url.into(), Fixture::Failure(status));
        self
    }

    /// Every URL navigated to, in order
    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn navigate(&self, url: &str) -> Result<RenderedPage, RenderError> {
        let target = parse_target(url)?;

        if let Ok(mut visits) = self.visits.lock() {
            visits.push(url.to_string());
        }

        match self.pages.get(url) {
            Some(Fixture::Page(html)) => Ok(RenderedPage {
                url: target,
                html: html.clone(),
            }),
            Some(Fixture::Failure(status)) => Err(RenderError::Status {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(RenderError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
