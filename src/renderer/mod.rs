//! Page renderer boundary
//!
//! The crawl runner never talks to the network directly. It asks a
//! `PageRenderer` to load a URL and gets back the page markup, which is then
//! queried through the synchronous `Document` API.
//!
//! Two renderers ship with the crate:
//! - `HttpRenderer` fetches static HTML over HTTP
//! - `StaticRenderer` serves pre-captured pages from memory

mod dom;
mod fixture;
mod http;

pub use dom::{resolve_link, Document, Element};
pub use fixture::StaticRenderer;
pub use http::HttpRenderer;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors raised while loading a page
///
/// Every variant is a transient fetch failure from the pipeline's point of view.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Timed out loading {url}")]
    Timeout { url: String },

    #[error("Could not connect to {url}")]
    Connect { url: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Expected HTML from {url}, got '{content_type}'")]
    ContentMismatch { url: String, content_type: String },

    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// A loaded page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Final URL after redirects
    pub url: Url,
    /// Page markup
    pub html: String,
}

impl RenderedPage {
    /// Parses the markup for querying
    ///
    /// The returned document is not `Send`; extract what you need from it before
    /// the next `.await`.
    pub fn document(&self) -> Document {
        Document::parse(&self.html, self.url.clone())
    }
}

/// Loads pages for the crawl runner
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Loads `url` and returns the rendered page
    async fn navigate(&self, url: &str) -> Result<RenderedPage, RenderError>;

    /// Releases renderer resources; called once after all workers finish
    async fn close(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Parses a URL for a renderer, mapping failures to `RenderError::InvalidUrl`
pub(crate) fn parse_target(url: &str) -> Result<Url, RenderError> {
    Url::parse(url).map_err(|e| RenderError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
