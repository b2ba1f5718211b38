//! HTTP renderer
//!
//! Fetches static HTML with reqwest. No scripts are executed, so it suits
//! storefronts that render product data server-side and replayed captures.
//!
//! Response classification:
//!
//! | Condition | Error |
//! |-----------|-------|
//! | non-2xx status | `Status` |
//! | Content-Type not HTML | `ContentMismatch` |
//! | timeout | `Timeout` |
//! | connection refused / DNS / TLS | `Connect` |
//! | anything else | `Http` |

use crate::config::RendererConfig;
use crate::renderer::{parse_target, PageRenderer, RenderError, RenderedPage};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Renderer backed by a plain HTTP client
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    /// Builds a renderer with the configured user agent and timeouts
    ///
    /// # Arguments
    ///
    /// * `config` - The renderer configuration
    ///
    /// # Returns
    ///
    /// * `Ok(HttpRenderer)` - Successfully built renderer
    /// * `Err(RenderError::Client)` - Failed to build the HTTP client
    pub fn new(config: &RendererConfig) -> Result<Self, RenderError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(Policy::limited(10))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(RenderError::Client)?;

        Ok(Self { client })
    }

    fn classify(url: &str, error: reqwest::Error) -> RenderError {
        if error.is_timeout() {
            RenderError::Timeout {
                url: url.to_string(),
            }
        } else if error.is_connect() {
            RenderError::Connect {
                url: url.to_string(),
            }
        } else {
            RenderError::Http {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn navigate(&self, url: &str) -> Result<RenderedPage, RenderError> {
        let target = parse_target(url)?;

        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") {
            return Err(RenderError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        let final_url = response.url().clone();
        let html = response.text().await.map_err(|e| Self::classify(url, e))?;

        tracing::trace!(url = %final_url, bytes = html.len(), "page loaded");

        Ok(RenderedPage {
            url: final_url,
            html,
        })
    }
}
