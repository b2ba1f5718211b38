use crate::upsert::CommitMode;
use serde::Deserialize;

/// Main configuration structure for Bookmatch
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    pub output: OutputConfig,
    /// Per-source overrides; when empty every known source runs with its defaults
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Finds the override entry for a source, if any
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Whether a source takes part in a run
    ///
    /// Without any `[[source]]` entries every source is enabled. Once entries
    /// exist, only the listed sources whose `enabled` flag is set take part.
    pub fn is_enabled(&self, name: &str) -> bool {
        if self.sources.is_empty() {
            return true;
        }
        self.source(name).map(|s| s.enabled).unwrap_or(false)
    }
}

/// Pipeline behavior shared by all sources
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// How the three records of a triple are grouped into transactions
    #[serde(rename = "commit-mode", default)]
    pub commit_mode: CommitMode,

    /// Extra navigation attempts after a failed fetch
    #[serde(rename = "max-fetch-retries", default)]
    pub max_fetch_retries: u32,

    /// Pause between fetch attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            commit_mode: CommitMode::default(),
            max_fetch_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// HTTP renderer configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Overrides for one storefront
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source key, e.g. "waterstones"
    pub name: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum number of committed items per run
    #[serde(rename = "max-items")]
    pub max_items: Option<usize>,

    /// Wait after loading a listing page (milliseconds)
    #[serde(rename = "listing-settle-ms")]
    pub listing_settle_ms: Option<u64>,

    /// Wait after loading a detail page (milliseconds)
    #[serde(rename = "detail-settle-ms")]
    pub detail_settle_ms: Option<u64>,

    /// Listing URL template; `{page}` is replaced by the page index
    #[serde(rename = "listing-url")]
    pub listing_url: Option<String>,
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_user_agent() -> String {
    format!("bookmatch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_enabled() -> bool {
    true
}
