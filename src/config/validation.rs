use crate::config::types::{Config, OutputConfig, PipelineConfig, RendererConfig, SourceConfig};
use crate::sources;
use crate::{ConfigError, ConfigResult};
use std::collections::HashSet;
use url::Url;

/// Longest settle delay a source may be configured with (milliseconds)
const MAX_SETTLE_MS: u64 = 120_000;

/// Most retry attempts a failed fetch may get
const MAX_FETCH_RETRIES: u32 = 10;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_pipeline_config(&config.pipeline)?;
    validate_renderer_config(&config.renderer)?;
    validate_output_config(&config.output)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates pipeline configuration
fn validate_pipeline_config(config: &PipelineConfig) -> ConfigResult<()> {
    if config.max_fetch_retries > MAX_FETCH_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max-fetch-retries must be <= {}, got {}",
            MAX_FETCH_RETRIES, config.max_fetch_retries
        )));
    }

    Ok(())
}

/// Validates renderer configuration
fn validate_renderer_config(config: &RendererConfig) -> ConfigResult<()> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-timeout-secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the per-source override entries
fn validate_sources(entries: &[SourceConfig]) -> ConfigResult<()> {
    let mut seen = HashSet::new();

    for entry in entries {
        if !sources::is_known_source(&entry.name) {
            return Err(ConfigError::UnknownSource(entry.name.clone()));
        }

        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "source '{}' is configured more than once",
                entry.name
            )));
        }

        if let Some(max_items) = entry.max_items {
            if max_items < 1 {
                return Err(ConfigError::Validation(format!(
                    "max-items for '{}' must be >= 1, got {}",
                    entry.name, max_items
                )));
            }
        }

        for (key, value) in [
            ("listing-settle-ms", entry.listing_settle_ms),
            ("detail-settle-ms", entry.detail_settle_ms),
        ] {
            if let Some(ms) = value {
                if ms > MAX_SETTLE_MS {
                    return Err(ConfigError::Validation(format!(
                        "{} for '{}' must be <= {}ms, got {}ms",
                        key, entry.name, MAX_SETTLE_MS, ms
                    )));
                }
            }
        }

        if let Some(template) = &entry.listing_url {
            validate_listing_url(&entry.name, template)?;
        }
    }

    Ok(())
}

/// Validates a listing URL template
///
/// The `{page}` and `{start}` placeholders are substituted before parsing so
/// templates with and without a page cursor are checked the same way. A cursor
/// in the fragment never reaches the server, and `{start}` needs a storefront
/// with a known page size.
fn validate_listing_url(source: &str, template: &str) -> ConfigResult<()> {
    let cursors = ["{page}", "{start}"];
    if let Some((_, fragment)) = template.split_once('#') {
        if cursors.iter().any(|cursor| fragment.contains(cursor)) {
            return Err(ConfigError::Validation(format!(
                "listing-url for '{}' has its page cursor in the fragment",
                source
            )));
        }
    }

    if template.contains("{start}") {
        let page_size = sources::build_adapter(source).and_then(|a| a.profile().page_size);
        if page_size.is_none() {
            return Err(ConfigError::Validation(format!(
                "listing-url for '{}' uses {{start}} but the source has no page size",
                source
            )));
        }
    }

    let candidate = template.replace("{page}", "1").replace("{start}", "0");
    let url = Url::parse(&candidate).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid listing-url for '{}' ('{}'): {}",
            source, template, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "listing-url for '{}' must use http or https, got '{}'",
            source,
            url.scheme()
        )));
    }

    Ok(())
}
