//! Storefront adapters
//!
//! Each adapter knows one retailer's page structure: where the product tiles
//! sit on a listing page and where every field sits on a detail page. Navigation
//! and pacing belong to the crawl runner; adapters only read parsed documents.

mod dubray;
mod hpb;
pub mod normalize;
mod owls_nest;
mod qbd;
mod waterstones;
mod wordery;

pub use dubray::Dubray;
pub use hpb::Hpb;
pub use owls_nest::OwlsNest;
pub use qbd::Qbd;
pub use waterstones::Waterstones;
pub use wordery::Wordery;

use crate::model::{Book, CanonicalTriple, Offer};
use crate::renderer::Document;
use crate::ExtractionFailure;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Keys of every known storefront, in the order they are started
pub const SOURCE_KEYS: [&str; 6] = ["waterstones", "wordery", "hpb", "qbd", "dubray", "owls-nest"];

/// Static description of a storefront
#[derive(Debug, Clone)]
pub struct SourceProfile {
    /// Configuration key
    pub key: &'static str,
    /// Retailer name stored with every price snapshot
    pub retailer: &'static str,
    /// Listing URL; `{page}` is replaced by the page index and `{start}` by
    /// the offset of the page's first item. Without either placeholder the
    /// listing is a single page.
    pub listing_url: &'static str,
    /// Index of the first listing page
    pub first_page: u32,
    /// Items per listing page, for storefronts paged by `{start}`
    pub page_size: Option<u32>,
    /// Wait after loading a listing page
    pub listing_settle: Duration,
    /// Wait after loading a detail page
    pub detail_settle: Duration,
    /// Default item cap per run
    pub max_items: usize,
}

/// Per-storefront extraction rules
pub trait SourceAdapter: Send + Sync {
    /// Static description of the storefront
    fn profile(&self) -> &SourceProfile;

    /// Detail-page URLs on a listing page, in page order
    ///
    /// An empty result means the listing is exhausted.
    fn list_page(&self, page: &Document) -> Result<Vec<String>, ExtractionFailure>;

    /// Turns one detail page into a canonical triple
    ///
    /// # Arguments
    ///
    /// * `url` - The detail URL that was navigated to; stored as the source URL
    /// * `page` - The loaded detail page
    fn extract_detail(&self, url: &str, page: &Document)
        -> Result<CanonicalTriple, ExtractionFailure>;
}

/// Whether `key` names a known storefront
pub fn is_known_source(key: &str) -> bool {
    SOURCE_KEYS.iter().any(|known| *known == key)
}

/// Builds the adapter for `key`
pub fn build_adapter(key: &str) -> Option<Arc<dyn SourceAdapter>> {
    let adapter: Arc<dyn SourceAdapter> = match key {
        "waterstones" => Arc::new(Waterstones),
        "wordery" => Arc::new(Wordery),
        "hpb" => Arc::new(Hpb),
        "qbd" => Arc::new(Qbd),
        "dubray" => Arc::new(Dubray),
        "owls-nest" => Arc::new(OwlsNest),
        _ => return None,
    };
    Some(adapter)
}

/// Collects detail links from the product tiles of a listing page
///
/// `link` selects the anchor inside each tile; with `None` the tile itself is
/// the anchor. Tiles without a usable link are skipped.
pub(crate) fn collect_links(
    page: &Document,
    tile: &str,
    link: Option<&str>,
) -> Result<Vec<String>, ExtractionFailure> {
    let mut urls = Vec::new();

    for element in page.query_selector_all(tile)? {
        let anchor = match link {
            Some(selector) => element.query_selector(selector)?,
            None => Some(element),
        };

        if let Some(href) = anchor.and_then(|a| a.attribute("href")) {
            urls.push(href);
        }
    }

    Ok(urls)
}

/// Field values read from a detail page, before validation
pub(crate) struct DetailFields {
    pub title: String,
    pub author: String,
    pub description: String,
    pub publication_date: NaiveDate,
    pub price: Decimal,
    pub image_url: String,
}

/// Validates extracted fields and builds the triple
pub(crate) fn assemble(
    profile: &SourceProfile,
    url: &str,
    fields: DetailFields,
) -> Result<CanonicalTriple, ExtractionFailure> {
    let title = fields.title.trim().to_string();
    if title.is_empty() {
        return Err(ExtractionFailure::EmptyField { field: "title" });
    }

    let author = fields.author.trim().to_string();
    if author.is_empty() {
        return Err(ExtractionFailure::EmptyField { field: "author" });
    }

    Ok(CanonicalTriple::new(
        Book {
            title,
            author,
            description: fields.description.trim().to_string(),
            publication_date: fields.publication_date,
        },
        Offer {
            price: fields.price,
            image_url: fields.image_url,
            source_url: url.to_string(),
            retailer_name: profile.retailer.to_string(),
        },
    ))
}
