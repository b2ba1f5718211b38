//! Wordery (UK)
//!
//! Wordery does not show a usable price on the product page, so every offer is
//! recorded at zero. A missing publication date falls back to today's date.

use crate::model::CanonicalTriple;
use crate::renderer::Document;
use crate::sources::normalize::{strip_boilerplate, DateGrammar};
use crate::sources::{assemble, collect_links, DetailFields, SourceAdapter, SourceProfile};
use crate::ExtractionFailure;
use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Duration;

static PROFILE: SourceProfile = SourceProfile {
    key: "wordery",
    retailer: "Wordery.com",
    listing_url: "https://wordery.com/historical-romance-FRH?viewBy=grid&resultsPerPage=20&page={page}&leadTime[]=express&formatGroup[]=paperback",
    first_page: 1,
    page_size: None,
    listing_settle: Duration::from_secs(5),
    detail_settle: Duration::from_secs(6),
    max_items: 500,
};

macro_rules! main_block {
    ($rest:literal) => {
        concat!("body > div:nth-of-type(4) > main", $rest)
    };
}

const TILE: &str = ".o-book-list__book";
const TILE_LINK: &str = ".c-book__body a";

const TITLE: &str = main_block!(" > div:nth-of-type(1) > div > div:nth-of-type(1) > h1");
const AUTHOR: &str = main_block!(" > div:nth-of-type(1) > div > div:nth-of-type(1) > p > a");
const DESCRIPTION: &str = main_block!(
    " > div:nth-of-type(3) > div > div:nth-of-type(1) > div:nth-of-type(1) > div > div > p:nth-of-type(1)"
);
const PUBLISHED: &str = main_block!(" > div:nth-of-type(1) > div > div:nth-of-type(1) > p > span");
const IMAGE: &str = main_block!(
    " > div:nth-of-type(1) > div > div:nth-of-type(1) > div > div:nth-of-type(1) > div:nth-of-type(1) > a > div > img"
);

/// Wordery historical romance paperbacks with express delivery
pub struct Wordery;

impl SourceAdapter for Wordery {
    fn profile(&self) -> &SourceProfile {
        &PROFILE
    }

    fn list_page(&self, page: &Document) -> Result<Vec<String>, ExtractionFailure> {
        collect_links(page, TILE, Some(TILE_LINK))
    }

    fn extract_detail(
        &self,
        url: &str,
        page: &Document,
    ) -> Result<CanonicalTriple, ExtractionFailure> {
        let title = strip_boilerplate(&page.require_text("title", TITLE)?, &["(Paperback)"]);
        let author = page.require_text("author", AUTHOR)?;
        let description = page.require_text("description", DESCRIPTION)?;
        let image_url = page.require_attr("image_url", IMAGE, "src")?;

        let published = page
            .query_selector(PUBLISHED)?
            .and_then(|span| span.attribute("content"));
        let publication_date = match published {
            Some(raw) => DateGrammar::Iso.parse("publication_date", &raw)?,
            None => {
                tracing::debug!(url, "no publication date, using today");
                Utc::now().date_naive()
            }
        };

        assemble(
            &PROFILE,
            url,
            DetailFields {
                title,
                author,
                description,
                publication_date,
                price: Decimal::ZERO,
                image_url,
            },
        )
    }
}
