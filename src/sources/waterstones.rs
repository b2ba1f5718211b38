//! Waterstones (UK)

use crate::model::CanonicalTriple;
use crate::renderer::Document;
use crate::sources::normalize::{parse_price, strip_boilerplate, DateGrammar};
use crate::sources::{assemble, collect_links, DetailFields, SourceAdapter, SourceProfile};
use crate::ExtractionFailure;
use std::time::Duration;

static PROFILE: SourceProfile = SourceProfile {
    key: "waterstones",
    retailer: "Waterstones.com",
    listing_url: "https://www.waterstones.com/category/romantic-fiction/historical-romance/sortmode/bestselling/format/17/page/{page}",
    first_page: 1,
    page_size: None,
    listing_settle: Duration::from_secs(5),
    detail_settle: Duration::from_secs(5),
    max_items: 500,
};

macro_rules! product {
    ($rest:literal) => {
        concat!(
            "body > div:nth-of-type(1) > div:nth-of-type(2) > div:nth-of-type(2)",
            $rest
        )
    };
}

const TILE: &str = ".book-preview-grid-item";
const TILE_LINK: &str = ".info-wrap .title-wrap a";

const TITLE: &str = "#scope_book_title";
const AUTHOR: &str = "span[itemprop='author']";
const DESCRIPTION: &str = product!(
    " > section:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(1) > div:nth-of-type(1) > div:nth-of-type(1) > p"
);
const PUBLISHED: &str = "meta[itemprop='datePublished']";
const IMAGE: &str = "#scope_book_image";
const PRICE: &str = product!(
    " > section:nth-of-type(1) > div:nth-of-type(2) > div:nth-of-type(2) > div > div:nth-of-type(1) > div > div:nth-of-type(1) > div:nth-of-type(1) > b"
);

/// Waterstones historical romance paperbacks, bestselling first
pub struct Waterstones;

impl SourceAdapter for Waterstones {
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
        let published = page.require_attr("publication_date", PUBLISHED, "content")?;
        let image_url = page.require_attr("image_url", IMAGE, "src")?;
        let price = parse_price("price", &page.require_text("price", PRICE)?)?;

        assemble(
            &PROFILE,
            url,
            DetailFields {
                title,
                author,
                description,
                publication_date: DateGrammar::Iso.parse("publication_date", &published)?,
                price,
                image_url,
            },
        )
    }
}
