//! Dubray Books (Ireland)

use crate::model::CanonicalTriple;
use crate::renderer::Document;
use crate::sources::normalize::{first_segment, parse_price, Boundary, DateGrammar};
use crate::sources::{assemble, collect_links, DetailFields, SourceAdapter, SourceProfile};
use crate::ExtractionFailure;
use std::time::Duration;

static PROFILE: SourceProfile = SourceProfile {
    key: "dubray",
    retailer: "DubrayBooks.ie",
    listing_url: "https://www.dubraybooks.ie/category/historical-romance?page={page}&book_types=Paperback&sortBy=products",
    first_page: 1,
    page_size: None,
    listing_settle: Duration::from_secs(3),
    detail_settle: Duration::from_secs(4),
    max_items: 500,
};

const TILE: &str = ".product-card";
const TILE_LINK: &str = ".product-image a";

const TITLE: &str = "#product-title";
const AUTHOR: &str = "#product-authorname";
const DESCRIPTION: &str = "#product-description";
const PUBLISHED: &str = "body > div > div > main > div:nth-of-type(1) > div:nth-of-type(3) > div > div > div:nth-of-type(3) > div:nth-of-type(1) > p:nth-of-type(4) > span";
const IMAGE: &str = "#product-image";
const PRICE: &str = "#product-current-price";

/// Dubray historical romance paperbacks
pub struct Dubray;

impl SourceAdapter for Dubray {
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
        let title = page.require_text("title", TITLE)?;
        let author = page.require_text("author", AUTHOR)?;
        let description = first_segment(
            &page.require_text("description", DESCRIPTION)?,
            Boundary::LineOrSentence,
        );
        let published = page.require_text("publication_date", PUBLISHED)?;
        let image_url = page.require_attr("image_url", IMAGE, "src")?;
        let price = parse_price("price", &page.require_text("price", PRICE)?)?;

        assemble(
            &PROFILE,
            url,
            DetailFields {
                title,
                author,
                description,
                publication_date: DateGrammar::OrdinalDayMonthYear
                    .parse("publication_date", &published)?,
                price,
                image_url,
            },
        )
    }
}
