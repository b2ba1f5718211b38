//! Half Price Books (US)

use crate::model::CanonicalTriple;
use crate::renderer::Document;
use crate::sources::normalize::{first_segment, parse_price, Boundary, DateGrammar};
use crate::sources::{assemble, collect_links, DetailFields, SourceAdapter, SourceProfile};
use crate::ExtractionFailure;
use std::time::Duration;

static PROFILE: SourceProfile = SourceProfile {
    key: "hpb",
    retailer: "HPB.com",
    listing_url: "https://www.hpb.com/books/categories/romance/historical?prefn1=Format&prefv1=Paperback&prefn2=instorePickUpAvailableStores&prefv2=HPB-001&prefn3=subjectLevel4&prefv3=Regency%7cMedieval&sz=80&start={start}&srule=most-popular",
    first_page: 2,
    page_size: Some(80),
    listing_settle: Duration::from_secs(3),
    detail_settle: Duration::from_secs(4),
    max_items: 500,
};

macro_rules! product {
    ($rest:literal) => {
        concat!("body > div:nth-of-type(2) > div:nth-of-type(2)", $rest)
    };
}

const TILE: &str = ".product-grid-element";
const TILE_LINK: &str = ".product-tile .image-container a";

const TITLE: &str = product!(
    " > div:nth-of-type(1) > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(1) > div > h1"
);
const AUTHOR: &str = product!(
    " > div:nth-of-type(1) > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(1) > div > span > a > span"
);
const DESCRIPTION: &str = product!(
    " > div:nth-of-type(2) > div:nth-of-type(1) > div:nth-of-type(1) .multi-collapse"
);
const PUBLISHED: &str = product!(
    " > div:nth-of-type(2) > div:nth-of-type(1) > div:nth-of-type(2) > div > div > div > ul > li:nth-of-type(7) > span:nth-of-type(2)"
);
const IMAGE: &str = product!(
    " > div:nth-of-type(1) > div:nth-of-type(2) > div:nth-of-type(1) > div > div > div > div img"
);
const PRICE: &str = product!(
    " > div:nth-of-type(1) > div:nth-of-type(2) > div:nth-of-type(3) > div:nth-of-type(3) > div:nth-of-type(1) > div > div > div > span > span > span"
);

/// Half Price Books historical romance paperbacks available for store pickup
pub struct Hpb;

impl SourceAdapter for Hpb {
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
                publication_date: DateGrammar::YearOrIso.parse("publication_date", &published)?,
                price,
                image_url,
            },
        )
    }
}
