//! Owl's Nest Books (Canada)
//!
//! The listing is a single page of up to 200 titles, so the listing URL has no
//! page cursor. The description sits in one of two places depending on whether
//! the page has a staff pick blurb.

use crate::model::CanonicalTriple;
use crate::renderer::Document;
use crate::sources::normalize::{
    first_segment, parse_price, strip_boilerplate, Boundary, DateGrammar,
};
use crate::sources::{assemble, collect_links, DetailFields, SourceAdapter, SourceProfile};
use crate::ExtractionFailure;
use std::time::Duration;

static PROFILE: SourceProfile = SourceProfile {
    key: "owls-nest",
    retailer: "OwlsNestBooks.com",
    listing_url: "https://owlsnestbooks.com/browse/filter/b/rankcaranked/s/fic/fic014/fic027/f/pb/l/200/v/popularity/x/LVvXTG8EsDDU",
    first_page: 1,
    page_size: None,
    listing_settle: Duration::from_secs(9),
    detail_settle: Duration::from_secs(9),
    max_items: 200,
};

macro_rules! content {
    ($rest:literal) => {
        concat!(
            "body > div:nth-of-type(1) > div > main > div:nth-of-type(7) > div > section",
            $rest
        )
    };
}

macro_rules! product {
    ($rest:literal) => {
        concat!(
            "body > div:nth-of-type(1) > div > main > div:nth-of-type(7) > div > section > main > div:nth-of-type(1)",
            $rest
        )
    };
}

const TILE: &str = "a[class='nav']";

const TITLE: &str = product!(" > div:nth-of-type(2) > h2");
const AUTHOR: &str = product!(" > div:nth-of-type(2) > strong > span > div");
const DESCRIPTION: &str = product!(
    " > div:nth-of-type(2) > div:nth-of-type(5) > div:nth-of-type(3) > div:nth-of-type(2) > div > div > span > div:nth-of-type(1) > b:nth-of-type(1)"
);
const DESCRIPTION_FALLBACK: &str = product!(
    " > div:nth-of-type(2) > div:nth-of-type(5) > div:nth-of-type(4) > div:nth-of-type(2) > div > div > span > div:nth-of-type(1) > p"
);
const PUBLISHED: &str =
    product!(" > div:nth-of-type(2) > div:nth-of-type(5) > button:nth-of-type(1) > span:nth-of-type(2)");
const IMAGE: &str = product!(
    " > div:nth-of-type(1) > div:nth-of-type(2) > div > div:nth-of-type(2) > div > img"
);
const PRICE: &str = content!(
    " > aside > div > div:nth-of-type(7) > div > div:nth-of-type(1) > span > strong:nth-of-type(1)"
);

const TITLE_NOISE: &[&str] = &["A Novel"];
const AUTHOR_NOISE: &[&str] = &["maple leaf from the flag of Canada"];

/// Owl's Nest popular historical fiction paperbacks
pub struct OwlsNest;

impl OwlsNest {
    fn description(page: &Document) -> Result<String, ExtractionFailure> {
        let element = match page.query_selector(DESCRIPTION)? {
            Some(element) => element,
            None => page.require("description", DESCRIPTION_FALLBACK)?,
        };
        Ok(first_segment(&element.text(), Boundary::Line))
    }
}

impl SourceAdapter for OwlsNest {
    fn profile(&self) -> &SourceProfile {
        &PROFILE
    }

    fn list_page(&self, page: &Document) -> Result<Vec<String>, ExtractionFailure> {
        collect_links(page, TILE, None)
    }

    fn extract_detail(
        &self,
        url: &str,
        page: &Document,
    ) -> Result<CanonicalTriple, ExtractionFailure> {
        let title = strip_boilerplate(&page.require_text("title", TITLE)?, TITLE_NOISE);
        let author = strip_boilerplate(&page.require_text("author", AUTHOR)?, AUTHOR_NOISE);
        let description = Self::description(page)?;
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
                publication_date: DateGrammar::PublishedMonthDayYear
                    .parse("publication_date", &published)?,
                price,
                image_url,
            },
        )
    }
}
