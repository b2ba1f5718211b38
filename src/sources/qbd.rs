//! QBD Books (Australia)

use crate::model::CanonicalTriple;
use crate::renderer::Document;
use crate::sources::normalize::{first_segment, parse_price, strip_boilerplate, Boundary, DateGrammar};
use crate::sources::{assemble, collect_links, DetailFields, SourceAdapter, SourceProfile};
use crate::ExtractionFailure;
use std::time::Duration;

static PROFILE: SourceProfile = SourceProfile {
    key: "qbd",
    retailer: "QBD.com",
    listing_url: "https://www.qbd.com.au/fiction/romance/best-sellers/{page}",
    first_page: 1,
    page_size: None,
    listing_settle: Duration::from_secs(3),
    detail_settle: Duration::from_secs(4),
    max_items: 500,
};

macro_rules! product_form {
    ($rest:literal) => {
        concat!(
            "body > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(1) > form > div:nth-of-type(1)",
            $rest
        )
    };
}

const TILE: &str = ".q2k21pt";
const TILE_LINK: &str = ".q2k21ptc a";

const TITLE: &str = "body > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(1) > h1";
const AUTHOR: &str = product_form!(" > div:nth-of-type(2) > div:nth-of-type(1) > span > a");
const DESCRIPTION: &str = product_form!(" > div:nth-of-type(2) > div:nth-of-type(7)");
const PUBLISHED: &str = product_form!(" > div:nth-of-type(2) > div:nth-of-type(3) > span");
const IMAGE: &str = product_form!(" > div:nth-of-type(1) > div img");
const PRICE: &str =
    product_form!(" > div:nth-of-type(3) > div:nth-of-type(1) > div > div:nth-of-type(1) > span");

/// QBD romance best sellers
pub struct Qbd;

impl SourceAdapter for Qbd {
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
        let title = strip_boilerplate(
            &page.require_text("title", TITLE)?,
            &["Collector's Edition"],
        );
        let author = page.require_text("author", AUTHOR)?;
        let description = first_segment(
            &page.require_text("description", DESCRIPTION)?,
            Boundary::Line,
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
                publication_date: DateGrammar::SlashDayMonthYear
                    .parse("publication_date", &published)?,
                price,
                image_url,
            },
        )
    }
}
