//! Shared fixtures for the integration tests
//!
//! `FixtureAdapter` reads a plain page layout so the tests can
//! generate whole storefronts with `stock` and serve them from a
//! `StaticRenderer`.

use bookmatch::crawler::CrawlPlan;
use bookmatch::model::CanonicalTriple;
use bookmatch::renderer::{Document, StaticRenderer};
use bookmatch::sources::normalize::{parse_price, DateGrammar};
use bookmatch::sources::{SourceAdapter, SourceProfile};
use bookmatch::{Book, ExtractionFailure, Offer};
use std::time::Duration;

/// Adapter for the generated test storefronts
pub struct FixtureAdapter {
    profile: SourceProfile,
    panic_on_listing: bool,
}

impl FixtureAdapter {
    pub fn new(key: &'static str, retailer: &'static str) -> Self {
        Self {
            profile: SourceProfile {
                key,
                retailer,
                listing_url: "https://fixture.test/list?page={page}",
                first_page: 1,
                page_size: None,
                listing_settle: Duration::ZERO,
                detail_settle: Duration::ZERO,
                max_items: 100,
            },
            panic_on_listing: false,
        }
    }

    /// An adapter whose listing parser panics, to simulate a crashing worker
    pub fn panicking(key: &'static str) -> Self {
        let mut adapter = Self::new(key, "Broken.test");
        adapter.panic_on_listing = true;
        adapter
    }
}

impl SourceAdapter for FixtureAdapter {
    fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    fn list_page(&self, page: &Document) -> Result<Vec<String>, ExtractionFailure> {
        if self.panic_on_listing {
            panic!("listing layout changed");
        }
        Ok(page
            .query_selector_all("a.item")?
            .into_iter()
            .filter_map(|a| a.attribute("href"))
            .collect())
    }

    fn extract_detail(
        &self,
        url: &str,
        page: &Document,
    ) -> Result<CanonicalTriple, ExtractionFailure> {
        let published = page.require_text("publication_date", ".published")?;
        let price = page.require_text("price", ".price")?;

        Ok(CanonicalTriple::new(
            Book {
                title: page.require_text("title", "h1")?,
                author: page.require_text("author", ".author")?,
                description: page.require_text("description", ".description")?,
                publication_date: DateGrammar::Iso.parse("publication_date", &published)?,
            },
            Offer {
                price: parse_price("price", &price)?,
                image_url: page.require_attr("image_url", "img.cover", "src")?,
                source_url: url.to_string(),
                retailer_name: self.profile.retailer.to_string(),
            },
        ))
    }
}

/// Listing URL template of a generated storefront
pub fn listing_template(key: &str) -> String {
    format!("https://{}.test/list?page={{page}}", key)
}

pub fn listing_url(key: &str, page: usize) -> String {
    format!("https://{}.test/list?page={}", key, page)
}

/// URL of the `item`-th book (1-based) on `page`
pub fn detail_url(key: &str, page: usize, item: usize) -> String {
    format!("https://{}.test/book/{}-{}", key, page, item)
}

pub fn title(key: &str, page: usize, item: usize) -> String {
    format!("{} book {}-{}", key, page, item)
}

/// A plan with no settle delays
pub fn plan(key: &str, retailer: &str, max_items: usize) -> CrawlPlan {
    CrawlPlan {
        source: key.to_string(),
        retailer: retailer.to_string(),
        listing_template: listing_template(key),
        first_page: 1,
        page_size: None,
        max_items,
        listing_settle: Duration::ZERO,
        detail_settle: Duration::ZERO,
        max_fetch_retries: 0,
        retry_delay: Duration::ZERO,
    }
}

pub fn listing_html(urls: &[String]) -> String {
    let links: String = urls
        .iter()
        .map(|url| format!("<li><a class=\"item\" href=\"{}\">Book</a></li>\n", url))
        .collect();
    format!("<html><body><ul class=\"results\">\n{}</ul></body></html>", links)
}

pub fn detail_html(title: &str, author: &str, description: &str) -> String {
    format!(
        r#"<html><body>
             <h1>{}</h1>
             <span class="author">{}</span>
             <div class="description">{}</div>
             <span class="published">2019-05-14</span>
             <span class="price">$12.50</span>
             <img class="cover" src="/covers/{}.jpg">
           </body></html>"#,
        title,
        author,
        description,
        title.replace(' ', "-")
    )
}

/// Adds a generated storefront to `renderer`
///
/// Page `n` lists `pages[n - 1]` books; the page after the last one is empty.
pub fn stock(mut renderer: StaticRenderer, key: &str, pages: &[usize]) -> StaticRenderer {
    for (index, &count) in pages.iter().enumerate() {
        let page = index + 1;
        let urls: Vec<String> = (1..=count).map(|item| detail_url(key, page, item)).collect();
        renderer = renderer.with_page(listing_url(key, page), listing_html(&urls));

        for item in 1..=count {
            renderer = renderer.with_page(
                detail_url(key, page, item),
                detail_html(&title(key, page, item), &format!("Author {}", key), "First edition"),
            );
        }
    }

    renderer.with_page(listing_url(key, pages.len() + 1), listing_html(&[]))
}
