//! DOM query primitives over parsed HTML
//!
//! Selectors are CSS selectors. Link-like attributes (`href`, `src`) come back as
//! absolute URLs resolved against the page URL, the way a browser reports them.

use crate::ExtractionFailure;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose boundaries start a new line of text
const LINE_BREAKING: &[&str] = &[
    "br", "p", "div", "li", "ul", "ol", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "article", "blockquote",
];

/// A parsed page that can be queried
pub struct Document {
    html: Html,
    base: Url,
}

/// One element of a `Document`
#[derive(Clone, Copy)]
pub struct Element<'a> {
    inner: ElementRef<'a>,
    base: &'a Url,
}

impl Document {
    /// Parses `html` loaded from `base`
    pub fn parse(html: &str, base: Url) -> Self {
        Self {
            html: Html::parse_document(html),
            base,
        }
    }

    /// URL the page was loaded from
    pub fn url(&self) -> &Url {
        &self.base
    }

    /// First element matching `selector`, if any
    pub fn query_selector(&self, selector: &str) -> Result<Option<Element<'_>>, ExtractionFailure> {
        let parsed = compile(selector)?;
        Ok(self.html.select(&parsed).next().map(|inner| Element {
            inner,
            base: &self.base,
        }))
    }

    /// Every element matching `selector`, in document order
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element<'_>>, ExtractionFailure> {
        let parsed = compile(selector)?;
        Ok(self
            .html
            .select(&parsed)
            .map(|inner| Element {
                inner,
                base: &self.base,
            })
            .collect())
    }

    /// First element matching `selector`; absence is an extraction failure for `field`
    pub fn require(
        &self,
        field: &'static str,
        selector: &str,
    ) -> Result<Element<'_>, ExtractionFailure> {
        self.query_selector(selector)?
            .ok_or_else(|| ExtractionFailure::MissingElement {
                field,
                selector: selector.to_string(),
            })
    }

    /// Text of the first element matching `selector`
    pub fn require_text(
        &self,
        field: &'static str,
        selector: &str,
    ) -> Result<String, ExtractionFailure> {
        Ok(self.require(field, selector)?.text())
    }

    /// Attribute of the first element matching `selector`
    pub fn require_attr(
        &self,
        field: &'static str,
        selector: &str,
        attribute: &'static str,
    ) -> Result<String, ExtractionFailure> {
        self.require(field, selector)?
            .attribute(attribute)
            .ok_or_else(|| ExtractionFailure::MissingAttribute {
                field,
                selector: selector.to_string(),
                attribute,
            })
    }
}

impl<'a> Element<'a> {
    /// Rendered text of the element
    ///
    /// Runs of whitespace collapse to one space within a line. Block elements and
    /// `<br>` start new lines; blank lines are dropped.
    pub fn text(&self) -> String {
        let mut raw = String::new();
        for node in self.inner.descendants() {
            match node.value() {
                Node::Text(text) => raw.push_str(text),
                Node::Element(element) if LINE_BREAKING.iter().any(|n| *n == element.name()) => {
                    raw.push('\n')
                }
                _ => {}
            }
        }

        raw.lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// First descendant matching `selector`
    pub fn query_selector(&self, selector: &str) -> Result<Option<Element<'a>>, ExtractionFailure> {
        let parsed = compile(selector)?;
        let base = self.base;
        Ok(self
            .inner
            .select(&parsed)
            .next()
            .map(|inner| Element { inner, base }))
    }

    /// Value of attribute `name`
    ///
    /// `href` and `src` are resolved to absolute URLs; other attributes are
    /// returned as written.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let value = self.inner.value().attr(name)?;
        match name {
            "href" | "src" => resolve_link(value, self.base),
            _ => Some(value.to_string()),
        }
    }
}

fn compile(selector: &str) -> Result<Selector, ExtractionFailure> {
    Selector::parse(selector).map_err(|e| ExtractionFailure::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Resolves a link to an absolute http(s) URL
///
/// Returns None if the link should be ignored:
/// - empty or fragment-only links
/// - javascript:, mailto:, tel: and data: URIs
/// - anything that does not resolve to http or https
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
