//! Canonical record model
//!
//! Every storefront is normalized into the same three records:
//!
//! - `Book`: one row per distinct (title, author)
//! - `Price`: the price seen at a source URL for a book, not retailer-scoped
//! - `ComparePrice`: the per-retailer price snapshot used for comparisons
//!
//! A detail page produces a `CanonicalTriple`, which holds the book and the
//! retailer offer. The offer only becomes a `Price`/`ComparePrice` pair once the
//! book has an id in the store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fmt;

/// Store-assigned row identifier
pub type RecordId = i64;

/// Kind of persisted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Book,
    Price,
    ComparePrice,
}

impl EntityKind {
    /// Name of the table holding this entity
    pub fn table(&self) -> &'static str {
        match self {
            Self::Book => "books",
            Self::Price => "prices",
            Self::ComparePrice => "compare_prices",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Book => "Book",
            Self::Price => "Price",
            Self::ComparePrice => "ComparePrice",
        };
        f.write_str(name)
    }
}

/// A record together with the id the store assigned to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored<T> {
    pub id: RecordId,
    pub record: T,
}

/// A book as listed by a retailer
///
/// Two books are equal when every field is equal; an existing row is only
/// rewritten when a fresh scrape differs from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub description: String,
    pub publication_date: NaiveDate,
}

impl Book {
    pub fn key(&self) -> BookKey {
        BookKey {
            title: self.title.clone(),
            author: self.author.clone(),
        }
    }
}

/// Identity key of a book
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookKey {
    pub title: String,
    pub author: String,
}

impl fmt::Display for BookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "title={:?}, author={:?}", self.title, self.author)
    }
}

/// The price of a book at a source URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price {
    pub price: Decimal,
    pub image_url: String,
    pub source_url: String,
    pub book_id: RecordId,
}

impl Price {
    pub fn key(&self) -> PriceKey {
        PriceKey {
            source_url: self.source_url.clone(),
            book_id: self.book_id,
            image_url: self.image_url.clone(),
        }
    }
}

/// Identity key of a price
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PriceKey {
    pub source_url: String,
    pub book_id: RecordId,
    pub image_url: String,
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source_url={:?}, book_id={}, image_url={:?}",
            self.source_url, self.book_id, self.image_url
        )
    }
}

/// The price of a book at one retailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparePrice {
    pub price: Decimal,
    pub image_url: String,
    pub source_url: String,
    pub book_id: RecordId,
    pub retailer_name: String,
}

impl ComparePrice {
    pub fn key(&self) -> ComparePriceKey {
        ComparePriceKey {
            source_url: self.source_url.clone(),
            book_id: self.book_id,
            retailer_name: self.retailer_name.clone(),
            image_url: self.image_url.clone(),
        }
    }
}

/// Identity key of a retailer price snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparePriceKey {
    pub source_url: String,
    pub book_id: RecordId,
    pub retailer_name: String,
    pub image_url: String,
}

impl fmt::Display for ComparePriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source_url={:?}, book_id={}, retailer={:?}, image_url={:?}",
            self.source_url, self.book_id, self.retailer_name, self.image_url
        )
    }
}

/// What a retailer charges for a book, before the book has an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offer {
    pub price: Decimal,
    pub image_url: String,
    pub source_url: String,
    pub retailer_name: String,
}

/// The normalized output of one detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTriple {
    pub book: Book,
    pub offer: Offer,
}

impl CanonicalTriple {
    pub fn new(book: Book, offer: Offer) -> Self {
        Self { book, offer }
    }

    /// The `Price` record of this triple once the book is stored as `book_id`
    pub fn price_for(&self, book_id: RecordId) -> Price {
        Price {
            price: self.offer.price,
            image_url: self.offer.image_url.clone(),
            source_url: self.offer.source_url.clone(),
            book_id,
        }
    }

    /// The `ComparePrice` record of this triple once the book is stored as `book_id`
    pub fn compare_price_for(&self, book_id: RecordId) -> ComparePrice {
        ComparePrice {
            price: self.offer.price,
            image_url: self.offer.image_url.clone(),
            source_url: self.offer.source_url.clone(),
            book_id,
            retailer_name: self.offer.retailer_name.clone(),
        }
    }
}
