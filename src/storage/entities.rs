//! Row mappings for the canonical records

use crate::model::{Book, ComparePrice, EntityKind, Price, RecordId, Stored};
use crate::storage::traits::Entity;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Reads a decimal stored as text
fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Stored<Book>> {
    Ok(Stored {
        id: row.get(0)?,
        record: Book {
            title: row.get(1)?,
            author: row.get(2)?,
            description: row.get(3)?,
            publication_date: row.get(4)?,
        },
    })
}

fn price_from_row(row: &Row<'_>) -> rusqlite::Result<Stored<Price>> {
    Ok(Stored {
        id: row.get(0)?,
        record: Price {
            price: decimal_column(row, 1)?,
            image_url: row.get(2)?,
            source_url: row.get(3)?,
            book_id: row.get(4)?,
        },
    })
}

fn compare_price_from_row(row: &Row<'_>) -> rusqlite::Result<Stored<ComparePrice>> {
    Ok(Stored {
        id: row.get(0)?,
        record: ComparePrice {
            price: decimal_column(row, 1)?,
            image_url: row.get(2)?,
            source_url: row.get(3)?,
            book_id: row.get(4)?,
            retailer_name: row.get(5)?,
        },
    })
}

impl Entity for Book {
    const KIND: EntityKind = EntityKind::Book;

    fn describe_key(&self) -> String {
        self.key().to_string()
    }

    fn find_by_key(conn: &Connection, probe: &Self) -> rusqlite::Result<Vec<Stored<Self>>> {
        let mut stmt = conn.prepare(
            "SELECT id, title, author, description, publication_date
             FROM books WHERE title = ?1 AND author = ?2 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![probe.title, probe.author], book_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert(conn: &Connection, record: &Self) -> rusqlite::Result<RecordId> {
        conn.execute(
            "INSERT INTO books (title, author, description, publication_date)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.title,
                record.author,
                record.description,
                record.publication_date
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(conn: &Connection, id: RecordId, record: &Self) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE books SET title = ?1, author = ?2, description = ?3, publication_date = ?4
             WHERE id = ?5",
            params![
                record.title,
                record.author,
                record.description,
                record.publication_date,
                id
            ],
        )
    }

    fn load_all(conn: &Connection) -> rusqlite::Result<Vec<Stored<Self>>> {
        let mut stmt = conn.prepare(
            "SELECT id, title, author, description, publication_date FROM books ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], book_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl Entity for Price {
    const KIND: EntityKind = EntityKind::Price;

    fn describe_key(&self) -> String {
        self.key().to_string()
    }

    fn find_by_key(conn: &Connection, probe: &Self) -> rusqlite::Result<Vec<Stored<Self>>> {
        let mut stmt = conn.prepare(
            "SELECT id, price, image_url, source_url, book_id
             FROM prices WHERE source_url = ?1 AND book_id = ?2 AND image_url = ?3 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(
                params![probe.source_url, probe.book_id, probe.image_url],
                price_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert(conn: &Connection, record: &Self) -> rusqlite::Result<RecordId> {
        conn.execute(
            "INSERT INTO prices (price, image_url, source_url, book_id) VALUES (?1, ?2, ?3, ?4)",
            params![
                record.price.to_string(),
                record.image_url,
                record.source_url,
                record.book_id
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(conn: &Connection, id: RecordId, record: &Self) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE prices SET price = ?1, image_url = ?2, source_url = ?3, book_id = ?4
             WHERE id = ?5",
            params![
                record.price.to_string(),
                record.image_url,
                record.source_url,
                record.book_id,
                id
            ],
        )
    }

    fn load_all(conn: &Connection) -> rusqlite::Result<Vec<Stored<Self>>> {
        let mut stmt = conn
            .prepare("SELECT id, price, image_url, source_url, book_id FROM prices ORDER BY id")?;
        let rows = stmt
            .query_map([], price_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl Entity for ComparePrice {
    const KIND: EntityKind = EntityKind::ComparePrice;

    fn describe_key(&self) -> String {
        self.key().to_string()
    }

    fn find_by_key(conn: &Connection, probe: &Self) -> rusqlite::Result<Vec<Stored<Self>>> {
        let mut stmt = conn.prepare(
            "SELECT id, price, image_url, source_url, book_id, retailer_name
             FROM compare_prices
             WHERE source_url = ?1 AND book_id = ?2 AND retailer_name = ?3 AND image_url = ?4
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(
                params![
                    probe.source_url,
                    probe.book_id,
                    probe.retailer_name,
                    probe.image_url
                ],
                compare_price_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert(conn: &Connection, record: &Self) -> rusqlite::Result<RecordId> {
        conn.execute(
            "INSERT INTO compare_prices (price, image_url, source_url, book_id, retailer_name)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.price.to_string(),
                record.image_url,
                record.source_url,
                record.book_id,
                record.retailer_name
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update(conn: &Connection, id: RecordId, record: &Self) -> rusqlite::Result<usize> {
        conn.execute(
            "UPDATE compare_prices
             SET price = ?1, image_url = ?2, source_url = ?3, book_id = ?4, retailer_name = ?5
             WHERE id = ?6",
            params![
                record.price.to_string(),
                record.image_url,
                record.source_url,
                record.book_id,
                record.retailer_name,
                id
            ],
        )
    }

    fn load_all(conn: &Connection) -> rusqlite::Result<Vec<Stored<Self>>> {
        let mut stmt = conn.prepare(
            "SELECT id, price, image_url, source_url, book_id, retailer_name
             FROM compare_prices ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], compare_price_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
