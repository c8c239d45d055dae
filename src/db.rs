use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::parser::ParseReport;

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS listings (
            id            INTEGER PRIMARY KEY,
            source_file   TEXT NOT NULL,
            page_index    INTEGER,
            position      INTEGER NOT NULL,
            account_name  TEXT NOT NULL,
            product_id    TEXT NOT NULL,
            parsed_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_listings_product ON listings(product_id);
        CREATE INDEX IF NOT EXISTS idx_listings_account ON listings(account_name);

        CREATE TABLE IF NOT EXISTS parsed_pages (
            source_file   TEXT PRIMARY KEY,
            page_index    INTEGER,
            listing_count INTEGER NOT NULL,
            parsed_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

/// Replace the stored table with this parse run. Rows keep report order.
/// Every parsed page is recorded, including pages without listings.
pub fn replace_listings(conn: &Connection, report: &ParseReport) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM listings", [])?;
    tx.execute("DELETE FROM parsed_pages", [])?;
    let mut count = 0;
    {
        let mut page_stmt = tx.prepare(
            "INSERT INTO parsed_pages (source_file, page_index, listing_count)
             VALUES (?1, ?2, ?3)",
        )?;
        let mut stmt = tx.prepare(
            "INSERT INTO listings (source_file, page_index, position, account_name, product_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for page in &report.pages {
            let file = page.source.file_name();
            let page_index = page.source.index.map(|i| i as i64);
            page_stmt.execute(rusqlite::params![
                file,
                page_index,
                page.listings.len() as i64,
            ])?;
            for (position, row) in page.listings.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    file,
                    page_index,
                    position as i64,
                    row.account_name,
                    row.product_id,
                ])?;
                count += 1;
            }
        }
    }
    tx.commit()?;
    Ok(count)
}

pub struct ListingRow {
    pub source_file: String,
    pub position: i64,
    pub account_name: String,
    pub product_id: String,
}

pub fn fetch_listings(
    conn: &Connection,
    account: Option<&str>,
    limit: usize,
) -> Result<Vec<ListingRow>> {
    let mut stmt = conn.prepare(
        "SELECT source_file, position, account_name, product_id
         FROM listings
         WHERE (?1 IS NULL OR account_name = ?1)
         ORDER BY id
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![account, limit as i64], |row| {
            Ok(ListingRow {
                source_file: row.get(0)?,
                position: row.get(1)?,
                account_name: row.get(2)?,
                product_id: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct Stats {
    pub rows: i64,
    pub products: i64,
    pub accounts: i64,
    /// Parsed page files, with or without listings.
    pub pages: i64,
    pub pages_with_listings: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let stats = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM listings),
                (SELECT COUNT(DISTINCT product_id) FROM listings),
                (SELECT COUNT(DISTINCT account_name) FROM listings),
                (SELECT COUNT(*) FROM parsed_pages),
                (SELECT COUNT(*) FROM parsed_pages WHERE listing_count > 0)",
        [],
        |row| {
            Ok(Stats {
                rows: row.get(0)?,
                products: row.get(1)?,
                accounts: row.get(2)?,
                pages: row.get(3)?,
                pages_with_listings: row.get(4)?,
            })
        },
    )?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::parser::ParsedPage;
    use crate::store::SavedPage;
    use crate::table::{ListingRecord, ListingTable};

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn parsed(index: usize, rows: &[(&str, &str)]) -> ParsedPage {
        ParsedPage {
            source: SavedPage {
                index: Some(index),
                path: PathBuf::from(format!("data/page_{}.html", index)),
            },
            listings: rows
                .iter()
                .map(|(name, id)| ListingRecord {
                    account_name: name.to_string(),
                    product_id: id.to_string(),
                })
                .collect::<ListingTable>(),
        }
    }

    fn report(pages: Vec<ParsedPage>) -> ParseReport {
        ParseReport {
            pages,
            failures: Vec::new(),
        }
    }

    #[test]
    fn stores_rows_in_report_order() {
        let conn = memory_db();
        let saved = replace_listings(
            &conn,
            &report(vec![
                parsed(0, &[("anna", "11"), ("bob", "12")]),
                parsed(1, &[("anna", "13")]),
            ]),
        )
        .unwrap();
        assert_eq!(saved, 3);

        let rows = fetch_listings(&conn, None, 10).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, ["11", "12", "13"]);
        assert_eq!(rows[2].source_file, "page_1.html");
        assert_eq!(rows[2].position, 0);
    }

    #[test]
    fn replace_drops_previous_run() {
        let conn = memory_db();
        replace_listings(&conn, &report(vec![parsed(0, &[("old", "1")])])).unwrap();
        replace_listings(&conn, &report(vec![parsed(0, &[("new", "2")])])).unwrap();

        let rows = fetch_listings(&conn, None, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].account_name, "new");
    }

    #[test]
    fn filter_by_account_and_limit() {
        let conn = memory_db();
        replace_listings(
            &conn,
            &report(vec![parsed(
                0,
                &[("anna", "1"), ("bob", "2"), ("anna", "3"), ("anna", "4")],
            )]),
        )
        .unwrap();

        let rows = fetch_listings(&conn, Some("anna"), 2).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, ["1", "3"]);
    }

    #[test]
    fn stats_count_duplicates_as_rows() {
        let conn = memory_db();
        replace_listings(
            &conn,
            &report(vec![
                parsed(0, &[("anna", "1"), ("bob", "2")]),
                parsed(1, &[("anna", "1")]),
            ]),
        )
        .unwrap();

        let s = get_stats(&conn).unwrap();
        assert_eq!((s.rows, s.products, s.accounts), (3, 2, 2));
        assert_eq!((s.pages, s.pages_with_listings), (2, 2));
    }

    #[test]
    fn stats_count_pages_without_listings() {
        let conn = memory_db();
        replace_listings(
            &conn,
            &report(vec![
                parsed(0, &[("anna", "1")]),
                parsed(1, &[]),
                parsed(2, &[("bob", "2")]),
            ]),
        )
        .unwrap();

        let s = get_stats(&conn).unwrap();
        assert_eq!(s.rows, 2);
        assert_eq!(s.pages, 3);
        assert_eq!(s.pages_with_listings, 2);
    }

    #[test]
    fn replace_drops_previous_pages() {
        let conn = memory_db();
        replace_listings(&conn, &report(vec![parsed(0, &[]), parsed(1, &[])])).unwrap();
        replace_listings(&conn, &report(vec![parsed(0, &[("anna", "1")])])).unwrap();

        let s = get_stats(&conn).unwrap();
        assert_eq!((s.pages, s.pages_with_listings), (1, 1));
    }
}
