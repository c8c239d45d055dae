pub mod containers;
pub mod fields;

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use scraper::Html;
use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::store::{self, SavedPage};
use crate::table::{ListingRecord, ListingTable};

/// Extract `(account_name, product_id)` rows from one catalog page.
///
/// Candidates missing an account name or a numeric id are skipped, never an error.
pub fn parse_page(html: &str) -> ListingTable {
    let doc = Html::parse_document(html);
    let mut table = ListingTable::new();

    for container in containers::listing_containers(&doc) {
        let Some(account_name) = fields::account_name(container) else {
            continue;
        };
        let Some(product_id) = fields::container_product_id(container) else {
            continue;
        };
        table.push(ListingRecord {
            account_name,
            product_id,
        });
    }

    table
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// Record the bad file and keep going.
    #[default]
    Isolate,
    /// Abort on the first unreadable file.
    FailFast,
}

#[derive(Debug)]
pub struct ParsedPage {
    pub source: SavedPage,
    pub listings: ListingTable,
}

#[derive(Debug)]
pub struct PageFailure {
    pub source: SavedPage,
    pub error: ScrapeError,
}

#[derive(Debug, Default)]
pub struct ParseReport {
    pub pages: Vec<ParsedPage>,
    pub failures: Vec<PageFailure>,
}

impl ParseReport {
    pub fn row_count(&self) -> usize {
        self.pages.iter().map(|p| p.listings.len()).sum()
    }

    /// All rows, page by page in listing order.
    pub fn table(&self) -> ListingTable {
        let mut table = ListingTable::new();
        for page in &self.pages {
            table.extend(page.listings.clone());
        }
        table
    }
}

/// Parse every page saved in `dir`, in page-index order.
pub fn parse_pages(dir: &Path, mode: FailureMode) -> Result<ParseReport, ScrapeError> {
    let saved = store::list_pages(dir)?;
    let mut report = ParseReport::default();

    let pb = ProgressBar::new(saved.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    for source in saved {
        match store::read_page(&source) {
            Ok(html) => {
                let listings = parse_page(&html);
                debug!("{}: {} listings", source.file_name(), listings.len());
                report.pages.push(ParsedPage { source, listings });
            }
            Err(error) if mode == FailureMode::Isolate => {
                warn!("Skipping {}: {}", source.file_name(), error);
                report.failures.push(PageFailure { source, error });
            }
            Err(error) => {
                pb.abandon();
                return Err(error);
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        "Parsed {} files: {} listings, {} failed",
        report.pages.len(),
        report.row_count(),
        report.failures.len()
    );
    Ok(report)
}
