use std::sync::LazyLock;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::browser::Browser;
use crate::error::{FetchAborted, ScrapeError};
use crate::settings::{CatalogConfig, FetchTiming};

static LISTING_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"product-item-id-\d+").unwrap());

/// One captured catalog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Position in the fetched batch, starting at 0.
    pub index: usize,
    /// Catalog `page=` parameter, starting at 1.
    pub page_number: u32,
    pub content: Vec<u8>,
}

impl Page {
    pub fn new(index: usize, page_number: u32, html: impl Into<String>) -> Self {
        Self {
            index,
            page_number,
            content: html.into().into_bytes(),
        }
    }
}

/// Load `catalog.pages` result pages through one browser session, in order.
///
/// Each page is captured once its source contains a listing marker. A page that
/// never renders one before its deadline aborts the batch; pages captured so far
/// travel back inside [`FetchAborted`].
pub fn get_pages<B: Browser>(
    browser: &mut B,
    catalog: &CatalogConfig,
    timing: &FetchTiming,
) -> Result<Vec<Page>, FetchAborted> {
    let total = catalog.pages as usize;
    let mut pages = Vec::with_capacity(total);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} pages ({msg})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    for page_number in 1..=catalog.pages {
        let url = catalog.page_url(page_number);
        pb.set_message(format!("page {}", page_number));

        match fetch_one(browser, &url, page_number, timing) {
            Ok(html) => {
                pages.push(Page::new(pages.len(), page_number, html));
                pb.inc(1);
            }
            Err(source) => {
                pb.abandon();
                warn!(
                    "Fetch stopped at page {} ({} captured): {}",
                    page_number,
                    pages.len(),
                    source
                );
                return Err(FetchAborted { pages, source });
            }
        }
    }

    pb.finish_and_clear();
    info!("Fetched {} pages", pages.len());
    Ok(pages)
}

fn fetch_one<B: Browser>(
    browser: &mut B,
    url: &str,
    page_number: u32,
    timing: &FetchTiming,
) -> Result<String, ScrapeError> {
    let start = Instant::now();
    browser.open(url)?;
    let html = wait_for_listings(
        browser,
        page_number,
        timing.timeout_for(page_number),
        timing.poll_interval(),
    )?;
    debug!(
        "Page {} rendered in {}ms ({} bytes)",
        page_number,
        start.elapsed().as_millis(),
        html.len()
    );
    Ok(html)
}

/// Poll the rendered source until a listing marker shows up or `timeout` elapses.
/// The content is always checked at least once.
fn wait_for_listings<B: Browser>(
    browser: &mut B,
    page_number: u32,
    timeout: Duration,
    poll: Duration,
) -> Result<String, ScrapeError> {
    let start = Instant::now();
    loop {
        let html = browser.rendered_content()?;
        if LISTING_MARKER_RE.is_match(&html) {
            return Ok(html);
        }

        let waited = start.elapsed();
        if waited >= timeout {
            return Err(ScrapeError::RenderTimeout {
                page: page_number,
                waited,
            });
        }
        std::thread::sleep(poll.min(timeout - waited));
    }
}
