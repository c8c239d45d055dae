use std::sync::Arc;

use headless_chrome::{Browser as Chrome, LaunchOptions, Tab};
use tracing::{debug, info};

use crate::error::ScrapeError;

/// Minimal driver surface the fetcher needs.
pub trait Browser {
    fn open(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Document source as rendered right now.
    fn rendered_content(&mut self) -> Result<String, ScrapeError>;
}

/// One Chrome process with a single tab. The process exits when this is dropped.
pub struct ChromeSession {
    tab: Arc<Tab>,
    // Held for its Drop: closing the browser kills the child process.
    _browser: Chrome,
}

impl ChromeSession {
    pub fn launch(headless: bool) -> Result<Self, ScrapeError> {
        let options = LaunchOptions {
            headless,
            ..Default::default()
        };
        let browser = Chrome::new(options).map_err(ScrapeError::Browser)?;
        let tab = browser.new_tab().map_err(ScrapeError::Browser)?;
        info!(headless, "Browser session started");
        Ok(Self {
            tab,
            _browser: browser,
        })
    }
}

impl Browser for ChromeSession {
    fn open(&mut self, url: &str) -> Result<(), ScrapeError> {
        debug!("Navigating to {}", url);
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(ScrapeError::Browser)?;
        Ok(())
    }

    fn rendered_content(&mut self) -> Result<String, ScrapeError> {
        self.tab.get_content().map_err(ScrapeError::Browser)
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        info!("Closing browser session");
    }
}
