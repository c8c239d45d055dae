use std::path::PathBuf;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::ScrapeError;

const CONFIG_FILE: &str = "vinted_scraper";
const ENV_PREFIX: &str = "VINTED";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub catalog: CatalogConfig,
    pub timing: FetchTiming,
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            timing: FetchTiming::default(),
            data_dir: PathBuf::from("data"),
            db_path: PathBuf::from("listings.sqlite"),
        }
    }
}

/// Which catalog slice to fetch and how the browser runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub category: u32,
    pub status: u32,
    /// Unix timestamp pinning the catalog snapshot.
    pub snapshot: i64,
    pub pages: u32,
    pub headless: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.vinted.fr/catalog".to_string(),
            category: 4,
            status: 6,
            snapshot: 1717152368,
            pages: 2,
            headless: false,
        }
    }
}

impl CatalogConfig {
    pub fn page_url(&self, page_number: u32) -> String {
        format!(
            "{}?catalog[]={}&status_ids[]={}&time={}&page={}",
            self.base_url, self.category, self.status, self.snapshot, page_number
        )
    }
}

/// Upper bounds for waiting on client-side rendering.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchTiming {
    /// Cold start: anti-bot challenge and first render.
    pub first_page_timeout_ms: u64,
    pub next_page_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for FetchTiming {
    fn default() -> Self {
        Self {
            first_page_timeout_ms: 15_000,
            next_page_timeout_ms: 10_000,
            poll_interval_ms: 500,
        }
    }
}

impl FetchTiming {
    pub fn timeout_for(&self, page_number: u32) -> Duration {
        if page_number == 1 {
            Duration::from_millis(self.first_page_timeout_ms)
        } else {
            Duration::from_millis(self.next_page_timeout_ms)
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Settings {
    /// Defaults, then `vinted_scraper.toml` if present, then `VINTED_*` env vars
    /// (`VINTED_CATALOG__PAGES=5`).
    pub fn load() -> Result<Self, ScrapeError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.catalog.pages == 0 {
            return Err(ScrapeError::InvalidConfig(
                "catalog.pages must be at least 1".into(),
            ));
        }
        if self.timing.poll_interval_ms == 0 {
            return Err(ScrapeError::InvalidConfig(
                "timing.poll_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}
