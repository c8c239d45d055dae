use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::fetcher::Page;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("browser driver failed: {0:#}")]
    Browser(anyhow::Error),

    #[error("page {page}: no listing rendered after {:.1}s", .waited.as_secs_f64())]
    RenderTimeout { page: u32, waited: Duration },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: not valid UTF-8", .path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScrapeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScrapeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Network/driver hiccups and slow renders may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScrapeError::Browser(_) | ScrapeError::RenderTimeout { .. }
        )
    }
}

/// A fetch batch that stopped early. Holds every page captured before the failure.
#[derive(Debug, Error)]
#[error("fetch aborted after {} page(s): {source}", .pages.len())]
pub struct FetchAborted {
    pub pages: Vec<Page>,
    #[source]
    pub source: ScrapeError,
}
