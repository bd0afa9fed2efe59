use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Retries exhausted; the caller treats the page as unavailable and
    /// moves on, this is not fatal to a run.
    #[error("failed to fetch {url} after {attempts} attempts")]
    FetchFailed { url: String, attempts: u32 },

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Transport-level failures are skippable per candidate; everything
    /// else bubbles into the run's error list.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::FetchFailed { .. } | Error::Http(_))
    }
}
