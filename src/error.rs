use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EspotError {
    #[error("fetching prices for {date} failed: {source}")]
    Fetch {
        date: NaiveDate,
        #[source]
        source: reqwest::Error,
    },
    #[error("price feed responded with status {status} for {date}")]
    Status { date: NaiveDate, status: u16 },
    #[error("price feed responded with a malformed response: {0}")]
    MalformedResponse(String),
    #[error(
        "not enough prices: {needed} consecutive hours requested, \
         only {available} available before the cutoff"
    )]
    InsufficientData { needed: usize, available: usize },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("rendering chart failed: {0}")]
    Chart(String),
    #[error("http client error")]
    Reqwest(#[from] reqwest::Error),
}

impl EspotError {
    /// Whether this error means a day's prices could not be retrieved.
    ///
    /// Malformed feed responses count as fetch failures.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            EspotError::Fetch { .. } | EspotError::Status { .. } | EspotError::MalformedResponse(_)
        )
    }
}
