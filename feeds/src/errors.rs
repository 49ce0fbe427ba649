use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch timed out")]
    Timeout,

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("provider has no data for {0}")]
    NoData(String),
}
