use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid backend url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("collection request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("collection request returned HTTP {status}")]
    Status { status: u16 },
    #[error("collection response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("page size must be greater than zero")]
    InvalidPageSize,
    #[error("rotation interval must be greater than zero")]
    InvalidInterval,
    #[error("index {index} is out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("page {page} is out of range for {total_pages} pages")]
    PageOutOfRange { page: usize, total_pages: usize },
    #[error("item '{key}' is not part of the current collection")]
    UnknownItem { key: String },
    #[error("operation requires the {expected} discipline")]
    WrongDiscipline { expected: &'static str },
}
