use thiserror::Error;

/// Errors returned when configuring a match.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("tolerance must be a finite, non-negative number, got {0}")]
    InvalidTolerance(f64),
}

pub type SearchResult<T> = std::result::Result<T, SearchError>;
