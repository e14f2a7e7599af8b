use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Engine-level failures surfaced to the caller. Lookup misses encountered
/// while assembling derived views (a feed item whose habit vanished
/// mid-scan) are not errors — those items are dropped in place.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("actor does not own the target habit")]
    Forbidden,

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
