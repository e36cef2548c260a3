//! Error types shared by providers, the session controller and the flag store.

use thiserror::Error;

/// Failure of a provider fetch.
///
/// Cached alongside successful results, so it must be cheap to clone: every
/// waiter on a failed cache entry receives its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The item does not exist in any known repository.
    #[error("file does not exist: {0}")]
    NotFound(String),

    /// A response arrived but lacks fields the model requires.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Anything else, transport failures included.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl FetchError {
    pub fn malformed(what: impl Into<String>) -> Self {
        Self::Malformed(what.into())
    }

    pub fn unknown(what: impl Into<String>) -> Self {
        Self::Unknown(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<image::ImageError> for FetchError {
    fn from(err: image::ImageError) -> Self {
        Self::Unknown(format!("image decode failed: {err}"))
    }
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Failure reading or writing the durable flag store.
#[derive(Debug, Error)]
pub enum FlagStoreError {
    #[error("flag store unavailable: {0}")]
    Unavailable(String),

    #[error("flag store I/O failed: {0:#}")]
    Io(#[from] anyhow::Error),
}
