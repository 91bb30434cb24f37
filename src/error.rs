//! Crate-wide error types.
//!
//! Library modules use their own `thiserror` enums; [`Error`] aggregates
//! them for callers that drive several subsystems at once. The CLI uses
//! `anyhow` on top.
//!
//! Parse failures and near-miss matches are not errors: they travel as
//! data on [`ParseOutcome`](crate::chart::ParseOutcome) and
//! [`IngestOutcome`](crate::matching::IngestOutcome).
//!
//! # Example
//!
//! ```ignore
//! use chart_minder::error::Result;
//!
//! async fn load(url: &str) -> Result<Vec<CanonicalSong>> {
//!     let store = SqliteStore::open(url).await?;
//!     Ok(store.all_songs().await?)
//! }
//! ```

use crate::config::ConfigError;
use crate::matching::{ClusterError, EngineError};
use crate::sources::FetchError;
use crate::store::StoreError;
use crate::theory::ChordError;
use crate::transpose::TransposeError;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chord error: {0}")]
    Chord(#[from] ChordError),

    #[error("Transpose error: {0}")]
    Transpose(#[from] TransposeError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cluster(e) => Self::Cluster(e),
            EngineError::Store(e) => Self::Store(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::SongId;

    #[test]
    fn test_engine_error_flattens() {
        let id = SongId::new();
        let err = Error::from(EngineError::Cluster(ClusterError::EmptyCluster(id)));
        assert!(matches!(err, Error::Cluster(ClusterError::EmptyCluster(_))));

        let err = Error::from(EngineError::Store(StoreError::EmptySong(id)));
        assert!(matches!(err, Error::Store(StoreError::EmptySong(_))));
    }

    #[test]
    fn test_question_mark_converts() {
        fn fetch() -> Result<()> {
            let outcome: std::result::Result<(), FetchError> = Err(FetchError::RateLimited);
            outcome?;
            Ok(())
        }
        let msg = fetch().unwrap_err().to_string();
        assert!(msg.starts_with("Fetch error"));
        assert!(msg.contains("Rate limited"));
    }
}
