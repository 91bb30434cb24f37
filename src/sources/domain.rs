//! Provider-independent types for chart retrieval.
//!
//! Provider responses get converted into these types by each source's
//! adapter; nothing outside a provider module sees its wire format.

use serde::{Deserialize, Serialize};

use crate::matching::Popularity;

/// A user query: title plus optional artist.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub title: String,
    pub artist: Option<String>,
}

impl SearchQuery {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: None,
        }
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        let artist = artist.into();
        self.artist = (!artist.trim().is_empty()).then_some(artist);
        self
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }
}

/// One chart as fetched from a provider, before parsing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawChart {
    /// Identifier at the provider
    pub native_id: String,
    /// Title as reported by the provider, if it reports one
    pub title: Option<String>,
    pub artist: Option<String>,
    pub raw: String,
    pub popularity: Popularity,
}

impl RawChart {
    pub fn new(native_id: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            native_id: native_id.into(),
            raw: raw.into(),
            ..Default::default()
        }
    }
}

/// Per-source failure. Degrades that source only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timed out after {0} ms")]
    Timeout(u64),

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),
}
