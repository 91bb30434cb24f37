//! Chart search API data transfer objects.
//!
//! These types match what a provider's `/search` endpoint returns.
//! DO NOT use them outside the http module - convert via the adapter.

use serde::{Deserialize, Serialize};

/// `GET {base}/search?title=..&artist=..` response body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<ChartResult>,
}

/// One chart in a search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChartResult {
    /// Provider's chart id
    pub id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Raw chart text
    #[serde(default)]
    pub content: String,
    /// Average rating, 0-5
    pub rating: Option<f32>,
    #[serde(default)]
    pub votes: u32,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: String,
}
