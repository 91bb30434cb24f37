//! The source-fetch seam.
//!
//! Production code uses [`HttpChartSource`](super::HttpChartSource) and
//! [`DirectorySource`](super::DirectorySource); tests substitute the mocks
//! below to simulate providers that succeed, fail or hang.

use async_trait::async_trait;

use super::domain::{FetchError, RawChart, SearchQuery};
use crate::chart::ProviderHint;

/// A configured provider of raw chord charts.
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Configured provider id, recorded on every variant it yields.
    fn provider(&self) -> &str;

    /// Grammar the provider's charts are written in.
    fn hint(&self) -> ProviderHint;

    /// Fetch every chart the provider has for `query`.
    async fn fetch_raw(&self, query: &SearchQuery) -> Result<Vec<RawChart>, FetchError>;
}

#[async_trait]
impl ChartSource for super::http::HttpChartSource {
    fn provider(&self) -> &str {
        self.id()
    }

    fn hint(&self) -> ProviderHint {
        self.hint()
    }

    async fn fetch_raw(&self, query: &SearchQuery) -> Result<Vec<RawChart>, FetchError> {
        self.search(query).await
    }
}

#[async_trait]
impl ChartSource for super::directory::DirectorySource {
    fn provider(&self) -> &str {
        self.id()
    }

    fn hint(&self) -> ProviderHint {
        self.hint()
    }

    async fn fetch_raw(&self, query: &SearchQuery) -> Result<Vec<RawChart>, FetchError> {
        self.search(query).await
    }
}
