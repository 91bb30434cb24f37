//! Chart providers and the retrieval orchestrator.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  RetrievalOrchestrator                   │
//! │   (one task per source, timeout, parse cache, ingest)    │
//! └──────────────┬───────────────────────────┬───────────────┘
//!                │ ChartSource               │
//!       ┌────────┴────────┐         ┌────────┴────────┐
//!       │ HttpChartSource │         │ DirectorySource │
//!       │ client/dto/     │         │ walkdir scan    │
//!       │ adapter         │         │                 │
//!       └─────────────────┘         └─────────────────┘
//! ```

pub mod directory;
pub mod domain;
pub mod http;
pub mod orchestrator;
pub mod traits;

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use directory::DirectorySource;
pub use domain::{FetchError, RawChart, SearchQuery};
pub use http::HttpChartSource;
pub use orchestrator::{
    DegradedSource, RetrievalConfig, RetrievalOrchestrator, SearchResults, SongCandidate,
};
pub use traits::ChartSource;

use crate::chart::ProviderHint;
use crate::matching::ArtistAliases;

/// How a configured provider is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderKind {
    Http { base_url: String },
    Directory { path: PathBuf },
}

/// One `[[providers]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    #[serde(flatten)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub hint: ProviderHint,
}

/// Build a source for a provider entry.
pub fn build_source(
    config: &ProviderConfig,
    aliases: &ArtistAliases,
) -> Result<Arc<dyn ChartSource>, FetchError> {
    Ok(match &config.kind {
        ProviderKind::Http { base_url } => Arc::new(HttpChartSource::new(
            config.id.as_str(),
            base_url.as_str(),
            config.hint,
        )?),
        ProviderKind::Directory { path } => Arc::new(
            DirectorySource::new(config.id.as_str(), path.clone(), config.hint)
                .with_aliases(aliases.clone()),
        ),
    })
}
