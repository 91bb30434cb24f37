//! Retrieval orchestrator: fan a query out to every configured source,
//! parse what comes back and feed it to the matching engine.
//!
//! Each source runs as its own task under a timeout. A source that times
//! out or fails, or whose charts cannot be stored, is recorded as degraded
//! and the search continues with the rest. Results produced while any source
//! was degraded are flagged `partial`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::domain::{FetchError, RawChart, SearchQuery};
use super::traits::ChartSource;
use crate::chart::{ChartParser, ParseOutcome, ProviderHint};
use crate::matching::{
    AmbiguousMatch, CanonicalSong, EngineError, MatchingEngine, SourceVariant, digest_of,
};

/// Retrieval tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Per-source timeout
    pub timeout_ms: u64,
    /// Most candidates returned by one search
    pub max_candidates: usize,
    /// Parsed snapshots kept in memory
    pub cache_capacity: usize,
    /// Lowest query score a candidate may have
    pub min_score: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_candidates: 20,
            cache_capacity: 256,
            min_score: 0.5,
        }
    }
}

/// A source dropped from one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedSource {
    pub provider: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct SongCandidate {
    pub song: CanonicalSong,
    /// Similarity of the song to the query
    pub score: f64,
    /// Produced while at least one source was degraded
    pub partial: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    /// Best first
    pub candidates: Vec<SongCandidate>,
    pub degraded: Vec<DegradedSource>,
    /// Possible duplicates raised while ingesting this search's charts
    pub ambiguous: Vec<AmbiguousMatch>,
}

impl SearchResults {
    pub fn is_partial(&self) -> bool {
        !self.degraded.is_empty()
    }
}

/// Bounded parse cache keyed by grammar and raw digest. Oldest entry is
/// evicted first.
#[derive(Debug, Default)]
struct ParseCache {
    capacity: usize,
    entries: HashMap<(ProviderHint, String), ParseOutcome>,
    order: VecDeque<(ProviderHint, String)>,
}

impl ParseCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Default::default()
        }
    }

    fn get(&self, key: &(ProviderHint, String)) -> Option<ParseOutcome> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: (ProviderHint, String), outcome: ParseOutcome) {
        if self.capacity == 0 || self.entries.contains_key(&key) {
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, outcome);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

type FetchResult = (String, ProviderHint, Result<Vec<RawChart>, FetchError>);

pub struct RetrievalOrchestrator {
    sources: Vec<Arc<dyn ChartSource>>,
    engine: Arc<MatchingEngine>,
    parser: ChartParser,
    config: RetrievalConfig,
    cache: parking_lot::Mutex<ParseCache>,
}

impl RetrievalOrchestrator {
    pub fn new(
        sources: Vec<Arc<dyn ChartSource>>,
        engine: Arc<MatchingEngine>,
        parser: ChartParser,
        config: RetrievalConfig,
    ) -> Self {
        let cache = parking_lot::Mutex::new(ParseCache::new(config.cache_capacity));
        Self {
            sources,
            engine,
            parser,
            config,
            cache,
        }
    }

    pub fn engine(&self) -> &Arc<MatchingEngine> {
        &self.engine
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.provider())
    }

    pub fn cached_parses(&self) -> usize {
        self.cache.lock().len()
    }

    fn parse_cached(&self, raw: &str, hint: ProviderHint) -> ParseOutcome {
        let key = (hint, digest_of(raw));
        if let Some(outcome) = self.cache.lock().get(&key) {
            return outcome;
        }
        let outcome = self.parser.parse(raw, hint);
        self.cache.lock().insert(key, outcome.clone());
        outcome
    }

    async fn fetch_all(&self, query: &SearchQuery) -> (Vec<FetchResult>, Vec<DegradedSource>) {
        let timeout_ms = self.config.timeout_ms;
        let mut set = JoinSet::new();
        for source in &self.sources {
            let source = Arc::clone(source);
            let query = query.clone();
            set.spawn(async move {
                let provider = source.provider().to_string();
                let result = tokio::time::timeout(
                    Duration::from_millis(timeout_ms),
                    source.fetch_raw(&query),
                )
                .await
                .unwrap_or(Err(FetchError::Timeout(timeout_ms)));
                (provider, source.hint(), result)
            });
        }

        let mut fetched = Vec::new();
        let mut degraded = Vec::new();
        let mut finished = HashSet::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((provider, hint, Ok(charts))) => {
                    debug!(provider = %provider, charts = charts.len(), "Source answered");
                    finished.insert(provider.clone());
                    fetched.push((provider, hint, Ok(charts)));
                }
                Ok((provider, _, Err(e))) => {
                    warn!(provider = %provider, error = %e, "Source degraded");
                    finished.insert(provider.clone());
                    degraded.push(DegradedSource {
                        provider,
                        error: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Source task aborted");
                }
            }
        }

        // Tasks that died without reporting back
        for source in &self.sources {
            if !finished.contains(source.provider()) {
                degraded.push(DegradedSource {
                    provider: source.provider().to_string(),
                    error: "task aborted".to_string(),
                });
            }
        }

        (fetched, degraded)
    }

    /// Search every source, ingest what they return and rank stored songs
    /// against the query.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults, EngineError> {
        if query.title.trim().is_empty() {
            return Ok(SearchResults::default());
        }

        let (fetched, mut degraded) = self.fetch_all(query).await;

        let mut ambiguous = Vec::new();
        let mut ingested = 0usize;
        for (provider, hint, result) in fetched {
            let Ok(charts) = result else { continue };
            for chart in charts {
                let outcome = self.parse_cached(&chart.raw, hint).with_metadata(
                    chart.title.as_deref().unwrap_or_default(),
                    chart.artist.as_deref().unwrap_or_default(),
                );
                let variant = SourceVariant::new(
                    provider.as_str(),
                    chart.native_id,
                    chart.raw,
                    outcome,
                    chart.popularity,
                );
                match self.engine.ingest(variant).await {
                    Ok(result) => {
                        ambiguous.extend(result.ambiguous);
                        ingested += 1;
                    }
                    Err(e) => {
                        warn!(provider = %provider, error = %e, "Failed to ingest chart");
                        degraded.push(DegradedSource {
                            provider: provider.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        let partial = !degraded.is_empty();
        let candidates: Vec<SongCandidate> = self
            .engine
            .candidates(&query.title, query.artist(), self.config.min_score)
            .await?
            .into_iter()
            .take(self.config.max_candidates)
            .map(|scored| SongCandidate {
                song: scored.song,
                score: scored.score,
                partial,
            })
            .collect();

        info!(
            title = %query.title,
            sources = self.sources.len(),
            degraded = degraded.len(),
            ingested,
            candidates = candidates.len(),
            "Search complete"
        );

        Ok(SearchResults {
            candidates,
            degraded,
            ambiguous,
        })
    }
}
