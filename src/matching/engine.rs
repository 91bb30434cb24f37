//! Matching engine: places incoming variants into song clusters.
//!
//! Cluster mutation is the one piece of shared state in the crate. Two locks
//! guard it:
//! - a placement lock, so two variants of the same new song cannot both
//!   decide "no match" and create duplicate clusters
//! - one lock per song id, so add/remove/re-rank on a cluster run one at a time
//!
//! Ingest takes the placement lock and then the cluster lock; removal takes
//! only the cluster lock. The lock table holds weak handles, so a song's
//! lock lives only while some task is using it.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::cluster::{CanonicalSong, ClusterError, SongId, SourceVariant, VariantId};
use super::similarity::{MatchDecision, MatchingConfig, PairScores, Scorer};
use crate::store::{SongStore, StoreError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A near-miss: close to an existing song but not close enough to merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousMatch {
    pub song_id: SongId,
    pub title: String,
    pub artist: String,
    pub scores: PairScores,
}

/// Where an ingested variant ended up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Placement {
    /// Appended to an existing cluster
    Merged { score: f64 },
    /// Seeded a new cluster
    Created,
    /// The same snapshot from the same provider was already stored
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub song: CanonicalSong,
    pub variant_id: VariantId,
    pub placement: Placement,
    pub ambiguous: Vec<AmbiguousMatch>,
}

/// A stored song scored against a query.
#[derive(Debug, Clone)]
pub struct ScoredSong {
    pub song: CanonicalSong,
    pub score: f64,
}

/// How a new variant relates to one stored song.
struct SongMatch {
    decision: MatchDecision,
    scores: PairScores,
}

pub struct MatchingEngine {
    store: Arc<dyn SongStore>,
    scorer: Scorer,
    placement: tokio::sync::Mutex<()>,
    cluster_locks: parking_lot::Mutex<HashMap<SongId, Weak<tokio::sync::Mutex<()>>>>,
    sequence: AtomicU64,
}

impl MatchingEngine {
    /// Create an engine over `store`. Sequence numbers continue after the
    /// highest one already stored.
    pub async fn new(store: Arc<dyn SongStore>, config: MatchingConfig) -> Result<Self, EngineError> {
        let last = store.max_sequence().await?;
        Ok(Self {
            store,
            scorer: Scorer::new(config),
            placement: tokio::sync::Mutex::new(()),
            cluster_locks: parking_lot::Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(last),
        })
    }

    pub fn config(&self) -> &MatchingConfig {
        self.scorer.config()
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    fn cluster_lock(&self, id: SongId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.cluster_locks.lock();
        if let Some(lock) = locks.get(&id).and_then(Weak::upgrade) {
            return lock;
        }
        // Nobody holds or waits on a dead entry
        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(tokio::sync::Mutex::new(()));
        locks.insert(id, Arc::downgrade(&lock));
        lock
    }

    fn compare(&self, variant: &SourceVariant, song: &CanonicalSong) -> SongMatch {
        let mut best: Option<SongMatch> = None;
        for member in &song.variants {
            let (scores, decision) = self.scorer.decide(&variant.document, &member.document);
            let better = match &best {
                None => true,
                Some(current) => {
                    decision_rank(decision) > decision_rank(current.decision)
                        || (decision == current.decision
                            && scores.overall() > current.scores.overall())
                }
            };
            if better {
                best = Some(SongMatch { decision, scores });
            }
        }
        best.unwrap_or(SongMatch {
            decision: MatchDecision::Distinct,
            scores: PairScores {
                title: 0.0,
                artist: 0.0,
                structural: None,
            },
        })
    }

    /// Cluster-or-create.
    ///
    /// Near-miss songs are returned in `ambiguous` rather than merged.
    pub async fn ingest(&self, mut variant: SourceVariant) -> Result<IngestOutcome, EngineError> {
        let _placement = self.placement.lock().await;

        let songs = self.store.all_songs().await?;

        if let Some((song, existing)) = songs.iter().find_map(|song| {
            song.variants
                .iter()
                .find(|v| {
                    v.provider == variant.provider
                        && v.native_id == variant.native_id
                        && v.digest == variant.digest
                })
                .map(|v| (song, v.id))
        }) {
            debug!(song_id = %song.id, provider = %variant.provider, "Snapshot already stored");
            return Ok(IngestOutcome {
                song: song.clone(),
                variant_id: existing,
                placement: Placement::Unchanged,
                ambiguous: Vec::new(),
            });
        }

        variant.sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let variant_id = variant.id;

        let mut target: Option<(SongId, f64)> = None;
        let mut ambiguous = Vec::new();
        for song in &songs {
            let found = self.compare(&variant, song);
            match found.decision {
                MatchDecision::Same => {
                    let score = found.scores.overall();
                    if target.is_none_or(|(_, best)| score > best) {
                        target = Some((song.id, score));
                    }
                }
                MatchDecision::Ambiguous => ambiguous.push(AmbiguousMatch {
                    song_id: song.id,
                    title: song.title().to_string(),
                    artist: song.artist().to_string(),
                    scores: found.scores,
                }),
                MatchDecision::Distinct => {}
            }
        }

        let (song, placement) = match target {
            Some((song_id, score)) => {
                let lock = self.cluster_lock(song_id);
                let _guard = lock.lock().await;

                let mut song = self
                    .store
                    .get_song(song_id)
                    .await?
                    .ok_or(ClusterError::UnknownSong(song_id))?;
                song.add_variant(variant, self.config());
                self.store.save_song(&song).await?;
                info!(
                    song_id = %song.id,
                    variants = song.variants.len(),
                    score,
                    "Merged variant into song"
                );
                (song, Placement::Merged { score })
            }
            None => {
                let song = CanonicalSong::new(variant);
                let lock = self.cluster_lock(song.id);
                let _guard = lock.lock().await;
                self.store.save_song(&song).await?;
                info!(song_id = %song.id, title = %song.title(), "Created song");
                (song, Placement::Created)
            }
        };

        for near in &ambiguous {
            info!(
                song_id = %song.id,
                similar_to = %near.song_id,
                title = %near.title,
                score = near.scores.overall(),
                "Possible duplicate song"
            );
        }

        Ok(IngestOutcome {
            song,
            variant_id,
            placement,
            ambiguous,
        })
    }

    /// Remove a variant and re-rank its song. The last variant cannot be removed.
    pub async fn remove_variant(
        &self,
        song_id: SongId,
        variant_id: VariantId,
    ) -> Result<CanonicalSong, EngineError> {
        let lock = self.cluster_lock(song_id);
        let _guard = lock.lock().await;

        let mut song = self
            .store
            .get_song(song_id)
            .await?
            .ok_or(ClusterError::UnknownSong(song_id))?;
        song.remove_variant(variant_id, self.config())?;
        self.store.save_song(&song).await?;
        debug!(song_id = %song_id, variant_id = %variant_id, "Removed variant");
        Ok(song)
    }

    pub async fn song(&self, id: SongId) -> Result<Option<CanonicalSong>, EngineError> {
        Ok(self.store.get_song(id).await?)
    }

    pub async fn songs(&self) -> Result<Vec<CanonicalSong>, EngineError> {
        Ok(self.store.all_songs().await?)
    }

    /// Best query score over a song's variants.
    pub fn query_score(&self, title: &str, artist: Option<&str>, song: &CanonicalSong) -> f64 {
        song.variants
            .iter()
            .map(|v| self.scorer.query_score(title, artist, &v.document.metadata))
            .fold(0.0, f64::max)
    }

    /// Stored songs scoring at least `min_score` against the query, best first.
    pub async fn candidates(
        &self,
        title: &str,
        artist: Option<&str>,
        min_score: f64,
    ) -> Result<Vec<ScoredSong>, EngineError> {
        let mut scored: Vec<ScoredSong> = self
            .store
            .all_songs()
            .await?
            .into_iter()
            .map(|song| ScoredSong {
                score: self.query_score(title, artist, &song),
                song,
            })
            .filter(|s| s.score >= min_score)
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scored)
    }
}

fn decision_rank(decision: MatchDecision) -> u8 {
    match decision {
        MatchDecision::Same => 2,
        MatchDecision::Ambiguous => 1,
        MatchDecision::Distinct => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ProviderHint, parse};
    use crate::matching::Popularity;
    use crate::store::MemoryStore;
    use crate::test_utils::{chart_variant, sample_variant};

    async fn engine() -> (Arc<MatchingEngine>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = MatchingEngine::new(store.clone(), MatchingConfig::default())
            .await
            .unwrap();
        (Arc::new(engine), store)
    }

    #[tokio::test]
    async fn test_first_variant_creates_song() {
        let (engine, store) = engine().await;
        let outcome = engine
            .ingest(sample_variant("Amazing Grace", "Traditional"))
            .await
            .unwrap();
        assert_eq!(outcome.placement, Placement::Created);
        assert!(outcome.ambiguous.is_empty());
        assert_eq!(outcome.song.variants[0].sequence, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_traditional_and_trad_merge() {
        let (engine, store) = engine().await;
        let first = engine
            .ingest(chart_variant(
                "site-a",
                "Title: Amazing Grace\nArtist: Traditional\n[G]A[C]maz[G]ing [D]grace [G]how",
            ))
            .await
            .unwrap();
        let second = engine
            .ingest(chart_variant(
                "site-b",
                "Title: Amazing Grace\nArtist: Trad.\nCapo: 2\n[G]A[C]maz[G]ing [D]grace [Em]how",
            ))
            .await
            .unwrap();

        assert!(matches!(second.placement, Placement::Merged { .. }));
        assert_eq!(second.song.id, first.song.id);
        assert_eq!(second.song.variants.len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_distinct_songs_stay_apart() {
        let (engine, store) = engine().await;
        engine
            .ingest(sample_variant("Amazing Grace", "Traditional"))
            .await
            .unwrap();
        let other = engine
            .ingest(sample_variant("Jolene", "Dolly Parton"))
            .await
            .unwrap();
        assert_eq!(other.placement, Placement::Created);
        assert!(other.ambiguous.is_empty());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_near_miss_is_surfaced_not_merged() {
        let store = Arc::new(MemoryStore::new());
        let config = MatchingConfig {
            title_threshold: 0.95,
            ..MatchingConfig::default()
        };
        let engine = MatchingEngine::new(store.clone(), config).await.unwrap();

        let first = engine
            .ingest(sample_variant("Wonderwall", "Oasis"))
            .await
            .unwrap();
        // "wonderwal" vs "wonderwall": 0.9, inside the 0.80..0.95 band
        let second = engine
            .ingest(sample_variant("Wonderwal", "Oasis"))
            .await
            .unwrap();

        assert_eq!(second.placement, Placement::Created);
        assert_eq!(second.ambiguous.len(), 1);
        assert_eq!(second.ambiguous[0].song_id, first.song.id);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_untitled_charts_never_merge() {
        let (engine, store) = engine().await;
        let first = engine
            .ingest(chart_variant("site-a", "[G]hello there friend"))
            .await
            .unwrap();
        let second = engine
            .ingest(chart_variant("site-b", "[Bbm]completely other [Eb]words"))
            .await
            .unwrap();

        assert_eq!(first.placement, Placement::Created);
        assert_eq!(second.placement, Placement::Created);
        assert!(second.ambiguous.is_empty());
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_same_snapshot_is_not_duplicated() {
        let (engine, store) = engine().await;
        let raw = "Title: Jolene\nArtist: Dolly Parton\n[Am]Jolene [C]Jolene [G]Jolene [Am]Jolene";
        let first = engine.ingest(chart_variant("site-a", raw)).await.unwrap();
        let again = engine.ingest(chart_variant("site-a", raw)).await.unwrap();

        assert_eq!(again.placement, Placement::Unchanged);
        assert_eq!(again.variant_id, first.variant_id);
        assert_eq!(store.get_song(first.song.id).await.unwrap().unwrap().variants.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_variant() {
        let (engine, _store) = engine().await;
        let first = engine
            .ingest(sample_variant("Amazing Grace", "Traditional"))
            .await
            .unwrap();
        let second = engine
            .ingest(sample_variant("Amazing Grace", "Traditional"))
            .await
            .unwrap();
        let song_id = first.song.id;

        let song = engine.remove_variant(song_id, second.variant_id).await.unwrap();
        assert_eq!(song.variants.len(), 1);
        assert_eq!(song.preferred, first.variant_id);

        let err = engine
            .remove_variant(song_id, first.variant_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Cluster(ClusterError::EmptyCluster(id)) if id == song_id));

        let err = engine
            .remove_variant(SongId::new(), first.variant_id)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Cluster(ClusterError::UnknownSong(_))));
    }

    #[tokio::test]
    async fn test_preferred_variant_reranked_on_ingest() {
        let (engine, _store) = engine().await;
        let sparse = "Title: Amazing Grace\nArtist: Traditional\nAmazing grace how sweet";
        engine.ingest(chart_variant("site-a", sparse)).await.unwrap();

        let full = "Title: Amazing Grace\nArtist: Traditional\nKey: G\n[Verse]\n[G]Amazing [C]grace how [G]sweet the [D]sound";
        let rich = SourceVariant::new(
            "site-b",
            "rich",
            full,
            parse(full, ProviderHint::InlineBrackets),
            Popularity::new(4.7, 300),
        );
        let rich_id = rich.id;
        let outcome = engine.ingest(rich).await.unwrap();

        assert!(matches!(outcome.placement, Placement::Merged { .. }));
        assert_eq!(outcome.song.preferred, rich_id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingest_creates_one_cluster() {
        let (engine, store) = engine().await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                let raw = format!(
                    "Title: Amazing Grace\nArtist: Traditional\n[G]A[C]maz[G]ing [D]grace {}",
                    i
                );
                engine.ingest(chart_variant(&format!("site-{}", i), &raw)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len(), 1);
        let song = &store.all_songs().await.unwrap()[0];
        assert_eq!(song.variants.len(), 8);
        let mut sequences: Vec<u64> = song.variants.iter().map(|v| v.sequence).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=8).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_cluster_locks_do_not_accumulate() {
        let (engine, store) = engine().await;
        for title in ["Amazing Grace", "Jolene", "Wonderwall", "Yesterday"] {
            engine.ingest(sample_variant(title, "Someone")).await.unwrap();
        }
        assert_eq!(store.len(), 4);
        assert!(engine.cluster_locks.lock().len() <= 1);

        let song = store.all_songs().await.unwrap()[0].id;
        let held = engine.cluster_lock(song);
        assert!(Arc::ptr_eq(&held, &engine.cluster_lock(song)));
        drop(held);
        assert!(engine.cluster_locks.lock().values().all(|l| l.strong_count() == 0));
    }

    #[tokio::test]
    async fn test_candidates() {
        let (engine, _store) = engine().await;
        engine
            .ingest(sample_variant("Amazing Grace", "Traditional"))
            .await
            .unwrap();
        engine
            .ingest(sample_variant("Jolene", "Dolly Parton"))
            .await
            .unwrap();

        let found = engine.candidates("amazing grace", None, 0.8).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].song.title(), "Amazing Grace");
        assert_eq!(found[0].score, 1.0);

        let all = engine.candidates("amazing grace", None, 0.0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].score >= all[1].score);
    }

    #[tokio::test]
    async fn test_sequence_continues_from_store() {
        let store = Arc::new(MemoryStore::new());
        let mut seeded = sample_variant("Jolene", "Dolly Parton");
        seeded.sequence = 41;
        store.save_song(&CanonicalSong::new(seeded)).await.unwrap();

        let engine = MatchingEngine::new(store, MatchingConfig::default())
            .await
            .unwrap();
        let outcome = engine
            .ingest(sample_variant("Amazing Grace", "Traditional"))
            .await
            .unwrap();
        assert_eq!(outcome.song.variants[0].sequence, 42);
    }
}
