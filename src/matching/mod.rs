//! Cross-source matching: text normalization, similarity scoring, song
//! clusters and the engine that places new variants.

pub mod cluster;
pub mod engine;
pub mod normalize;
pub mod similarity;

pub use cluster::{
    CanonicalSong, ClusterError, Popularity, SongId, SourceVariant, VariantId, completeness,
    digest_of, rank_score,
};
pub use engine::{AmbiguousMatch, EngineError, IngestOutcome, MatchingEngine, Placement, ScoredSong};
pub use normalize::{ArtistAliases, normalize_text, text_similarity};
pub use similarity::{
    MatchDecision, MatchingConfig, PairScores, RankingWeights, Scorer, structural_similarity,
};
