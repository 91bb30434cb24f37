//! Source variants, canonical songs and preferred-variant ranking.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use super::similarity::MatchingConfig;
use crate::chart::{CanonicalDocument, ParseFailure, ParseOutcome};

/// Stable identifier of a canonical song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub Uuid);

impl SongId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SongId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SongId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of one source variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(pub Uuid);

impl VariantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VariantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for VariantId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("cannot remove the last variant of song {0}")]
    EmptyCluster(SongId),

    #[error("variant {0} not found")]
    UnknownVariant(VariantId),

    #[error("song {0} not found")]
    UnknownSong(SongId),
}

/// Provider rating and vote count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Popularity {
    /// 0–5 stars
    pub rating: Option<f32>,
    pub votes: u32,
}

impl Popularity {
    pub fn new(rating: f32, votes: u32) -> Self {
        Self {
            rating: Some(rating),
            votes,
        }
    }

    /// Popularity signal, 0.0–1.0.
    ///
    /// The rating is discounted by how many votes back it up, so a single
    /// five-star vote does not outrank a well-reviewed 4.5.
    pub fn signal(&self) -> f64 {
        let Some(rating) = self.rating else {
            return 0.0;
        };
        let rating = (rating as f64 / 5.0).clamp(0.0, 1.0);
        let votes = self.votes as f64;
        rating * votes / (votes + 10.0)
    }
}

/// One provider's version of a song. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceVariant {
    pub id: VariantId,
    /// Configured provider id (e.g. `"tabsite"`)
    pub provider: String,
    /// Identifier of the chart at the provider
    pub native_id: String,
    /// Raw text as fetched
    pub raw: String,
    /// SHA-256 of `raw`, lowercase hex
    pub digest: String,
    /// Parse confidence, 0.0–1.0
    pub confidence: f64,
    pub failures: Vec<ParseFailure>,
    pub document: CanonicalDocument,
    pub popularity: Popularity,
    /// Ingestion order; assigned by the matching engine
    pub sequence: u64,
    pub ingested_at: DateTime<Utc>,
}

impl SourceVariant {
    pub fn new(
        provider: impl Into<String>,
        native_id: impl Into<String>,
        raw: impl Into<String>,
        outcome: ParseOutcome,
        popularity: Popularity,
    ) -> Self {
        let raw = raw.into();
        let confidence = outcome.confidence();
        let failures = outcome.failures().to_vec();
        Self {
            id: VariantId::new(),
            provider: provider.into(),
            native_id: native_id.into(),
            digest: digest_of(&raw),
            raw,
            confidence,
            failures,
            document: outcome.into_document(),
            popularity,
            sequence: 0,
            ingested_at: Utc::now(),
        }
    }

    pub fn title(&self) -> &str {
        &self.document.metadata.title
    }

    pub fn artist(&self) -> &str {
        &self.document.metadata.artist
    }
}

/// SHA-256 of a raw snapshot as lowercase hex.
pub fn digest_of(raw: &str) -> String {
    format!("{:x}", Sha256::digest(raw.as_bytes()))
}

/// How much of a full chart a document carries, 0.0–1.0.
pub fn completeness(doc: &CanonicalDocument, min_chords: usize) -> f64 {
    let mut score = 0.0;
    if doc.chord_count() >= min_chords {
        score += 0.4;
    }
    if doc.has_lyrics() {
        score += 0.2;
    }
    if doc.has_sections() {
        score += 0.2;
    }
    if doc.metadata.key_declared {
        score += 0.2;
    }
    score
}

/// Weighted ranking score of a variant.
pub fn rank_score(variant: &SourceVariant, config: &MatchingConfig) -> f64 {
    let weights = &config.ranking;
    weights.confidence * variant.confidence
        + weights.popularity * variant.popularity.signal()
        + weights.completeness * completeness(&variant.document, config.min_structural_chords)
}

/// Higher score first, then earlier ingestion.
fn rank_order(a: (f64, &SourceVariant), b: (f64, &SourceVariant)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.sequence.cmp(&b.1.sequence))
}

/// A song and every variant judged to be it.
///
/// `variants` is never empty. `preferred` is an id into `variants`,
/// recomputed whenever the cluster changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSong {
    pub id: SongId,
    pub variants: Vec<SourceVariant>,
    pub preferred: VariantId,
}

impl CanonicalSong {
    pub fn new(first: SourceVariant) -> Self {
        Self {
            id: SongId::new(),
            preferred: first.id,
            variants: vec![first],
        }
    }

    /// The preferred variant.
    pub fn preferred(&self) -> &SourceVariant {
        let index = self
            .variants
            .iter()
            .position(|v| v.id == self.preferred)
            .unwrap_or(0);
        &self.variants[index]
    }

    pub fn variant(&self, id: VariantId) -> Option<&SourceVariant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn title(&self) -> &str {
        self.preferred().title()
    }

    pub fn artist(&self) -> &str {
        self.preferred().artist()
    }

    /// Add a variant and re-rank.
    pub fn add_variant(&mut self, variant: SourceVariant, config: &MatchingConfig) {
        self.variants.push(variant);
        self.rerank(config);
    }

    /// Remove a variant and re-rank. The last variant cannot be removed.
    pub fn remove_variant(
        &mut self,
        id: VariantId,
        config: &MatchingConfig,
    ) -> Result<SourceVariant, ClusterError> {
        let index = self
            .variants
            .iter()
            .position(|v| v.id == id)
            .ok_or(ClusterError::UnknownVariant(id))?;
        if self.variants.len() == 1 {
            return Err(ClusterError::EmptyCluster(self.id));
        }
        let removed = self.variants.remove(index);
        self.rerank(config);
        Ok(removed)
    }

    /// Recompute the preferred variant from member scores alone.
    pub fn rerank(&mut self, config: &MatchingConfig) {
        if let Some((_, best)) = self
            .variants
            .iter()
            .map(|v| (rank_score(v, config), v))
            .min_by(|a, b| rank_order(*a, *b))
        {
            self.preferred = best.id;
        }
    }

    /// Variants with their ranking scores, best first.
    pub fn ranked(&self, config: &MatchingConfig) -> Vec<(&SourceVariant, f64)> {
        let mut scored: Vec<(f64, &SourceVariant)> = self
            .variants
            .iter()
            .map(|v| (rank_score(v, config), v))
            .collect();
        scored.sort_by(|a, b| rank_order(*a, *b));
        scored.into_iter().map(|(score, v)| (v, score)).collect()
    }
}
