//! Pairwise similarity between charts and the clustering decision rule.
//!
//! A pair is scored on three axes: title, artist and chord structure. The
//! structural axis compares chord progressions relative to each chart's
//! shapes key, so the same song written in different keys or with a capo
//! still lines up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::normalize::{ArtistAliases, default_artist_aliases, text_similarity};
use crate::chart::{CanonicalDocument, ChartMetadata};
use crate::theory::ChordQuality;

/// Weights of the preferred-variant ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingWeights {
    pub confidence: f64,
    pub popularity: f64,
    pub completeness: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            confidence: 0.4,
            popularity: 0.4,
            completeness: 0.2,
        }
    }
}

/// Matching thresholds and tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum title similarity to merge
    pub title_threshold: f64,
    /// Minimum artist similarity to merge
    pub artist_threshold: f64,
    /// Lower edge of the "possible duplicate" band
    pub near_miss_floor: f64,
    /// Minimum structural similarity to merge, when it can be computed
    pub structural_threshold: f64,
    /// Charts with fewer chords than this skip the structural check
    pub min_structural_chords: usize,
    /// Longest chord sequence compared (keeps LCS cost bounded)
    pub max_structural_chords: usize,
    pub ranking: RankingWeights,
    /// Canonical artist name → alternative spellings
    pub artist_aliases: BTreeMap<String, Vec<String>>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            title_threshold: 0.85,
            artist_threshold: 0.85,
            near_miss_floor: 0.80,
            structural_threshold: 0.6,
            min_structural_chords: 4,
            max_structural_chords: 512,
            ranking: RankingWeights::default(),
            artist_aliases: default_artist_aliases(),
        }
    }
}

/// Outcome of comparing two variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchDecision {
    /// Same song: merge into one cluster
    Same,
    /// Close but below threshold: surface as a possible duplicate
    Ambiguous,
    Distinct,
}

/// Component scores for one pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairScores {
    pub title: f64,
    pub artist: f64,
    /// `None` when either side has too few chords to compare
    pub structural: Option<f64>,
}

impl PairScores {
    /// Mean of the available components.
    pub fn overall(&self) -> f64 {
        match self.structural {
            Some(s) => (self.title + self.artist + s) / 3.0,
            None => (self.title + self.artist) / 2.0,
        }
    }

    pub fn decide(&self, config: &MatchingConfig) -> MatchDecision {
        let structure_ok = self
            .structural
            .is_none_or(|s| s >= config.structural_threshold);
        if !structure_ok {
            return MatchDecision::Distinct;
        }
        if self.title >= config.title_threshold && self.artist >= config.artist_threshold {
            MatchDecision::Same
        } else if self.title >= config.near_miss_floor && self.artist >= config.near_miss_floor {
            MatchDecision::Ambiguous
        } else {
            MatchDecision::Distinct
        }
    }
}

/// Scores charts against each other and against search queries.
#[derive(Debug, Clone)]
pub struct Scorer {
    config: MatchingConfig,
    aliases: ArtistAliases,
}

impl Scorer {
    pub fn new(config: MatchingConfig) -> Self {
        let aliases = ArtistAliases::new(&config.artist_aliases);
        Self { config, aliases }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    pub fn artist_similarity(&self, a: &str, b: &str) -> f64 {
        self.aliases.similarity(a, b)
    }

    /// Symmetric pairwise score.
    pub fn score(&self, a: &CanonicalDocument, b: &CanonicalDocument) -> PairScores {
        PairScores {
            title: text_similarity(&a.metadata.title, &b.metadata.title),
            artist: self.artist_similarity(&a.metadata.artist, &b.metadata.artist),
            structural: structural_similarity(
                a,
                b,
                self.config.min_structural_chords,
                self.config.max_structural_chords,
            ),
        }
    }

    pub fn decide(&self, a: &CanonicalDocument, b: &CanonicalDocument) -> (PairScores, MatchDecision) {
        let scores = self.score(a, b);
        (scores, scores.decide(&self.config))
    }

    /// How well chart metadata answers a `title [+ artist]` query, 0.0–1.0.
    pub fn query_score(&self, title: &str, artist: Option<&str>, metadata: &ChartMetadata) -> f64 {
        let title_score = text_similarity(title, &metadata.title);
        match artist.filter(|a| !a.trim().is_empty()) {
            Some(artist) => (title_score + self.artist_similarity(artist, &metadata.artist)) / 2.0,
            None => title_score,
        }
    }
}

/// Chord progression as (interval above the shapes key, quality).
fn relative_progression(doc: &CanonicalDocument, limit: usize) -> Vec<(u8, ChordQuality)> {
    let key = doc.shapes_key();
    let mut progression: Vec<(u8, ChordQuality)> = Vec::new();
    for chord in doc.chords() {
        let step = (key.interval_to(chord.root), chord.quality);
        // Repeated chords are a formatting choice (one per bar or one per line)
        if progression.last() != Some(&step) {
            progression.push(step);
        }
        if progression.len() == limit {
            break;
        }
    }
    progression
}

/// LCS ratio of the two key-relative chord progressions: 2·LCS / (|a| + |b|).
///
/// Returns `None` when either document has fewer than `min_chords` chords.
pub fn structural_similarity(
    a: &CanonicalDocument,
    b: &CanonicalDocument,
    min_chords: usize,
    max_chords: usize,
) -> Option<f64> {
    if a.chord_count() < min_chords || b.chord_count() < min_chords {
        return None;
    }
    let a = relative_progression(a, max_chords);
    let b = relative_progression(b, max_chords);
    if a.is_empty() && b.is_empty() {
        return None;
    }
    let lcs = lcs_len(&a, &b);
    Some(2.0 * lcs as f64 / (a.len() + b.len()) as f64)
}

fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{ProviderHint, parse};

    fn doc(raw: &str) -> CanonicalDocument {
        parse(raw, ProviderHint::InlineBrackets).into_document()
    }

    #[test]
    fn test_lcs_len() {
        assert_eq!(lcs_len(&[1, 2, 3, 4], &[1, 3, 4]), 3);
        assert_eq!(lcs_len::<i32>(&[], &[1]), 0);
        assert_eq!(lcs_len(&[1, 2], &[3, 4]), 0);
    }

    #[test]
    fn test_structural_similarity_is_key_invariant() {
        let in_g = doc("Key: G\n[G]a [C]b [D]c [Em]d [G]e");
        let in_a = doc("Key: A\n[A]a [D]b [E]c [F#m]d [A]e");
        assert_eq!(structural_similarity(&in_g, &in_a, 4, 512), Some(1.0));
    }

    #[test]
    fn test_structural_similarity_with_capo() {
        // Same sounding song: G shapes with capo 2 vs A shapes without
        let capoed = doc("Capo: 2\nKey: A\n[G]a [C]b [D]c [G]d");
        let open = doc("Key: A\n[A]a [D]b [E]c [A]d");
        assert_eq!(structural_similarity(&capoed, &open, 4, 512), Some(1.0));
    }

    #[test]
    fn test_structural_similarity_needs_chords() {
        let few = doc("[G]a [C]b");
        let many = doc("[G]a [C]b [D]c [G]d");
        assert_eq!(structural_similarity(&few, &many, 4, 512), None);
    }

    #[test]
    fn test_partial_structural_overlap() {
        let a = doc("Key: C\n[C]a [F]b [G]c [Am]d [F]e");
        let b = doc("Key: C\n[C]a [F]b [G]c [C]d [E7]e");
        let s = structural_similarity(&a, &b, 4, 512).unwrap();
        // LCS is C F G (3) of 5 + 5
        assert!((s - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_decision_rule() {
        let config = MatchingConfig::default();
        let same = PairScores {
            title: 1.0,
            artist: 0.9,
            structural: Some(0.7),
        };
        assert_eq!(same.decide(&config), MatchDecision::Same);

        let no_structure = PairScores {
            title: 0.9,
            artist: 0.9,
            structural: None,
        };
        assert_eq!(no_structure.decide(&config), MatchDecision::Same);

        let near_miss = PairScores {
            title: 0.82,
            artist: 1.0,
            structural: Some(0.9),
        };
        assert_eq!(near_miss.decide(&config), MatchDecision::Ambiguous);

        let different_chords = PairScores {
            title: 1.0,
            artist: 1.0,
            structural: Some(0.3),
        };
        assert_eq!(different_chords.decide(&config), MatchDecision::Distinct);

        let far = PairScores {
            title: 0.5,
            artist: 1.0,
            structural: None,
        };
        assert_eq!(far.decide(&config), MatchDecision::Distinct);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let strict = MatchingConfig {
            title_threshold: 0.95,
            ..MatchingConfig::default()
        };
        let scores = PairScores {
            title: 0.9,
            artist: 1.0,
            structural: None,
        };
        assert_eq!(scores.decide(&MatchingConfig::default()), MatchDecision::Same);
        assert_eq!(scores.decide(&strict), MatchDecision::Ambiguous);
    }

    #[test]
    fn test_traditional_variants_cluster() {
        let scorer = Scorer::new(MatchingConfig::default());
        let a = doc("Title: Amazing Grace\nArtist: Traditional\n[G]a [C]b [G]c [D]d [G]e");
        let b = doc("Title: Amazing Grace\nArtist: Trad.\nKey: A\n[A]a [D]b [A]c [E]d [A]e");
        let (scores, decision) = scorer.decide(&a, &b);
        assert_eq!(scores.title, 1.0);
        assert_eq!(scores.artist, 1.0);
        assert_eq!(scores.structural, Some(1.0));
        assert_eq!(decision, MatchDecision::Same);
    }

    #[test]
    fn test_untitled_charts_are_distinct() {
        let scorer = Scorer::new(MatchingConfig::default());
        let a = doc("[G]hello there friend");
        let b = doc("[Bbm]completely other [Eb]words");
        let (scores, decision) = scorer.decide(&a, &b);
        assert_eq!(scores.title, 0.0);
        assert_eq!(scores.artist, 1.0);
        assert_eq!(decision, MatchDecision::Distinct);
    }

    #[test]
    fn test_query_score() {
        let scorer = Scorer::new(MatchingConfig::default());
        let meta = doc("Title: Amazing Grace\nArtist: Traditional\n[G]a").metadata;
        assert_eq!(scorer.query_score("amazing grace", None, &meta), 1.0);
        assert_eq!(scorer.query_score("Amazing Grace", Some("trad"), &meta), 1.0);
        assert!(scorer.query_score("Wonderwall", Some("Oasis"), &meta) < 0.3);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::chart::{ProviderHint, parse};
    use proptest::prelude::*;

    const CHORDS: &[&str] = &["C", "Dm", "Em", "F", "G7", "Am", "Bb", "E7"];

    fn chart() -> impl Strategy<Value = CanonicalDocument> {
        (
            "[A-Za-z][A-Za-z ]{0,15}",
            "[A-Za-z. ]{0,12}",
            prop::collection::vec(0..CHORDS.len(), 0..12),
        )
            .prop_map(|(title, artist, chords)| {
                let body: Vec<String> = chords.iter().map(|i| format!("[{}]la", CHORDS[*i])).collect();
                let raw = format!("Title: {}\nArtist: {}\n{}", title, artist, body.join(" "));
                parse(&raw, ProviderHint::InlineBrackets).into_document()
            })
    }

    proptest! {
        #[test]
        fn score_is_symmetric(a in chart(), b in chart()) {
            let scorer = Scorer::new(MatchingConfig::default());
            prop_assert_eq!(scorer.score(&a, &b), scorer.score(&b, &a));
            prop_assert_eq!(scorer.decide(&a, &b).1, scorer.decide(&b, &a).1);
        }

        #[test]
        fn self_similarity_is_one(a in chart()) {
            let scorer = Scorer::new(MatchingConfig::default());
            let scores = scorer.score(&a, &a);
            prop_assert_eq!(scores.title, 1.0);
            prop_assert_eq!(scores.artist, 1.0);
            prop_assert!(scores.structural.is_none_or(|s| s == 1.0));
        }
    }
}
