//! Transposition engine.
//!
//! Transposition is a pitch-class rotation: every chord root and bass moves by
//! the same number of semitones, quality and extensions stay as they are. The
//! input document is never mutated.
//!
//! Chords in a document are the shapes fingered at its capo, while
//! `metadata.key` is always the sounding key. Changing the capo therefore
//! rotates the chords the other way and leaves the key alone.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chart::{CanonicalDocument, CanonicalToken};
use crate::theory::{ChordSymbol, Pitch, SpellingTable};

/// Largest capo fret we accept.
pub const MAX_CAPO: i32 = 11;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransposeError {
    #[error("invalid transpose target: {0}")]
    InvalidTransposeTarget(String),
}

/// Requested transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransposeTarget {
    /// Move the sounding key to this pitch class
    ToKey(Pitch),
    /// Shift by a signed number of semitones, -11..=11
    Delta(i32),
    /// Play with a capo at this fret, 0..=11, keeping the sounding key
    Capo(i32),
}

impl TransposeTarget {
    /// Build a `ToKey` target from a key name such as `D`, `Bb` or `F#m`.
    pub fn parse_key(text: &str) -> Result<Self, TransposeError> {
        Pitch::parse_name(text)
            .map(TransposeTarget::ToKey)
            .ok_or_else(|| TransposeError::InvalidTransposeTarget(format!("unknown key {:?}", text)))
    }

    fn validate(self) -> Result<Self, TransposeError> {
        match self {
            TransposeTarget::Delta(d) if !(-11..=11).contains(&d) => Err(
                TransposeError::InvalidTransposeTarget(format!("delta {} outside -11..=11", d)),
            ),
            TransposeTarget::Capo(c) if !(0..=MAX_CAPO).contains(&c) => Err(
                TransposeError::InvalidTransposeTarget(format!("capo {} outside 0..={}", c, MAX_CAPO)),
            ),
            target => Ok(target),
        }
    }
}

/// Rotate one chord by `delta` semitones.
pub fn transpose_chord(chord: &ChordSymbol, delta: i32) -> ChordSymbol {
    chord.transposed(delta)
}

/// Key of the shapes a player fingers: `(key - capo) mod 12`.
pub fn shapes_key(doc: &CanonicalDocument) -> Pitch {
    doc.shapes_key()
}

/// Produce a transposed copy of `doc`.
///
/// The result's accidental bias comes from `spelling` for its shapes key, so
/// a chart never mixes sharps and flats.
pub fn transpose(
    doc: &CanonicalDocument,
    target: TransposeTarget,
    spelling: &SpellingTable,
) -> Result<CanonicalDocument, TransposeError> {
    let target = target.validate()?;
    let current_capo = doc.metadata.capo as i32;

    // (chord rotation, new sounding key, new capo)
    let (delta, key, capo) = match target {
        TransposeTarget::ToKey(key) => (
            doc.metadata.key.interval_to(key) as i32,
            key,
            current_capo,
        ),
        TransposeTarget::Delta(d) => (d, doc.metadata.key.transpose(d), current_capo),
        TransposeTarget::Capo(p) => (current_capo - p, doc.metadata.key, p),
    };

    let tokens = doc
        .tokens
        .iter()
        .map(|token| match token {
            CanonicalToken::ChordMarker { chord, position } => CanonicalToken::ChordMarker {
                chord: transpose_chord(chord, delta),
                position: *position,
            },
            other => other.clone(),
        })
        .collect();

    let mut metadata = doc.metadata.clone();
    metadata.key = key;
    metadata.capo = capo as u8;
    metadata.accidentals = spelling.bias_for(key.transpose(-capo));

    Ok(CanonicalDocument { metadata, tokens })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::chart::{ProviderHint, parse};
    use proptest::prelude::*;

    const CHART: &str = "Capo: 1\n[C]One [Am7]two [F/A]three [G7sus4]four\n[Bb]five [Ebmaj7]six [D/F#]seven";

    fn roots_and_basses(doc: &CanonicalDocument) -> Vec<(Pitch, Option<Pitch>)> {
        doc.chords().map(|c| (c.root, c.bass)).collect()
    }

    proptest! {
        #[test]
        fn inverse_restores_pitch_classes(d in -11i32..=11) {
            let table = SpellingTable::default();
            let doc = parse(CHART, ProviderHint::InlineBrackets).into_document();
            let there = transpose(&doc, TransposeTarget::Delta(d), &table).unwrap();
            let back = transpose(&there, TransposeTarget::Delta(-d), &table).unwrap();
            prop_assert_eq!(roots_and_basses(&back), roots_and_basses(&doc));
            prop_assert_eq!(back.metadata.key, doc.metadata.key);
        }

        #[test]
        fn deltas_compose(d1 in -11i32..=11, d2 in -11i32..=11) {
            let table = SpellingTable::default();
            let doc = parse(CHART, ProviderHint::InlineBrackets).into_document();
            let once = transpose(&doc, TransposeTarget::Delta((d1 + d2) % 12), &table).unwrap();
            let step = transpose(&doc, TransposeTarget::Delta(d1), &table).unwrap();
            let twice = transpose(&step, TransposeTarget::Delta(d2), &table).unwrap();
            prop_assert_eq!(roots_and_basses(&once), roots_and_basses(&twice));
            prop_assert_eq!(once.metadata.key, twice.metadata.key);
        }

        #[test]
        fn chord_rotation_keeps_quality(d in -11i32..=11) {
            let doc = parse(CHART, ProviderHint::InlineBrackets).into_document();
            for chord in doc.chords() {
                let moved = transpose_chord(chord, d);
                prop_assert_eq!(moved.quality, chord.quality);
                prop_assert_eq!(&moved.extensions, &chord.extensions);
                prop_assert_eq!(moved.root, chord.root.transpose(d));
            }
        }

        #[test]
        fn capo_never_changes_sounding_key(capo in 0i32..=11) {
            let table = SpellingTable::default();
            let doc = parse(CHART, ProviderHint::InlineBrackets).into_document();
            let moved = transpose(&doc, TransposeTarget::Capo(capo), &table).unwrap();
            prop_assert_eq!(moved.metadata.key, doc.metadata.key);
            prop_assert_eq!(moved.shapes_key(), doc.metadata.key.transpose(-capo));
        }
    }
}
