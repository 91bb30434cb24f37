//! Canonical, source-independent chart model.
//!
//! A [`CanonicalDocument`] is an ordered token stream plus [`ChartMetadata`].
//! Each rendered line of a chart ends with [`CanonicalToken::LineBreak`].
//!
//! `ChordMarker::position` is the character offset (not byte offset) into
//! the lyric line the chord sits above. It is the only alignment contract
//! between chords and lyrics, so every transform must carry it unchanged.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::theory::{AccidentalBias, ChordSymbol, Pitch};

/// Kind of a structural section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Content before (or without) any recognized section marker.
    Unlabeled,
    Intro,
    Verse,
    PreChorus,
    Chorus,
    Bridge,
    Solo,
    Interlude,
    Outro,
    Tag,
}

impl SectionKind {
    /// Recognize a section name such as `Verse`, `Pre-Chorus` or `Chorus 2`.
    ///
    /// Returns the kind plus any trailing label (`"2"` for `Chorus 2`).
    pub fn from_label(text: &str) -> Option<(SectionKind, Option<String>)> {
        let text = text.trim();
        let lower = text.to_lowercase();
        const NAMES: &[(&str, SectionKind)] = &[
            ("pre-chorus", SectionKind::PreChorus),
            ("pre chorus", SectionKind::PreChorus),
            ("prechorus", SectionKind::PreChorus),
            ("chorus", SectionKind::Chorus),
            ("refrain", SectionKind::Chorus),
            ("verse", SectionKind::Verse),
            ("bridge", SectionKind::Bridge),
            ("intro", SectionKind::Intro),
            ("outro", SectionKind::Outro),
            ("ending", SectionKind::Outro),
            ("solo", SectionKind::Solo),
            ("interlude", SectionKind::Interlude),
            ("instrumental", SectionKind::Interlude),
            ("tag", SectionKind::Tag),
            ("coda", SectionKind::Tag),
        ];

        let (name, kind) = NAMES.iter().find(|(name, _)| lower.starts_with(name))?;
        // Byte offsets line up because every name is ASCII
        let rest = text.get(name.len()..).unwrap_or_default().trim();
        let mut rest_chars = rest.chars();
        let repeat_count = matches!(
            (rest_chars.next(), rest_chars.next()),
            (Some('x' | 'X'), Some(d)) if d.is_ascii_digit()
        );
        if !repeat_count && rest.chars().next().is_some_and(|c| c.is_alphabetic()) {
            // "Versed", "Tagline" and friends are not section markers
            return None;
        }
        let label = (!rest.is_empty()).then(|| rest.to_string());
        Some((*kind, label))
    }

    /// Display name used when rendering a marker.
    pub fn name(self) -> &'static str {
        match self {
            SectionKind::Unlabeled => "",
            SectionKind::Intro => "Intro",
            SectionKind::Verse => "Verse",
            SectionKind::PreChorus => "Pre-Chorus",
            SectionKind::Chorus => "Chorus",
            SectionKind::Bridge => "Bridge",
            SectionKind::Solo => "Solo",
            SectionKind::Interlude => "Interlude",
            SectionKind::Outro => "Outro",
            SectionKind::Tag => "Tag",
        }
    }
}

/// One element of a canonical chart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalToken {
    ChordMarker { chord: ChordSymbol, position: usize },
    LyricRun { text: String },
    SectionMarker { kind: SectionKind, label: Option<String> },
    BarLine,
    LineBreak,
}

impl CanonicalToken {
    pub fn chord(chord: ChordSymbol, position: usize) -> Self {
        CanonicalToken::ChordMarker { chord, position }
    }

    pub fn lyric(text: impl Into<String>) -> Self {
        CanonicalToken::LyricRun { text: text.into() }
    }

    pub fn section(kind: SectionKind, label: Option<String>) -> Self {
        CanonicalToken::SectionMarker { kind, label }
    }
}

/// Time signature such as 4/4 or 6/8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub unit: u8,
}

impl TimeSignature {
    pub fn parse(text: &str) -> Option<Self> {
        let (beats, unit) = text.trim().split_once('/')?;
        let beats: u8 = beats.trim().parse().ok()?;
        let unit: u8 = unit.trim().parse().ok()?;
        if beats == 0 || !matches!(unit, 1 | 2 | 4 | 8 | 16 | 32) {
            return None;
        }
        Some(Self { beats, unit })
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.unit)
    }
}

/// Chart-level metadata.
///
/// `key` is always the sounding key. `capo` is stored separately; chords in
/// the token stream are the shapes fingered at that capo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartMetadata {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub key: Pitch,
    /// True when the source stated the key rather than it being inferred
    pub key_declared: bool,
    /// Capo fret, 0–11
    pub capo: u8,
    /// Beats per minute
    pub tempo: Option<u16>,
    /// 1 (beginner) to 5 (expert)
    pub difficulty: Option<u8>,
    pub time_signature: Option<TimeSignature>,
    /// Accidental preference for rendering chord names
    pub accidentals: AccidentalBias,
}

impl Default for ChartMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            artist: String::new(),
            album: None,
            key: Pitch::C,
            key_declared: false,
            capo: 0,
            tempo: None,
            difficulty: None,
            time_signature: None,
            accidentals: AccidentalBias::Sharp,
        }
    }
}

/// Ordered token stream plus metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalDocument {
    pub metadata: ChartMetadata,
    pub tokens: Vec<CanonicalToken>,
}

impl CanonicalDocument {
    /// All chord symbols in document order.
    pub fn chords(&self) -> impl Iterator<Item = &ChordSymbol> {
        self.tokens.iter().filter_map(|t| match t {
            CanonicalToken::ChordMarker { chord, .. } => Some(chord),
            _ => None,
        })
    }

    pub fn chord_count(&self) -> usize {
        self.chords().count()
    }

    pub fn has_lyrics(&self) -> bool {
        self.tokens.iter().any(|t| match t {
            CanonicalToken::LyricRun { text } => !text.trim().is_empty(),
            _ => false,
        })
    }

    /// True if any labelled (non-default) section marker is present.
    pub fn has_sections(&self) -> bool {
        self.tokens.iter().any(|t| {
            matches!(t, CanonicalToken::SectionMarker { kind, .. } if *kind != SectionKind::Unlabeled)
        })
    }

    /// Key of the chord shapes a player fingers: `(key - capo) mod 12`.
    ///
    /// Derived on demand, never stored.
    pub fn shapes_key(&self) -> Pitch {
        self.metadata.key.transpose(-(self.metadata.capo as i32))
    }

    /// Token slices for each line, without their trailing `LineBreak`.
    pub fn lines(&self) -> impl Iterator<Item = &[CanonicalToken]> {
        let tokens = self.tokens.as_slice();
        let ends_with_break = matches!(tokens.last(), Some(CanonicalToken::LineBreak));
        let mut lines: Vec<&[CanonicalToken]> = tokens
            .split(|t| matches!(t, CanonicalToken::LineBreak))
            .collect();
        if ends_with_break {
            lines.pop();
        }
        lines.into_iter()
    }

    /// Lyric text of the whole chart, one line per `LineBreak`.
    pub fn lyrics_text(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                CanonicalToken::LyricRun { text } => out.push_str(text),
                CanonicalToken::LineBreak => out.push('\n'),
                _ => {}
            }
        }
        out
    }
}
