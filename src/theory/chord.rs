//! Chord symbol grammar.
//!
//! Reduces chord notation strings (`C`, `Am7`, `F#m7b5`, `G7sus4`, `Bb/D`,
//! `Cadd9`, `E♭maj7`) to a [`ChordSymbol`] whose root and bass are pitch
//! classes. The spelling a source used is discarded; it is reconstructed at
//! display time from an [`AccidentalBias`].
//!
//! # Suffix precedence
//!
//! Suffix pieces must appear in a fixed order:
//!
//! 1. triad marker (`m`, `dim`, `aug`, `ø`, `maj`)
//! 2. seventh or extension number (`7`, `maj7`, `9`, `13`, `6`, `5`)
//! 3. suspension (`sus2`, `sus4`, `sus`)
//! 4. added tone (`add9`, `add11`)
//! 5. alterations (`b5`, `#5`, `b9`, `#9`, `#11`, `b13`)
//!
//! A piece that appears after a later-ranked piece, a repeated piece, or a
//! contradictory combination (`msus4`, `dim9`) is rejected as
//! [`ChordError::AmbiguousSuffix`].

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::pitch::{AccidentalBias, Pitch};

/// Why a chord notation string could not be reduced to a [`ChordSymbol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum ChordError {
    #[error("empty chord symbol")]
    EmptyInput,

    #[error("unknown chord root")]
    UnknownRoot,

    #[error("unknown chord quality")]
    UnknownQuality,

    #[error("ambiguous chord suffix")]
    AmbiguousSuffix,
}

/// Closed set of chord families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
    Dominant7,
    Major7,
    Minor7,
    MinorMajor7,
    Diminished,
    Diminished7,
    HalfDiminished,
    Augmented,
    Sus2,
    Sus4,
    Add9,
    Power,
    Major6,
    Minor6,
}

impl ChordQuality {
    /// Canonical suffix text for this quality.
    pub fn suffix(self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::MinorMajor7 => "m(maj7)",
            ChordQuality::Diminished => "dim",
            ChordQuality::Diminished7 => "dim7",
            ChordQuality::HalfDiminished => "m7b5",
            ChordQuality::Augmented => "aug",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Add9 => "add9",
            ChordQuality::Power => "5",
            ChordQuality::Major6 => "6",
            ChordQuality::Minor6 => "m6",
        }
    }

    /// True for qualities built on a minor third.
    pub fn is_minor(self) -> bool {
        matches!(
            self,
            ChordQuality::Minor
                | ChordQuality::Minor7
                | ChordQuality::MinorMajor7
                | ChordQuality::Minor6
                | ChordQuality::Diminished
                | ChordQuality::Diminished7
                | ChordQuality::HalfDiminished
        )
    }

    fn has_seventh(self) -> bool {
        matches!(
            self,
            ChordQuality::Dominant7
                | ChordQuality::Major7
                | ChordQuality::Minor7
                | ChordQuality::MinorMajor7
        )
    }
}

/// Scale-degree modifier applied on top of a [`ChordQuality`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extension {
    Ninth,
    Eleventh,
    Thirteenth,
    Sus2,
    Sus4,
    Add(u8),
    Flat5,
    Sharp5,
    Flat9,
    Sharp9,
    Sharp11,
    Flat13,
}

impl Extension {
    fn suffix(self) -> String {
        match self {
            Extension::Ninth => "9".to_string(),
            Extension::Eleventh => "11".to_string(),
            Extension::Thirteenth => "13".to_string(),
            Extension::Sus2 => "sus2".to_string(),
            Extension::Sus4 => "sus4".to_string(),
            Extension::Add(degree) => format!("add{}", degree),
            Extension::Flat5 => "b5".to_string(),
            Extension::Sharp5 => "#5".to_string(),
            Extension::Flat9 => "b9".to_string(),
            Extension::Sharp9 => "#9".to_string(),
            Extension::Sharp11 => "#11".to_string(),
            Extension::Flat13 => "b13".to_string(),
        }
    }

    fn is_upper(self) -> bool {
        matches!(
            self,
            Extension::Ninth | Extension::Eleventh | Extension::Thirteenth
        )
    }
}

/// A chord reduced to pitch classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChordSymbol {
    pub root: Pitch,
    pub quality: ChordQuality,
    /// Slash-chord bass note, if different from the root.
    pub bass: Option<Pitch>,
    pub extensions: SmallVec<[Extension; 4]>,
}

impl ChordSymbol {
    /// Plain chord with no extensions or slash bass.
    pub fn new(root: Pitch, quality: ChordQuality) -> Self {
        Self {
            root,
            quality,
            bass: None,
            extensions: SmallVec::new(),
        }
    }

    pub fn with_bass(mut self, bass: Pitch) -> Self {
        self.bass = Some(bass);
        self
    }

    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Rotate root and bass by `delta` semitones; quality and extensions are kept.
    pub fn transposed(&self, delta: i32) -> Self {
        Self {
            root: self.root.transpose(delta),
            quality: self.quality,
            bass: self.bass.map(|b| b.transpose(delta)),
            extensions: self.extensions.clone(),
        }
    }

    /// Canonical text for this chord using the given accidental bias.
    ///
    /// The result parses back to an equal `ChordSymbol`.
    pub fn spelled(&self, bias: AccidentalBias) -> String {
        let mut out = String::from(self.root.spelled(bias));
        let mut extensions = self.extensions.iter().copied().peekable();

        // A leading upper extension replaces the 7 of a seventh chord: C9, Cm11, Cmaj13.
        match extensions.peek().copied() {
            Some(ext) if ext.is_upper() && self.quality.has_seventh() => {
                extensions.next();
                let number = ext.suffix();
                let text = match self.quality {
                    ChordQuality::Dominant7 => number,
                    ChordQuality::Major7 => format!("maj{}", number),
                    ChordQuality::Minor7 => format!("m{}", number),
                    _ => format!("m(maj{})", number),
                };
                out.push_str(&text);
            }
            _ => out.push_str(self.quality.suffix()),
        }

        for ext in extensions {
            out.push_str(&ext.suffix());
        }

        if let Some(bass) = self.bass {
            out.push('/');
            out.push_str(bass.spelled(bias));
        }
        out
    }
}

impl fmt::Display for ChordSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spelled(AccidentalBias::Sharp))
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// One recognized piece of a chord suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Triad(Triad),
    Seventh { major: bool, degree: u8 },
    Sixth,
    Power,
    Sus(u8),
    Add(u8),
    Alteration(Extension),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Triad {
    Major,
    Minor,
    Diminished,
    Augmented,
    HalfDiminished,
}

impl Piece {
    fn rank(self) -> u8 {
        match self {
            Piece::Triad(_) => 0,
            Piece::Seventh { .. } | Piece::Sixth | Piece::Power => 1,
            Piece::Sus(_) => 2,
            Piece::Add(_) => 3,
            Piece::Alteration(_) => 4,
        }
    }
}

/// Suffix vocabulary, longest spellings first so greedy matching is unambiguous.
const LEXICON: &[(&str, Piece)] = &[
    ("maj13", Piece::Seventh { major: true, degree: 13 }),
    ("maj11", Piece::Seventh { major: true, degree: 11 }),
    ("maj9", Piece::Seventh { major: true, degree: 9 }),
    ("maj7", Piece::Seventh { major: true, degree: 7 }),
    ("Maj7", Piece::Seventh { major: true, degree: 7 }),
    ("ma7", Piece::Seventh { major: true, degree: 7 }),
    ("M13", Piece::Seventh { major: true, degree: 13 }),
    ("M11", Piece::Seventh { major: true, degree: 11 }),
    ("M9", Piece::Seventh { major: true, degree: 9 }),
    ("M7", Piece::Seventh { major: true, degree: 7 }),
    ("Δ7", Piece::Seventh { major: true, degree: 7 }),
    ("Δ", Piece::Seventh { major: true, degree: 7 }),
    ("add13", Piece::Add(13)),
    ("add11", Piece::Add(11)),
    ("add9", Piece::Add(9)),
    ("add4", Piece::Add(4)),
    ("add2", Piece::Add(2)),
    ("sus4", Piece::Sus(4)),
    ("sus2", Piece::Sus(2)),
    ("sus", Piece::Sus(4)),
    ("b13", Piece::Alteration(Extension::Flat13)),
    ("#11", Piece::Alteration(Extension::Sharp11)),
    ("+11", Piece::Alteration(Extension::Sharp11)),
    ("b9", Piece::Alteration(Extension::Flat9)),
    ("#9", Piece::Alteration(Extension::Sharp9)),
    ("b5", Piece::Alteration(Extension::Flat5)),
    ("#5", Piece::Alteration(Extension::Sharp5)),
    ("+5", Piece::Alteration(Extension::Sharp5)),
    ("dim", Piece::Triad(Triad::Diminished)),
    ("aug", Piece::Triad(Triad::Augmented)),
    ("min", Piece::Triad(Triad::Minor)),
    ("maj", Piece::Triad(Triad::Major)),
    ("13", Piece::Seventh { major: false, degree: 13 }),
    ("11", Piece::Seventh { major: false, degree: 11 }),
    ("mi", Piece::Triad(Triad::Minor)),
    ("m", Piece::Triad(Triad::Minor)),
    ("-", Piece::Triad(Triad::Minor)),
    ("M", Piece::Triad(Triad::Major)),
    ("°", Piece::Triad(Triad::Diminished)),
    ("+", Piece::Triad(Triad::Augmented)),
    ("ø", Piece::Triad(Triad::HalfDiminished)),
    ("9", Piece::Seventh { major: false, degree: 9 }),
    ("7", Piece::Seventh { major: false, degree: 7 }),
    ("6", Piece::Sixth),
    ("5", Piece::Power),
    ("4", Piece::Sus(4)),
    ("2", Piece::Sus(2)),
];

/// Parse a chord notation string into a [`ChordSymbol`].
///
/// # Examples
/// ```
/// use chart_minder::theory::{parse_chord_text, ChordQuality, ChordError, Pitch};
///
/// let chord = parse_chord_text("Am7").unwrap();
/// assert_eq!(chord.root, Pitch::A);
/// assert_eq!(chord.quality, ChordQuality::Minor7);
///
/// assert_eq!(parse_chord_text(""), Err(ChordError::EmptyInput));
/// assert_eq!(parse_chord_text("Hm"), Err(ChordError::UnknownRoot));
/// ```
pub fn parse_chord_text(text: &str) -> Result<ChordSymbol, ChordError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ChordError::EmptyInput);
    }

    let (root, _, consumed) = Pitch::parse_prefix(text).ok_or(ChordError::UnknownRoot)?;
    let rest = &text[consumed..];

    let (suffix, bass) = split_bass(rest)?;
    let normalized = normalize_suffix(suffix);
    let pieces = tokenize_suffix(&normalized)?;
    let (quality, extensions) = resolve_pieces(&pieces)?;

    Ok(ChordSymbol {
        root,
        quality,
        bass: bass.filter(|b| *b != root),
        extensions,
    })
}

/// Split off a slash bass. `6/9` is a suffix, not a slash chord.
fn split_bass(rest: &str) -> Result<(&str, Option<Pitch>), ChordError> {
    let Some(slash) = rest.rfind('/') else {
        return Ok((rest, None));
    };
    let after = &rest[slash + 1..];
    if after.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return Ok((rest, None));
    }
    let (bass, _, consumed) = Pitch::parse_prefix(after).ok_or(ChordError::UnknownRoot)?;
    if consumed != after.len() {
        return Err(ChordError::UnknownRoot);
    }
    Ok((&rest[..slash], Some(bass)))
}

/// Drop grouping characters and fold Unicode accidentals to ASCII.
fn normalize_suffix(suffix: &str) -> String {
    suffix
        .replace("6/9", "6add9")
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | ',' | ' '))
        .map(|c| match c {
            '♯' => '#',
            '♭' => 'b',
            other => other,
        })
        .collect()
}

fn tokenize_suffix(mut suffix: &str) -> Result<Vec<Piece>, ChordError> {
    let mut pieces = Vec::new();
    while !suffix.is_empty() {
        let (text, piece) = LEXICON
            .iter()
            .find(|(text, _)| suffix.starts_with(text))
            .ok_or(ChordError::UnknownQuality)?;
        pieces.push(*piece);
        suffix = &suffix[text.len()..];
    }
    Ok(pieces)
}

fn resolve_pieces(pieces: &[Piece]) -> Result<(ChordQuality, SmallVec<[Extension; 4]>), ChordError> {
    let mut triad = None;
    let mut seventh = None;
    let mut sus = None;
    let mut add = None;
    let mut alterations: SmallVec<[Extension; 4]> = SmallVec::new();
    let mut last_rank = 0;

    for piece in pieces {
        if piece.rank() < last_rank {
            return Err(ChordError::AmbiguousSuffix);
        }
        last_rank = piece.rank();

        let slot_taken = match piece {
            Piece::Triad(t) => triad.replace(*t).is_some(),
            Piece::Seventh { .. } | Piece::Sixth | Piece::Power => seventh.replace(*piece).is_some(),
            Piece::Sus(n) => sus.replace(*n).is_some(),
            Piece::Add(n) => add.replace(*n).is_some(),
            Piece::Alteration(ext) => {
                if alterations.contains(ext) {
                    true
                } else {
                    alterations.push(*ext);
                    false
                }
            }
        };
        if slot_taken {
            return Err(ChordError::AmbiguousSuffix);
        }
    }

    let mut extensions: SmallVec<[Extension; 4]> = SmallVec::new();
    let upper = |degree: u8| match degree {
        9 => Some(Extension::Ninth),
        11 => Some(Extension::Eleventh),
        13 => Some(Extension::Thirteenth),
        _ => None,
    };

    let mut implied_sharp5 = false;
    let mut quality = match (triad, seventh) {
        (None | Some(Triad::Major), None) => ChordQuality::Major,
        (Some(Triad::Minor), None) => ChordQuality::Minor,
        (Some(Triad::Diminished), None) => ChordQuality::Diminished,
        (Some(Triad::Augmented), None) => ChordQuality::Augmented,
        (Some(Triad::HalfDiminished), None)
        | (Some(Triad::HalfDiminished), Some(Piece::Seventh { major: false, degree: 7 })) => {
            ChordQuality::HalfDiminished
        }
        (Some(Triad::Diminished), Some(Piece::Seventh { major: false, degree: 7 })) => {
            ChordQuality::Diminished7
        }
        (None, Some(Piece::Seventh { major: false, degree })) => {
            extensions.extend(upper(degree));
            ChordQuality::Dominant7
        }
        (None | Some(Triad::Major), Some(Piece::Seventh { major: true, degree })) => {
            extensions.extend(upper(degree));
            ChordQuality::Major7
        }
        (Some(Triad::Major), Some(Piece::Seventh { major: false, degree })) => {
            extensions.extend(upper(degree));
            ChordQuality::Major7
        }
        (Some(Triad::Minor), Some(Piece::Seventh { major, degree })) => {
            extensions.extend(upper(degree));
            if major {
                ChordQuality::MinorMajor7
            } else {
                ChordQuality::Minor7
            }
        }
        (Some(Triad::Augmented), Some(Piece::Seventh { major, degree })) => {
            extensions.extend(upper(degree));
            implied_sharp5 = true;
            if major {
                ChordQuality::Major7
            } else {
                ChordQuality::Dominant7
            }
        }
        (None | Some(Triad::Major), Some(Piece::Sixth)) => ChordQuality::Major6,
        (Some(Triad::Minor), Some(Piece::Sixth)) => ChordQuality::Minor6,
        (None, Some(Piece::Power)) => ChordQuality::Power,
        _ => return Err(ChordError::AmbiguousSuffix),
    };

    if let Some(degree) = sus {
        let ext = if degree == 2 { Extension::Sus2 } else { Extension::Sus4 };
        match quality {
            ChordQuality::Major if triad.is_none() => {
                quality = if degree == 2 { ChordQuality::Sus2 } else { ChordQuality::Sus4 };
            }
            ChordQuality::Dominant7 | ChordQuality::Major7 => extensions.push(ext),
            _ => return Err(ChordError::AmbiguousSuffix),
        }
    }

    if let Some(degree) = add {
        match quality {
            ChordQuality::Power => return Err(ChordError::AmbiguousSuffix),
            ChordQuality::Major if degree == 9 && extensions.is_empty() => {
                quality = ChordQuality::Add9;
            }
            _ => extensions.push(Extension::Add(degree)),
        }
    }

    if implied_sharp5 {
        if alterations.contains(&Extension::Sharp5) {
            return Err(ChordError::AmbiguousSuffix);
        }
        extensions.push(Extension::Sharp5);
    }
    if quality == ChordQuality::Power && !alterations.is_empty() {
        return Err(ChordError::AmbiguousSuffix);
    }
    if alterations.contains(&Extension::Flat5) {
        match quality {
            ChordQuality::HalfDiminished => return Err(ChordError::AmbiguousSuffix),
            // m7b5 is the half-diminished chord
            ChordQuality::Minor7 if extensions.is_empty() => {
                quality = ChordQuality::HalfDiminished;
                alterations.retain(|ext| *ext != Extension::Flat5);
            }
            _ => {}
        }
    }
    extensions.extend(alterations);

    Ok((quality, extensions))
}
