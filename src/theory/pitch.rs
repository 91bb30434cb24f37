//! Pitch classes, note letters and enharmonic spelling.
//!
//! A [`Pitch`] is one of the 12 pitch classes, stored as its semitone distance
//! from C. All arithmetic is modulo 12. Spelling (sharp vs. flat names) is never
//! stored on a pitch; it is chosen at display time from an [`AccidentalBias`],
//! usually looked up in a [`SpellingTable`] for the key being rendered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the 12 pitch classes (C = 0, C#/Db = 1, ... B = 11).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Pitch(u8);

impl Pitch {
    pub const C: Pitch = Pitch(0);
    pub const D: Pitch = Pitch(2);
    pub const E: Pitch = Pitch(4);
    pub const F: Pitch = Pitch(5);
    pub const G: Pitch = Pitch(7);
    pub const A: Pitch = Pitch(9);
    pub const B: Pitch = Pitch(11);

    /// Build a pitch class from any integer, reducing it modulo 12.
    pub fn new(semitones: i32) -> Self {
        Pitch(semitones.rem_euclid(12) as u8)
    }

    /// Semitone distance from C, always in `0..12`.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Rotate this pitch class by `delta` semitones.
    pub fn transpose(self, delta: i32) -> Self {
        Pitch::new(self.0 as i32 + delta)
    }

    /// Upward interval from `self` to `other`, in `0..12`.
    pub fn interval_to(self, other: Pitch) -> u8 {
        (other.0 as i32 - self.0 as i32).rem_euclid(12) as u8
    }

    /// Parse a note name (`C`, `F#`, `Bb`, `E♭`) at the start of `text`.
    ///
    /// Returns the pitch, the accidental that was written, and the number of
    /// bytes consumed. Only uppercase letters are recognized as roots.
    pub fn parse_prefix(text: &str) -> Option<(Pitch, Accidental, usize)> {
        let mut chars = text.char_indices();
        let (_, first) = chars.next()?;
        let letter = Letter::from_char(first)?;
        let mut consumed = first.len_utf8();

        let accidental = match chars.next() {
            Some((_, c)) => match Accidental::from_char(c) {
                Some(acc) => {
                    consumed += c.len_utf8();
                    acc
                }
                None => Accidental::Natural,
            },
            None => Accidental::Natural,
        };

        let pitch = letter.natural().transpose(accidental.offset());
        Some((pitch, accidental, consumed))
    }

    /// Parse a complete note name, rejecting trailing text.
    ///
    /// A trailing `m` is accepted so keys can be written as `Am` or `F#m`;
    /// only the tonic pitch class is kept.
    pub fn parse_name(text: &str) -> Option<Pitch> {
        let text = text.trim();
        let (pitch, _, consumed) = Pitch::parse_prefix(text)?;
        match &text[consumed..] {
            "" | "m" | "min" | "maj" | "major" | "minor" | " major" | " minor" => Some(pitch),
            _ => None,
        }
    }

    /// Name this pitch class using the given accidental bias.
    pub fn spelled(self, bias: AccidentalBias) -> &'static str {
        const SHARPS: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        const FLATS: [&str; 12] = [
            "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
        ];
        match bias {
            AccidentalBias::Sharp => SHARPS[self.0 as usize],
            AccidentalBias::Flat => FLATS[self.0 as usize],
        }
    }
}

impl TryFrom<u8> for Pitch {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value < 12 {
            Ok(Pitch(value))
        } else {
            Err(format!("pitch class out of range: {}", value))
        }
    }
}

impl From<Pitch> for u8 {
    fn from(pitch: Pitch) -> Self {
        pitch.0
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelled(SpellingTable::default().bias_for(*self)))
    }
}

/// The seven natural note letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'C' => Some(Letter::C),
            'D' => Some(Letter::D),
            'E' => Some(Letter::E),
            'F' => Some(Letter::F),
            'G' => Some(Letter::G),
            'A' => Some(Letter::A),
            'B' => Some(Letter::B),
            _ => None,
        }
    }

    /// Pitch class of the unaltered letter.
    pub fn natural(self) -> Pitch {
        match self {
            Letter::C => Pitch(0),
            Letter::D => Pitch(2),
            Letter::E => Pitch(4),
            Letter::F => Pitch(5),
            Letter::G => Pitch(7),
            Letter::A => Pitch(9),
            Letter::B => Pitch(11),
        }
    }
}

/// Accidental written after a note letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
}

impl Accidental {
    /// Recognizes ASCII (`#`, `b`) and Unicode (`♯`, `♭`) accidentals.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '#' | '♯' => Some(Accidental::Sharp),
            'b' | '♭' => Some(Accidental::Flat),
            '♮' => Some(Accidental::Natural),
            _ => None,
        }
    }

    pub fn offset(self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
        }
    }
}

/// Preferred accidental when naming black-key pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccidentalBias {
    #[default]
    Sharp,
    Flat,
}

/// Key → accidental bias lookup used to spell chords after transposition.
///
/// Indexed by the pitch class of the key. Keeping one bias per key avoids
/// mixing sharps and flats within a single chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpellingTable {
    biases: [AccidentalBias; 12],
}

impl SpellingTable {
    pub fn new(biases: [AccidentalBias; 12]) -> Self {
        Self { biases }
    }

    /// Bias to use for a chart in `key`.
    pub fn bias_for(&self, key: Pitch) -> AccidentalBias {
        self.biases[key.value() as usize]
    }

    /// Spell `pitch` for a chart in `key`.
    pub fn spell(&self, pitch: Pitch, key: Pitch) -> &'static str {
        pitch.spelled(self.bias_for(key))
    }
}

impl Default for SpellingTable {
    fn default() -> Self {
        use AccidentalBias::{Flat, Sharp};
        // C  Db    D      Eb    E      F     F#     G      Ab    A      Bb    B
        Self::new([
            Sharp, Flat, Sharp, Flat, Sharp, Flat, Sharp, Sharp, Flat, Sharp, Flat, Sharp,
        ])
    }
}
