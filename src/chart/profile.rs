//! Data-driven grammar profiles.
//!
//! Providers differ in how they lay out chords (inline brackets, a chord line
//! above the lyrics, or explicit column offsets). Rather than one parser per
//! provider, each [`ProviderHint`] maps to a [`GrammarProfile`]: a set of
//! capabilities the shared parser core switches on or off.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Structural features a source format may use.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// `[Chorus]`, `Verse 2:` style section markers
        const SECTION_MARKERS = 1 << 0;
        /// `[G]chords in[C]line` with lyrics
        const INLINE_CHORDS = 1 << 1;
        /// A line of chords aligned by column above a lyric line
        const ALIGNED_CHORDS = 1 << 2;
        /// `G@0 D@8` chord lines giving explicit columns
        const COLUMN_OFFSETS = 1 << 3;
        /// ChordPro `{title: ...}` directives
        const DIRECTIVES = 1 << 4;
        /// `Key: G` style header fields at the top of the chart
        const HEADER_FIELDS = 1 << 5;
    }
}

/// Which format family a provider's raw text belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderHint {
    /// Chords in square brackets inside the lyric line
    InlineBrackets,
    /// Chord line above each lyric line (tab-site style)
    ChordsOverLyrics,
    /// ChordPro: inline brackets plus `{directives}`
    ChordPro,
    /// Chord lines carrying explicit `CHORD@COLUMN` offsets
    ColumnOffsets,
    /// Unknown source; enable every capability
    #[default]
    Auto,
}

impl ProviderHint {
    pub const ALL: [ProviderHint; 5] = [
        ProviderHint::InlineBrackets,
        ProviderHint::ChordsOverLyrics,
        ProviderHint::ChordPro,
        ProviderHint::ColumnOffsets,
        ProviderHint::Auto,
    ];

    /// Grammar profile for this provider family.
    pub fn profile(self) -> GrammarProfile {
        let capabilities = match self {
            ProviderHint::InlineBrackets => {
                Capabilities::INLINE_CHORDS
                    | Capabilities::SECTION_MARKERS
                    | Capabilities::HEADER_FIELDS
            }
            // Column lines carry chords that cannot share one aligned row
            ProviderHint::ChordsOverLyrics => {
                Capabilities::ALIGNED_CHORDS
                    | Capabilities::COLUMN_OFFSETS
                    | Capabilities::SECTION_MARKERS
                    | Capabilities::HEADER_FIELDS
            }
            ProviderHint::ChordPro => {
                Capabilities::INLINE_CHORDS | Capabilities::DIRECTIVES | Capabilities::SECTION_MARKERS
            }
            ProviderHint::ColumnOffsets => {
                Capabilities::COLUMN_OFFSETS
                    | Capabilities::SECTION_MARKERS
                    | Capabilities::HEADER_FIELDS
            }
            ProviderHint::Auto => Capabilities::all(),
        };
        GrammarProfile { hint: self, capabilities }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderHint::InlineBrackets => "inline-brackets",
            ProviderHint::ChordsOverLyrics => "chords-over-lyrics",
            ProviderHint::ChordPro => "chord-pro",
            ProviderHint::ColumnOffsets => "column-offsets",
            ProviderHint::Auto => "auto",
        }
    }
}

impl fmt::Display for ProviderHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline-brackets" | "inline" => Ok(ProviderHint::InlineBrackets),
            "chords-over-lyrics" | "above" | "tab" => Ok(ProviderHint::ChordsOverLyrics),
            "chord-pro" | "chordpro" => Ok(ProviderHint::ChordPro),
            "column-offsets" | "columns" => Ok(ProviderHint::ColumnOffsets),
            "auto" => Ok(ProviderHint::Auto),
            other => Err(format!("unknown provider hint: {}", other)),
        }
    }
}

/// Capability set consumed by the shared parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarProfile {
    pub hint: ProviderHint,
    pub capabilities: Capabilities,
}

impl GrammarProfile {
    pub fn allows(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_select_capabilities() {
        let inline = ProviderHint::InlineBrackets.profile();
        assert!(inline.allows(Capabilities::INLINE_CHORDS));
        assert!(!inline.allows(Capabilities::ALIGNED_CHORDS));

        let tab = ProviderHint::ChordsOverLyrics.profile();
        assert!(tab.allows(Capabilities::ALIGNED_CHORDS));
        assert!(tab.allows(Capabilities::COLUMN_OFFSETS));
        assert!(!tab.allows(Capabilities::INLINE_CHORDS));

        let pro = ProviderHint::ChordPro.profile();
        assert!(pro.allows(Capabilities::DIRECTIVES));
        assert!(!pro.allows(Capabilities::HEADER_FIELDS));

        assert_eq!(ProviderHint::Auto.profile().capabilities, Capabilities::all());
    }

    #[test]
    fn test_hint_string_round_trip() {
        for hint in ProviderHint::ALL {
            assert_eq!(hint.as_str().parse::<ProviderHint>(), Ok(hint));
        }
        assert!("midi".parse::<ProviderHint>().is_err());
    }
}
