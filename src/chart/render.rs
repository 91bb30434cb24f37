//! Render a [`CanonicalDocument`] back to text.
//!
//! Two display modes: chords inline in brackets, or chords on their own line
//! above the lyrics. Chord names are spelled with the document's accidental
//! bias. Output is plain text; layout beyond column alignment is the
//! caller's concern.

use super::document::{CanonicalDocument, CanonicalToken, ChartMetadata, SectionKind};
use crate::theory::AccidentalBias;

/// Display mode for rendered charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    ChordsAbove,
    ChordsInline,
}

/// Render in the given display mode.
pub fn render(doc: &CanonicalDocument, mode: DisplayMode) -> String {
    match mode {
        DisplayMode::ChordsAbove => to_chords_above(doc),
        DisplayMode::ChordsInline => to_inline(doc),
    }
}

/// `[G]Amazing [C]grace` style text.
///
/// Parsing the output with the inline-brackets profile reproduces the same
/// lyric runs and chord positions. Bars are written `[|]`.
pub fn to_inline(doc: &CanonicalDocument) -> String {
    let bias = doc.metadata.accidentals;
    let mut out = header(&doc.metadata);

    for line in doc.lines() {
        if let Some(marker) = marker_line(line) {
            out.push_str(&marker);
            out.push('\n');
            continue;
        }

        let mut column = 0;
        for token in line {
            match token {
                CanonicalToken::ChordMarker { chord, position } => {
                    // Padding keeps the column of a chord past the lyric end;
                    // the parser drops it again as trailing whitespace
                    while column < *position {
                        out.push(' ');
                        column += 1;
                    }
                    out.push('[');
                    out.push_str(&chord.spelled(bias));
                    out.push(']');
                }
                CanonicalToken::LyricRun { text } => {
                    out.push_str(text);
                    column += text.chars().count();
                }
                CanonicalToken::BarLine => out.push_str("[|]"),
                CanonicalToken::SectionMarker { .. } | CanonicalToken::LineBreak => {}
            }
        }
        out.push('\n');
    }
    out
}

/// Tab-site style text: a chord line above each lyric line.
///
/// A line whose chords cannot all sit at their own columns (two chords on
/// one syllable, or a chord too close to the next) gets a `G@0 C@0` column
/// line instead, which the chords-over-lyrics profile also reads.
pub fn to_chords_above(doc: &CanonicalDocument) -> String {
    let bias = doc.metadata.accidentals;
    let mut out = header(&doc.metadata);
    let mut after_chord_row = false;

    for line in doc.lines() {
        if let Some(marker) = marker_line(line) {
            out.push_str(&marker);
            out.push('\n');
            after_chord_row = false;
            continue;
        }

        let (chords, lyric) = split_line(line, bias);
        match chords {
            Some(chords) => {
                out.push_str(&chords);
                out.push('\n');
                after_chord_row = lyric.is_empty();
                if !lyric.is_empty() {
                    out.push_str(&lyric);
                    out.push('\n');
                }
            }
            None => {
                // Otherwise the lyric would be read as belonging to the chord row above
                if after_chord_row && !lyric.is_empty() {
                    out.push('\n');
                }
                out.push_str(&lyric);
                out.push('\n');
                after_chord_row = false;
            }
        }
    }
    out
}

/// A chord or bar on a chord row.
enum Slot {
    Chord { column: usize, text: String },
    Bar { column: usize },
}

impl Slot {
    fn column(&self) -> usize {
        match self {
            Slot::Chord { column, .. } | Slot::Bar { column } => *column,
        }
    }

    fn text(&self) -> &str {
        match self {
            Slot::Chord { text, .. } => text.as_str(),
            Slot::Bar { .. } => "|",
        }
    }
}

/// Chord row and lyric row for one document line. The chord row is `None`
/// when the line has no chords or bars.
fn split_line(line: &[CanonicalToken], bias: AccidentalBias) -> (Option<String>, String) {
    let mut slots = Vec::new();
    let mut lyric = String::new();
    let mut lyric_len = 0;
    let mut last_column = 0;

    for token in line {
        match token {
            CanonicalToken::ChordMarker { chord, position } => {
                last_column = last_column.max(*position);
                slots.push(Slot::Chord {
                    column: *position,
                    text: chord.spelled(bias),
                });
            }
            CanonicalToken::BarLine => {
                // Column rows are read back in column order
                let column = lyric_len.max(last_column);
                last_column = column;
                slots.push(Slot::Bar { column });
            }
            CanonicalToken::LyricRun { text } => {
                lyric.push_str(text);
                lyric_len += text.chars().count();
            }
            _ => {}
        }
    }

    if slots.is_empty() {
        return (None, lyric);
    }
    let has_chord = slots.iter().any(|s| matches!(s, Slot::Chord { .. }));
    let row = has_chord
        .then(|| aligned_row(&slots, lyric_len))
        .flatten()
        .unwrap_or_else(|| column_row(&slots));
    (Some(row), lyric)
}

/// Every slot written at its own column, or `None` when two would touch.
fn aligned_row(slots: &[Slot], lyric_len: usize) -> Option<String> {
    let mut row: Vec<char> = Vec::new();
    for slot in slots {
        // Neighbours need a space between them to read back as two words
        let earliest = if row.is_empty() { 0 } else { row.len() + 1 };
        let column = match slot {
            // A bar at or past the lyric end cuts nothing, so it may move right
            Slot::Bar { column } if *column >= lyric_len => (*column).max(earliest),
            _ => slot.column(),
        };
        if column < earliest {
            return None;
        }
        row.resize(column, ' ');
        row.extend(slot.text().chars());
    }
    Some(row.into_iter().collect())
}

/// `Cmaj7@0 G@0 |@5` row giving every column explicitly.
fn column_row(slots: &[Slot]) -> String {
    slots
        .iter()
        .map(|slot| format!("{}@{}", slot.text(), slot.column()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A line holding only a labelled section marker renders as `[Name label]`.
fn marker_line(line: &[CanonicalToken]) -> Option<String> {
    match line {
        [CanonicalToken::SectionMarker { kind, label }] if *kind != SectionKind::Unlabeled => {
            Some(match label {
                Some(label) => format!("[{} {}]", kind.name(), label),
                None => format!("[{}]", kind.name()),
            })
        }
        _ => None,
    }
}

fn header(metadata: &ChartMetadata) -> String {
    let mut lines = Vec::new();
    if !metadata.title.is_empty() {
        lines.push(format!("Title: {}", metadata.title));
    }
    if !metadata.artist.is_empty() {
        lines.push(format!("Artist: {}", metadata.artist));
    }
    if let Some(album) = &metadata.album {
        lines.push(format!("Album: {}", album));
    }
    if metadata.key_declared {
        lines.push(format!("Key: {}", metadata.key.spelled(metadata.accidentals)));
    }
    if metadata.capo > 0 {
        lines.push(format!("Capo: {}", metadata.capo));
    }
    if let Some(tempo) = metadata.tempo {
        lines.push(format!("Tempo: {}", tempo));
    }
    if let Some(time) = metadata.time_signature {
        lines.push(format!("Time: {}", time));
    }
    if let Some(difficulty) = metadata.difficulty {
        lines.push(format!("Difficulty: {}", difficulty));
    }

    if lines.is_empty() {
        String::new()
    } else {
        lines.join("\n") + "\n\n"
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::chart::parser::parse;
    use crate::chart::profile::ProviderHint;
    use proptest::prelude::*;

    const CHORDS: &[&str] = &["C", "Am", "F#m7", "Bb", "G7sus4", "D/F#", "Ebmaj7", "Cadd9"];

    fn inline_line() -> impl Strategy<Value = String> {
        prop::collection::vec((prop::option::of(0..CHORDS.len()), "[a-z]{1,6}"), 1..8).prop_map(
            |words| {
                let parts: Vec<String> = words
                    .into_iter()
                    .map(|(chord, word)| match chord {
                        Some(i) => format!("[{}]{}", CHORDS[i], word),
                        None => word,
                    })
                    .collect();
                format!("la {}", parts.join(" "))
            },
        )
    }

    /// Inline lines with bars and chords stacked on one syllable.
    fn crowded_inline_line() -> impl Strategy<Value = String> {
        let part = (
            any::<bool>(),
            prop::collection::vec(0..CHORDS.len(), 0..3),
            "[a-z]{1,6}",
        );
        prop::collection::vec(part, 1..8).prop_map(|parts| {
            let parts: Vec<String> = parts
                .into_iter()
                .map(|(bar, chords, word)| {
                    let mut part = if bar { "[|]".to_string() } else { String::new() };
                    for i in chords {
                        part.push_str(&format!("[{}]", CHORDS[i]));
                    }
                    part + &word
                })
                .collect();
            format!("la {}", parts.join(" "))
        })
    }

    /// A chord row (with bars, some chords past the lyric end) over a lyric row.
    fn chords_above_pair() -> impl Strategy<Value = String> {
        let rest = prop::collection::vec((1..5usize, prop::option::of(0..CHORDS.len())), 0..6);
        (0..3usize, 0..CHORDS.len(), rest, "la( [a-z]{1,6}){0,4}").prop_map(
            |(indent, first, rest, lyric)| {
                let mut row = " ".repeat(indent);
                row.push_str(CHORDS[first]);
                for (gap, chord) in rest {
                    row.push_str(&" ".repeat(gap));
                    row.push_str(chord.map_or("|", |i| CHORDS[i]));
                }
                format!("{}\n{}", row, lyric)
            },
        )
    }

    fn lyric_and_positions(doc: &CanonicalDocument) -> Vec<CanonicalToken> {
        doc.tokens
            .iter()
            .filter(|t| {
                matches!(
                    t,
                    CanonicalToken::LyricRun { .. } | CanonicalToken::ChordMarker { .. }
                )
            })
            .cloned()
            .collect()
    }

    proptest! {
        #[test]
        fn inline_render_round_trips(lines in prop::collection::vec(inline_line(), 1..6)) {
            let raw = lines.join("\n");
            let doc = parse(&raw, ProviderHint::InlineBrackets).into_document();
            let rendered = to_inline(&doc);
            let reparsed = parse(&rendered, ProviderHint::InlineBrackets).into_document();
            prop_assert_eq!(lyric_and_positions(&reparsed), lyric_and_positions(&doc));
        }

        #[test]
        fn chords_above_input_round_trips_inline(pairs in prop::collection::vec(chords_above_pair(), 1..5)) {
            let raw = pairs.join("\n");
            let doc = parse(&raw, ProviderHint::ChordsOverLyrics).into_document();
            let rendered = to_inline(&doc);
            let reparsed = parse(&rendered, ProviderHint::InlineBrackets).into_document();
            prop_assert_eq!(&reparsed.tokens, &doc.tokens);
        }

        #[test]
        fn chords_above_render_round_trips(lines in prop::collection::vec(crowded_inline_line(), 1..6)) {
            let raw = lines.join("\n");
            let doc = parse(&raw, ProviderHint::InlineBrackets).into_document();
            let rendered = to_chords_above(&doc);
            let reparsed = parse(&rendered, ProviderHint::ChordsOverLyrics).into_document();
            prop_assert_eq!(&reparsed.tokens, &doc.tokens);
        }
    }
}
