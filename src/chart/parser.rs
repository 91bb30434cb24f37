//! Source parser: provider raw text → [`CanonicalDocument`].
//!
//! One parser core serves every provider. The [`GrammarProfile`] selected by
//! the provider hint switches individual recognizers on or off.
//!
//! Parsing is fail-soft. A chord span that does not parse stays in the lyric
//! text verbatim and is reported as a [`ParseFailure`]; the rest of the chart
//! is still produced.
//!
//! Alignment:
//! - inline `[G]` chords: `position` is the character offset of the bracket
//!   in the line with all parsed brackets removed
//! - chord lines above lyrics: `position` is the character column of the
//!   chord's first character
//! - `G@8` column lines: `position` is the given column
//!
//! Bar lines are `|` words on chord lines, `|@6` on column lines and `[|]`
//! inline. Whitespace at the end of a line is layout, never lyric text.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::document::{
    CanonicalDocument, CanonicalToken, ChartMetadata, SectionKind, TimeSignature,
};
use super::profile::{Capabilities, GrammarProfile, ProviderHint};
use crate::theory::{
    Accidental, AccidentalBias, ChordError, ChordSymbol, Pitch, SpellingTable, parse_chord_text,
};

/// Maximum raw content accepted by the upstream song schema.
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 50 * 1024;

/// Parser tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Raw text beyond this many bytes is dropped
    pub max_content_bytes: usize,
    /// Share of a line's tokens that must be chords for it to count as a chord line
    pub chord_line_ratio: f32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            chord_line_ratio: 0.5,
        }
    }
}

/// Why part of a chart could not be canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum FailureReason {
    #[error(transparent)]
    Chord(#[from] ChordError),

    #[error("column offset is not a number")]
    BadColumn,

    #[error("content truncated at size limit")]
    Truncated,
}

/// A single diagnostic produced while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("line {line}, column {column}: {reason} ({text:?})")]
pub struct ParseFailure {
    /// 1-based line number
    pub line: usize,
    /// 1-based character column
    pub column: usize,
    /// The offending source text
    pub text: String,
    pub reason: FailureReason,
}

/// Result of parsing one raw chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParseOutcome {
    Complete {
        document: CanonicalDocument,
        chords_parsed: usize,
    },
    Partial {
        document: CanonicalDocument,
        chords_parsed: usize,
        failures: Vec<ParseFailure>,
    },
}

impl ParseOutcome {
    pub fn document(&self) -> &CanonicalDocument {
        match self {
            ParseOutcome::Complete { document, .. } | ParseOutcome::Partial { document, .. } => {
                document
            }
        }
    }

    pub fn into_document(self) -> CanonicalDocument {
        match self {
            ParseOutcome::Complete { document, .. } | ParseOutcome::Partial { document, .. } => {
                document
            }
        }
    }

    pub fn failures(&self) -> &[ParseFailure] {
        match self {
            ParseOutcome::Complete { .. } => &[],
            ParseOutcome::Partial { failures, .. } => failures,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ParseOutcome::Complete { .. })
    }

    /// Share of chord spans that parsed.
    ///
    /// A chart with no chord spans at all (lyrics only) scores 0.5: there is
    /// nothing wrong with it, but nothing was verified either.
    pub fn confidence(&self) -> f64 {
        let (parsed, failed) = match self {
            ParseOutcome::Complete { chords_parsed, .. } => (*chords_parsed, 0),
            ParseOutcome::Partial {
                chords_parsed,
                failures,
                ..
            } => (*chords_parsed, failures.len()),
        };
        if parsed + failed == 0 {
            0.5
        } else {
            parsed as f64 / (parsed + failed) as f64
        }
    }

    /// Apply title/artist supplied by the caller (e.g. from a provider listing).
    ///
    /// Empty values leave whatever the chart header declared.
    pub fn with_metadata(mut self, title: &str, artist: &str) -> Self {
        let document = match &mut self {
            ParseOutcome::Complete { document, .. } | ParseOutcome::Partial { document, .. } => {
                document
            }
        };
        if !title.trim().is_empty() {
            document.metadata.title = title.trim().to_string();
        }
        if !artist.trim().is_empty() {
            document.metadata.artist = artist.trim().to_string();
        }
        self
    }
}

/// Shared parser core.
#[derive(Debug, Clone, Default)]
pub struct ChartParser {
    config: ParserConfig,
    spelling: SpellingTable,
}

impl ChartParser {
    pub fn new(config: ParserConfig, spelling: SpellingTable) -> Self {
        Self { config, spelling }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse one raw chart using the grammar profile for `hint`.
    pub fn parse(&self, raw: &str, hint: ProviderHint) -> ParseOutcome {
        let profile = hint.profile();
        let mut state = ParseState::new(profile, &self.config);

        let content = truncate_at_char_boundary(raw, self.config.max_content_bytes);
        if content.len() < raw.len() {
            let line = content.lines().count().max(1);
            let column = content.lines().last().map_or(0, |l| l.chars().count()) + 1;
            debug!(
                limit = self.config.max_content_bytes,
                size = raw.len(),
                "Truncating oversized chart"
            );
            state.failures.push(ParseFailure {
                line,
                column,
                text: String::new(),
                reason: FailureReason::Truncated,
            });
        }

        let lines: Vec<&str> = content.lines().collect();
        state.run(&lines);
        state.finish(&self.spelling)
    }

    /// Parse many charts in parallel. Output order matches input order.
    pub fn parse_batch(&self, inputs: &[(String, ProviderHint)]) -> Vec<ParseOutcome> {
        inputs
            .par_iter()
            .map(|(raw, hint)| self.parse(raw, *hint))
            .collect()
    }
}

/// Parse with default configuration and spelling.
pub fn parse(raw: &str, hint: ProviderHint) -> ParseOutcome {
    ChartParser::default().parse(raw, hint)
}

fn truncate_at_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// An item found on a chord line, located by character column.
#[derive(Debug)]
enum AlignedItem {
    Chord {
        column: usize,
        chord: ChordSymbol,
        accidental: Accidental,
    },
    Bar {
        column: usize,
    },
}

impl AlignedItem {
    fn column(&self) -> usize {
        match self {
            AlignedItem::Chord { column, .. } | AlignedItem::Bar { column } => *column,
        }
    }
}

/// Classification of a line that may carry only chords.
enum ChordLine {
    /// Every token parsed; merge with the lyric line below
    Clean(Vec<AlignedItem>),
    /// Looks like chords but some tokens failed; keep verbatim
    Dirty(Vec<ParseFailure>, usize),
    NotChords,
}

struct ParseState<'a> {
    profile: GrammarProfile,
    config: &'a ParserConfig,
    metadata: ChartMetadata,
    tokens: Vec<CanonicalToken>,
    failures: Vec<ParseFailure>,
    chords_parsed: usize,
    sharps_seen: usize,
    flats_seen: usize,
    bias_declared: Option<AccidentalBias>,
}

impl<'a> ParseState<'a> {
    fn new(profile: GrammarProfile, config: &'a ParserConfig) -> Self {
        Self {
            profile,
            config,
            metadata: ChartMetadata::default(),
            tokens: Vec::new(),
            failures: Vec::new(),
            chords_parsed: 0,
            sharps_seen: 0,
            flats_seen: 0,
            bias_declared: None,
        }
    }

    fn run(&mut self, lines: &[&str]) {
        let mut index = 0;
        while index < lines.len() {
            let line = lines[index];
            let line_no = index + 1;
            let trimmed = line.trim();
            index += 1;

            if trimmed.is_empty() {
                // Blank lines before any content carry no meaning
                if !self.tokens.is_empty() {
                    self.tokens.push(CanonicalToken::LineBreak);
                }
                continue;
            }

            if self.profile.allows(Capabilities::DIRECTIVES) && self.apply_directive(trimmed) {
                continue;
            }

            if self.tokens.is_empty()
                && self.profile.allows(Capabilities::HEADER_FIELDS)
                && self.apply_header(trimmed)
            {
                continue;
            }

            if self.profile.allows(Capabilities::SECTION_MARKERS) {
                if let Some((kind, label)) = section_line(trimmed) {
                    self.tokens.push(CanonicalToken::section(kind, label));
                    self.tokens.push(CanonicalToken::LineBreak);
                    continue;
                }
            }

            let chord_line = if self.profile.allows(Capabilities::COLUMN_OFFSETS)
                && is_column_line(trimmed)
            {
                self.classify_column_line(line, line_no)
            } else if self.profile.allows(Capabilities::ALIGNED_CHORDS) {
                self.classify_chord_line(line, line_no)
            } else {
                ChordLine::NotChords
            };

            match chord_line {
                ChordLine::Clean(items) => {
                    let lyric = lines
                        .get(index)
                        .copied()
                        .filter(|next| self.is_plain_lyric(next));
                    if lyric.is_some() {
                        index += 1;
                    }
                    self.chords_parsed += items
                        .iter()
                        .filter(|i| matches!(i, AlignedItem::Chord { .. }))
                        .count();
                    self.push_aligned(items, lyric.unwrap_or_default());
                }
                ChordLine::Dirty(failures, parsed) => {
                    self.chords_parsed += parsed;
                    self.failures.extend(failures);
                    self.tokens.push(CanonicalToken::lyric(line.trim_end()));
                    self.tokens.push(CanonicalToken::LineBreak);
                }
                ChordLine::NotChords => {
                    if self.profile.allows(Capabilities::INLINE_CHORDS) {
                        self.push_inline(line, line_no);
                    } else {
                        self.tokens.push(CanonicalToken::lyric(line.trim_end()));
                        self.tokens.push(CanonicalToken::LineBreak);
                    }
                }
            }
        }
    }

    /// True if `line` can be the lyric partner of a chord line above it.
    fn is_plain_lyric(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return false;
        }
        if self.profile.allows(Capabilities::DIRECTIVES) && is_directive(trimmed) {
            return false;
        }
        if self.profile.allows(Capabilities::SECTION_MARKERS) && section_line(trimmed).is_some() {
            return false;
        }
        if self.profile.allows(Capabilities::COLUMN_OFFSETS) && is_column_line(trimmed) {
            return false;
        }
        if self.profile.allows(Capabilities::ALIGNED_CHORDS) {
            let words = words_with_columns(line);
            let parsed = words
                .iter()
                .filter(|(_, w)| is_bar(w) || parse_chord_text(w).is_ok())
                .count();
            if ratio_reached(parsed, words.len(), self.config.chord_line_ratio) {
                return false;
            }
        }
        true
    }

    fn classify_chord_line(&self, line: &str, line_no: usize) -> ChordLine {
        let words = words_with_columns(line);
        let mut items = Vec::with_capacity(words.len());
        let mut failures = Vec::new();
        let mut chords = 0;

        for (column, word) in &words {
            if is_bar(word) {
                items.push(AlignedItem::Bar { column: *column });
                continue;
            }
            match parse_chord_text(word) {
                Ok(chord) => {
                    chords += 1;
                    items.push(AlignedItem::Chord {
                        column: *column,
                        chord,
                        accidental: written_accidental(word),
                    });
                }
                Err(reason) => failures.push(ParseFailure {
                    line: line_no,
                    column: column + 1,
                    text: (*word).to_string(),
                    reason: reason.into(),
                }),
            }
        }

        if chords == 0 || !ratio_reached(items.len(), words.len(), self.config.chord_line_ratio) {
            return ChordLine::NotChords;
        }
        if failures.is_empty() {
            ChordLine::Clean(items)
        } else {
            ChordLine::Dirty(failures, chords)
        }
    }

    fn classify_column_line(&self, line: &str, line_no: usize) -> ChordLine {
        let mut items = Vec::new();
        let mut failures = Vec::new();
        let mut chords = 0;

        for (column, word) in words_with_columns(line) {
            if is_bar(word) {
                items.push(AlignedItem::Bar { column });
                continue;
            }
            let Some((symbol, offset)) = word.rsplit_once('@') else {
                continue;
            };
            let Ok(offset) = offset.parse::<usize>() else {
                failures.push(ParseFailure {
                    line: line_no,
                    column: column + 1,
                    text: word.to_string(),
                    reason: FailureReason::BadColumn,
                });
                continue;
            };
            if is_bar(symbol) {
                items.push(AlignedItem::Bar { column: offset });
                continue;
            }
            match parse_chord_text(symbol) {
                Ok(chord) => {
                    chords += 1;
                    items.push(AlignedItem::Chord {
                        column: offset,
                        chord,
                        accidental: written_accidental(symbol),
                    });
                }
                Err(reason) => failures.push(ParseFailure {
                    line: line_no,
                    column: column + 1,
                    text: word.to_string(),
                    reason: reason.into(),
                }),
            }
        }

        if failures.is_empty() {
            items.sort_by_key(AlignedItem::column);
            ChordLine::Clean(items)
        } else {
            ChordLine::Dirty(failures, chords)
        }
    }

    /// Emit a chord line merged with the lyric line below it.
    fn push_aligned(&mut self, items: Vec<AlignedItem>, lyric: &str) {
        let chars: Vec<char> = lyric.trim_end().chars().collect();
        let mut cursor = 0;

        for item in items {
            let cut = item.column().min(chars.len());
            if cut > cursor {
                self.tokens
                    .push(CanonicalToken::lyric(chars[cursor..cut].iter().collect::<String>()));
                cursor = cut;
            }
            match item {
                AlignedItem::Chord {
                    column,
                    chord,
                    accidental,
                } => {
                    self.note_accidental(accidental);
                    self.tokens.push(CanonicalToken::chord(chord, column));
                }
                AlignedItem::Bar { .. } => self.tokens.push(CanonicalToken::BarLine),
            }
        }
        if cursor < chars.len() {
            self.tokens
                .push(CanonicalToken::lyric(chars[cursor..].iter().collect::<String>()));
        }
        self.tokens.push(CanonicalToken::LineBreak);
    }

    /// Emit a lyric line with `[Chord]` brackets.
    fn push_inline(&mut self, line: &str, line_no: usize) {
        let start = self.tokens.len();
        let chars: Vec<char> = line.chars().collect();
        let mut run = String::new();
        let mut position = 0;
        let mut i = 0;

        while i < chars.len() {
            if chars[i] == '[' {
                let close = chars[i + 1..]
                    .iter()
                    .position(|c| *c == ']' || *c == '[')
                    .map(|rel| i + 1 + rel)
                    .filter(|end| chars[*end] == ']');
                if let Some(close) = close {
                    let inner: String = chars[i + 1..close].iter().collect();
                    if is_bar(&inner) {
                        if !run.is_empty() {
                            self.tokens.push(CanonicalToken::lyric(std::mem::take(&mut run)));
                        }
                        self.tokens.push(CanonicalToken::BarLine);
                        i = close + 1;
                        continue;
                    }
                    match parse_chord_text(&inner) {
                        Ok(chord) => {
                            if !run.is_empty() {
                                self.tokens.push(CanonicalToken::lyric(std::mem::take(&mut run)));
                            }
                            self.chords_parsed += 1;
                            self.note_accidental(written_accidental(&inner));
                            self.tokens.push(CanonicalToken::chord(chord, position));
                        }
                        Err(reason) => {
                            self.failures.push(ParseFailure {
                                line: line_no,
                                column: i + 1,
                                text: inner,
                                reason: reason.into(),
                            });
                            // Unparseable span stays in the lyric verbatim
                            for c in &chars[i..=close] {
                                run.push(*c);
                                position += 1;
                            }
                        }
                    }
                    i = close + 1;
                    continue;
                }
            }
            run.push(chars[i]);
            position += 1;
            i += 1;
        }

        if !run.is_empty() {
            self.tokens.push(CanonicalToken::lyric(run));
        }
        self.trim_line_end(start);
        self.tokens.push(CanonicalToken::LineBreak);
    }

    /// Drop trailing whitespace from the lyric runs of the line starting at
    /// token `start`. Chords and bars keep their positions.
    fn trim_line_end(&mut self, start: usize) {
        let mut index = self.tokens.len();
        while index > start {
            index -= 1;
            let kept = match &self.tokens[index] {
                CanonicalToken::LyricRun { text } => text.trim_end().len(),
                _ => continue,
            };
            if kept == 0 {
                self.tokens.remove(index);
                continue;
            }
            if let CanonicalToken::LyricRun { text } = &mut self.tokens[index] {
                text.truncate(kept);
            }
            break;
        }
    }

    fn note_accidental(&mut self, accidental: Accidental) {
        match accidental {
            Accidental::Sharp => self.sharps_seen += 1,
            Accidental::Flat => self.flats_seen += 1,
            Accidental::Natural => {}
        }
    }

    /// `Key: G` style header. Returns false if the line is not a header.
    fn apply_header(&mut self, line: &str) -> bool {
        let (name, value) = match line.split_once(':') {
            Some((name, value)) => (name.trim().to_lowercase(), value.trim()),
            None => {
                // "Capo 2" is common enough without the colon
                let lower = line.to_lowercase();
                match lower.strip_prefix("capo") {
                    Some(rest) if rest.starts_with(' ') => {
                        return self.set_field("capo", line.get(4..).unwrap_or_default());
                    }
                    _ => return false,
                }
            }
        };
        self.set_field(&name, value)
    }

    /// `{name: value}` ChordPro directive. Returns false if not a directive.
    fn apply_directive(&mut self, line: &str) -> bool {
        if !is_directive(line) {
            return false;
        }
        let body = &line[1..line.len() - 1];
        let (name, value) = match body.split_once(':') {
            Some((name, value)) => (name.trim().to_lowercase(), value.trim()),
            None => (body.trim().to_lowercase(), ""),
        };
        let label = (!value.is_empty()).then(|| value.to_string());

        let section = match name.as_str() {
            "soc" | "start_of_chorus" => Some(SectionKind::Chorus),
            "sov" | "start_of_verse" => Some(SectionKind::Verse),
            "sob" | "start_of_bridge" => Some(SectionKind::Bridge),
            _ => None,
        };
        if let Some(kind) = section {
            self.tokens.push(CanonicalToken::section(kind, label));
            self.tokens.push(CanonicalToken::LineBreak);
            return true;
        }

        match name.as_str() {
            "t" => {
                self.set_field("title", value);
            }
            "st" | "subtitle" => {
                self.set_field("artist", value);
            }
            "eoc" | "eov" | "eob" | "c" | "ci" | "comment" | "comment_italic" => {}
            n if n.starts_with("end_of_") => {}
            other => {
                if !self.set_field(other, value) {
                    debug!(directive = %other, value, "Ignoring directive");
                }
            }
        }
        true
    }

    /// Store a metadata field. Returns false for unknown field names and for
    /// values that do not parse, so such a line is read as chart content.
    fn set_field(&mut self, name: &str, value: &str) -> bool {
        let value = value.trim();
        match name {
            "title" | "song" => self.metadata.title = value.to_string(),
            "artist" | "by" => self.metadata.artist = value.to_string(),
            "album" => self.metadata.album = (!value.is_empty()).then(|| value.to_string()),
            "key" => {
                let Some(key) = Pitch::parse_name(value) else {
                    return false;
                };
                self.metadata.key = key;
                self.metadata.key_declared = true;
                if let Some((_, accidental, _)) = Pitch::parse_prefix(value) {
                    self.bias_declared = match accidental {
                        Accidental::Sharp => Some(AccidentalBias::Sharp),
                        Accidental::Flat => Some(AccidentalBias::Flat),
                        Accidental::Natural => None,
                    };
                }
            }
            "capo" => match first_number(value) {
                Some(fret) if fret < 12 => self.metadata.capo = fret as u8,
                Some(fret) => debug!(fret, "Ignoring out of range capo"),
                None => return false,
            },
            "tempo" | "bpm" => match first_number(value).filter(|bpm| (20..=400).contains(bpm)) {
                Some(bpm) => self.metadata.tempo = Some(bpm as u16),
                None => return false,
            },
            "time" | "time signature" => match TimeSignature::parse(value) {
                Some(time) => self.metadata.time_signature = Some(time),
                None => return false,
            },
            "difficulty" => match parse_difficulty(value) {
                Some(level) => self.metadata.difficulty = Some(level),
                None => return false,
            },
            _ => return false,
        }
        true
    }

    fn finish(mut self, spelling: &SpellingTable) -> ParseOutcome {
        if !self.metadata.key_declared {
            self.metadata.key = self
                .tokens
                .iter()
                .find_map(|t| match t {
                    CanonicalToken::ChordMarker { chord, .. } => Some(chord.root),
                    _ => None,
                })
                .map_or(Pitch::C, |root| root.transpose(self.metadata.capo as i32));
        }

        let shapes_key = self.metadata.key.transpose(-(self.metadata.capo as i32));
        self.metadata.accidentals = if self.flats_seen > self.sharps_seen {
            AccidentalBias::Flat
        } else if self.sharps_seen > self.flats_seen {
            AccidentalBias::Sharp
        } else if let Some(bias) = self.bias_declared.filter(|_| self.metadata.capo == 0) {
            bias
        } else {
            spelling.bias_for(shapes_key)
        };

        let starts_with_marker = matches!(
            self.tokens.first(),
            Some(CanonicalToken::SectionMarker { .. })
        );
        if !self.tokens.is_empty() && !starts_with_marker {
            self.tokens
                .insert(0, CanonicalToken::section(SectionKind::Unlabeled, None));
        }

        let document = CanonicalDocument {
            metadata: self.metadata,
            tokens: self.tokens,
        };
        if self.failures.is_empty() {
            ParseOutcome::Complete {
                document,
                chords_parsed: self.chords_parsed,
            }
        } else {
            ParseOutcome::Partial {
                document,
                chords_parsed: self.chords_parsed,
                failures: self.failures,
            }
        }
    }
}

/// Accidental written on the root of a chord symbol.
fn written_accidental(symbol: &str) -> Accidental {
    Pitch::parse_prefix(symbol.trim()).map_or(Accidental::Natural, |(_, accidental, _)| accidental)
}

fn ratio_reached(parsed: usize, total: usize, ratio: f32) -> bool {
    total > 0 && parsed as f32 / total as f32 >= ratio
}

/// Whitespace-separated words with their starting character column.
fn words_with_columns(line: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start: Option<(usize, usize)> = None;
    for (column, (byte, c)) in line.char_indices().enumerate() {
        if c.is_whitespace() {
            if let Some((col, from)) = start.take() {
                words.push((col, &line[from..byte]));
            }
        } else if start.is_none() {
            start = Some((column, byte));
        }
    }
    if let Some((col, from)) = start {
        words.push((col, &line[from..]));
    }
    words
}

fn is_bar(word: &str) -> bool {
    matches!(word, "|" | "||" | "|:" | ":|" | "|:|")
}

fn is_directive(line: &str) -> bool {
    line.len() >= 2 && line.starts_with('{') && line.ends_with('}')
}

fn is_column_line(line: &str) -> bool {
    let mut words = line.split_whitespace().filter(|w| !is_bar(w)).peekable();
    words.peek().is_some() && words.all(|w| w.contains('@'))
}

/// Recognize a line that is only a section marker.
fn section_line(trimmed: &str) -> Option<(SectionKind, Option<String>)> {
    let inner = if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        inner.trim_end_matches(':')
    } else if let Some(inner) = trimmed.strip_suffix(':') {
        inner
    } else {
        trimmed
    };
    let (kind, label) = SectionKind::from_label(inner)?;
    match &label {
        Some(label) if !is_marker_label(label) => None,
        _ => Some((kind, label)),
    }
}

fn is_marker_label(label: &str) -> bool {
    label.chars().count() <= 12
        && label
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '#' | '(' | ')' | '-' | '.'))
}

fn first_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn parse_difficulty(value: &str) -> Option<u8> {
    match value.to_lowercase().as_str() {
        "beginner" | "novice" => Some(1),
        "easy" => Some(2),
        "intermediate" | "medium" => Some(3),
        "advanced" | "hard" => Some(4),
        "expert" => Some(5),
        other => first_number(other)
            .filter(|n| (1..=5).contains(n))
            .map(|n| n as u8),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parse_is_deterministic(raw in "[\\[\\]A-Ga-z#b7 \n:|@0-9]{0,200}") {
            for hint in ProviderHint::ALL {
                prop_assert_eq!(parse(&raw, hint), parse(&raw, hint));
            }
        }

        #[test]
        fn parse_never_loses_lyric_characters(line in "la[a-z ]{0,40}") {
            let doc = parse(&line, ProviderHint::InlineBrackets).into_document();
            prop_assert_eq!(doc.lyrics_text(), format!("{}\n", line.trim_end()));
        }

        #[test]
        fn confidence_is_bounded(raw in "[\\[\\]A-Za-z#7 \n]{0,120}") {
            let c = parse(&raw, ProviderHint::Auto).confidence();
            prop_assert!((0.0..=1.0).contains(&c));
        }
    }
}
