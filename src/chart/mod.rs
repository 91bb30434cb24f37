//! Canonical chart model, provider grammar profiles, parsing and rendering.

pub mod document;
pub mod parser;
pub mod profile;
pub mod render;

pub use document::{CanonicalDocument, CanonicalToken, ChartMetadata, SectionKind, TimeSignature};
pub use parser::{ChartParser, FailureReason, ParseFailure, ParseOutcome, ParserConfig, parse};
pub use profile::{Capabilities, GrammarProfile, ProviderHint};
pub use render::{DisplayMode, render, to_chords_above, to_inline};
