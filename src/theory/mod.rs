//! Music theory primitives: pitch classes, spelling and the chord grammar.
//!
//! Everything here is pure and allocation-light so it can run on any worker.

pub mod chord;
pub mod pitch;

pub use chord::{ChordError, ChordQuality, ChordSymbol, Extension, parse_chord_text};
pub use pitch::{Accidental, AccidentalBias, Letter, Pitch, SpellingTable};
