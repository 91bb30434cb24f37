//! Chart Minder - chord chart canonicalization, transposition and
//! cross-source matching.
//!
//! Raw chord charts from many providers are parsed into one canonical
//! document model, transposed by pitch-class rotation, and clustered into
//! canonical songs so each song surfaces once with its best variant.
//!
//! # Modules
//!
//! - [`theory`]: pitches, spelling and the chord grammar
//! - [`chart`]: canonical documents, parsing and rendering
//! - [`transpose`]: key, semitone and capo transforms
//! - [`matching`]: similarity scoring, song clusters and the matching engine
//! - [`store`]: song persistence
//! - [`sources`]: chart providers and the retrieval orchestrator

pub mod chart;
pub mod cli;
pub mod config;
pub mod error;
pub mod matching;
pub mod sources;
pub mod store;
#[cfg(test)]
pub mod test_utils;
pub mod theory;
pub mod transpose;

pub use chart::{CanonicalDocument, ParseOutcome, ProviderHint, parse};
pub use error::{Error, Result};
pub use matching::{CanonicalSong, MatchingEngine, SourceVariant};
pub use sources::{RetrievalOrchestrator, SearchQuery};
pub use transpose::{TransposeTarget, transpose};
