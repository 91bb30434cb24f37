//! Test fixtures shared across modules.
//!
//! # Example
//!
//! ```ignore
//! use chart_minder::test_utils::{sample_variant, temp_store};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (store, _dir) = temp_store().await;
//!     let variant = sample_variant("Amazing Grace", "Traditional");
//!     // ... test logic
//! }
//! ```

use tempfile::TempDir;

use crate::chart::{ProviderHint, parse};
use crate::matching::{Popularity, SourceVariant, digest_of};
use crate::store::SqliteStore;

/// Four-chord verse used by [`sample_variant`].
pub const SAMPLE_BODY: &str = "[Verse 1]\n\
[G]Amazing [C]grace how [G]sweet the [D]sound\n\
That [G]saved a [C]wretch like [D]me";

/// A song in chords-over-lyrics layout.
pub const CHORDS_ABOVE_CHART: &str = "Title: Amazing Grace\n\
Artist: Traditional\n\
\n\
[Verse 1]\n\
G       C          G\n\
Amazing grace how sweet the sound\n\
        D\n\
That saved a wretch like me";

/// Creates a temporary SQLite store with migrations applied.
///
/// Keep the `TempDir` alive for the duration of the test.
pub async fn temp_store() -> (SqliteStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let store = SqliteStore::open(&db_url)
        .await
        .expect("Failed to open test store");

    (store, dir)
}

/// A parsed variant of [`SAMPLE_BODY`] with the given title and artist.
///
/// Every call gets a fresh native id, so two samples are never the same
/// provider snapshot.
pub fn sample_variant(title: &str, artist: &str) -> SourceVariant {
    let raw = format!("Title: {}\nArtist: {}\n{}", title, artist, SAMPLE_BODY);
    SourceVariant::new(
        "test",
        uuid::Uuid::new_v4().to_string(),
        raw.clone(),
        parse(&raw, ProviderHint::InlineBrackets),
        Popularity::default(),
    )
}

/// A variant of an arbitrary inline chart. The native id is derived from
/// the text, so identical text from one provider is the same snapshot.
pub fn chart_variant(provider: &str, raw: &str) -> SourceVariant {
    let native_id = digest_of(raw)[..12].to_string();
    SourceVariant::new(
        provider,
        native_id,
        raw,
        parse(raw, ProviderHint::InlineBrackets),
        Popularity::default(),
    )
}
