//! Persistence capability for canonical songs.
//!
//! The matching engine defines the shapes; a [`SongStore`] owns durability.
//! Two implementations ship with the crate:
//! - [`MemoryStore`] for tests and one-shot CLI runs
//! - [`SqliteStore`] backed by SQLx with JSON variant payloads
//!
//! # Example
//!
//! ```ignore
//! use chart_minder::store::{SqliteStore, SongStore};
//!
//! let store = SqliteStore::open("sqlite:charts.db").await?;
//! let songs = store.all_songs().await?;
//! ```

mod sqlite;

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use thiserror::Error;

use crate::matching::{CanonicalSong, SongId};

pub use sqlite::{DEFAULT_DB_NAME, SqliteStore, db_url};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("corrupt record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("song {0} has no variants")]
    EmptySong(SongId),
}

/// Storage and lookup of canonical songs by id.
#[async_trait]
pub trait SongStore: Send + Sync {
    async fn get_song(&self, id: SongId) -> Result<Option<CanonicalSong>, StoreError>;

    /// Insert or replace a song and its whole variant cluster.
    async fn save_song(&self, song: &CanonicalSong) -> Result<(), StoreError>;

    async fn all_songs(&self) -> Result<Vec<CanonicalSong>, StoreError>;

    /// Highest variant sequence number stored, 0 when empty.
    async fn max_sequence(&self) -> Result<u64, StoreError>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    songs: RwLock<HashMap<SongId, CanonicalSong>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.songs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.read().is_empty()
    }
}

#[async_trait]
impl SongStore for MemoryStore {
    async fn get_song(&self, id: SongId) -> Result<Option<CanonicalSong>, StoreError> {
        Ok(self.songs.read().get(&id).cloned())
    }

    async fn save_song(&self, song: &CanonicalSong) -> Result<(), StoreError> {
        if song.variants.is_empty() {
            return Err(StoreError::EmptySong(song.id));
        }
        self.songs.write().insert(song.id, song.clone());
        Ok(())
    }

    async fn all_songs(&self) -> Result<Vec<CanonicalSong>, StoreError> {
        let mut songs: Vec<CanonicalSong> = self.songs.read().values().cloned().collect();
        // Oldest cluster first, so callers see a stable order
        songs.sort_by_key(|s| s.variants.iter().map(|v| v.sequence).min().unwrap_or(0));
        Ok(songs)
    }

    async fn max_sequence(&self) -> Result<u64, StoreError> {
        Ok(self
            .songs
            .read()
            .values()
            .flat_map(|s| s.variants.iter().map(|v| v.sequence))
            .max()
            .unwrap_or(0))
    }
}
