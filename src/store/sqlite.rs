//! SQLite song store.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use super::{SongStore, StoreError};
use crate::matching::{CanonicalSong, SongId, SourceVariant, VariantId};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "chart_minder.db";

/// Build a SQLite URL from an optional path, defaulting to [`DEFAULT_DB_NAME`].
pub fn db_url(path: Option<&Path>) -> String {
    match path {
        Some(p) => format!("sqlite:{}", p.display()),
        None => format!("sqlite:{}", DEFAULT_DB_NAME),
    }
}

/// Songs table plus one JSON payload row per variant.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database and run pending migrations.
    pub async fn open(db_url: &str) -> Result<Self, StoreError> {
        if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
            sqlx::Sqlite::create_database(db_url).await?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!(url = %db_url, "Opened song store");

        Ok(Self { pool })
    }

    async fn load_variants(&self, song_id: &str) -> Result<Vec<SourceVariant>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT payload FROM variants WHERE song_id = ? ORDER BY sequence")
                .bind(song_id)
                .fetch_all(&self.pool)
                .await?;

        rows.iter()
            .map(|(payload,)| serde_json::from_str(payload).map_err(StoreError::from))
            .collect()
    }
}

fn assemble(
    id: &str,
    preferred: &str,
    variants: Vec<SourceVariant>,
) -> Result<CanonicalSong, StoreError> {
    let id = parse_id(id).map(SongId)?;
    if variants.is_empty() {
        return Err(StoreError::EmptySong(id));
    }
    let preferred = parse_id(preferred)
        .map(VariantId)
        .unwrap_or(variants[0].id);
    Ok(CanonicalSong {
        id,
        variants,
        preferred,
    })
}

fn parse_id(text: &str) -> Result<uuid::Uuid, StoreError> {
    uuid::Uuid::parse_str(text).map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))
}

#[async_trait]
impl SongStore for SqliteStore {
    async fn get_song(&self, id: SongId) -> Result<Option<CanonicalSong>, StoreError> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT id, preferred_variant FROM songs WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((song_id, preferred)) => {
                let variants = self.load_variants(&song_id).await?;
                assemble(&song_id, &preferred, variants).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn save_song(&self, song: &CanonicalSong) -> Result<(), StoreError> {
        if song.variants.is_empty() {
            return Err(StoreError::EmptySong(song.id));
        }

        let song_id = song.id.to_string();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO songs (id, title, artist, preferred_variant, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                preferred_variant = excluded.preferred_variant,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&song_id)
        .bind(song.title())
        .bind(song.artist())
        .bind(song.preferred.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        // The cluster is replaced wholesale; removed variants must disappear
        sqlx::query("DELETE FROM variants WHERE song_id = ?")
            .bind(&song_id)
            .execute(&mut *tx)
            .await?;

        for variant in &song.variants {
            let payload = serde_json::to_string(variant)?;
            sqlx::query(
                r#"
                INSERT INTO variants (id, song_id, provider, native_id, digest, sequence, payload)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(variant.id.to_string())
            .bind(&song_id)
            .bind(&variant.provider)
            .bind(&variant.native_id)
            .bind(&variant.digest)
            .bind(variant.sequence as i64)
            .bind(payload)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn all_songs(&self) -> Result<Vec<CanonicalSong>, StoreError> {
        let songs: Vec<(String, String)> =
            sqlx::query_as("SELECT id, preferred_variant FROM songs")
                .fetch_all(&self.pool)
                .await?;
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT song_id, payload FROM variants ORDER BY sequence")
                .fetch_all(&self.pool)
                .await?;

        let mut by_song: HashMap<String, Vec<SourceVariant>> = HashMap::new();
        for (song_id, payload) in rows {
            by_song
                .entry(song_id)
                .or_default()
                .push(serde_json::from_str(&payload)?);
        }

        let mut result = songs
            .into_iter()
            .map(|(id, preferred)| {
                let variants = by_song.remove(&id).unwrap_or_default();
                assemble(&id, &preferred, variants)
            })
            .collect::<Result<Vec<_>, _>>()?;
        result.sort_by_key(|s| s.variants.first().map(|v| v.sequence).unwrap_or(0));
        Ok(result)
    }

    async fn max_sequence(&self) -> Result<u64, StoreError> {
        let (max,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(sequence), 0) FROM variants")
            .fetch_one(&self.pool)
            .await?;
        Ok(max.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchingConfig;
    use crate::test_utils::{sample_variant, temp_store};

    /// Floats go through JSON text, so they compare within a tolerance.
    fn assert_same_song(loaded: &CanonicalSong, saved: &CanonicalSong) {
        assert_eq!(loaded.id, saved.id);
        assert_eq!(loaded.preferred, saved.preferred);
        assert_eq!(loaded.variants.len(), saved.variants.len());
        for (a, b) in loaded.variants.iter().zip(&saved.variants) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.provider, b.provider);
            assert_eq!(a.native_id, b.native_id);
            assert_eq!(a.raw, b.raw);
            assert_eq!(a.digest, b.digest);
            assert_eq!(a.failures, b.failures);
            assert_eq!(a.document, b.document);
            assert_eq!(a.sequence, b.sequence);
            assert_eq!(a.ingested_at, b.ingested_at);
            assert_eq!(a.popularity.votes, b.popularity.votes);
            assert!((a.confidence - b.confidence).abs() < 1e-9);
            match (a.popularity.rating, b.popularity.rating) {
                (Some(x), Some(y)) => assert!((x - y).abs() < 1e-6),
                (x, y) => assert_eq!(x, y),
            }
        }
    }

    #[test]
    fn test_db_url() {
        assert_eq!(db_url(None), "sqlite:chart_minder.db");
        assert_eq!(
            db_url(Some(Path::new("/tmp/charts.db"))),
            "sqlite:/tmp/charts.db"
        );
    }

    #[tokio::test]
    async fn test_save_and_load_song() {
        let (store, _dir) = temp_store().await;

        let mut first = sample_variant("Amazing Grace", "Traditional");
        first.sequence = 1;
        let mut second = sample_variant("Amazing Grace", "Trad.");
        second.sequence = 2;

        let mut song = CanonicalSong::new(first);
        song.add_variant(second, &MatchingConfig::default());
        store.save_song(&song).await.unwrap();

        let loaded = store.get_song(song.id).await.unwrap().unwrap();
        assert_same_song(&loaded, &song);
        assert_eq!(store.max_sequence().await.unwrap(), 2);
        let all = store.all_songs().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_same_song(&all[0], &song);
    }

    #[tokio::test]
    async fn test_save_replaces_removed_variants() {
        let (store, _dir) = temp_store().await;
        let config = MatchingConfig::default();

        let mut first = sample_variant("Jolene", "Dolly Parton");
        first.sequence = 1;
        let mut second = sample_variant("Jolene", "Dolly Parton");
        second.sequence = 2;
        let second_id = second.id;

        let mut song = CanonicalSong::new(first);
        song.add_variant(second, &config);
        store.save_song(&song).await.unwrap();

        song.remove_variant(second_id, &config).unwrap();
        store.save_song(&song).await.unwrap();

        let loaded = store.get_song(song.id).await.unwrap().unwrap();
        assert_eq!(loaded.variants.len(), 1);
        assert!(loaded.variant(second_id).is_none());
    }

    #[tokio::test]
    async fn test_empty_store() {
        let (store, _dir) = temp_store().await;
        assert_eq!(store.max_sequence().await.unwrap(), 0);
        assert!(store.all_songs().await.unwrap().is_empty());
        assert!(store.get_song(SongId::new()).await.unwrap().is_none());
    }
}
