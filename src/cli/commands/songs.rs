//! Song store commands: ingest, search, songs, remove.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Runtime;
use tracing::warn;

use super::{chart_parser, open_store, read_input};
use crate::chart::{DisplayMode, ProviderHint, render};
use crate::config::Config;
use crate::matching::{
    ArtistAliases, CanonicalSong, MatchingEngine, Placement, Popularity, SongId, SourceVariant,
    VariantId,
};
use crate::sources::{ChartSource, RetrievalOrchestrator, SearchQuery, build_source};

pub struct IngestArgs<'a> {
    pub path: &'a Path,
    pub hint: ProviderHint,
    pub provider: &'a str,
    pub title: Option<&'a str>,
    pub artist: Option<&'a str>,
    pub rating: Option<f32>,
    pub votes: u32,
}

async fn engine(config: &Config) -> anyhow::Result<Arc<MatchingEngine>> {
    let store = open_store(config).await?;
    let engine = MatchingEngine::new(store, config.matching.clone()).await?;
    Ok(Arc::new(engine))
}

fn warn_if_ephemeral(config: &Config) {
    if config.storage.database.is_none() {
        eprintln!("Note: no database configured; songs are not kept after this command.");
        eprintln!("Use --db PATH or set [storage].database in the config file.");
    }
}

fn print_song_line(song: &CanonicalSong) {
    println!(
        "{}  {} - {} ({} variant{})",
        song.id,
        song.title(),
        song.artist(),
        song.variants.len(),
        if song.variants.len() == 1 { "" } else { "s" }
    );
}

/// Add a chart to the song store
pub fn cmd_ingest(rt: &Runtime, config: &Config, args: IngestArgs<'_>) -> anyhow::Result<()> {
    rt.block_on(async {
        warn_if_ephemeral(config);
        let raw = read_input(args.path)?;
        let outcome = chart_parser(config).parse(&raw, args.hint).with_metadata(
            args.title.unwrap_or_default(),
            args.artist.unwrap_or_default(),
        );
        let native_id = args
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| args.path.display().to_string());
        let popularity = Popularity {
            rating: args.rating,
            votes: args.votes,
        };
        let variant = SourceVariant::new(args.provider, native_id, raw, outcome, popularity);

        let engine = engine(config).await?;
        let result = engine.ingest(variant).await?;

        match result.placement {
            Placement::Created => println!("Created song:"),
            Placement::Merged { score } => println!("Merged into song (score {:.2}):", score),
            Placement::Unchanged => println!("Already stored:"),
        }
        print_song_line(&result.song);
        println!("  variant {}", result.variant_id);

        for near in &result.ambiguous {
            println!(
                "Possible duplicate: {}  {} - {} (score {:.2})",
                near.song_id,
                near.title,
                near.artist,
                near.scores.overall()
            );
        }
        Ok(())
    })
}

/// Search configured providers and stored songs
pub fn cmd_search(
    rt: &Runtime,
    config: &Config,
    title: &str,
    artist: Option<&str>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let aliases = ArtistAliases::new(&config.matching.artist_aliases);
        let mut sources: Vec<Arc<dyn ChartSource>> = Vec::new();
        for provider in &config.providers {
            match build_source(provider, &aliases) {
                Ok(source) => sources.push(source),
                Err(e) => warn!(provider = %provider.id, error = %e, "Skipping provider"),
            }
        }
        if sources.is_empty() {
            eprintln!("Note: no providers configured; searching stored songs only.");
        }

        let engine = engine(config).await?;
        let orchestrator = RetrievalOrchestrator::new(
            sources,
            engine,
            chart_parser(config),
            config.retrieval.clone(),
        );

        let mut query = SearchQuery::new(title);
        if let Some(artist) = artist {
            query = query.with_artist(artist);
        }
        let results = orchestrator.search(&query).await?;

        if results.candidates.is_empty() {
            println!("No matching songs.");
        }
        for candidate in &results.candidates {
            print!("{:.2}  ", candidate.score);
            print_song_line(&candidate.song);
        }
        if results.is_partial() {
            println!();
            println!("Partial results; degraded sources:");
            for degraded in &results.degraded {
                println!("  {}: {}", degraded.provider, degraded.error);
            }
        }
        for near in &results.ambiguous {
            println!(
                "Possible duplicate: {} - {} ({})",
                near.title, near.artist, near.song_id
            );
        }
        Ok(())
    })
}

/// List stored songs, or show one song's variants
pub fn cmd_songs(
    rt: &Runtime,
    config: &Config,
    id: Option<&str>,
    mode: DisplayMode,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let engine = engine(config).await?;

        let Some(id) = id else {
            let songs = engine.songs().await?;
            if songs.is_empty() {
                println!("No songs stored.");
            }
            for song in &songs {
                print_song_line(song);
            }
            return Ok(());
        };

        let id: SongId = id.parse().context("Invalid song id")?;
        let song = engine
            .song(id)
            .await?
            .with_context(|| format!("Song {} not found", id))?;

        print_song_line(&song);
        println!();
        for (variant, score) in song.ranked(engine.config()) {
            let marker = if variant.id == song.preferred { "*" } else { " " };
            println!(
                "{} {}  {}:{}  rank {:.2}, confidence {:.0}%, {} chords",
                marker,
                variant.id,
                variant.provider,
                variant.native_id,
                score,
                variant.confidence * 100.0,
                variant.document.chord_count()
            );
        }
        println!();
        print!("{}", render(&song.preferred().document, mode));
        Ok(())
    })
}

/// Remove one variant from a song
pub fn cmd_remove(rt: &Runtime, config: &Config, song: &str, variant: &str) -> anyhow::Result<()> {
    rt.block_on(async {
        let song_id: SongId = song.parse().context("Invalid song id")?;
        let variant_id: VariantId = variant.parse().context("Invalid variant id")?;

        let engine = engine(config).await?;
        let song = engine.remove_variant(song_id, variant_id).await?;
        println!("Removed variant {}", variant_id);
        print_song_line(&song);
        Ok(())
    })
}
