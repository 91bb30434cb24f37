//! CLI command definitions and dispatch.
//!
//! Each subcommand family lives in its own submodule:
//! - `chart`: parsing and transposing single charts
//! - `songs`: ingesting, searching and listing canonical songs
//! - `config`: showing and writing the configuration file

mod chart;
mod config;
mod songs;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::chart::{ChartParser, DisplayMode, ProviderHint};
use crate::config::{self as app_config, Config};
use crate::store::{MemoryStore, SongStore, SqliteStore, db_url};

pub use chart::{cmd_parse, cmd_transpose};
pub use config::{cmd_config_init, cmd_config_path, cmd_config_show};
pub use songs::{cmd_ingest, cmd_remove, cmd_search, cmd_songs};

/// Chart Minder CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the OS config directory)
    #[arg(long, global = true, env = "CHART_MINDER_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database, overriding `[storage].database`
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// How a rendered chart is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Layout {
    /// Chord line above each lyric line
    Above,
    /// Chords in brackets inside the lyrics
    Inline,
}

impl From<Layout> for DisplayMode {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Above => DisplayMode::ChordsAbove,
            Layout::Inline => DisplayMode::ChordsInline,
        }
    }
}

/// Exactly one transposition target
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Sounding key to move to (e.g. D, Bb, F#m)
    #[arg(long)]
    pub to_key: Option<String>,

    /// Semitones to shift, -11..=11
    #[arg(long, allow_hyphen_values = true)]
    pub delta: Option<i32>,

    /// Capo fret to play at, keeping the sounding key
    #[arg(long)]
    pub capo: Option<i32>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Parse a chart and print it in canonical form
    Parse {
        /// Chart file, or `-` for stdin
        path: PathBuf,
        /// Source grammar: inline, above, chordpro, columns, auto
        #[arg(long, default_value = "auto")]
        hint: ProviderHint,
        /// Print the parse outcome as JSON
        #[arg(long)]
        json: bool,
        #[arg(long, value_enum, default_value = "above")]
        layout: Layout,
    },
    /// Transpose a chart
    Transpose {
        /// Chart file, or `-` for stdin
        path: PathBuf,
        #[arg(long, default_value = "auto")]
        hint: ProviderHint,
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long, value_enum, default_value = "above")]
        layout: Layout,
    },
    /// Add a chart to the song store
    Ingest {
        /// Chart file
        path: PathBuf,
        #[arg(long, default_value = "auto")]
        hint: ProviderHint,
        /// Provider id recorded on the variant
        #[arg(long, default_value = "local")]
        provider: String,
        /// Title, overriding the chart header
        #[arg(long)]
        title: Option<String>,
        /// Artist, overriding the chart header
        #[arg(long)]
        artist: Option<String>,
        /// Provider rating, 0-5
        #[arg(long)]
        rating: Option<f32>,
        /// Number of votes behind the rating
        #[arg(long, default_value = "0")]
        votes: u32,
    },
    /// Search configured providers and stored songs
    Search {
        title: String,
        #[arg(long)]
        artist: Option<String>,
    },
    /// List stored songs, or show one song's variants
    Songs {
        /// Song id to show in detail
        id: Option<String>,
        #[arg(long, value_enum, default_value = "above")]
        layout: Layout,
    },
    /// Remove one variant from a song
    Remove {
        song: String,
        variant: String,
    },
    /// Show or write the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file location
    Path,
    /// Write the effective configuration to the config file
    Init,
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli);

    match &cli.command {
        Commands::Parse {
            path,
            hint,
            json,
            layout,
        } => cmd_parse(&config, path, *hint, *json, (*layout).into()),
        Commands::Transpose {
            path,
            hint,
            target,
            layout,
        } => cmd_transpose(&config, path, *hint, target, (*layout).into()),
        Commands::Ingest {
            path,
            hint,
            provider,
            title,
            artist,
            rating,
            votes,
        } => {
            let rt = Runtime::new()?;
            cmd_ingest(
                &rt,
                &config,
                songs::IngestArgs {
                    path,
                    hint: *hint,
                    provider,
                    title: title.as_deref(),
                    artist: artist.as_deref(),
                    rating: *rating,
                    votes: *votes,
                },
            )
        }
        Commands::Search { title, artist } => {
            let rt = Runtime::new()?;
            cmd_search(&rt, &config, title, artist.as_deref())
        }
        Commands::Songs { id, layout } => {
            let rt = Runtime::new()?;
            cmd_songs(&rt, &config, id.as_deref(), (*layout).into())
        }
        Commands::Remove { song, variant } => {
            let rt = Runtime::new()?;
            cmd_remove(&rt, &config, song, variant)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(&config),
            ConfigAction::Path => cmd_config_path(cli.config.as_deref()),
            ConfigAction::Init => cmd_config_init(&config, cli.config.as_deref()),
        },
    }
}

// ============================================================================
// Shared helper functions
// ============================================================================

/// Effective config: file contents plus command-line overrides.
fn load_config(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => app_config::load_from(path),
        None => app_config::load(),
    };
    if let Some(db) = &cli.db {
        config.storage.database = Some(db.clone());
    }
    config
}

/// Parser built from the `[parser]` and `[spelling]` sections.
pub(crate) fn chart_parser(config: &Config) -> ChartParser {
    ChartParser::new(config.parser.clone(), config.spelling.keys.clone())
}

/// Read a chart from a file, or stdin for `-`.
pub(crate) fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("Failed to read stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Open the configured store; in-memory when no database is set.
pub(crate) async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn SongStore>> {
    match &config.storage.database {
        Some(path) => {
            let url = db_url(Some(path));
            let store = SqliteStore::open(&url)
                .await
                .with_context(|| format!("Failed to open database {}", path.display()))?;
            debug!(db = %path.display(), "Using SQLite store");
            Ok(Arc::new(store))
        }
        None => {
            debug!("No database configured, songs are kept in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_transpose_target() {
        let cli = Cli::try_parse_from(["chart-minder", "transpose", "song.txt", "--delta", "-2"])
            .unwrap();
        match cli.command {
            Commands::Transpose { target, .. } => {
                assert_eq!(target.delta, Some(-2));
                assert!(target.to_key.is_none());
            }
            _ => panic!("expected transpose"),
        }
    }

    #[test]
    fn test_cli_rejects_two_targets() {
        let result = Cli::try_parse_from([
            "chart-minder",
            "transpose",
            "song.txt",
            "--delta",
            "2",
            "--capo",
            "3",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_requires_a_target() {
        assert!(Cli::try_parse_from(["chart-minder", "transpose", "song.txt"]).is_err());
    }

    #[test]
    fn test_cli_hint_and_db_override() {
        let cli = Cli::try_parse_from([
            "chart-minder",
            "parse",
            "song.cho",
            "--hint",
            "chordpro",
            "--db",
            "/tmp/x.db",
        ])
        .unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        match cli.command {
            Commands::Parse { hint, .. } => assert_eq!(hint, ProviderHint::ChordPro),
            _ => panic!("expected parse"),
        }
    }

    #[test]
    fn test_read_input_missing_file() {
        assert!(read_input(Path::new("/nonexistent/chart.txt")).is_err());
    }
}
