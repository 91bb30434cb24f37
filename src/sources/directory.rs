//! Local folder of chart files as a provider.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::domain::{FetchError, RawChart, SearchQuery};
use crate::chart::{ProviderHint, parse};
use crate::matching::normalize::default_artist_aliases;
use crate::matching::{ArtistAliases, text_similarity};

/// Extensions served as charts.
pub const CHART_EXTENSIONS: &[&str] = &["txt", "cho", "crd", "pro", "chopro"];

/// Title and artist similarity needed for a file to answer a query.
const MATCH_THRESHOLD: f64 = 0.8;

/// Serves chart files from a directory tree.
///
/// A file matches when the title in its header (or its file name, when the
/// header has none) is close to the query title, and the artist agrees
/// whenever both sides name one.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    id: String,
    root: PathBuf,
    hint: ProviderHint,
    aliases: ArtistAliases,
}

impl DirectorySource {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>, hint: ProviderHint) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            hint,
            aliases: ArtistAliases::new(&default_artist_aliases()),
        }
    }

    /// Use a configured alias table for artist comparison.
    pub fn with_aliases(mut self, aliases: ArtistAliases) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hint(&self) -> ProviderHint {
        self.hint
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<RawChart>, FetchError> {
        let source = self.clone();
        let query = query.clone();
        tokio::task::spawn_blocking(move || source.scan(&query))
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?
    }

    fn scan(&self, query: &SearchQuery) -> Result<Vec<RawChart>, FetchError> {
        if !self.root.is_dir() {
            return Err(FetchError::NotFound(self.root.display().to_string()));
        }

        let mut charts = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_chart_file(e.path()))
        {
            let path = entry.path();
            let raw = match std::fs::read_to_string(path) {
                Ok(raw) => raw,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Skipping unreadable chart");
                    continue;
                }
            };
            if let Some(chart) = self.match_file(path, raw, query) {
                charts.push(chart);
            }
        }

        debug!(provider = %self.id, matches = charts.len(), "Scanned chart directory");
        Ok(charts)
    }

    fn match_file(&self, path: &Path, raw: String, query: &SearchQuery) -> Option<RawChart> {
        let metadata = parse(&raw, self.hint).into_document().metadata;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().replace(['_', '-'], " "))
            .unwrap_or_default();

        let title = if metadata.title.is_empty() {
            stem
        } else {
            metadata.title
        };
        if text_similarity(&query.title, &title) < MATCH_THRESHOLD {
            return None;
        }
        if let Some(artist) = query.artist()
            && !metadata.artist.is_empty()
            && self.aliases.similarity(artist, &metadata.artist) < MATCH_THRESHOLD
        {
            return None;
        }

        let native_id = path
            .strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        Some(RawChart {
            native_id,
            title: Some(title),
            artist: (!metadata.artist.is_empty()).then_some(metadata.artist),
            raw,
            ..Default::default()
        })
    }
}

fn is_chart_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| CHART_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn test_matches_by_header_title() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "grace.cho",
            "{title: Amazing Grace}\n{artist: Traditional}\n[G]Amazing [C]grace",
        );
        write(dir.path(), "jolene.cho", "{title: Jolene}\n[Am]Jolene");
        write(dir.path(), "notes.md", "{title: Amazing Grace}");

        let source = DirectorySource::new("local", dir.path(), ProviderHint::ChordPro);
        let charts = source.search(&SearchQuery::new("amazing grace")).await.unwrap();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].native_id, "grace.cho");
        assert_eq!(charts[0].title.as_deref(), Some("Amazing Grace"));
        assert_eq!(charts[0].artist.as_deref(), Some("Traditional"));
    }

    #[tokio::test]
    async fn test_matches_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "amazing_grace.txt", "G   C\nAmazing grace");

        let source = DirectorySource::new("local", dir.path(), ProviderHint::ChordsOverLyrics);
        let charts = source.search(&SearchQuery::new("Amazing Grace")).await.unwrap();
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].title.as_deref(), Some("amazing grace"));
        assert_eq!(charts[0].artist, None);
    }

    #[tokio::test]
    async fn test_artist_mismatch_filters() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "grace.cho",
            "{title: Amazing Grace}\n{artist: Traditional}\n[G]Amazing",
        );

        let source = DirectorySource::new("local", dir.path(), ProviderHint::ChordPro);
        let query = SearchQuery::new("Amazing Grace").with_artist("Dolly Parton");
        assert!(source.search(&query).await.unwrap().is_empty());

        let query = SearchQuery::new("Amazing Grace").with_artist("Trad.");
        assert_eq!(source.search(&query).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_root() {
        let source = DirectorySource::new("local", "/nonexistent/charts", ProviderHint::Auto);
        let result = source.search(&SearchQuery::new("x")).await;
        assert!(matches!(result, Err(FetchError::NotFound(_))));
    }

    #[test]
    fn test_is_chart_file() {
        assert!(is_chart_file(Path::new("a.txt")));
        assert!(is_chart_file(Path::new("a.CHO")));
        assert!(!is_chart_file(Path::new("a.mp3")));
        assert!(!is_chart_file(Path::new("README")));
    }
}
