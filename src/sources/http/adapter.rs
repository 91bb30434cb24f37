//! Adapter layer: convert search DTOs to raw charts.

use super::dto;
use crate::matching::Popularity;
use crate::sources::domain::RawChart;

/// Convert a search response, dropping results without chart text.
pub fn to_raw_charts(response: dto::SearchResponse) -> Vec<RawChart> {
    response
        .results
        .into_iter()
        .filter(|r| !r.content.trim().is_empty())
        .map(to_raw_chart)
        .collect()
}

fn to_raw_chart(result: dto::ChartResult) -> RawChart {
    RawChart {
        native_id: result.id,
        title: non_empty(result.title),
        artist: non_empty(result.artist),
        raw: result.content,
        popularity: Popularity {
            rating: result.rating.filter(|r| r.is_finite()),
            votes: result.votes,
        },
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, content: &str) -> dto::ChartResult {
        dto::ChartResult {
            id: id.to_string(),
            title: Some("Jolene".to_string()),
            artist: Some(" ".to_string()),
            content: content.to_string(),
            rating: Some(4.0),
            votes: 12,
        }
    }

    #[test]
    fn test_to_raw_charts() {
        let response = dto::SearchResponse {
            results: vec![result("1", "[Am]Jolene"), result("2", "  ")],
        };
        let charts = to_raw_charts(response);
        assert_eq!(charts.len(), 1);
        assert_eq!(charts[0].native_id, "1");
        assert_eq!(charts[0].title.as_deref(), Some("Jolene"));
        assert_eq!(charts[0].artist, None);
        assert_eq!(charts[0].popularity, Popularity::new(4.0, 12));
    }
}
