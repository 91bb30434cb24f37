//! HTTP client for chart search providers.

use super::{adapter, dto};
use crate::chart::ProviderHint;
use crate::sources::domain::{FetchError, RawChart, SearchQuery};

const USER_AGENT: &str = concat!("ChartMinder/", env!("CARGO_PKG_VERSION"));

/// A provider reached over HTTP.
pub struct HttpChartSource {
    id: String,
    hint: ProviderHint,
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpChartSource {
    pub fn new(
        id: impl Into<String>,
        base_url: impl Into<String>,
        hint: ProviderHint,
    ) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            id: id.into(),
            hint,
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hint(&self) -> ProviderHint {
        self.hint
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "{}/search?title={}",
            self.base_url,
            urlencoding::encode(query.title.trim())
        );
        if let Some(artist) = query.artist() {
            url.push_str("&artist=");
            url.push_str(&urlencoding::encode(artist.trim()));
        }
        url
    }

    /// Search the provider and convert its results.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<RawChart>, FetchError> {
        let response = self.send_search_request(query).await?;
        Ok(adapter::to_raw_charts(response))
    }

    async fn send_search_request(
        &self,
        query: &SearchQuery,
    ) -> Result<dto::SearchResponse, FetchError> {
        let url = self.search_url(query);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }

        if !status.is_success() {
            let reason = match response.json::<dto::ApiError>().await {
                Ok(error) => error.error,
                Err(_) => status.canonical_reason().unwrap_or("Unknown").to_string(),
            };
            return Err(FetchError::Http {
                status: status.as_u16(),
                reason,
            });
        }

        response
            .json::<dto::SearchResponse>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HttpChartSource {
        HttpChartSource::new("tabsite", "http://localhost:8080/", ProviderHint::ChordsOverLyrics)
            .unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = source();
        assert_eq!(client.id(), "tabsite");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.hint(), ProviderHint::ChordsOverLyrics);
    }

    #[test]
    fn test_search_url_encodes_query() {
        let client = source();
        assert_eq!(
            client.search_url(&SearchQuery::new("Don't Stop")),
            "http://localhost:8080/search?title=Don%27t%20Stop"
        );
        assert_eq!(
            client.search_url(&SearchQuery::new("Jolene").with_artist("Dolly & Co")),
            "http://localhost:8080/search?title=Jolene&artist=Dolly%20%26%20Co"
        );
    }

    #[test]
    fn test_user_agent_format() {
        assert!(USER_AGENT.starts_with("ChartMinder/"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client =
            HttpChartSource::new("down", "http://127.0.0.1:9", ProviderHint::Auto).unwrap();
        let result = client.search(&SearchQuery::new("Jolene")).await;
        assert!(matches!(result, Err(FetchError::Network(_))));
    }
}
