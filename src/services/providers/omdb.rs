/// OMDb search provider
///
/// Calls `GET {api_url}?apikey=..&s=<query>&page=<n>` and translates the
/// PascalCase payload into our [`Movie`](crate::models::Movie) shape.
/// Successful responses are cached in Redis when a cache is configured.
use std::time::Duration;

use reqwest::Client as HttpClient;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{OmdbSearchResponse, SearchResponse},
    services::providers::MovieSearcher,
};

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct OmdbSearcher {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
}

impl OmdbSearcher {
    pub fn new(api_key: String, api_url: String, cache: Option<Cache>) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            cache,
        })
    }

    async fn fetch(&self, query: &str, page: u32) -> AppResult<SearchResponse> {
        let page = page.to_string();
        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("s", query),
                ("page", page.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OMDb API returned status {}: {}",
                status, body
            )));
        }

        let raw: OmdbSearchResponse = response.json().await?;
        let results = into_results(raw)?;

        tracing::info!(
            query = %query,
            page = %page,
            results = results.movies.len(),
            total = results.total_results,
            provider = "omdb",
            "Movie search completed"
        );

        Ok(results)
    }
}

/// Turns OMDb's in-band failure into an error
fn into_results(raw: OmdbSearchResponse) -> AppResult<SearchResponse> {
    if !raw.is_success() {
        let message = raw
            .error
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| "No movies found".to_string());
        return Err(AppError::InvalidInput(message));
    }

    Ok(raw.into_search_response())
}

#[async_trait::async_trait]
impl MovieSearcher for OmdbSearcher {
    async fn search(&self, query: &str, page: u32) -> AppResult<SearchResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let Some(cache) = &self.cache else {
            return self.fetch(query, page).await;
        };

        let key = CacheKey::MovieSearch {
            query: query.to_string(),
            page,
        };
        cached!(cache, key, SEARCH_CACHE_TTL, self.fetch(query, page))
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}
