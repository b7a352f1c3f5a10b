use std::time::Duration;

use reqwest::{Client as HttpClient, Response};
use serde::Deserialize;

use crate::{
    client::error::ClientError,
    models::{AddFavoriteRequest, Movie, SearchResponse},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Remote favorites and search operations as seen by the client
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FavoritesApi: Send + Sync {
    async fn list_favorites(&self) -> Result<Vec<Movie>, ClientError>;

    async fn add_favorite(&self, movie: Movie) -> Result<Movie, ClientError>;

    /// Succeeds whether or not the favorite existed
    async fn remove_favorite(&self, imdb_id: &str) -> Result<(), ClientError>;

    async fn search_movies(&self, query: &str, page: u32) -> Result<SearchResponse, ClientError>;
}

/// Error body written by the server (`error`) or by proxies in front of it (`message`)
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// [`FavoritesApi`] over HTTP
#[derive(Clone)]
pub struct HttpFavoritesApi {
    http_client: HttpClient,
    base_url: String,
}

impl HttpFavoritesApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http_client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/favorites/<id>` with the id percent-encoded as one path segment
    fn favorite_url(&self, imdb_id: &str) -> Result<reqwest::Url, ClientError> {
        let mut url = reqwest::Url::parse(&self.url("/favorites"))
            .map_err(|e| ClientError::Validation(format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation("Base URL cannot be a base".to_string()))?
            .push(imdb_id);
        Ok(url)
    }

    /// Passes successful responses through, maps the rest to [`ClientError`]
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = body
            .error
            .or(body.message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        tracing::warn!(status = %status, message = %message, "Favorites API request failed");

        Err(ClientError::from_status(status, message))
    }
}

#[async_trait::async_trait]
impl FavoritesApi for HttpFavoritesApi {
    async fn list_favorites(&self) -> Result<Vec<Movie>, ClientError> {
        let response = self.http_client.get(self.url("/favorites")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn add_favorite(&self, movie: Movie) -> Result<Movie, ClientError> {
        let response = self
            .http_client
            .post(self.url("/favorites"))
            .json(&AddFavoriteRequest::from(movie))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn remove_favorite(&self, imdb_id: &str) -> Result<(), ClientError> {
        let response = self.http_client.delete(self.favorite_url(imdb_id)?).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<SearchResponse, ClientError> {
        let page = page.to_string();
        let response = self
            .http_client
            .get(self.url("/movies/search"))
            .query(&[("query", query), ("page", page.as_str())])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = HttpFavoritesApi::new("http://localhost:3001/").unwrap();
        assert_eq!(api.url("/favorites"), "http://localhost:3001/favorites");
    }

    #[test]
    fn test_favorite_url_encodes_id_as_one_segment() {
        let api = HttpFavoritesApi::new("http://localhost:3001").unwrap();
        let url = api.favorite_url("tt/1").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/favorites/tt%2F1");
    }

    #[test]
    fn test_favorite_url_rejects_cannot_be_a_base() {
        let api = HttpFavoritesApi::new("mailto:someone").unwrap();
        match api.favorite_url("tt1") {
            Err(ClientError::Validation(msg)) => assert_eq!(msg, "Base URL cannot be a base"),
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_retryable_transport_error() {
        let api = HttpFavoritesApi::new("http://127.0.0.1:9").unwrap();

        let err = api.list_favorites().await.unwrap_err();

        assert!(matches!(err, ClientError::Transport(_)));
        assert!(err.is_retryable());
    }
}
