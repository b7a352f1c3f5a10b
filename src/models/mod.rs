use serde::Deserialize;

pub mod movie;

pub use movie::{normalize_poster, AddFavoriteRequest, Movie, SearchResponse, NO_POSTER};

// ============================================================================
// OMDb API Types
// ============================================================================

/// A single search hit as returned by OMDb (PascalCase fields)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OmdbMovie {
    #[serde(rename = "imdbID", default)]
    pub imdb_id: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Year", default)]
    pub year: String,
    #[serde(rename = "Poster", default)]
    pub poster: Option<String>,
}

impl From<OmdbMovie> for Movie {
    fn from(omdb: OmdbMovie) -> Self {
        Movie::new(omdb.imdb_id, omdb.title, omdb.year, omdb.poster)
    }
}

/// Raw response of `GET /?s=...`
///
/// OMDb signals failure in-band with `Response: "False"` and an `Error` message.
#[derive(Debug, Clone, Deserialize)]
pub struct OmdbSearchResponse {
    #[serde(rename = "Search", default)]
    pub search: Option<Vec<OmdbMovie>>,
    #[serde(rename = "totalResults", default)]
    pub total_results: Option<String>,
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Error", default)]
    pub error: Option<String>,
}

impl OmdbSearchResponse {
    pub fn is_success(&self) -> bool {
        !self.response.eq_ignore_ascii_case("false")
    }

    /// Parsed `totalResults`, 0 when absent or malformed
    pub fn total_results(&self) -> u64 {
        self.total_results
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn into_search_response(self) -> SearchResponse {
        let total_results = self.total_results();
        SearchResponse {
            movies: self
                .search
                .unwrap_or_default()
                .into_iter()
                .map(Movie::from)
                .collect(),
            total_results,
        }
    }
}
