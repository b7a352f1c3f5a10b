use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Sentinel the catalog uses for "no poster"
pub const NO_POSTER: &str = "N/A";

/// A movie as seen by clients, both in search results and in the favorites list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Movie {
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    pub title: String,
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

impl Movie {
    pub fn new(
        imdb_id: impl Into<String>,
        title: impl Into<String>,
        year: impl Into<String>,
        poster: Option<String>,
    ) -> Self {
        Self {
            imdb_id: imdb_id.into(),
            title: title.into(),
            year: year.into(),
            poster: normalize_poster(poster),
        }
    }

    /// Whether there is an image worth rendering
    pub fn has_poster(&self) -> bool {
        self.poster
            .as_deref()
            .is_some_and(|p| !p.is_empty() && p != NO_POSTER)
    }
}

/// Collapses the "no image" spellings into `None`
pub fn normalize_poster(poster: Option<String>) -> Option<String> {
    poster.filter(|p| {
        let trimmed = p.trim();
        !trimmed.is_empty() && trimmed != NO_POSTER
    })
}

/// Body of `POST /favorites`
///
/// Fields default to empty so a missing field and an empty field are both
/// reported by [`AddFavoriteRequest::validate`] as a 400 rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AddFavoriteRequest {
    #[serde(rename = "imdbID", default)]
    pub imdb_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub poster: Option<String>,
}

impl AddFavoriteRequest {
    /// Checks required fields and produces the movie to persist
    pub fn validate(self) -> AppResult<Movie> {
        require_non_empty("imdbID", &self.imdb_id)?;
        require_non_empty("title", &self.title)?;
        require_non_empty("year", &self.year)?;

        Ok(Movie::new(
            self.imdb_id.trim(),
            self.title.trim(),
            self.year.trim(),
            self.poster,
        ))
    }
}

impl From<Movie> for AddFavoriteRequest {
    fn from(movie: Movie) -> Self {
        Self {
            imdb_id: movie.imdb_id,
            title: movie.title,
            year: movie.year,
            poster: movie.poster,
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Response of `GET /movies/search`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub movies: Vec<Movie>,
    pub total_results: u64,
}
