use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    db::favorites::{already_exists, FavoritesStore},
    error::AppResult,
    models::Movie,
};

/// Favorites store held in process memory
///
/// Check-and-insert goes through the map's entry API, so the shard lock makes
/// it atomic per identifier.
#[derive(Default)]
pub struct InMemoryFavoritesStore {
    data: DashMap<String, Movie>,
}

impl InMemoryFavoritesStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl FavoritesStore for InMemoryFavoritesStore {
    async fn get_all(&self) -> AppResult<Vec<Movie>> {
        let mut movies: Vec<Movie> = self.data.iter().map(|r| r.value().clone()).collect();
        movies.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.imdb_id.cmp(&b.imdb_id)));
        Ok(movies)
    }

    async fn add(&self, movie: Movie) -> AppResult<Movie> {
        match self.data.entry(movie.imdb_id.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(imdb_id = %movie.imdb_id, "Favorite already stored");
                Err(already_exists(&movie.imdb_id))
            }
            Entry::Vacant(slot) => {
                slot.insert(movie.clone());
                tracing::info!(imdb_id = %movie.imdb_id, "Favorite added");
                Ok(movie)
            }
        }
    }

    async fn remove(&self, imdb_id: &str) -> AppResult<()> {
        let removed = self.data.remove(imdb_id).is_some();
        tracing::info!(imdb_id = %imdb_id, removed, "Favorite removal processed");
        Ok(())
    }

    async fn exists(&self, imdb_id: &str) -> AppResult<bool> {
        Ok(self.data.contains_key(imdb_id))
    }

    async fn count(&self) -> AppResult<u64> {
        Ok(self.data.len() as u64)
    }
}
