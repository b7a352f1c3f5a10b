use std::sync::Arc;

use crate::{
    db::FavoritesStore,
    error::AppResult,
    models::{AddFavoriteRequest, Movie},
};

pub async fn list_favorites(store: Arc<dyn FavoritesStore>) -> AppResult<Vec<Movie>> {
    store.get_all().await
}

/// Validates the request before it reaches the store
pub async fn add_favorite(
    store: Arc<dyn FavoritesStore>,
    request: AddFavoriteRequest,
) -> AppResult<Movie> {
    let movie = request.validate()?;
    store.add(movie).await
}

/// Idempotent: removing an absent favorite is not an error
pub async fn remove_favorite(store: Arc<dyn FavoritesStore>, imdb_id: &str) -> AppResult<()> {
    store.remove(imdb_id.trim()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::InMemoryFavoritesStore, error::AppError};

    fn request(imdb_id: &str, title: &str, year: &str) -> AddFavoriteRequest {
        AddFavoriteRequest {
            imdb_id: imdb_id.to_string(),
            title: title.to_string(),
            year: year.to_string(),
            poster: None,
        }
    }

    #[tokio::test]
    async fn test_add_then_conflict() {
        let store: Arc<dyn FavoritesStore> = Arc::new(InMemoryFavoritesStore::new());

        let added = add_favorite(store.clone(), request("tt1", "A", "2000")).await.unwrap();
        assert_eq!(added, Movie::new("tt1", "A", "2000", None));
        assert_eq!(store.count().await.unwrap(), 1);

        let second = add_favorite(store.clone(), request("tt1", "A", "2000")).await;
        assert!(matches!(second, Err(AppError::AlreadyExists(_))));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_store() {
        let store: Arc<dyn FavoritesStore> = Arc::new(InMemoryFavoritesStore::new());

        let result = add_favorite(store.clone(), request("", "A", "2000")).await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_on_empty_store() {
        let store: Arc<dyn FavoritesStore> = Arc::new(InMemoryFavoritesStore::new());

        remove_favorite(store.clone(), "tt9").await.unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(list_favorites(store).await.unwrap().is_empty());
    }
}
