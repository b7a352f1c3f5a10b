use std::sync::Arc;

use crate::{db::FavoritesStore, services::MovieSearcher};

/// Shared application state
///
/// Collaborators are built once in `main` and handed in here; handlers only
/// ever see the trait objects.
#[derive(Clone)]
pub struct AppState {
    pub favorites: Arc<dyn FavoritesStore>,
    pub searcher: Arc<dyn MovieSearcher>,
}

impl AppState {
    pub fn new(favorites: Arc<dyn FavoritesStore>, searcher: Arc<dyn MovieSearcher>) -> Self {
        Self {
            favorites,
            searcher,
        }
    }
}
