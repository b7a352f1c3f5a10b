//! Optimistic favorites mutations
//!
//! Each add or remove runs through a small state machine:
//!
//! ```text
//! Idle --Started--> Optimistic --Confirmed--> Settled
//!                        |
//!                        +------Failed------> RolledBack
//! ```
//!
//! The favorites entry is rewritten before the request is sent. On failure the
//! entry goes back to the snapshot taken at the start; in both outcomes the
//! entry is invalidated so the next read comes from the server.

use std::future::Future;
use std::sync::Arc;

use crate::{
    client::{
        api::FavoritesApi,
        cache::{QueryCache, QueryKey},
        error::ClientError,
    },
    models::{Movie, SearchResponse},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState<T> {
    Idle,
    Optimistic { snapshot: Option<T> },
    Settled,
    RolledBack,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationEvent<T> {
    Started { snapshot: Option<T> },
    Confirmed,
    Failed,
}

/// What the coordinator must do to the cache after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEffect<T> {
    Restore(T),
    Invalidate,
}

impl<T> MutationState<T> {
    /// Single reducer for every mutation
    ///
    /// Out-of-order events leave the state unchanged and produce no effects.
    pub fn apply(self, event: MutationEvent<T>) -> (Self, Vec<CacheEffect<T>>) {
        match (self, event) {
            (MutationState::Idle, MutationEvent::Started { snapshot }) => {
                (MutationState::Optimistic { snapshot }, Vec::new())
            }
            (MutationState::Optimistic { .. }, MutationEvent::Confirmed) => {
                (MutationState::Settled, vec![CacheEffect::Invalidate])
            }
            (MutationState::Optimistic { snapshot }, MutationEvent::Failed) => {
                let mut effects = Vec::with_capacity(2);
                if let Some(snapshot) = snapshot {
                    effects.push(CacheEffect::Restore(snapshot));
                }
                effects.push(CacheEffect::Invalidate);
                (MutationState::RolledBack, effects)
            }
            (state, _) => (state, Vec::new()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MutationState::Settled | MutationState::RolledBack)
    }
}

/// Coordinates favorites reads and optimistic writes against one cache
///
/// Two mutations may be in flight at once; neither waits for the other.
/// Each one invalidates the favorites entry when it settles, so the server
/// gets the last word.
#[derive(Clone)]
pub struct MutationCoordinator {
    cache: QueryCache,
    api: Arc<dyn FavoritesApi>,
}

impl MutationCoordinator {
    pub fn new(cache: QueryCache, api: Arc<dyn FavoritesApi>) -> Self {
        Self { cache, api }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Read-through favorites query
    pub async fn favorites(&self) -> Result<Vec<Movie>, ClientError> {
        let key = QueryKey::Favorites;
        self.cache
            .fetch_with(&key, key.stale_after(), || self.api.list_favorites())
            .await
    }

    /// Read-through search query; an empty query never hits the network
    pub async fn search_movies(&self, query: &str, page: u32) -> Result<SearchResponse, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(SearchResponse::default());
        }

        let key = QueryKey::search(query, page);
        self.cache
            .fetch_with(&key, key.stale_after(), || self.api.search_movies(query, page))
            .await
    }

    /// Adds `movie` to favorites, showing it in the cache right away
    pub async fn add_favorite(&self, movie: Movie) -> Result<Movie, ClientError> {
        let imdb_id = movie.imdb_id.clone();
        let optimistic = movie.clone();
        self.mutate(
            "add",
            &imdb_id,
            move |current| {
                let mut next = current.to_vec();
                if !next.iter().any(|m| m.imdb_id == optimistic.imdb_id) {
                    next.push(optimistic);
                }
                next
            },
            || self.api.add_favorite(movie),
        )
        .await
    }

    /// Removes the favorite with `imdb_id`, hiding it in the cache right away
    pub async fn remove_favorite(&self, imdb_id: &str) -> Result<(), ClientError> {
        self.mutate(
            "remove",
            imdb_id,
            |current| {
                current
                    .iter()
                    .filter(|m| m.imdb_id != imdb_id)
                    .cloned()
                    .collect()
            },
            || self.api.remove_favorite(imdb_id),
        )
        .await
    }

    async fn mutate<R, U, F, Fut>(
        &self,
        operation: &'static str,
        imdb_id: &str,
        update: U,
        request: F,
    ) -> Result<R, ClientError>
    where
        U: FnOnce(&[Movie]) -> Vec<Movie>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<R, ClientError>>,
    {
        let key = QueryKey::Favorites;

        // A read already in flight would land on top of the optimistic value.
        self.cache.cancel_fetches(&key);

        let snapshot = self.cache.read::<Vec<Movie>>(&key);
        let optimistic = snapshot.as_deref().map(update);

        let (state, _) = MutationState::Idle.apply(MutationEvent::Started { snapshot });
        if let Some(optimistic) = optimistic {
            self.cache.write(&key, optimistic);
        }
        tracing::debug!(operation, imdb_id = %imdb_id, "Favorites mutation optimistic");

        let result = request().await;

        let event = match &result {
            Ok(_) => MutationEvent::Confirmed,
            Err(_) => MutationEvent::Failed,
        };
        let (state, effects) = state.apply(event);

        for effect in effects {
            match effect {
                CacheEffect::Restore(previous) => self.cache.write(&key, previous),
                CacheEffect::Invalidate => self.cache.invalidate(&key),
            }
        }

        match (&state, &result) {
            (MutationState::RolledBack, Err(e)) => tracing::warn!(
                operation,
                imdb_id = %imdb_id,
                error = %e,
                retryable = e.is_retryable(),
                "Favorites mutation rolled back"
            ),
            _ => tracing::debug!(operation, imdb_id = %imdb_id, state = ?state, "Favorites mutation settled"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::api::MockFavoritesApi;
    use reqwest::StatusCode;
    use crate::client::cache::FAVORITES_STALE_AFTER;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio_test::{assert_err, assert_ok};

    fn movie(imdb_id: &str, title: &str) -> Movie {
        Movie::new(imdb_id, title, "2000", None)
    }

    fn unavailable() -> ClientError {
        ClientError::Server {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "try later".to_string(),
        }
    }

    fn cached_favorites(cache: &QueryCache) -> Option<Vec<Movie>> {
        cache.read::<Vec<Movie>>(&QueryKey::Favorites)
    }

    #[test]
    fn test_reducer_success_path() {
        let state: MutationState<Vec<u32>> = MutationState::Idle;

        let (state, effects) = state.apply(MutationEvent::Started { snapshot: Some(vec![1]) });
        assert_eq!(state, MutationState::Optimistic { snapshot: Some(vec![1]) });
        assert!(effects.is_empty());

        let (state, effects) = state.apply(MutationEvent::Confirmed);
        assert_eq!(state, MutationState::Settled);
        assert_eq!(effects, vec![CacheEffect::Invalidate]);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_reducer_failure_restores_then_invalidates() {
        let (state, _) = MutationState::Idle.apply(MutationEvent::Started { snapshot: Some(vec![1, 2]) });

        let (state, effects) = state.apply(MutationEvent::Failed);

        assert_eq!(state, MutationState::RolledBack);
        assert_eq!(
            effects,
            vec![CacheEffect::Restore(vec![1, 2]), CacheEffect::Invalidate]
        );
    }

    #[test]
    fn test_reducer_failure_without_snapshot_only_invalidates() {
        let (state, _) = MutationState::<Vec<u32>>::Idle.apply(MutationEvent::Started { snapshot: None });

        let (_, effects) = state.apply(MutationEvent::Failed);

        assert_eq!(effects, vec![CacheEffect::Invalidate]);
    }

    #[test]
    fn test_reducer_ignores_out_of_order_events() {
        let (state, effects) = MutationState::<Vec<u32>>::Idle.apply(MutationEvent::Confirmed);
        assert_eq!(state, MutationState::Idle);
        assert!(effects.is_empty());

        let (state, effects) = MutationState::<Vec<u32>>::Settled.apply(MutationEvent::Failed);
        assert_eq!(state, MutationState::Settled);
        assert!(effects.is_empty());

        let (state, effects) =
            MutationState::<Vec<u32>>::RolledBack.apply(MutationEvent::Started { snapshot: None });
        assert_eq!(state, MutationState::RolledBack);
        assert!(effects.is_empty());
    }

    #[tokio::test]
    async fn test_failed_remove_rolls_back() {
        let a = movie("tt1", "A");
        let b = movie("tt2", "B");
        let cache = QueryCache::new();
        cache.write(&QueryKey::Favorites, vec![a.clone(), b.clone()]);

        let mut api = MockFavoritesApi::new();
        let observer = cache.clone();
        let expected_midflight = vec![b.clone()];
        api.expect_remove_favorite()
            .withf(|id| id == "tt1")
            .times(1)
            .returning(move |_| {
                assert_eq!(cached_favorites(&observer), Some(expected_midflight.clone()));
                Err(unavailable())
            });

        let coordinator = MutationCoordinator::new(cache.clone(), Arc::new(api));
        let result = coordinator.remove_favorite("tt1").await;

        assert_err!(&result);
        assert_eq!(cached_favorites(&cache), Some(vec![a, b]));
        assert!(cache.is_invalidated(&QueryKey::Favorites));
    }

    #[tokio::test]
    async fn test_successful_add_invalidates_and_refetches() {
        let a = movie("tt1", "A");
        let c = movie("tt3", "C");
        let cache = QueryCache::new();
        cache.write(&QueryKey::Favorites, vec![a.clone()]);

        let mut api = MockFavoritesApi::new();
        let observer = cache.clone();
        let midflight = vec![a.clone(), c.clone()];
        api.expect_add_favorite().times(1).returning(move |m| {
            assert_eq!(cached_favorites(&observer), Some(midflight.clone()));
            Ok(m)
        });
        let server_truth = vec![a.clone(), c.clone()];
        api.expect_list_favorites()
            .times(1)
            .returning(move || Ok(server_truth.clone()));

        let coordinator = MutationCoordinator::new(cache.clone(), Arc::new(api));
        let added = assert_ok!(coordinator.add_favorite(c.clone()).await);

        assert_eq!(added, c);
        assert!(cache.is_stale(&QueryKey::Favorites));

        let favorites = assert_ok!(coordinator.favorites().await);
        assert_eq!(favorites, vec![a, c]);
        assert!(!cache.is_stale(&QueryKey::Favorites));
    }

    #[tokio::test]
    async fn test_refetch_reflects_diverged_server_state() {
        let a = movie("tt1", "A");
        let c = movie("tt3", "C");
        let d = movie("tt4", "D");
        let cache = QueryCache::new();
        cache.write(&QueryKey::Favorites, vec![a.clone()]);

        let mut api = MockFavoritesApi::new();
        api.expect_add_favorite().returning(Ok);
        let server_truth = vec![c.clone(), d.clone()];
        api.expect_list_favorites()
            .returning(move || Ok(server_truth.clone()));

        let coordinator = MutationCoordinator::new(cache.clone(), Arc::new(api));
        assert_ok!(coordinator.add_favorite(c.clone()).await);

        assert_eq!(assert_ok!(coordinator.favorites().await), vec![c, d]);
    }

    #[tokio::test]
    async fn test_conflicting_add_rolls_back_and_surfaces_conflict() {
        let a = movie("tt1", "A");
        let cache = QueryCache::new();
        cache.write(&QueryKey::Favorites, Vec::<Movie>::new());

        let mut api = MockFavoritesApi::new();
        api.expect_add_favorite()
            .returning(|m| Err(ClientError::Conflict(format!("{} already in favorites", m.imdb_id))));

        let coordinator = MutationCoordinator::new(cache.clone(), Arc::new(api));
        let err = coordinator.add_favorite(a).await.unwrap_err();

        assert!(matches!(err, ClientError::Conflict(_)));
        assert!(!err.is_retryable());
        assert_eq!(cached_favorites(&cache), Some(Vec::new()));
        assert!(cache.is_invalidated(&QueryKey::Favorites));
    }

    #[tokio::test]
    async fn test_add_of_present_movie_does_not_duplicate() {
        let a = movie("tt1", "A");
        let cache = QueryCache::new();
        cache.write(&QueryKey::Favorites, vec![a.clone()]);

        let mut api = MockFavoritesApi::new();
        let observer = cache.clone();
        let expected = vec![a.clone()];
        api.expect_add_favorite().returning(move |m| {
            assert_eq!(cached_favorites(&observer), Some(expected.clone()));
            Err(ClientError::Conflict(m.imdb_id))
        });

        let coordinator = MutationCoordinator::new(cache.clone(), Arc::new(api));
        assert_err!(coordinator.add_favorite(a.clone()).await);
        assert_eq!(cached_favorites(&cache), Some(vec![a]));
    }

    #[tokio::test]
    async fn test_mutation_without_cached_list_writes_nothing() {
        let cache = QueryCache::new();

        let mut api = MockFavoritesApi::new();
        let observer = cache.clone();
        api.expect_add_favorite().returning(move |_| {
            assert_eq!(cached_favorites(&observer), None);
            Err(unavailable())
        });

        let coordinator = MutationCoordinator::new(cache.clone(), Arc::new(api));
        assert_err!(coordinator.add_favorite(movie("tt1", "A")).await);
        assert_eq!(cached_favorites(&cache), None);
    }

    #[tokio::test]
    async fn test_search_empty_query_skips_network() {
        let api = MockFavoritesApi::new();
        let coordinator = MutationCoordinator::new(QueryCache::new(), Arc::new(api));

        let response = assert_ok!(coordinator.search_movies("  ", 1).await);
        assert_eq!(response, SearchResponse::default());
    }

    #[tokio::test]
    async fn test_search_is_cached_per_page() {
        let mut api = MockFavoritesApi::new();
        api.expect_search_movies()
            .withf(|q, page| q == "batman" && *page == 1)
            .times(1)
            .returning(|_, _| {
                Ok(SearchResponse {
                    movies: vec![movie("tt0372784", "Batman Begins")],
                    total_results: 1,
                })
            });
        api.expect_search_movies()
            .withf(|q, page| q == "batman" && *page == 2)
            .times(1)
            .returning(|_, _| Ok(SearchResponse::default()));

        let coordinator = MutationCoordinator::new(QueryCache::new(), Arc::new(api));

        let first = assert_ok!(coordinator.search_movies("batman", 1).await);
        let again = assert_ok!(coordinator.search_movies("batman", 1).await);
        let second_page = assert_ok!(coordinator.search_movies("batman", 2).await);

        assert_eq!(first, again);
        assert_eq!(first.total_results, 1);
        assert!(second_page.movies.is_empty());
    }

    /// Fake server whose first list call, and optionally first mutation,
    /// can be held open
    struct SlowListApi {
        favorites: Mutex<Vec<Movie>>,
        hold_list: AtomicBool,
        list_started: Notify,
        release_list: Notify,
        hold_mutation: AtomicBool,
        mutation_started: Notify,
        release_mutation: Notify,
    }

    impl SlowListApi {
        fn new(favorites: Vec<Movie>) -> Self {
            Self {
                favorites: Mutex::new(favorites),
                hold_list: AtomicBool::new(true),
                list_started: Notify::new(),
                release_list: Notify::new(),
                hold_mutation: AtomicBool::new(false),
                mutation_started: Notify::new(),
                release_mutation: Notify::new(),
            }
        }

        fn holding_mutation(self) -> Self {
            self.hold_mutation.store(true, Ordering::SeqCst);
            self
        }

        /// Parks before the mutation reaches the store
        async fn gate_mutation(&self) {
            if self.hold_mutation.swap(false, Ordering::SeqCst) {
                self.mutation_started.notify_one();
                self.release_mutation.notified().await;
            }
        }
    }

    #[async_trait::async_trait]
    impl FavoritesApi for SlowListApi {
        async fn list_favorites(&self) -> Result<Vec<Movie>, ClientError> {
            let snapshot = self.favorites.lock().unwrap().clone();
            if self.hold_list.swap(false, Ordering::SeqCst) {
                self.list_started.notify_one();
                self.release_list.notified().await;
            }
            Ok(snapshot)
        }

        async fn add_favorite(&self, movie: Movie) -> Result<Movie, ClientError> {
            self.gate_mutation().await;
            let mut favorites = self.favorites.lock().unwrap();
            if favorites.iter().any(|m| m.imdb_id == movie.imdb_id) {
                return Err(ClientError::Conflict(movie.imdb_id));
            }
            favorites.push(movie.clone());
            Ok(movie)
        }

        async fn remove_favorite(&self, imdb_id: &str) -> Result<(), ClientError> {
            self.gate_mutation().await;
            self.favorites.lock().unwrap().retain(|m| m.imdb_id != imdb_id);
            Ok(())
        }

        async fn search_movies(&self, _query: &str, _page: u32) -> Result<SearchResponse, ClientError> {
            Ok(SearchResponse::default())
        }
    }

    #[tokio::test]
    async fn test_stale_inflight_read_cannot_overwrite_optimistic_write() {
        let a = movie("tt1", "A");
        let c = movie("tt3", "C");
        let api = Arc::new(SlowListApi::new(vec![a.clone()]));
        let cache = QueryCache::new();
        cache.write(&QueryKey::Favorites, vec![a.clone()]);
        cache.invalidate(&QueryKey::Favorites);

        let coordinator = MutationCoordinator::new(cache.clone(), api.clone());

        let reader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.favorites().await })
        };
        api.list_started.notified().await;

        // The read captured [A] before the add reached the server.
        assert_ok!(coordinator.add_favorite(c.clone()).await);
        api.release_list.notify_one();
        let read = assert_ok!(reader.await.unwrap());

        assert_eq!(read, vec![a.clone(), c.clone()]);
        assert_eq!(cached_favorites(&cache), Some(vec![a.clone(), c.clone()]));
        assert!(cache.is_invalidated(&QueryKey::Favorites));

        assert_eq!(assert_ok!(coordinator.favorites().await), vec![a, c]);
    }

    #[tokio::test]
    async fn test_rapid_toggle_converges_on_server_state() {
        let a = movie("tt1", "A");
        let api = Arc::new(SlowListApi::new(Vec::new()));
        api.hold_list.store(false, Ordering::SeqCst);
        let cache = QueryCache::new();
        let coordinator = MutationCoordinator::new(cache.clone(), api.clone());

        assert_ok!(coordinator.favorites().await);

        let (added, removed) = tokio::join!(
            coordinator.add_favorite(a.clone()),
            coordinator.remove_favorite("tt1"),
        );
        assert_ok!(added);
        assert_ok!(removed);

        assert!(cache.is_stale(&QueryKey::Favorites));
        assert_eq!(assert_ok!(coordinator.favorites().await), Vec::<Movie>::new());
    }

    #[tokio::test]
    async fn test_read_started_during_add_cannot_mask_settle() {
        let c = movie("tt3", "C");
        let api = Arc::new(SlowListApi::new(Vec::new()).holding_mutation());
        let cache = QueryCache::new();
        let coordinator = MutationCoordinator::new(cache.clone(), api.clone());

        let adding = {
            let coordinator = coordinator.clone();
            let c = c.clone();
            tokio::spawn(async move { coordinator.add_favorite(c).await })
        };
        api.mutation_started.notified().await;

        // This read sees the server before the add commits.
        let reader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.favorites().await })
        };
        api.list_started.notified().await;

        api.release_mutation.notify_one();
        assert_ok!(adding.await.unwrap());
        assert!(cache.is_stale(&QueryKey::Favorites));

        api.release_list.notify_one();
        assert_ok!(reader.await.unwrap());

        assert!(cache.is_stale(&QueryKey::Favorites));
        assert_eq!(cached_favorites(&cache), None);
        assert_eq!(assert_ok!(coordinator.favorites().await), vec![c]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_started_during_remove_cannot_mask_settle() {
        let a = movie("tt1", "A");
        let b = movie("tt2", "B");
        let api = Arc::new(SlowListApi::new(vec![a.clone(), b.clone()]).holding_mutation());
        let cache = QueryCache::new();
        cache.write(&QueryKey::Favorites, vec![a.clone(), b.clone()]);
        let coordinator = MutationCoordinator::new(cache.clone(), api.clone());

        let removing = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.remove_favorite("tt1").await })
        };
        api.mutation_started.notified().await;
        assert_eq!(cached_favorites(&cache), Some(vec![b.clone()]));

        // Let the optimistic value age out so the next read goes to the server.
        tokio::time::advance(FAVORITES_STALE_AFTER + Duration::from_millis(1)).await;
        let reader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.favorites().await })
        };
        api.list_started.notified().await;

        api.release_mutation.notify_one();
        assert_ok!(removing.await.unwrap());

        api.release_list.notify_one();
        let read = assert_ok!(reader.await.unwrap());

        assert_eq!(read, vec![b.clone()]);
        assert_eq!(cached_favorites(&cache), Some(vec![b.clone()]));
        assert!(cache.is_stale(&QueryKey::Favorites));
        assert_eq!(assert_ok!(coordinator.favorites().await), vec![b]);
    }
}
