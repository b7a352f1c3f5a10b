//! Client-side query cache
//!
//! Holds the last known result of each logical query, keyed by [`QueryKey`].
//! Entries go stale after a per-key window and can be invalidated outright;
//! neither removes the data, they only decide whether the next
//! [`QueryCache::fetch_with`] trusts it.
//!
//! In-flight fetches are tracked by generation. [`QueryCache::cancel_fetches`]
//! bumps a key's generation, and a fetch that started under an older
//! generation is not allowed to write its result.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// How long a favorites list is trusted without refetching
pub const FAVORITES_STALE_AFTER: Duration = Duration::from_secs(60);
/// How long a search results page is trusted without refetching
pub const SEARCH_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Favorites,
    Search { query: String, page: u32 },
}

impl QueryKey {
    pub fn search(query: impl Into<String>, page: u32) -> Self {
        QueryKey::Search {
            query: query.into(),
            page,
        }
    }

    pub fn stale_after(&self) -> Duration {
        match self {
            QueryKey::Favorites => FAVORITES_STALE_AFTER,
            QueryKey::Search { .. } => SEARCH_STALE_AFTER,
        }
    }
}

impl Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKey::Favorites => write!(f, "favorites"),
            QueryKey::Search { query, page } => write!(f, "search:{}:{}", query, page),
        }
    }
}

type Value = Arc<dyn Any + Send + Sync>;

struct CacheEntry {
    data: Option<Value>,
    fetched_at: Instant,
    stale_after: Duration,
    invalidated: bool,
}

impl CacheEntry {
    fn empty(stale_after: Duration) -> Self {
        Self {
            data: None,
            fetched_at: Instant::now(),
            stale_after,
            invalidated: false,
        }
    }

    fn is_stale(&self) -> bool {
        self.is_stale_after(self.stale_after)
    }

    fn is_stale_after(&self, window: Duration) -> bool {
        self.data.is_none() || self.invalidated || self.fetched_at.elapsed() > window
    }
}

/// Proof that a fetch was started, checked again when it completes
#[derive(Debug, Clone)]
pub struct FetchToken {
    key: QueryKey,
    generation: u64,
}

impl FetchToken {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

/// Shared handle to the client's query cache
///
/// Clones share the same entries. Fetch generations are kept apart from the
/// entries so that dropping an entry never resets them.
#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<DashMap<QueryKey, CacheEntry>>,
    generations: Arc<DashMap<QueryKey, u64>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value for `key`, without fetching
    ///
    /// Returns `None` when nothing is stored or the stored value is not a `T`.
    pub fn read<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entry = self.entries.get(key)?;
        let data = entry.data.as_ref()?;
        match data.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                tracing::warn!(key = %key, "Cached value has unexpected type");
                None
            }
        }
    }

    /// Replaces the value for `key` and marks it freshly fetched
    pub fn write<T>(&self, key: &QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::empty(key.stale_after()));
        entry.data = Some(Arc::new(value));
        entry.fetched_at = Instant::now();
        entry.invalidated = false;
    }

    /// Whether the next read through [`QueryCache::fetch_with`] would refetch
    ///
    /// A key with no data is always stale.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.get(key).map_or(true, |entry| entry.is_stale())
    }

    /// Forces a refetch on next use; the data stays readable meanwhile
    ///
    /// Fetches already in flight for `key` are canceled, since they may have
    /// read the server before whatever prompted the invalidation.
    pub fn invalidate(&self, key: &QueryKey) {
        self.cancel_fetches(key);
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.invalidated = true;
            tracing::debug!(key = %key, "Cache entry invalidated");
        }
    }

    pub fn is_invalidated(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.invalidated)
    }

    /// Drops the entry for `key` entirely
    pub fn remove(&self, key: &QueryKey) {
        self.entries.remove(key);
    }

    /// Registers a fetch for `key` under its current generation
    pub fn begin_fetch(&self, key: &QueryKey) -> FetchToken {
        let generation = self.generations.get(key).map_or(0, |generation| *generation);

        FetchToken {
            key: key.clone(),
            generation,
        }
    }

    /// Makes every fetch started so far for `key` unable to write
    pub fn cancel_fetches(&self, key: &QueryKey) {
        let mut generation = self.generations.entry(key.clone()).or_insert(0);
        *generation += 1;
        tracing::debug!(key = %key, generation = *generation, "In-flight fetches canceled");
    }

    /// Stores a fetch result unless the fetch was canceled
    ///
    /// Returns whether the value was written.
    pub fn complete_fetch<T>(&self, token: &FetchToken, value: T) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.store_fetched(token, value, token.key.stale_after())
    }

    fn store_fetched<T>(&self, token: &FetchToken, value: T, stale_after: Duration) -> bool
    where
        T: Send + Sync + 'static,
    {
        // Held across the write so a concurrent cancel cannot slip in between.
        let guard = self.generations.get(&token.key);
        let current = guard.as_deref().copied().unwrap_or(0);
        if current != token.generation {
            tracing::debug!(
                key = %token.key,
                started = token.generation,
                current,
                "Discarding result of canceled fetch"
            );
            return false;
        }

        let mut entry = self
            .entries
            .entry(token.key.clone())
            .or_insert_with(|| CacheEntry::empty(stale_after));
        entry.data = Some(Arc::new(value));
        entry.fetched_at = Instant::now();
        entry.stale_after = stale_after;
        entry.invalidated = false;
        true
    }

    /// Read-through query
    ///
    /// Serves the cached value while it is younger than `stale_after` and not
    /// invalidated. Otherwise runs `fetcher` and stores its result under that
    /// window. If the fetch is canceled while in flight, the result is not
    /// stored and the caller gets whatever the cache holds by then (falling
    /// back to the fetched value if the cache is empty). A failed fetch leaves
    /// the entry untouched.
    pub async fn fetch_with<T, E, F, Fut>(
        &self,
        key: &QueryKey,
        stale_after: Duration,
        fetcher: F,
    ) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let fresh = self
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_stale_after(stale_after));
        if fresh {
            if let Some(value) = self.read::<T>(key) {
                tracing::debug!(key = %key, "Serving fresh cached value");
                return Ok(value);
            }
        }

        let token = self.begin_fetch(key);
        tracing::debug!(key = %key, "Fetching");
        let value = fetcher().await?;

        if self.store_fetched(&token, value.clone(), stale_after) {
            Ok(value)
        } else {
            Ok(self.read::<T>(key).unwrap_or(value))
        }
    }
}
