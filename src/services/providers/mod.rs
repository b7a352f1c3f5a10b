/// Movie catalog abstraction
///
/// The HTTP layer only sees [`MovieSearcher`]; the concrete catalog (OMDb)
/// translates its own wire shape into [`SearchResponse`].
use crate::{error::AppResult, models::SearchResponse};

pub mod omdb;

pub use omdb::OmdbSearcher;

/// Trait for movie catalog providers
#[async_trait::async_trait]
pub trait MovieSearcher: Send + Sync {
    /// Search the catalog by title, one result page at a time (pages start at 1)
    async fn search(&self, query: &str, page: u32) -> AppResult<SearchResponse>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
