pub mod favorites;
pub mod movie_search;
pub mod providers;

pub use providers::{MovieSearcher, OmdbSearcher};
