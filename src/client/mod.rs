//! Client half of favorites synchronization
//!
//! [`QueryCache`] keeps query results in memory, [`FavoritesApi`] talks to the
//! server, and [`MutationCoordinator`] ties them together with optimistic
//! updates and rollback.

pub mod api;
pub mod cache;
pub mod error;
pub mod mutation;

pub use api::{FavoritesApi, HttpFavoritesApi};
pub use cache::{FetchToken, QueryCache, QueryKey};
pub use error::ClientError;
pub use mutation::{CacheEffect, MutationCoordinator, MutationEvent, MutationState};
