//! Movie search and favorites.
//!
//! The server side ([`routes`], [`services`], [`db`]) exposes a favorites
//! list with one row per IMDb id and proxies searches to OMDb. The client side
//! ([`client`]) caches query results and applies favorites mutations
//! optimistically, rolling back when the server refuses them.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
