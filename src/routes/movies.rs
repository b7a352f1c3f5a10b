use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult, models::SearchResponse, routes::AppState, services::movie_search,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    query: String,
    page: Option<String>,
}

/// Handler for movie search endpoint
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let response = movie_search::search_movies(
        state.searcher.clone(),
        &params.query,
        params.page.as_deref(),
    )
    .await?;
    Ok(Json(response))
}
