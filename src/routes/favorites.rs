use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{AddFavoriteRequest, Movie},
    routes::AppState,
    services::favorites,
};

/// Handler for `GET /favorites`
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<Movie>>> {
    let movies = favorites::list_favorites(state.favorites.clone()).await?;
    Ok(Json(movies))
}

/// Handler for `POST /favorites`
///
/// Body rejections are mapped to 400 so malformed and incomplete payloads
/// look the same to the client.
pub async fn add(
    State(state): State<AppState>,
    payload: Result<Json<AddFavoriteRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Movie>)> {
    let Json(request) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    tracing::Span::current().record("imdb_id", request.imdb_id.as_str());
    tracing::info!("Adding favorite");

    let movie = favorites::add_favorite(state.favorites.clone(), request).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

/// Handler for `DELETE /favorites/:imdb_id`
pub async fn remove(
    State(state): State<AppState>,
    Path(imdb_id): Path<String>,
) -> AppResult<StatusCode> {
    tracing::Span::current().record("imdb_id", imdb_id.as_str());
    tracing::info!("Removing favorite");

    favorites::remove_favorite(state.favorites.clone(), &imdb_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
