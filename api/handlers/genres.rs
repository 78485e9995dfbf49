use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{debug_handler, Json};

use crate::api_model::{Genre, GenreRequest};
use crate::auth_middleware::AdminUser;
use crate::errors::ApiError;
use crate::extractors::{ValidatedId, ValidatedJson};
use crate::AppState;

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn list(
    state: State<Arc<AppState>>,
) -> Result<Json<Vec<Genre>>, ApiError> {
    let genres = state.genres.list().await?;
    Ok(Json(genres.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn get(
    state: State<Arc<AppState>>,
    ValidatedId(id): ValidatedId,
) -> Result<Json<Genre>, ApiError> {
    let genre = state
        .genres
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("genre {id}")))?;
    Ok(Json(genre.into()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn create(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedJson(request): ValidatedJson<GenreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let genre = state.genres.create(request.name).await?;
    Ok((StatusCode::CREATED, Json(Genre::from(genre))))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn update(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedId(id): ValidatedId,
    ValidatedJson(request): ValidatedJson<GenreRequest>,
) -> Result<Json<Genre>, ApiError> {
    let genre = state
        .genres
        .rename(id, request.name)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("genre {id}")))?;
    Ok(Json(genre.into()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn delete(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedId(id): ValidatedId,
) -> Result<Json<i32>, ApiError> {
    if !state.genres.delete(id).await? {
        return Err(ApiError::NotFound(format!("genre {id}")));
    }
    // Movies may have lost a genre.
    state.recent_movies.invalidate().await;
    Ok(Json(id))
}
