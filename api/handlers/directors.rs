use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{debug_handler, Json};

use crate::api_model::{
    CreateDirectorRequest,
    Director,
    UpdateDirectorRequest,
};
use crate::auth_middleware::AdminUser;
use crate::errors::ApiError;
use crate::extractors::{ValidatedId, ValidatedJson};
use crate::AppState;

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("director {id}"))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn list(
    state: State<Arc<AppState>>,
) -> Result<Json<Vec<Director>>, ApiError> {
    let directors = state.directors.list().await?;
    Ok(Json(directors.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn get(
    state: State<Arc<AppState>>,
    ValidatedId(id): ValidatedId,
) -> Result<Json<Director>, ApiError> {
    let director = state.directors.get(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(director.into()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn create(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedJson(request): ValidatedJson<CreateDirectorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let director = state
        .directors
        .create(request.name, request.dob, request.nationality)
        .await?;
    Ok((StatusCode::CREATED, Json(Director::from(director))))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn update(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedId(id): ValidatedId,
    ValidatedJson(request): ValidatedJson<UpdateDirectorRequest>,
) -> Result<Json<Director>, ApiError> {
    let director = state
        .directors
        .update(id, request.into())
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(director.into()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn delete(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedId(id): ValidatedId,
) -> Result<Json<i32>, ApiError> {
    let movies = state.directors.movie_count(id).await?;
    if movies > 0 {
        return Err(ApiError::Conflict(format!(
            "director {id} still has {movies} movie(s)"
        )));
    }
    if !state.directors.delete(id).await? {
        return Err(not_found(id));
    }
    Ok(Json(id))
}
