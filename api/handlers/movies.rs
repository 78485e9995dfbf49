use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{debug_handler, Json};
use metrics::increment_counter;
use tracing::info;

use crate::api_model::{
    CreateMovieRequest,
    LikeResponse,
    Movie,
    MoviesFilter,
    UpdateMovieRequest,
};
use crate::auth_middleware::{AdminUser, AuthUser, Caller, MaybeUser};
use crate::db_model::movie_user_likes::Reaction;
use crate::errors::ApiError;
use crate::extractors::{ValidatedId, ValidatedJson, ValidatedQuery};
use crate::movie_store::MoviePage;
use crate::paginated::{Paginated, Pagination};
use crate::AppState;

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn list(
    state: State<Arc<AppState>>,
    MaybeUser(caller): MaybeUser,
    ValidatedQuery(pagination): ValidatedQuery<Pagination>,
    ValidatedQuery(filter): ValidatedQuery<MoviesFilter>,
) -> Result<Paginated<Movie>, ApiError> {
    let page = pagination.page_query(state.config.api.default_page_size)?;
    let MoviePage { page, count } =
        state.movies.list(filter.title.as_deref(), &page).await?;

    let mut movies: Paginated<Movie> = Paginated::from(page, count);
    if let Some(caller) = caller {
        let ids: Vec<i32> = movies.data.iter().map(|m| m.id).collect();
        let statuses = state.movies.like_statuses(caller.user_id, &ids).await?;
        for movie in &mut movies.data {
            movie.like_status = Some(statuses.get(&movie.id).copied());
        }
    }
    Ok(movies)
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn recent(
    state: State<Arc<AppState>>,
) -> Result<Json<Vec<Movie>>, ApiError> {
    let limit = state.config.api.recent_movies_limit;
    let movies = state
        .recent_movies
        .get_or_fetch(state.movies.recent(limit))
        .await?;
    Ok(Json(movies.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn get(
    state: State<Arc<AppState>>,
    ValidatedId(id): ValidatedId,
) -> Result<Json<Movie>, ApiError> {
    let movie = state
        .movies
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("movie {id}")))?;
    Ok(Json(movie.into()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn create(
    state: State<Arc<AppState>>,
    AdminUser(caller): AdminUser,
    ValidatedJson(request): ValidatedJson<CreateMovieRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state.movies.create(request.into(), caller.user_id).await?;
    state.recent_movies.invalidate().await;
    info!(movie_id = created.movie.id, "Movie created");
    Ok((StatusCode::CREATED, Json(Movie::from(created))))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn update(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedId(id): ValidatedId,
    ValidatedJson(request): ValidatedJson<UpdateMovieRequest>,
) -> Result<Json<Movie>, ApiError> {
    let updated = state.movies.update(id, request.into()).await?;
    state.recent_movies.invalidate().await;
    Ok(Json(updated.into()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn delete(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedId(id): ValidatedId,
) -> Result<Json<i32>, ApiError> {
    state.movies.delete(id).await?;
    state.recent_movies.invalidate().await;
    info!(movie_id = id, "Movie deleted");
    Ok(Json(id))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn like(
    state: State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    ValidatedId(id): ValidatedId,
) -> Result<Json<LikeResponse>, ApiError> {
    react(&state, caller, id, Reaction::Like).await
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn dislike(
    state: State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    ValidatedId(id): ValidatedId,
) -> Result<Json<LikeResponse>, ApiError> {
    react(&state, caller, id, Reaction::Dislike).await
}

async fn react(
    state: &AppState,
    caller: Caller,
    movie_id: i32,
    reaction: Reaction,
) -> Result<Json<LikeResponse>, ApiError> {
    let next = state.likes.toggle(movie_id, caller.user_id, reaction).await?;
    increment_counter!("cinema.likes.toggles_total", "reaction" => reaction.as_str());
    Ok(Json(next.into()))
}
