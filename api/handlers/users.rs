use std::sync::Arc;

use axum::extract::State;
use axum::{debug_handler, Json};

use crate::api_model::{UpdateUserRequest, User};
use crate::auth::hash_password;
use crate::auth_middleware::AdminUser;
use crate::errors::ApiError;
use crate::extractors::{ValidatedId, ValidatedJson};
use crate::user_store::UserChanges;
use crate::AppState;

fn not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("user {id}"))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn list(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn get(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedId(id): ValidatedId,
) -> Result<Json<User>, ApiError> {
    let user = state.users.get(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(user.into()))
}

// `request` is skipped, it may carry a password.
#[tracing::instrument(skip(state, request))]
#[debug_handler]
pub(crate) async fn update(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedId(id): ValidatedId,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let password = match request.password {
        | Some(ref plain) => Some(hash_password(plain)?),
        | None => None,
    };
    let changes = UserChanges {
        email: request.email,
        password,
        role: request.role,
    };
    let user = state
        .users
        .update(id, changes)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(user.into()))
}

#[tracing::instrument(skip(state))]
#[debug_handler]
pub(crate) async fn delete(
    state: State<Arc<AppState>>,
    AdminUser(_): AdminUser,
    ValidatedId(id): ValidatedId,
) -> Result<Json<i32>, ApiError> {
    if !state.users.delete(id).await? {
        return Err(not_found(id));
    }
    Ok(Json(id))
}
