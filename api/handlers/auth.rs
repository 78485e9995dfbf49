use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{debug_handler, Json};
use tracing::info;

use crate::api_model::{
    AccessTokenResponse,
    BlockTokenRequest,
    LoginResponse,
    User,
};
use crate::auth::{authorization_content, parse_basic};
use crate::errors::ApiError;
use crate::extractors::ValidatedJson;
use crate::AppState;

#[tracing::instrument(skip_all)]
#[debug_handler]
pub(crate) async fn register(
    state: State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let creds = parse_basic(&headers)?;
    let user = state.authenticator.register(creds).await?;
    info!(user_id = user.id, "Registered a new user");
    Ok((StatusCode::CREATED, Json(User::from(user))))
}

#[tracing::instrument(skip_all)]
#[debug_handler]
pub(crate) async fn login(
    state: State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LoginResponse>, ApiError> {
    let creds = parse_basic(&headers)?;
    let pair = state.authenticator.login(&creds).await?;
    Ok(Json(pair.into()))
}

#[tracing::instrument(skip_all)]
#[debug_handler]
pub(crate) async fn rotate_access_token(
    state: State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let refresh_token = authorization_content(&headers, "Bearer")?
        .ok_or(ApiError::Unauthorized)?;
    let access_token = state.authenticator.rotate_access(refresh_token).await?;
    Ok(Json(AccessTokenResponse { access_token }))
}

#[tracing::instrument(skip_all)]
#[debug_handler]
pub(crate) async fn block_token(
    state: State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<BlockTokenRequest>,
) -> Result<StatusCode, ApiError> {
    let claims = state.authenticator.block(&request.token).await?;
    info!(user_id = claims.sub, token_type = ?claims.token_type, "Token blocked");
    Ok(StatusCode::NO_CONTENT)
}
