use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use tracing::debug;

use crate::auth::authorization_content;
use crate::db_model::users::Role;
use crate::errors::ApiError;
use crate::AppState;

/// The authenticated principal of a request, injected in the request
/// extensions by [`authenticate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i32,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Resolves an optional `Authorization: Bearer <access token>`. Revoked
/// tokens get a 401. Requests without the header continue anonymously; it's up to the handler's
/// extractors to require a caller.
pub async fn authenticate<B>(
    State(state): State<Arc<AppState>>,
    mut req: Request<B>,
    next: Next<B>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = authorization_content(req.headers(), "Bearer")? {
        let claims = state.authenticator.verify_access(token)?;
        debug!(user_id = claims.sub, role = ?claims.role, "Authenticated");
        req.extensions_mut().insert(Caller {
            user_id: claims.sub,
            role: claims.role,
        });
    }
    Ok(next.run(req).await)
}

/// Any authenticated user.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .copied()
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}

/// An authenticated admin. Other roles get a 403.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(caller) = AuthUser::from_request_parts(parts, state).await?;
        if !caller.is_admin() {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(caller))
    }
}

/// The caller when there is one.
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<Caller>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Caller>().copied()))
    }
}
