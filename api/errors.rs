use std::error::Error;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use lib::prelude::*;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::genre_store::GenreStoreError;
use crate::like_store::LikeError;
use crate::movie_store::MovieStoreError;
use crate::recent_cache::FetchError;
use crate::user_store::UserStoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Service unavailable, please try again later")]
    ServiceUnavailable,
    #[error("Internal error")]
    Internal(String),
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),
    #[error(transparent)]
    JsonRejection(#[from] JsonRejection),
}

impl IntoResponse for ApiError {
    #[tracing::instrument]
    fn into_response(self) -> Response {
        match self {
            | ApiError::ValidationError(_) => {
                let message = format!("Input validation error: [{}]", self)
                    .replace('\n', ", ");
                (StatusCode::BAD_REQUEST, message)
            }
            // Json Rejections, we are expanding the match to expose the
            // underlying error better to our users. See https://docs.rs/axum/latest/axum/extract/index.html#accessing-inner-errors for details.
            | ApiError::JsonRejection(
                JsonRejection::MissingJsonContentType(e),
            ) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string()),
            | ApiError::JsonRejection(e) => serde_json_error_response(e),
            | ApiError::BadRequest(_) | ApiError::Conflict(_) => {
                let status = if matches!(self, ApiError::Conflict(_)) {
                    StatusCode::CONFLICT
                } else {
                    StatusCode::BAD_REQUEST
                };
                debug!(error = %self, "Client error");
                (status, self.to_string())
            }
            | ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            | ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            | ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            | ApiError::ServiceUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            | ApiError::Internal(ref e) => {
                error!(error = %e, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went terribly wrong here, please report a bug!"
                        .to_owned(),
                )
            }
        }
        .into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(value: DatabaseError) -> Self {
        error!("{}", value);
        ApiError::ServiceUnavailable
    }
}

impl From<PaginationError> for ApiError {
    fn from(value: PaginationError) -> Self {
        debug!(error = %value, "Rejected pagination request");
        ApiError::BadRequest(value.to_string())
    }
}

impl From<UserStoreError> for ApiError {
    fn from(value: UserStoreError) -> Self {
        match value {
            | UserStoreError::Database(e) => e.into(),
            | UserStoreError::DuplicateEmail(_) => {
                ApiError::Conflict(value.to_string())
            }
        }
    }
}

impl From<GenreStoreError> for ApiError {
    fn from(value: GenreStoreError) -> Self {
        match value {
            | GenreStoreError::Database(e) => e.into(),
            | GenreStoreError::DuplicateName(_) => {
                ApiError::Conflict(value.to_string())
            }
        }
    }
}

impl From<MovieStoreError> for ApiError {
    fn from(value: MovieStoreError) -> Self {
        match value {
            | MovieStoreError::Database(e) => e.into(),
            | MovieStoreError::Pagination(e) => e.into(),
            | MovieStoreError::MovieNotFound(_)
            | MovieStoreError::DirectorNotFound(_)
            | MovieStoreError::GenresNotFound { .. } => {
                ApiError::NotFound(value.to_string())
            }
            | MovieStoreError::DuplicateTitle(_) => {
                ApiError::Conflict(value.to_string())
            }
        }
    }
}

impl From<LikeError> for ApiError {
    fn from(value: LikeError) -> Self {
        match value {
            | LikeError::MovieNotFound(_) => ApiError::NotFound(value.to_string()),
            // The token was valid but the account is gone.
            | LikeError::UserNotFound(id) => {
                warn!(user_id = id, "Reaction from a user that doesn't exist");
                ApiError::Unauthorized
            }
            | LikeError::Conflict => {
                ApiError::Internal("reaction conflict persisted after retry".into())
            }
            | LikeError::Database(e) => e.into(),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(value: FetchError) -> Self {
        error!("{}", value);
        ApiError::ServiceUnavailable
    }
}

// attempt to extract the inner `serde_json::Error`, if that succeeds we can
// provide a more specific error
fn serde_json_error_response<E>(err: E) -> (StatusCode, String)
where
    E: Error + 'static,
{
    if let Some(serde_json_err) = find_error_source::<serde_json::Error>(&err) {
        (
            StatusCode::BAD_REQUEST,
            format!("JSON validation error: {}", serde_json_err),
        )
    } else {
        warn!("JSON error: {}", err);

        (StatusCode::BAD_REQUEST, "Unknown error".to_string())
    }
}

// attempt to downcast `err` into a `T` and if that fails recursively try and
// downcast `err`'s source
fn find_error_source<'a, T>(err: &'a (dyn Error + 'static)) -> Option<&'a T>
where
    T: Error + 'static,
{
    if let Some(err) = err.downcast_ref::<T>() {
        Some(err)
    } else if let Some(source) = err.source() {
        find_error_source(source)
    } else {
        None
    }
}
