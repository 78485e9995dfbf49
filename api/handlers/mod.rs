mod auth;
mod directors;
mod genres;
mod movies;
mod users;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

// Routes behind the bearer token middleware. Whether a caller is required is
// decided per handler by its extractors.
pub(crate) fn routes(shared_state: Arc<AppState>) -> Router {
    Router::new()
        .nest(
            "/movie",
            Router::new()
                .route("/", get(movies::list).post(movies::create))
                .route("/recent", get(movies::recent))
                .route(
                    "/:id",
                    get(movies::get)
                        .patch(movies::update)
                        .delete(movies::delete),
                )
                .route("/:id/like", post(movies::like))
                .route("/:id/dislike", post(movies::dislike))
                .with_state(Arc::clone(&shared_state)),
        )
        .nest(
            "/director",
            Router::new()
                .route("/", get(directors::list).post(directors::create))
                .route(
                    "/:id",
                    get(directors::get)
                        .patch(directors::update)
                        .delete(directors::delete),
                )
                .with_state(Arc::clone(&shared_state)),
        )
        .nest(
            "/genre",
            Router::new()
                .route("/", get(genres::list).post(genres::create))
                .route(
                    "/:id",
                    get(genres::get)
                        .patch(genres::update)
                        .delete(genres::delete),
                )
                .with_state(Arc::clone(&shared_state)),
        )
        .nest(
            "/user",
            Router::new()
                .route("/", get(users::list))
                .route(
                    "/:id",
                    get(users::get).patch(users::update).delete(users::delete),
                )
                .with_state(Arc::clone(&shared_state)),
        )
}

// Login and token exchange carry their own credentials.
pub(crate) fn auth_routes(shared_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/token/access", post(auth::rotate_access_token))
        .route("/token/block", post(auth::block_token))
        .with_state(shared_state)
}
