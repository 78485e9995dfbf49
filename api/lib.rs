mod api_model;
pub mod auth;
pub mod auth_middleware;
pub mod db_model;
pub mod director_store;
pub mod errors;
pub(crate) mod extractors;
pub mod genre_store;
mod handlers;
pub mod like_store;
mod logging;
pub mod movie_store;
pub(crate) mod paginated;
pub mod recent_cache;
pub mod token_blocklist;
pub mod user_store;

use std::sync::Arc;
use std::time::{Duration, Instant};

use auth::{Authenticator, TokenIssuer};
use axum::extract::MatchedPath;
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::Router;
use director_store::DirectorStore;
use genre_store::GenreStore;
use lib::netutils;
use lib::prelude::*;
use lib::Config;
use like_store::LikeStore;
use logging::{trace_request_response, ApiMakeSpan};
use metrics::{histogram, increment_counter};
use movie_store::{MovieStore, MovieWithRelations};
use recent_cache::RecentCache;
use tokio::select;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use user_store::UserStore;

pub struct AppState {
    pub _context: ServiceContext,
    pub config: Config,
    pub authenticator: Authenticator,
    pub users: UserStore,
    pub directors: DirectorStore,
    pub genres: GenreStore,
    pub movies: MovieStore,
    pub likes: LikeStore,
    pub recent_movies: RecentCache<Vec<MovieWithRelations>>,
}

impl AppState {
    pub fn new(context: ServiceContext, config: Config, db: Database) -> Self {
        let tokens = TokenIssuer::from_config(&config.api);
        let recent_ttl = Duration::from_secs(config.api.recent_movies_ttl_s);
        Self {
            _context: context,
            authenticator: Authenticator::new(UserStore::new(db.clone()), tokens),
            users: UserStore::new(db.clone()),
            directors: DirectorStore::new(db.clone()),
            genres: GenreStore::new(db.clone()),
            movies: MovieStore::new(db.clone()),
            likes: LikeStore::new(db),
            recent_movies: RecentCache::new(recent_ttl),
            config,
        }
    }
}

/// The full HTTP surface with its middleware stack.
pub fn build_router(shared_state: Arc<AppState>) -> Router {
    let service_name = shared_state._context.service_name().to_owned();
    let config = Arc::new(shared_state.config.clone());

    Router::new()
        .merge(handlers::routes(Arc::clone(&shared_state)))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&shared_state),
            auth_middleware::authenticate,
        ))
        .nest("/auth", handlers::auth_routes(Arc::clone(&shared_state)))
        .layer(middleware::from_fn(track_metrics))
        .layer(middleware::from_fn_with_state(config, trace_request_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(ApiMakeSpan::new(service_name)))
        .fallback(fallback)
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

#[tracing::instrument(skip_all, fields(service = context.service_name()))]
pub async fn start_api_server(
    mut context: ServiceContext,
) -> anyhow::Result<()> {
    let config = context.load_config()?;
    let addr = netutils::parse_addr(&config.api.address, config.api.port)?;

    let db = Database::connect(&config.api.database_uri).await?;
    db.migrate().await?;

    let shared_state = Arc::new(AppState::new(context.clone(), config, db));
    let app = build_router(shared_state);

    let mut context_clone = context.clone();
    info!("Starting '{}' on {:?}", context.service_name(), addr);
    let server = axum::Server::try_bind(&addr)?;

    let server = server
        .serve(app.into_make_service())
        .with_graceful_shutdown(context.recv_shutdown_signal());

    // Waiting for shutdown signal
    select! {
        _ = context_clone.recv_shutdown_signal() => {
            warn!("Received shutdown signal!");
        },
        res = server => {
            if let Err(e) = res {
                error!(
                    "Service '{}' failed and will trigger system shutdown: {e}",
                    context.service_name()
                );
                context.broadcast_shutdown();
            }
        }
    };
    Ok(())
}

async fn track_metrics<B>(req: Request<B>, next: Next<B>) -> impl IntoResponse {
    let start = Instant::now();
    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>()
    {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };
    let method = req.method().clone();

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", status),
    ];

    increment_counter!("cinema.api.http_requests_total", &labels);
    histogram!("cinema.api.http_requests_duration_seconds", latency, &labels);

    response
}
