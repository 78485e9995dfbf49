use std::sync::Arc;

use api::auth::{hash_password, TokenType};
use api::db_model::users::Role;
use api::movie_store::NewMovie;
use api::{build_router, AppState};
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use lib::database::Cursor;
use lib::prelude::*;
use lib::{ConfigLoader, Shutdown};
use serde_json::{json, Value};
use tower::ServiceExt;
use tracing::info;
use tracing_test::traced_test;

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    admin_token: String,
    director_id: i32,
    genre_ids: Vec<i32>,
}

impl TestApp {
    async fn new() -> anyhow::Result<Self> {
        let config_loader = Arc::new(ConfigLoader::from_path(&None));
        let context = ServiceContext::new(
            "api-test".to_owned(),
            config_loader.clone(),
            Shutdown::default(),
        );
        let db = Database::in_memory().await?;
        let state =
            Arc::new(AppState::new(context, config_loader.load()?, db));

        let admin = state
            .users
            .create("admin@cinema.dev".into(), hash_password("root")?, Role::Admin)
            .await?;
        let admin_token = state.authenticator.tokens().issue(
            admin.id,
            Role::Admin,
            TokenType::Access,
        )?;
        let dob = NaiveDate::from_ymd_opt(1937, 11, 30).unwrap();
        let director = state
            .directors
            .create("Ridley Scott".into(), dob, "UK".into())
            .await?;
        let genre_ids = vec![
            state.genres.create("sci-fi".into()).await?.id,
            state.genres.create("horror".into()).await?.id,
        ];

        Ok(Self {
            router: build_router(state.clone()),
            state,
            admin_token,
            director_id: director.id,
            genre_ids,
        })
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        auth: Option<String>,
        body: Option<Value>,
    ) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let req = match body {
            | Some(body) => {
                builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(serde_json::to_vec(&body)?))?
            }
            | None => builder.body(Body::empty())?,
        };

        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = hyper::body::to_bytes(resp.into_body()).await?;
        let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        });
        Ok((status, value))
    }

    async fn seed_movies(&self, n: usize) -> anyhow::Result<()> {
        let admin = self
            .state
            .users
            .find_by_email("admin@cinema.dev")
            .await?
            .unwrap();
        for i in 1..=n {
            self.state
                .movies
                .create(
                    NewMovie {
                        title: format!("Movie {i:02}"),
                        detail: format!("Detail {i}"),
                        director_id: self.director_id,
                        genre_ids: vec![self.genre_ids[0]],
                        movie_file_name: format!("movie-{i}.mp4"),
                    },
                    admin.id,
                )
                .await?;
        }
        Ok(())
    }

    async fn react(
        &self,
        token: &str,
        movie_id: i32,
        action: &str,
    ) -> anyhow::Result<(StatusCode, Value)> {
        self.request(
            Method::POST,
            &format!("/movie/{movie_id}/{action}"),
            bearer(token),
            None,
        )
        .await
    }

    /// Registers and logs in, returning the access token.
    async fn user_token(&self, email: &str) -> anyhow::Result<String> {
        let (status, _) = self
            .request(Method::POST, "/auth/register", Some(basic(email, "pw")), None)
            .await?;
        assert_eq!(StatusCode::CREATED, status);
        let (status, body) = self
            .request(Method::POST, "/auth/login", Some(basic(email, "pw")), None)
            .await?;
        assert_eq!(StatusCode::OK, status);
        Ok(body["accessToken"].as_str().unwrap().to_owned())
    }
}

fn basic(email: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{email}:{password}")))
}

fn bearer(token: &str) -> Option<String> {
    Some(format!("Bearer {token}"))
}

fn ids(page: &Value) -> Vec<i64> {
    page["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn auth_flow() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let creds = Some(basic("neo@example.com", "redpill"));

    let (status, user) = app
        .request(Method::POST, "/auth/register", creds.clone(), None)
        .await?;
    assert_eq!(StatusCode::CREATED, status);
    assert_eq!(json!("user"), user["role"]);
    assert!(user.get("password").is_none());

    let (status, _) = app
        .request(Method::POST, "/auth/register", creds.clone(), None)
        .await?;
    assert_eq!(StatusCode::BAD_REQUEST, status);

    let (status, tokens) = app
        .request(Method::POST, "/auth/login", creds, None)
        .await?;
    assert_eq!(StatusCode::OK, status);
    let refresh = tokens["refreshToken"].as_str().unwrap();
    let access = tokens["accessToken"].as_str().unwrap();

    let (status, rotated) = app
        .request(Method::POST, "/auth/token/access", bearer(refresh), None)
        .await?;
    assert_eq!(StatusCode::OK, status);
    assert!(rotated["accessToken"].is_string());

    // An access token can't be exchanged.
    let (status, _) = app
        .request(Method::POST, "/auth/token/access", bearer(access), None)
        .await?;
    assert_eq!(StatusCode::UNAUTHORIZED, status);

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/login",
            Some(basic("neo@example.com", "bluepill")),
            None,
        )
        .await?;
    assert_eq!(StatusCode::UNAUTHORIZED, status);

    // Bearer tokens on the catalog must be valid access tokens.
    let (status, _) = app
        .request(Method::GET, "/movie", bearer(refresh), None)
        .await?;
    assert_eq!(StatusCode::UNAUTHORIZED, status);
    let (status, _) = app
        .request(Method::GET, "/movie", Some("Token abc".into()), None)
        .await?;
    assert_eq!(StatusCode::BAD_REQUEST, status);
    Ok(())
}

#[traced_test]
#[tokio::test]
async fn movie_lifecycle() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    info!("Initialising test...");
    let admin = bearer(&app.admin_token);
    let new_movie = json!({
        "title": "Alien",
        "detail": "In space no one can hear you scream",
        "directorId": app.director_id,
        "genreIds": app.genre_ids,
        "movieFileName": "alien.mp4",
    });

    let (status, _) = app
        .request(Method::POST, "/movie", None, Some(new_movie.clone()))
        .await?;
    assert_eq!(StatusCode::UNAUTHORIZED, status);
    let user = app.user_token("ripley@nostromo.space").await?;
    let (status, _) = app
        .request(Method::POST, "/movie", bearer(&user), Some(new_movie.clone()))
        .await?;
    assert_eq!(StatusCode::FORBIDDEN, status);

    let (status, movie) = app
        .request(Method::POST, "/movie", admin.clone(), Some(new_movie.clone()))
        .await?;
    assert_eq!(StatusCode::CREATED, status);
    assert!(logs_contain("Movie created"));
    let id = movie["id"].as_i64().unwrap();
    assert_eq!(json!("public/movie/alien.mp4"), movie["movieFilePath"]);
    assert_eq!(json!("Ridley Scott"), movie["director"]["name"]);
    assert_eq!(2, movie["genres"].as_array().unwrap().len());

    let (status, _) = app
        .request(Method::POST, "/movie", admin.clone(), Some(new_movie.clone()))
        .await?;
    assert_eq!(StatusCode::CONFLICT, status);

    let mut missing_genre = new_movie.clone();
    missing_genre["title"] = json!("Aliens");
    missing_genre["genreIds"] = json!([app.genre_ids[0], 999]);
    let (status, _) = app
        .request(Method::POST, "/movie", admin.clone(), Some(missing_genre))
        .await?;
    assert_eq!(StatusCode::NOT_FOUND, status);

    let (status, _) = app
        .request(Method::GET, "/movie/abc", None, None)
        .await?;
    assert_eq!(StatusCode::BAD_REQUEST, status);
    let (status, _) = app
        .request(Method::GET, "/movie/4242", None, None)
        .await?;
    assert_eq!(StatusCode::NOT_FOUND, status);

    let (status, patched) = app
        .request(
            Method::PATCH,
            &format!("/movie/{id}"),
            admin.clone(),
            Some(json!({"title": "Alien (1979)", "genreIds": [app.genre_ids[1]]})),
        )
        .await?;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(json!("Alien (1979)"), patched["title"]);
    assert_eq!(json!("horror"), patched["genres"][0]["name"]);
    assert_eq!(1, patched["genres"].as_array().unwrap().len());

    let (status, recent) = app
        .request(Method::GET, "/movie/recent", None, None)
        .await?;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(json!("Alien (1979)"), recent[0]["title"]);

    let (status, deleted) = app
        .request(Method::DELETE, &format!("/movie/{id}"), admin.clone(), None)
        .await?;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(json!(id), deleted);
    let (_, recent) = app
        .request(Method::GET, "/movie/recent", None, None)
        .await?;
    assert_eq!(json!([]), recent);
    Ok(())
}

#[tokio::test]
async fn cursor_pagination_over_http() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.seed_movies(15).await?;

    let (status, page) = app
        .request(Method::GET, "/movie?order=id_DESC&take=5", None, None)
        .await?;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(vec![15, 14, 13, 12, 11], ids(&page));
    assert_eq!(json!(15), page["count"]);

    let cursor = page["nextCursor"].as_str().unwrap().to_owned();
    let decoded = Cursor::decode(&cursor)?;
    assert_eq!(json!({"id": 11}), Value::Object(decoded.values));
    assert_eq!(vec!["id_DESC".to_owned()], decoded.order);

    // The cursor's order wins over the one sent along.
    let (_, page) = app
        .request(
            Method::GET,
            &format!("/movie?cursor={}&order=id_ASC&take=5", urlencode(&cursor)),
            None,
            None,
        )
        .await?;
    assert_eq!(vec![10, 9, 8, 7, 6], ids(&page));

    let (_, page) = app
        .request(Method::GET, "/movie?order=id_ASC&take=20", None, None)
        .await?;
    assert_eq!(15, ids(&page).len());
    assert_eq!(Value::Null, page["nextCursor"]);

    let (_, page) = app
        .request(Method::GET, "/movie?title=ovie%2001", None, None)
        .await?;
    assert_eq!(vec![1], ids(&page));
    assert_eq!(json!(1), page["count"]);

    for bad in [
        "/movie?order=id_asc",
        "/movie?order=budget_DESC",
        "/movie?cursor=not-a-cursor",
        "/movie?take=0",
        "/movie?title=ab",
    ] {
        let (status, _) = app.request(Method::GET, bad, None, None).await?;
        assert_eq!(StatusCode::BAD_REQUEST, status, "{bad}");
    }
    Ok(())
}

#[tokio::test]
async fn blocked_token_is_rejected() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.seed_movies(2).await?;
    let user = app.user_token("trinity@example.com").await?;
    assert_eq!(StatusCode::OK, app.react(&user, 2, "like").await?.0);

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/token/block",
            None,
            Some(json!({"token": user})),
        )
        .await?;
    assert_eq!(StatusCode::NO_CONTENT, status);

    assert_eq!(StatusCode::UNAUTHORIZED, app.react(&user, 2, "like").await?.0);
    // Other tokens are unaffected.
    assert_eq!(StatusCode::OK, app.react(&app.admin_token, 2, "like").await?.0);

    let (status, _) = app
        .request(
            Method::POST,
            "/auth/token/block",
            None,
            Some(json!({"token": "not-a-token"})),
        )
        .await?;
    assert_eq!(StatusCode::UNAUTHORIZED, status);
    Ok(())
}

#[tokio::test]
async fn like_toggle_over_http() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.seed_movies(8).await?;
    let user = app.user_token("critic@example.com").await?;

    let (status, _) = app
        .request(Method::POST, "/movie/7/like", None, None)
        .await?;
    assert_eq!(StatusCode::UNAUTHORIZED, status);

    assert_eq!((StatusCode::OK, json!({"isLike": true})), app.react(&user, 7, "like").await?);
    assert_eq!(
        (StatusCode::OK, json!({"isLike": false})),
        app.react(&user, 7, "dislike").await?
    );
    assert_eq!(
        (StatusCode::OK, json!({"isLike": null})),
        app.react(&user, 7, "dislike").await?
    );
    assert_eq!((StatusCode::OK, json!({"isLike": true})), app.react(&user, 7, "like").await?);

    let (_, page) = app
        .request(Method::GET, "/movie?order=likeCount_DESC&order=id_ASC&take=2", bearer(&user), None)
        .await?;
    assert_eq!(vec![7, 1], ids(&page));
    assert_eq!(json!(true), page["data"][0]["likeStatus"]);
    assert_eq!(json!(1), page["data"][0]["likeCount"]);
    assert_eq!(Value::Null, page["data"][1]["likeStatus"]);
    assert!(page["data"][1].get("likeStatus").is_some());

    let (_, page) = app.request(Method::GET, "/movie", None, None).await?;
    assert!(page["data"][0].get("likeStatus").is_none());

    let (status, _) = app.react(&user, 99, "like").await?;
    assert_eq!(StatusCode::NOT_FOUND, status);
    Ok(())
}

#[tokio::test]
async fn directors_genres_and_users() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let admin = bearer(&app.admin_token);
    app.seed_movies(1).await?;

    let (status, director) = app
        .request(
            Method::POST,
            "/director",
            admin.clone(),
            Some(json!({"name": "Denis Villeneuve", "dob": "1967-10-03", "nationality": "CA"})),
        )
        .await?;
    assert_eq!(StatusCode::CREATED, status);
    assert_eq!(json!("1967-10-03"), director["dob"]);
    let id = director["id"].as_i64().unwrap();
    let (status, _) = app
        .request(Method::DELETE, &format!("/director/{id}"), admin.clone(), None)
        .await?;
    assert_eq!(StatusCode::OK, status);

    // Still referenced by the seeded movie.
    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/director/{}", app.director_id),
            admin.clone(),
            None,
        )
        .await?;
    assert_eq!(StatusCode::CONFLICT, status);

    let (status, _) = app
        .request(Method::POST, "/genre", admin.clone(), Some(json!({"name": "sci-fi"})))
        .await?;
    assert_eq!(StatusCode::CONFLICT, status);
    let (status, genres) = app.request(Method::GET, "/genre", None, None).await?;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(2, genres.as_array().unwrap().len());

    let user = app.user_token("viewer@example.com").await?;
    let (status, _) = app
        .request(Method::GET, "/user", bearer(&user), None)
        .await?;
    assert_eq!(StatusCode::FORBIDDEN, status);
    let (status, users) = app.request(Method::GET, "/user", admin.clone(), None).await?;
    assert_eq!(StatusCode::OK, status);
    let viewer = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == json!("viewer@example.com"))
        .unwrap()
        .clone();
    let viewer_id = viewer["id"].as_i64().unwrap();

    let (status, updated) = app
        .request(
            Method::PATCH,
            &format!("/user/{viewer_id}"),
            admin.clone(),
            Some(json!({"role": "paidUser"})),
        )
        .await?;
    assert_eq!(StatusCode::OK, status);
    assert_eq!(json!("paidUser"), updated["role"]);

    let (status, _) = app
        .request(Method::DELETE, &format!("/user/{viewer_id}"), admin, None)
        .await?;
    assert_eq!(StatusCode::OK, status);

    // The token still verifies but the account is gone.
    let (status, _) = app
        .request(Method::POST, "/movie/1/like", bearer(&user), None)
        .await?;
    assert_eq!(StatusCode::UNAUTHORIZED, status);
    Ok(())
}

#[tokio::test]
async fn unknown_route() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let (status, _) = app.request(Method::GET, "/nope", None, None).await?;
    assert_eq!(StatusCode::NOT_FOUND, status);
    Ok(())
}

// Cursors are standard base64, `+`, `/` and `=` need escaping in a query.
fn urlencode(raw: &str) -> String {
    raw.replace('+', "%2B").replace('/', "%2F").replace('=', "%3D")
}
