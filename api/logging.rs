use std::borrow::Cow;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hyper::header::USER_AGENT;
use lib::Config;
use serde_json::Value;
use tower_http::trace::MakeSpan;
use tracing::{error_span, info};

// JSON fields whose values never reach the logs.
const SECRET_FIELDS: &[&str] =
    &["password", "token", "accessToken", "refreshToken"];

#[derive(Clone, Debug)]
pub struct ApiMakeSpan {
    service_name: String,
}

impl ApiMakeSpan {
    pub fn new(service_name: String) -> Self {
        Self { service_name }
    }
}

impl<B> MakeSpan<B> for ApiMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        let uri = request.uri();
        error_span!(
            target: "request_response_tracing_metadata",
            "http_request",
            service = %self.service_name,
            method = %request.method(),
            path = uri.path(),
            query = uri.query(),
            version = ?request.version(),
            user_agent = ?request.headers().get(USER_AGENT),
        )
    }
}

#[derive(Debug, Clone, Copy)]
enum Leg {
    Request,
    Response(StatusCode),
}

/// Logs request and response bodies when enabled in the config, inside the
/// request span. Secret fields are masked.
pub async fn trace_request_response(
    State(config): State<Arc<Config>>,
    request: Request<Body>,
    next: Next<Body>,
) -> Result<impl IntoResponse, Response> {
    let config = &config.api;

    let request = if config.log_request_body {
        let (parts, body) = request.into_parts();
        let bytes = capture(body, Leg::Request).await?;
        Request::from_parts(parts, Body::from(bytes))
    } else {
        request
    };

    let response = next.run(request).await;
    if !config.log_response_body {
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = capture(body, Leg::Response(parts.status)).await?;
    Ok(Response::from_parts(parts, axum::body::boxed(Body::from(bytes))))
}

async fn capture<B>(body: B, leg: Leg) -> Result<Bytes, Response>
where
    B: axum::body::HttpBody,
    B::Error: std::fmt::Display,
{
    let bytes = hyper::body::to_bytes(body).await.map_err(|err| {
        (StatusCode::BAD_REQUEST, err.to_string()).into_response()
    })?;
    if bytes.is_empty() {
        return Ok(bytes);
    }

    let body = masked(&bytes);
    match leg {
        | Leg::Request => {
            info!(target: "request_response_tracing", %body, "Got request");
        }
        | Leg::Response(status) => {
            info!(
                target: "request_response_tracing",
                %body,
                status = status.as_u16(),
                "Sent response"
            );
        }
    }
    Ok(bytes)
}

// JSON bodies keep their shape with secret values replaced. Anything else is
// logged as is unless it mentions a secret field at all.
fn masked(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(mut json) = serde_json::from_slice::<Value>(bytes) {
        mask_value(&mut json);
        return Cow::Owned(json.to_string());
    }
    let text = String::from_utf8_lossy(bytes);
    let lower = text.to_lowercase();
    if SECRET_FIELDS
        .iter()
        .any(|f| lower.contains(&f.to_lowercase()))
    {
        Cow::Borrowed("REDACTED")
    } else {
        text
    }
}

fn mask_value(value: &mut Value) {
    match value {
        | Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if SECRET_FIELDS.contains(&key.as_str()) {
                    *field = Value::String("REDACTED".to_owned());
                } else {
                    mask_value(field);
                }
            }
        }
        | Value::Array(items) => items.iter_mut().for_each(mask_value),
        | _ => {}
    }
}
