use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
}

/// Everything `/echo` saw of the request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Deserialize)]
pub struct SlowParams {
    #[serde(default)]
    pub ms: u64,
}

pub fn app() -> Router {
    Router::new()
        .route("/users/{id}", get(get_user))
        .route("/echo", any(echo))
        .route("/text", get(text))
        .route("/bytes", get(binary))
        .route("/empty", get(empty))
        .route("/redirect", get(redirect))
        .route("/moved", get(moved))
        .route("/submit", any(see_other))
        .route("/temporary", any(temporary))
        .route("/loop", get(redirect_loop))
        .route("/bad-request", get(bad_request))
        .route("/error", get(server_error))
        .route("/slow", get(slow))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

fn known_users() -> Vec<User> {
    vec![
        User {
            id: 1,
            name: "Ada".to_string(),
        },
        User {
            id: 2,
            name: "Grace".to_string(),
        },
    ]
}

async fn get_user(Path(id): Path<u64>) -> Result<Json<User>, (StatusCode, Json<Value>)> {
    known_users()
        .into_iter()
        .find(|user| user.id == id)
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(json!({"error": format!("user {id} not found")}))))
}

async fn echo(
    method: Method,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
    body: Bytes,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| (name.to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
        .collect();
    let body = if body.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned())))
    };
    Json(Echo {
        method: method.to_string(),
        headers,
        query,
        body,
    })
}

async fn text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "plain text body")
}

async fn binary() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/octet-stream")], vec![0u8, 1, 2, 253, 254, 255])
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn redirect() -> impl IntoResponse {
    (StatusCode::MULTIPLE_CHOICES, Json(json!({"location": "/users/1"})))
}

async fn moved() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/users/2")])
}

async fn see_other() -> impl IntoResponse {
    (StatusCode::SEE_OTHER, [(header::LOCATION, "/echo")])
}

async fn temporary() -> impl IntoResponse {
    (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, "/echo")])
}

async fn redirect_loop() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, "/loop")])
}

async fn bad_request() -> impl IntoResponse {
    (StatusCode::BAD_REQUEST, "missing field `name`")
}

async fn server_error() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [("x-error-id", "e-42")],
        Json(json!({"error": "database unavailable"})),
    )
}

async fn slow(Query(params): Query<SlowParams>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(params.ms)).await;
    Json(json!({"slept_ms": params.ms}))
}
