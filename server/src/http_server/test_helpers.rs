use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;

use crate::{state::AppConfig, AppState};

pub fn create_test_app(pool: PgPool) -> Router {
    let state = AppState {
        app: AppConfig { port: 0 },
        db: pool,
    };

    super::with_layers(super::make_router().with_state(state))
}

pub fn json_request(method: &str, uri: &str, body: &impl Serialize) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn response_body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

pub async fn response_body_text(response: Response<Body>) -> String {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body_bytes.to_vec()).unwrap()
}
