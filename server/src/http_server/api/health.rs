use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HealthResponse {
    pub status: String,
    pub message: String,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match db::ping(state.db()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
                message: "Database connection is healthy".to_string(),
            }),
        ),
        Err(error) => {
            tracing::warn!(?error, "Health check failed");

            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "error".to_string(),
                    message: "Database connection lost".to_string(),
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use sqlx::PgPool;
    use tower::ServiceExt;

    use super::*;
    use crate::http_server::test_helpers::{create_test_app, response_body_json};

    #[sqlx::test(migrations = "../db/migrations")]
    async fn healthy_when_database_answers(pool: PgPool) {
        let app = create_test_app(pool);

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: HealthResponse = response_body_json(response).await;
        assert_eq!(body.status, "ok");
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn unavailable_when_pool_is_closed(pool: PgPool) {
        pool.close().await;
        let app = create_test_app(pool);

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: HealthResponse = response_body_json(response).await;
        assert_eq!(body.status, "error");
    }
}
