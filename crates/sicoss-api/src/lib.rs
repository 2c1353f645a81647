//! # sicoss-api — Axum HTTP Facade
//!
//! Thin request → pipeline → JSON adapter over the SICOSS engine.
//!
//! ## API Surface
//!
//! | Route                 | Module              | Purpose                     |
//! |-----------------------|---------------------|-----------------------------|
//! | `POST /sicoss/process`| [`routes::process`] | run one fiscal period       |
//! | `GET/PUT /sicoss/config` | [`routes::config`] | runtime default caps     |
//! | `GET /health`         | here                | simple liveness             |
//! | `GET /health/liveness`| here                | process liveness probe      |
//! | `GET /health/readiness`| here               | DB-aware readiness probe    |
//! | `GET /openapi.json`   | [`openapi`]         | OpenAPI document            |

pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::process::router())
        .merge(routes::config::router())
        .merge(openapi::router())
        .route("/health", get(health))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health — the contract the web frontend polls.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Liveness probe — 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — pings the database when one is configured.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("verificación de base de datos falló: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "base de datos inaccesible")
                .into_response();
        }
    }
    (StatusCode::OK, "ready").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_returns_ok_status() {
        let app = app(AppState::new(None));
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_without_db_is_ready() {
        let app = app(AppState::new(None));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/health/readiness")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = app(AppState::new(None));
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
