//! # Runtime Configuration Endpoints
//!
//! `GET /sicoss/config` returns the runtime defaults used when a process
//! request carries no cap overrides; `PUT /sicoss/config` replaces them
//! after pre-flight validation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sicoss_core::SicossConfig;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConfigUpdateResponse {
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/sicoss/config", get(get_config).put(put_config))
}

/// GET /sicoss/config — current runtime defaults.
#[utoipa::path(
    get,
    path = "/sicoss/config",
    responses((status = 200, description = "Configuración vigente"))
)]
pub(crate) async fn get_config(State(state): State<AppState>) -> Json<SicossConfig> {
    Json(state.config())
}

/// PUT /sicoss/config — replace the runtime defaults.
#[utoipa::path(
    put,
    path = "/sicoss/config",
    responses(
        (status = 200, description = "Configuración actualizada", body = ConfigUpdateResponse),
        (status = 400, description = "Configuración inválida"),
    )
)]
pub(crate) async fn put_config(
    State(state): State<AppState>,
    body: Result<Json<SicossConfig>, JsonRejection>,
) -> Result<Json<ConfigUpdateResponse>, AppError> {
    let config = extract_json(body)?;
    config
        .validar()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    tracing::info!(
        tope_patronal = %config.tope_jubilatorio_patronal,
        tope_personal = %config.tope_jubilatorio_personal,
        trunca = config.trunca_tope,
        "configuración de topes actualizada"
    );
    state.set_config(config);

    Ok(Json(ConfigUpdateResponse {
        message: "Configuración actualizada exitosamente".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app() -> (Router, AppState) {
        let state = AppState::new(None);
        (super::router().with_state(state.clone()), state)
    }

    #[tokio::test]
    async fn get_returns_runtime_defaults() {
        let (app, _) = test_app();
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/sicoss/config")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let cfg: SicossConfig = serde_json::from_slice(&bytes).unwrap();
        assert!(cfg.trunca_tope);
    }

    #[tokio::test]
    async fn put_replaces_defaults() {
        let (app, state) = test_app();
        let mut cfg = state.config();
        cfg.trunca_tope = false;

        let resp = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/sicoss/config")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&cfg).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!state.config().trunca_tope);
    }

    #[tokio::test]
    async fn put_rejects_negative_caps() {
        let (app, state) = test_app();
        let mut cfg = state.config();
        cfg.tope_jubilatorio_personal = rust_decimal::Decimal::NEGATIVE_ONE;

        let resp = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/sicoss/config")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&cfg).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        // El estado no cambió.
        assert!(state.config().tope_jubilatorio_personal.is_sign_positive());
    }
}
