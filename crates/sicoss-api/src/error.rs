//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps core errors to HTTP status codes with a JSON body carrying a
//! machine-readable code. Internal details are never exposed to clients.
//!
//! Status mapping: 400 malformed request (bad period, bad caps), 409
//! period already in flight, 422 data-shape and invariant failures, 503
//! database not configured, 500 everything else.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use sicoss_core::SicossError;
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "PERIODO_EN_PROCESO").
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Application-level error type for the SICOSS API.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed request: bad fiscal period, negative caps (400).
    #[error("solicitud inválida: {0}")]
    BadRequest(String),

    /// Semantically invalid content or failed data-shape contract (422).
    #[error("error de validación: {0}")]
    Validation(String),

    /// The period is already being processed (409).
    #[error("período {0} ya está en proceso")]
    PeriodoEnProceso(String),

    /// Database not configured (503).
    #[error("servicio no disponible: {0}")]
    ServiceUnavailable(String),

    /// Internal failure. Message is logged, not returned (500).
    #[error("error interno: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::PeriodoEnProceso(_) => (StatusCode::CONFLICT, "PERIODO_EN_PROCESO"),
            Self::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "Ocurrió un error interno".to_string(),
            otro => otro.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "error interno"),
            Self::ServiceUnavailable(_) => tracing::warn!(error = %self, "servicio no disponible"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<SicossError> for AppError {
    fn from(err: SicossError) -> Self {
        match &err {
            SicossError::InvalidConfig(_) => Self::BadRequest(err.to_string()),
            SicossError::InvariantViolation { .. } | SicossError::ConsolidationIncomplete(_) => {
                Self::Validation(err.to_string())
            }
            SicossError::ExtractionFailed(_) | SicossError::PersistenceFailed { .. } => {
                Self::Internal(err.to_string())
            }
            // La cancelación se responde como success=false en el handler;
            // si llega hasta acá, tratarla como interna.
            SicossError::Cancelled => Self::Internal(err.to_string()),
        }
    }
}
