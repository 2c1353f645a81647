//! # OpenAPI Document
//!
//! Auto-generated OpenAPI description served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::routes;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SICOSS API",
        description = "Procesamiento de declaraciones juradas SICOSS sobre el esquema Mapuche",
        version = env!("CARGO_PKG_VERSION"),
    ),
    paths(
        routes::process::process_sicoss,
        routes::config::get_config,
        routes::config::put_config,
    ),
    components(schemas(
        routes::process::ProcessRequest,
        routes::process::ProcessResponse,
        routes::process::ConfigTopes,
        routes::process::LegajoDto,
        routes::process::LegajoDetalles,
        routes::process::ResumenEjecutivo,
        routes::config::ConfigUpdateResponse,
        crate::error::ErrorBody,
    ))
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_includes_process_path() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/sicoss/process"));
        assert!(doc.paths.paths.contains_key("/sicoss/config"));
    }
}
