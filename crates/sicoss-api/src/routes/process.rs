//! # Processing Endpoint
//!
//! `POST /sicoss/process` — parses a `ProcessRequest`, drives the pipeline
//! for the requested fiscal period, optionally persists the result, and
//! shapes the response in one of three formats:
//!
//! - `completo`   — every record with its detail block
//! - `resumen`    — first 100 records, no detail blocks
//! - `solo_totales` — totals and executive summary only
//!
//! A period can only be processed by one request at a time; concurrent
//! requests for the same period get `409 Conflict`.

use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sicoss_core::{CancelToken, PeriodoFiscal, SicossConfig, SicossError};
use sicoss_engine::{Estadisticas, ProcesadorSicoss, ResultadoProcesamiento, Totales};
use sicoss_db::ResultadoGuardado;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

pub const API_VERSION: &str = "v1";
pub const BACKEND: &str = "sicoss_rust";

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

/// Requested response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FormatoRespuesta {
    #[default]
    Completo,
    Resumen,
    SoloTotales,
}

/// Cap overrides carried by the request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ConfigTopes {
    #[schema(value_type = String)]
    pub tope_jubilatorio_patronal: Decimal,
    #[schema(value_type = String)]
    pub tope_jubilatorio_personal: Decimal,
    #[schema(value_type = String)]
    pub tope_otros_aportes_personales: Decimal,
    pub trunca_tope: bool,
}

/// Request to process one fiscal period.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProcessRequest {
    /// Fiscal period in `YYYYMM` form.
    pub periodo_fiscal: String,
    /// Restrict the run to one employee.
    pub nro_legajo: Option<i64>,
    #[serde(default)]
    pub formato_respuesta: FormatoRespuesta,
    #[serde(default)]
    pub guardar_en_bd: bool,
    /// Cap overrides; absent fields fall back to the runtime defaults.
    pub config_topes: Option<ConfigTopes>,
}

impl Validate for ProcessRequest {
    fn validate(&self) -> Result<(), String> {
        if self.periodo_fiscal.trim().is_empty() {
            return Err("periodo_fiscal no puede estar vacío".to_string());
        }
        if let Some(nro) = self.nro_legajo {
            if nro <= 0 {
                return Err("nro_legajo debe ser positivo".to_string());
            }
        }
        if let Some(topes) = &self.config_topes {
            for (nombre, valor) in [
                ("tope_jubilatorio_patronal", topes.tope_jubilatorio_patronal),
                ("tope_jubilatorio_personal", topes.tope_jubilatorio_personal),
                (
                    "tope_otros_aportes_personales",
                    topes.tope_otros_aportes_personales,
                ),
            ] {
                if valor.is_sign_negative() {
                    return Err(format!("{nombre} no puede ser negativo"));
                }
            }
        }
        Ok(())
    }
}

/// One employee in the response record set.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LegajoDto {
    pub nro_legaj: i64,
    pub cuil: String,
    pub apnom: String,
    #[schema(value_type = String)]
    pub bruto: Decimal,
    #[schema(value_type = String)]
    pub imponible: Decimal,
    #[schema(value_type = String)]
    pub sac: Decimal,
    pub cod_situacion: i32,
    pub cod_actividad: i32,
    pub valido: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detalles: Option<LegajoDetalles>,
}

/// Detail block included in the `completo` format.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LegajoDetalles {
    #[schema(value_type = String)]
    pub no_remun: Decimal,
    #[schema(value_type = String)]
    pub imponible_patronal: Decimal,
    #[schema(value_type = String)]
    pub remuner_78805: Decimal,
    #[schema(value_type = String)]
    pub imponible_4: Decimal,
    #[schema(value_type = String)]
    pub imponible_5: Decimal,
    #[schema(value_type = String)]
    pub imponible_6: Decimal,
    #[schema(value_type = String)]
    pub imponible_9: Decimal,
    #[schema(value_type = String)]
    pub asignaciones_familiares: Decimal,
    pub tipo_de_operacion: i16,
    pub categoria_diferencial: bool,
}

/// Executive summary for the frontend dashboard.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResumenEjecutivo {
    pub estado: String,
    pub total_procesado: u64,
    pub porcentaje_exito: f64,
    pub tiempo_ms: f64,
    #[schema(value_type = String)]
    pub bruto_total: Decimal,
    #[schema(value_type = String)]
    pub imponible_principal: Decimal,
    #[schema(value_type = String)]
    pub sac_total: Decimal,
    #[schema(value_type = String)]
    pub promedio_bruto: Decimal,
    pub alertas: Vec<String>,
}

/// `data` block of the response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legajos: Option<Vec<LegajoDto>>,
    #[schema(value_type = Object)]
    pub estadisticas: Estadisticas,
    pub resumen: ResumenEjecutivo,
    #[schema(value_type = Object)]
    pub totales: Totales,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub guardado_bd: Option<ResultadoGuardado>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseMetadata {
    pub backend: String,
    pub api_version: String,
    pub processing_time_ms: f64,
}

/// Response envelope of `POST /sicoss/process`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessResponse {
    pub success: bool,
    pub message: String,
    pub data: ProcessData,
    pub metadata: ResponseMetadata,
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new().route("/sicoss/process", post(process_sicoss))
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// POST /sicoss/process — run the pipeline for one fiscal period.
#[utoipa::path(
    post,
    path = "/sicoss/process",
    request_body = ProcessRequest,
    responses(
        (status = 200, description = "Procesamiento completado", body = ProcessResponse),
        (status = 400, description = "Solicitud inválida"),
        (status = 409, description = "Período ya en proceso"),
        (status = 422, description = "Contenido inválido"),
        (status = 503, description = "Base de datos no configurada"),
    )
)]
pub(crate) async fn process_sicoss(
    State(state): State<AppState>,
    body: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, AppError> {
    let inicio = Instant::now();
    let req = extract_validated_json(body)?;

    let periodo: PeriodoFiscal = req
        .periodo_fiscal
        .parse()
        .map_err(|e: SicossError| AppError::BadRequest(e.to_string()))?;

    let config = configurar(state.config(), req.config_topes.as_ref());
    let procesador =
        ProcesadorSicoss::nuevo(config).map_err(|e| AppError::BadRequest(e.to_string()))?;

    // Serialización por período: una sola corrida en vuelo.
    let _en_curso = state
        .comenzar_periodo(periodo)
        .ok_or_else(|| AppError::PeriodoEnProceso(periodo.to_string()))?;

    let pool = state.db_pool.as_ref().ok_or_else(|| {
        AppError::ServiceUnavailable("base de datos no configurada".to_string())
    })?;

    let cancel = CancelToken::new();
    let datos = sicoss_db::extraer_datos(pool, periodo, req.nro_legajo, &cancel).await?;

    if datos.is_empty() {
        return Ok(Json(respuesta_vacia(periodo, inicio)));
    }

    // Etapas de CPU fuera del executor de tokio.
    let resultado = {
        let procesador = procesador.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || procesador.procesar(periodo, datos, &cancel))
            .await
            .map_err(|e| AppError::Internal(format!("tarea de procesamiento: {e}")))?
    };

    let resultado = match resultado {
        Ok(r) => r,
        Err(SicossError::Cancelled) => {
            return Ok(Json(respuesta_cancelada(periodo, inicio)));
        }
        Err(e) => return Err(e.into()),
    };

    let guardado = if req.guardar_en_bd {
        Some(sicoss_db::guardar_en_bd(pool, periodo, &resultado.legajos, true, &cancel).await?)
    } else {
        None
    };

    Ok(Json(formar_respuesta(
        &resultado,
        req.formato_respuesta,
        guardado,
        inicio.elapsed().as_secs_f64() * 1000.0,
    )))
}

/// Merge request-level cap overrides onto the runtime defaults.
fn configurar(mut config: SicossConfig, topes: Option<&ConfigTopes>) -> SicossConfig {
    if let Some(t) = topes {
        config.tope_jubilatorio_patronal = t.tope_jubilatorio_patronal;
        config.tope_jubilatorio_personal = t.tope_jubilatorio_personal;
        config.tope_otros_aportes_personales = t.tope_otros_aportes_personales;
        config.trunca_tope = t.trunca_tope;
    }
    config
}

// ---------------------------------------------------------------------------
// Response shaping
// ---------------------------------------------------------------------------

/// Records included in the `resumen` format.
const LIMITE_RESUMEN: usize = 100;

fn formar_respuesta(
    resultado: &ResultadoProcesamiento,
    formato: FormatoRespuesta,
    guardado_bd: Option<ResultadoGuardado>,
    processing_time_ms: f64,
) -> ProcessResponse {
    let legajos = match formato {
        FormatoRespuesta::SoloTotales => None,
        FormatoRespuesta::Resumen => Some(
            resultado
                .legajos
                .iter()
                .take(LIMITE_RESUMEN)
                .map(|r| legajo_dto(r, false))
                .collect(),
        ),
        FormatoRespuesta::Completo => Some(
            resultado
                .legajos
                .iter()
                .map(|r| legajo_dto(r, true))
                .collect(),
        ),
    };

    ProcessResponse {
        success: true,
        message: format!(
            "Procesamiento SICOSS exitoso: {} legajos",
            resultado.estadisticas.legajos_validos
        ),
        data: ProcessData {
            legajos,
            estadisticas: resultado.estadisticas.clone(),
            resumen: resumen_ejecutivo(resultado),
            totales: resultado.totales.clone(),
            guardado_bd,
        },
        metadata: ResponseMetadata {
            backend: BACKEND.to_string(),
            api_version: API_VERSION.to_string(),
            processing_time_ms,
        },
        timestamp: Utc::now().to_rfc3339(),
    }
}

fn legajo_dto(r: &sicoss_core::SicossRecord, con_detalles: bool) -> LegajoDto {
    LegajoDto {
        nro_legaj: r.nro_legaj,
        cuil: r.cuil.clone(),
        apnom: r.apnom.clone(),
        bruto: r.rem_total,
        imponible: r.rem_impo1,
        sac: r.sac,
        cod_situacion: r.cod_situacion,
        cod_actividad: r.cod_act,
        valido: r.valid,
        detalles: con_detalles.then(|| LegajoDetalles {
            no_remun: r.no_remun,
            imponible_patronal: r.rem_impo2,
            remuner_78805: r.rem_impo8,
            imponible_4: r.rem_impo4,
            imponible_5: r.rem_impo5,
            imponible_6: r.rem_impo6,
            imponible_9: r.rem_impo9,
            asignaciones_familiares: r.asig_fam_pag,
            tipo_de_operacion: r.tipo_de_operacion,
            categoria_diferencial: r.categoria_diferencial,
        }),
    }
}

fn resumen_ejecutivo(resultado: &ResultadoProcesamiento) -> ResumenEjecutivo {
    let e = &resultado.estadisticas;
    let t = &resultado.totales;

    let mut alertas = Vec::new();
    if e.legajos_rechazados > 0 {
        alertas.push(format!("{} legajos rechazados", e.legajos_rechazados));
    }
    if resultado.metricas.tiempo_total_ms > 5000.0 {
        alertas.push(format!(
            "procesamiento lento: {:.0} ms",
            resultado.metricas.tiempo_total_ms
        ));
    }

    let divisor = Decimal::from(e.legajos_validos.max(1));
    ResumenEjecutivo {
        estado: if e.legajos_rechazados == 0 {
            "exitoso".to_string()
        } else {
            "con_observaciones".to_string()
        },
        total_procesado: e.legajos_validos,
        porcentaje_exito: e.porcentaje_aprobacion,
        tiempo_ms: resultado.metricas.tiempo_total_ms,
        bruto_total: t.bruto,
        imponible_principal: t.imponible_1,
        sac_total: t.sac,
        promedio_bruto: (t.bruto / divisor).round_dp(2),
        alertas,
    }
}

fn respuesta_vacia(periodo: PeriodoFiscal, inicio: Instant) -> ProcessResponse {
    ProcessResponse {
        success: true,
        message: format!("Sin legajos para el período {periodo}"),
        data: ProcessData {
            legajos: Some(Vec::new()),
            estadisticas: Estadisticas::default(),
            resumen: ResumenEjecutivo {
                estado: "sin_datos".to_string(),
                total_procesado: 0,
                porcentaje_exito: 0.0,
                tiempo_ms: 0.0,
                bruto_total: Decimal::ZERO,
                imponible_principal: Decimal::ZERO,
                sac_total: Decimal::ZERO,
                promedio_bruto: Decimal::ZERO,
                alertas: Vec::new(),
            },
            totales: Totales::default(),
            guardado_bd: None,
        },
        metadata: ResponseMetadata {
            backend: BACKEND.to_string(),
            api_version: API_VERSION.to_string(),
            processing_time_ms: inicio.elapsed().as_secs_f64() * 1000.0,
        },
        timestamp: Utc::now().to_rfc3339(),
    }
}

fn respuesta_cancelada(periodo: PeriodoFiscal, inicio: Instant) -> ProcessResponse {
    let mut respuesta = respuesta_vacia(periodo, inicio);
    respuesta.success = false;
    respuesta.message = "cancelled".to_string();
    respuesta.data.resumen.estado = "cancelado".to_string();
    respuesta
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;
    use sicoss_core::{DatosExtraidos, Legajo};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let state = AppState::new(None);
        super::router().with_state(state)
    }

    async fn post_json(app: Router, body: serde_json::Value) -> (StatusCode, Vec<u8>) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sicoss/process")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn rejects_malformed_period_with_400() {
        let body = serde_json::json!({
            "periodo_fiscal": "2025-01",
            "formato_respuesta": "completo",
            "guardar_en_bd": false
        });
        let (status, _) = post_json(test_app(), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_missing_period_with_422() {
        let body = serde_json::json!({ "guardar_en_bd": false });
        let (status, _) = post_json(test_app(), body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn rejects_negative_cap_override_with_422() {
        let body = serde_json::json!({
            "periodo_fiscal": "202501",
            "config_topes": {
                "tope_jubilatorio_patronal": "-1",
                "tope_jubilatorio_personal": "600000",
                "tope_otros_aportes_personales": "700000",
                "trunca_tope": true
            }
        });
        let (status, _) = post_json(test_app(), body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn no_database_yields_503() {
        let body = serde_json::json!({ "periodo_fiscal": "202501" });
        let (status, _) = post_json(test_app(), body).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn busy_period_yields_409() {
        let state = AppState::new(None);
        let periodo: PeriodoFiscal = "202501".parse().unwrap();
        let _en_curso = state.comenzar_periodo(periodo).unwrap();

        let app = super::router().with_state(state);
        let body = serde_json::json!({ "periodo_fiscal": "202501" });
        let (status, bytes) = post_json(app, body).await;

        assert_eq!(status, StatusCode::CONFLICT);
        let texto = String::from_utf8(bytes).unwrap();
        assert!(texto.contains("202501"));
    }

    #[tokio::test]
    async fn rejects_nonpositive_legajo() {
        let body = serde_json::json!({ "periodo_fiscal": "202501", "nro_legajo": 0 });
        let (status, _) = post_json(test_app(), body).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    // -- Response shaping ---------------------------------------------------

    fn resultado_de_prueba(cantidad: usize) -> ResultadoProcesamiento {
        let periodo: PeriodoFiscal = "202501".parse().unwrap();
        let legajos: Vec<Legajo> = (1..=cantidad as i64)
            .map(|nro| Legajo {
                nro_legaj: nro,
                cuil: format!("20{nro:08}9"),
                apnom: format!("LEGAJO {nro}"),
                cod_situacion: 1,
                cod_condicion: 1,
                cod_actividad: 1,
                cod_zona: 0,
                cod_mod_contratacion: 8,
                cod_obra_social: "000000".into(),
                regimen: "1".into(),
                conyuge: false,
                hijos: 0,
                adherentes: 0,
                licencia: false,
                retro_sin_actividad: false,
                trabajador_convencionado: "S".into(),
                provincia_localidad: String::new(),
            })
            .collect();
        let conceptos = legajos
            .iter()
            .map(|l| sicoss_core::Concepto {
                nro_legaj: l.nro_legaj,
                codn_conce: 100,
                impp_conce: dec!(1000),
                tipos_grupos: vec![7],
                tipo_conce: 'C',
                nro_orimp: 1,
                cantidad: Decimal::ZERO,
                escalafon: None,
            })
            .collect();

        let procesador = ProcesadorSicoss::nuevo(SicossConfig::con_topes(
            dec!(1000000),
            dec!(1000000),
            dec!(1000000),
            true,
        ))
        .unwrap();
        procesador
            .procesar(
                periodo,
                DatosExtraidos {
                    legajos,
                    conceptos,
                    ..Default::default()
                },
                &CancelToken::new(),
            )
            .unwrap()
    }

    #[test]
    fn completo_includes_details_for_every_record() {
        let resultado = resultado_de_prueba(3);
        let r = formar_respuesta(&resultado, FormatoRespuesta::Completo, None, 1.0);
        let legajos = r.data.legajos.unwrap();
        assert_eq!(legajos.len(), 3);
        assert!(legajos.iter().all(|l| l.detalles.is_some()));
    }

    #[test]
    fn resumen_caps_at_one_hundred_without_details() {
        let resultado = resultado_de_prueba(120);
        let r = formar_respuesta(&resultado, FormatoRespuesta::Resumen, None, 1.0);
        let legajos = r.data.legajos.unwrap();
        assert_eq!(legajos.len(), 100);
        assert!(legajos.iter().all(|l| l.detalles.is_none()));
    }

    #[test]
    fn solo_totales_omits_the_record_set() {
        let resultado = resultado_de_prueba(5);
        let r = formar_respuesta(&resultado, FormatoRespuesta::SoloTotales, None, 1.0);
        assert!(r.data.legajos.is_none());
        assert_eq!(r.data.totales.cantidad_legajos, 5);
        assert_eq!(r.metadata.backend, "sicoss_rust");
    }

    #[test]
    fn summary_flags_rejections() {
        let mut resultado = resultado_de_prueba(4);
        resultado.legajos[0].valid = false;
        resultado.estadisticas.legajos_rechazados = 1;
        let r = formar_respuesta(&resultado, FormatoRespuesta::SoloTotales, None, 1.0);
        assert_eq!(r.data.resumen.estado, "con_observaciones");
        assert!(!r.data.resumen.alertas.is_empty());
    }
}
