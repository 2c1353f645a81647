//! # HR-Store Extraction
//!
//! Runs the four extraction queries for one fiscal period (optionally one
//! employee) and maps the rows to the core input types. Transient database
//! errors are retried with exponential backoff up to three attempts and
//! then surfaced as `ExtractionFailed`. An empty roster is not an error —
//! the pipeline returns an empty success.

use std::time::Duration;

use rust_decimal::Decimal;
use sicoss_core::{
    CancelToken, Concepto, DatosExtraidos, Escalafon, Legajo, ObraSocialCode, OtraActividad,
    PeriodoFiscal, SicossError,
};
use sqlx::PgPool;

use crate::queries;

const REINTENTOS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct LegajoRow {
    nro_legaj: i64,
    cuil: String,
    apnom: String,
    cod_situacion: i32,
    cod_condicion: i32,
    cod_actividad: i32,
    cod_zona: i32,
    cod_mod_contratacion: i32,
    trabajador_convencionado: String,
    provincia_localidad: String,
    regimen: String,
    conyuge: bool,
    hijos: i32,
    adherentes: i32,
    licencia: bool,
    retro_sin_actividad: bool,
}

impl LegajoRow {
    fn into_legajo(self) -> Legajo {
        Legajo {
            nro_legaj: self.nro_legaj,
            cuil: self.cuil.trim().to_string(),
            apnom: self.apnom.trim().to_string(),
            cod_situacion: self.cod_situacion,
            cod_condicion: self.cod_condicion,
            cod_actividad: self.cod_actividad,
            cod_zona: self.cod_zona,
            cod_mod_contratacion: self.cod_mod_contratacion,
            // El código real llega con el join de obra social.
            cod_obra_social: "000000".to_string(),
            regimen: self.regimen,
            conyuge: self.conyuge,
            hijos: self.hijos,
            adherentes: self.adherentes,
            licencia: self.licencia,
            retro_sin_actividad: self.retro_sin_actividad,
            trabajador_convencionado: self.trabajador_convencionado,
            provincia_localidad: self.provincia_localidad,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ConceptoRow {
    nro_legaj: i64,
    codn_conce: i32,
    impp_conce: Decimal,
    tipo_conce: String,
    cantidad: Decimal,
    nro_orimp: i32,
    tipos_grupos: Vec<i32>,
    codigoescalafon: Option<String>,
}

impl ConceptoRow {
    fn into_concepto(self) -> Concepto {
        let tipos_grupos = self
            .tipos_grupos
            .into_iter()
            .filter_map(|g| u8::try_from(g).ok())
            .collect();
        Concepto {
            nro_legaj: self.nro_legaj,
            codn_conce: self.codn_conce,
            impp_conce: self.impp_conce,
            tipos_grupos,
            tipo_conce: self.tipo_conce.chars().next().unwrap_or('C'),
            nro_orimp: self.nro_orimp,
            cantidad: self.cantidad,
            escalafon: parsear_escalafon(self.codigoescalafon.as_deref()),
        }
    }
}

fn parsear_escalafon(codigo: Option<&str>) -> Option<Escalafon> {
    match codigo.map(str::trim) {
        Some("DOCE") => Some(Escalafon::Doce),
        Some("AUTO") => Some(Escalafon::Auto),
        Some("NODO") => Some(Escalafon::Nodo),
        _ => None,
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OtraActividadRow {
    nro_legaj: i64,
    importe_jubilatorio: Decimal,
    importe_otros: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct ObraSocialRow {
    nro_legaj: i64,
    cod_os: String,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract the four input tables for one period.
///
/// `nro_legajo` restricts the roster and concepts to a single employee.
/// Cancellation is checked between queries.
pub async fn extraer_datos(
    pool: &PgPool,
    periodo: PeriodoFiscal,
    nro_legajo: Option<i64>,
    cancel: &CancelToken,
) -> Result<DatosExtraidos, SicossError> {
    let anio = i32::from(periodo.year());
    let mes = i32::from(periodo.month());

    tracing::info!(periodo = %periodo, ?nro_legajo, "extrayendo datos del esquema mapuche");

    cancel.verificar()?;
    let legajos: Vec<LegajoRow> = con_reintentos("legajos", || async move {
        match nro_legajo {
            Some(nro) => {
                sqlx::query_as(queries::LEGAJOS_UNO)
                    .bind(anio)
                    .bind(mes)
                    .bind(nro)
                    .fetch_all(pool)
                    .await
            }
            None => {
                sqlx::query_as(queries::LEGAJOS)
                    .bind(anio)
                    .bind(mes)
                    .fetch_all(pool)
                    .await
            }
        }
    })
    .await?;

    if legajos.is_empty() {
        tracing::warn!(periodo = %periodo, "sin legajos para el período");
        return Ok(DatosExtraidos::default());
    }

    cancel.verificar()?;
    let conceptos: Vec<ConceptoRow> = con_reintentos("conceptos", || async move {
        match nro_legajo {
            Some(nro) => {
                sqlx::query_as(queries::CONCEPTOS_UNO)
                    .bind(anio)
                    .bind(mes)
                    .bind(nro)
                    .fetch_all(pool)
                    .await
            }
            None => {
                sqlx::query_as(queries::CONCEPTOS)
                    .bind(anio)
                    .bind(mes)
                    .fetch_all(pool)
                    .await
            }
        }
    })
    .await?;

    cancel.verificar()?;
    let otra_actividad: Vec<OtraActividadRow> =
        con_reintentos("otra_actividad", || async move {
            sqlx::query_as(queries::OTRA_ACTIVIDAD).fetch_all(pool).await
        })
        .await?;

    cancel.verificar()?;
    let obra_social: Vec<ObraSocialRow> = con_reintentos("obra_social", || async move {
        sqlx::query_as(queries::OBRA_SOCIAL).fetch_all(pool).await
    })
    .await?;

    tracing::info!(
        legajos = legajos.len(),
        conceptos = conceptos.len(),
        "extracción completada"
    );

    Ok(DatosExtraidos {
        legajos: legajos.into_iter().map(LegajoRow::into_legajo).collect(),
        conceptos: conceptos.into_iter().map(ConceptoRow::into_concepto).collect(),
        otra_actividad: otra_actividad
            .into_iter()
            .map(|r| OtraActividad {
                nro_legaj: r.nro_legaj,
                importe_jubilatorio: r.importe_jubilatorio,
                importe_otros: r.importe_otros,
            })
            .collect(),
        obra_social: obra_social
            .into_iter()
            .map(|r| ObraSocialCode {
                nro_legaj: r.nro_legaj,
                cod_os: r.cod_os.trim().to_string(),
            })
            .collect(),
    })
}

/// Run one query with exponential-backoff retries on transient errors.
async fn con_reintentos<T, F, Fut>(nombre: &str, mut operacion: F) -> Result<T, SicossError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    let mut intento = 0u32;
    loop {
        match operacion().await {
            Ok(valor) => return Ok(valor),
            Err(err) if intento + 1 < REINTENTOS && es_transitorio(&err) => {
                intento += 1;
                let espera = BACKOFF_BASE * 2u32.pow(intento - 1);
                tracing::warn!(
                    consulta = nombre,
                    intento,
                    error = %err,
                    "error transitorio de extracción, reintentando en {espera:?}"
                );
                tokio::time::sleep(espera).await;
            }
            Err(err) => {
                return Err(SicossError::ExtractionFailed(format!(
                    "consulta '{nombre}': {err}"
                )));
            }
        }
    }
}

/// Connection-level failures are worth retrying; SQL/decode errors are not.
fn es_transitorio(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn concepto_row_maps_groups_and_escalafon() {
        let row = ConceptoRow {
            nro_legaj: 10,
            codn_conce: 1050,
            impp_conce: dec!(1000.50),
            tipo_conce: "C".into(),
            cantidad: dec!(4),
            nro_orimp: 1,
            tipos_grupos: vec![1, 9, 300], // 300 no entra en u8
            codigoescalafon: Some("DOCE".into()),
        };
        let c = row.into_concepto();
        assert_eq!(c.tipos_grupos, vec![1, 9]);
        assert_eq!(c.escalafon, Some(Escalafon::Doce));
        assert_eq!(c.tipo_conce, 'C');
    }

    #[test]
    fn unknown_escalafon_maps_to_none() {
        assert_eq!(parsear_escalafon(Some("OTRO")), None);
        assert_eq!(parsear_escalafon(None), None);
        assert_eq!(parsear_escalafon(Some(" AUTO ")), Some(Escalafon::Auto));
    }

    #[test]
    fn legajo_row_trims_identity_fields() {
        let row = LegajoRow {
            nro_legaj: 5,
            cuil: " 20123456789 ".into(),
            apnom: "PEREZ JUAN   ".into(),
            cod_situacion: 1,
            cod_condicion: 1,
            cod_actividad: 1,
            cod_zona: 0,
            cod_mod_contratacion: 8,
            trabajador_convencionado: "S".into(),
            provincia_localidad: String::new(),
            regimen: "1".into(),
            conyuge: false,
            hijos: 0,
            adherentes: 0,
            licencia: false,
            retro_sin_actividad: false,
        };
        let l = row.into_legajo();
        assert_eq!(l.cuil, "20123456789");
        assert_eq!(l.apnom, "PEREZ JUAN");
    }

    #[test]
    fn transient_classification() {
        assert!(es_transitorio(&sqlx::Error::PoolTimedOut));
        assert!(!es_transitorio(&sqlx::Error::RowNotFound));
    }
}
