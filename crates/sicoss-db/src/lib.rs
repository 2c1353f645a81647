//! # sicoss-db — Postgres Extraction & Persistence
//!
//! The two I/O edges of the pipeline: reading the four input tables from
//! the Mapuche HR schema and writing the computed record set into the
//! `suc.afip_mapuche_sicoss` reporting table.
//!
//! Connection parameters come from `DATABASE_URL`, or from the
//! `[postgresql]` section of `database.ini` when the variable is absent.

pub mod config;
pub mod extractor;
pub mod queries;
pub mod saver;

use std::path::Path;

use sicoss_core::SicossError;
use sqlx::postgres::{PgPool, PgPoolOptions};

pub use extractor::extraer_datos;
pub use saver::{guardar_en_bd, ResultadoGuardado, TABLA_DESTINO};

/// Initialize the connection pool.
///
/// Returns `None` when neither `DATABASE_URL` nor a readable `database.ini`
/// is available — the API then serves computation-only requests and rejects
/// extraction-backed ones.
pub async fn init_pool(ruta_ini: Option<&Path>) -> Result<Option<PgPool>, SicossError> {
    let url = match config::resolver_url(ruta_ini) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(
                "sin configuración de base de datos ({e}); el servicio corre sin extracción"
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await
        .map_err(|e| SicossError::ExtractionFailed(format!("conexión a Postgres: {e}")))?;

    tracing::info!("conectado a PostgreSQL");
    Ok(Some(pool))
}
