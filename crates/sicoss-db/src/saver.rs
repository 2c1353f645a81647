//! # Reporting-Table Persister
//!
//! Maps the computed record set to `suc.afip_mapuche_sicoss` and writes it
//! in one transaction. The core-name → column mapping lives here and only
//! here; nothing else in the workspace speaks the target column names.
//!
//! Contract:
//! - every row is validated before any SQL runs (CUIL exactly 11 digits,
//!   names truncated to 40 chars, amounts within NUMERIC(12,2));
//! - the insert is chunked (1000 rows per statement) inside a single
//!   transaction; any failure rolls the whole period back;
//! - a `pg_advisory_xact_lock` keyed on the period serializes concurrent
//!   runs for the same period;
//! - re-running a period first deletes its rows when
//!   `reemplazar_periodo` is on — the persister itself never deduplicates.

use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sicoss_core::{CancelToken, PeriodoFiscal, SicossError, SicossRecord};
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Fully qualified target table.
pub const TABLA_DESTINO: &str = "suc.afip_mapuche_sicoss";

/// Rows per INSERT statement. 54 binds per row keeps a full chunk well
/// under Postgres' 65535-parameter limit.
const FILAS_POR_LOTE: usize = 1000;

/// NUMERIC(12,2) integral bound: 9_999_999_999.
const MAX_NUMERIC_12_2: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 0);

/// Result of one persistence run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultadoGuardado {
    pub legajos_guardados: usize,
    pub duracion_segundos: f64,
    pub tabla_destino: String,
    pub periodo: PeriodoFiscal,
}

/// One row in target-table shape, validated and ready to bind.
#[derive(Debug, Clone)]
struct FilaSicoss {
    periodo_fiscal: String,
    cuil: String,
    apnom: String,
    conyuge: bool,
    cant_hijos: i32,
    cod_situacion: i32,
    cod_cond: i32,
    cod_act: i32,
    cod_zona: i32,
    porc_aporte: Decimal,
    cod_mod_cont: i32,
    cod_os: String,
    cant_adh: i32,
    rem_total: Decimal,
    rem_impo1: Decimal,
    rem_impo2: Decimal,
    rem_impo3: Decimal,
    rem_impo4: Decimal,
    rem_impo5: Decimal,
    rem_impo6: Decimal,
    rem_imp7: Decimal,
    rem_dec_788: Decimal,
    rem_imp9: Decimal,
    asig_fam_pag: Decimal,
    aporte_vol: Decimal,
    imp_adic_os: Decimal,
    aporte_adic_os: Decimal,
    marca_reduccion: i32,
    tipo_empresa: i32,
    regimen: i32,
    sit_rev1: i32,
    dia_ini_sit_rev1: i32,
    sit_rev2: i32,
    dia_ini_sit_rev2: i32,
    sit_rev3: i32,
    dia_ini_sit_rev3: i32,
    sueldo_adicc: Decimal,
    sac: Decimal,
    horas_extras: Decimal,
    nro_horas_ext: i32,
    zona_desfav: Decimal,
    vacaciones: Decimal,
    premios: Decimal,
    adicionales: Decimal,
    cpto_no_remun: Decimal,
    maternidad: Decimal,
    rectificacion_remun: Decimal,
    cant_dias_trab: i32,
    convencionado: i32,
    tipo_oper: i16,
    seguro: i32,
    fecha_procesamiento: DateTime<Utc>,
    version_sistema: String,
    metodo_procesamiento: String,
}

/// Map one computed record to the target-table row, enforcing the schema
/// contract. `indice` is the position within the batch, surfaced on error.
fn mapear_registro(registro: &SicossRecord, indice: usize) -> Result<FilaSicoss, SicossError> {
    let error = |column: &str, detalle: String| SicossError::PersistenceFailed {
        row_index: indice,
        column: column.to_string(),
        detalle,
    };

    let cuil = registro.cuil.trim().to_string();
    if cuil.len() != 11 || !cuil.chars().all(|c| c.is_ascii_digit()) {
        return Err(error(
            "cuil",
            format!("\"{cuil}\" no es un CUIL de 11 dígitos"),
        ));
    }

    let apnom: String = registro.apnom.chars().take(40).collect();
    if apnom.trim().is_empty() {
        return Err(error("apnom", "apellido y nombre vacío".into()));
    }
    let cod_os: String = registro.cod_os.chars().take(6).collect();

    let montos = [
        ("rem_total", registro.rem_total),
        ("rem_impo1", registro.rem_impo1),
        ("rem_impo2", registro.rem_impo2),
        ("rem_impo3", registro.rem_impo3),
        ("rem_impo4", registro.rem_impo4),
        ("rem_impo5", registro.rem_impo5),
        ("rem_impo6", registro.rem_impo6),
        ("rem_imp7", registro.rem_impo7),
        ("rem_dec_788", registro.rem_impo8),
        ("rem_imp9", registro.rem_impo9),
        ("asig_fam_pag", registro.asig_fam_pag),
        ("sueldo_adicc", registro.sueldo_adicc),
        ("sac", registro.sac),
        ("horas_extras", registro.horas_extras),
        ("zona_desfav", registro.zona_desfav),
        ("vacaciones", registro.vacaciones),
        ("premios", registro.premios),
        ("adicionales", registro.adicionales),
        ("cpto_no_remun", registro.no_remun),
        ("maternidad", registro.maternidad),
    ];
    for (columna, monto) in montos {
        if monto.is_sign_negative() {
            return Err(error(columna, format!("importe negativo: {monto}")));
        }
        if monto > MAX_NUMERIC_12_2 {
            return Err(error(columna, format!("{monto} excede NUMERIC(12,2)")));
        }
    }

    Ok(FilaSicoss {
        periodo_fiscal: registro.periodo_fiscal.as_periodo_str(),
        cuil,
        apnom,
        conyuge: registro.conyuge,
        cant_hijos: registro.cant_hijos,
        cod_situacion: registro.cod_situacion,
        cod_cond: registro.cod_cond,
        cod_act: registro.cod_act,
        cod_zona: registro.cod_zona,
        porc_aporte: registro.porc_aporte,
        cod_mod_cont: registro.cod_mod_cont,
        cod_os,
        cant_adh: registro.cant_adh,
        rem_total: registro.rem_total,
        rem_impo1: registro.rem_impo1,
        rem_impo2: registro.rem_impo2,
        rem_impo3: registro.rem_impo3,
        rem_impo4: registro.rem_impo4,
        rem_impo5: registro.rem_impo5,
        rem_impo6: registro.rem_impo6,
        rem_imp7: registro.rem_impo7,
        rem_dec_788: registro.rem_impo8,
        rem_imp9: registro.rem_impo9,
        asig_fam_pag: registro.asig_fam_pag,
        aporte_vol: registro.aporte_vol,
        imp_adic_os: registro.imp_adic_os,
        aporte_adic_os: registro.aporte_adic_os,
        marca_reduccion: registro.marca_reduccion,
        tipo_empresa: registro.tipo_empresa,
        regimen: registro.regimen.trim().parse().unwrap_or(0),
        sit_rev1: registro.sit_rev1,
        dia_ini_sit_rev1: registro.dia_ini_sit_rev1,
        sit_rev2: registro.sit_rev2,
        dia_ini_sit_rev2: registro.dia_ini_sit_rev2,
        sit_rev3: registro.sit_rev3,
        dia_ini_sit_rev3: registro.dia_ini_sit_rev3,
        sueldo_adicc: registro.sueldo_adicc,
        sac: registro.sac,
        horas_extras: registro.horas_extras,
        nro_horas_ext: registro.nro_horas_ext,
        zona_desfav: registro.zona_desfav,
        vacaciones: registro.vacaciones,
        premios: registro.premios,
        adicionales: registro.adicionales,
        cpto_no_remun: registro.no_remun,
        maternidad: registro.maternidad,
        rectificacion_remun: registro.rectificacion_remun,
        cant_dias_trab: registro.cant_dias_trab,
        convencionado: i32::from(registro.trabajador_convencionado.trim() == "S"),
        tipo_oper: registro.tipo_de_operacion,
        seguro: i32::from(registro.seguro_vida),
        fecha_procesamiento: registro.fecha_procesamiento,
        version_sistema: registro.version_sistema.clone(),
        metodo_procesamiento: registro.metodo_procesamiento.clone(),
    })
}

/// Advisory-lock key for a period: serializes same-period runs.
fn clave_bloqueo(periodo: PeriodoFiscal) -> i64 {
    i64::from(periodo.year()) * 100 + i64::from(periodo.month())
}

/// Persist the valid records of one run into the reporting table.
///
/// `reemplazar_periodo` deletes the period's existing rows inside the same
/// transaction before inserting, making re-runs idempotent.
pub async fn guardar_en_bd(
    pool: &PgPool,
    periodo: PeriodoFiscal,
    registros: &[SicossRecord],
    reemplazar_periodo: bool,
    cancel: &CancelToken,
) -> Result<ResultadoGuardado, SicossError> {
    let inicio = Instant::now();

    // Validación completa antes de abrir la transacción: una fila inválida
    // aborta el período sin tocar la tabla.
    let filas: Vec<FilaSicoss> = registros
        .iter()
        .filter(|r| r.valid)
        .enumerate()
        .map(|(i, r)| mapear_registro(r, i))
        .collect::<Result<_, _>>()?;

    if filas.is_empty() {
        tracing::warn!(periodo = %periodo, "sin legajos válidos para guardar");
        return Ok(ResultadoGuardado {
            legajos_guardados: 0,
            duracion_segundos: inicio.elapsed().as_secs_f64(),
            tabla_destino: TABLA_DESTINO.to_string(),
            periodo,
        });
    }

    cancel.verificar()?;

    let mut tx = pool.begin().await.map_err(|e| error_sql(0, e))?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(clave_bloqueo(periodo))
        .execute(&mut *tx)
        .await
        .map_err(|e| error_sql(0, e))?;

    if reemplazar_periodo {
        let borradas = sqlx::query(&format!(
            "DELETE FROM {TABLA_DESTINO} WHERE periodo_fiscal = $1"
        ))
        .bind(periodo.as_periodo_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| error_sql(0, e))?
        .rows_affected();
        if borradas > 0 {
            tracing::info!(periodo = %periodo, borradas, "período previo reemplazado");
        }
    }

    for (nro_lote, lote) in filas.chunks(FILAS_POR_LOTE).enumerate() {
        // La cancelación en medio del guardado descarta la transacción
        // completa; nunca queda un período parcial visible.
        if cancel.is_cancelled() {
            tx.rollback().await.ok();
            return Err(SicossError::Cancelled);
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {TABLA_DESTINO} (\
             periodo_fiscal, cuil, apnom, conyuge, cant_hijos, cod_situacion, \
             cod_cond, cod_act, cod_zona, porc_aporte, cod_mod_cont, cod_os, \
             cant_adh, rem_total, rem_impo1, rem_impo2, rem_impo3, rem_impo4, \
             rem_impo5, rem_impo6, rem_imp7, rem_dec_788, rem_imp9, \
             asig_fam_pag, aporte_vol, imp_adic_os, aporte_adic_os, \
             marca_reduccion, tipo_empresa, regimen, sit_rev1, dia_ini_sit_rev1, \
             sit_rev2, dia_ini_sit_rev2, sit_rev3, dia_ini_sit_rev3, \
             sueldo_adicc, sac, horas_extras, nro_horas_ext, zona_desfav, \
             vacaciones, premios, adicionales, cpto_no_remun, maternidad, \
             rectificacion_remun, cant_dias_trab, convencionado, tipo_oper, \
             seguro, fecha_procesamiento, version_sistema, metodo_procesamiento) "
        ));

        builder.push_values(lote, |mut b, fila| {
            b.push_bind(&fila.periodo_fiscal)
                .push_bind(&fila.cuil)
                .push_bind(&fila.apnom)
                .push_bind(fila.conyuge)
                .push_bind(fila.cant_hijos)
                .push_bind(fila.cod_situacion)
                .push_bind(fila.cod_cond)
                .push_bind(fila.cod_act)
                .push_bind(fila.cod_zona)
                .push_bind(fila.porc_aporte)
                .push_bind(fila.cod_mod_cont)
                .push_bind(&fila.cod_os)
                .push_bind(fila.cant_adh)
                .push_bind(fila.rem_total)
                .push_bind(fila.rem_impo1)
                .push_bind(fila.rem_impo2)
                .push_bind(fila.rem_impo3)
                .push_bind(fila.rem_impo4)
                .push_bind(fila.rem_impo5)
                .push_bind(fila.rem_impo6)
                .push_bind(fila.rem_imp7)
                .push_bind(fila.rem_dec_788)
                .push_bind(fila.rem_imp9)
                .push_bind(fila.asig_fam_pag)
                .push_bind(fila.aporte_vol)
                .push_bind(fila.imp_adic_os)
                .push_bind(fila.aporte_adic_os)
                .push_bind(fila.marca_reduccion)
                .push_bind(fila.tipo_empresa)
                .push_bind(fila.regimen)
                .push_bind(fila.sit_rev1)
                .push_bind(fila.dia_ini_sit_rev1)
                .push_bind(fila.sit_rev2)
                .push_bind(fila.dia_ini_sit_rev2)
                .push_bind(fila.sit_rev3)
                .push_bind(fila.dia_ini_sit_rev3)
                .push_bind(fila.sueldo_adicc)
                .push_bind(fila.sac)
                .push_bind(fila.horas_extras)
                .push_bind(fila.nro_horas_ext)
                .push_bind(fila.zona_desfav)
                .push_bind(fila.vacaciones)
                .push_bind(fila.premios)
                .push_bind(fila.adicionales)
                .push_bind(fila.cpto_no_remun)
                .push_bind(fila.maternidad)
                .push_bind(fila.rectificacion_remun)
                .push_bind(fila.cant_dias_trab)
                .push_bind(fila.convencionado)
                .push_bind(fila.tipo_oper)
                .push_bind(fila.seguro)
                .push_bind(fila.fecha_procesamiento)
                .push_bind(&fila.version_sistema)
                .push_bind(&fila.metodo_procesamiento);
        });

        if let Err(e) = builder.build().execute(&mut *tx).await {
            tx.rollback().await.ok();
            return Err(error_sql(nro_lote * FILAS_POR_LOTE, e));
        }
    }

    tx.commit().await.map_err(|e| error_sql(0, e))?;

    let resultado = ResultadoGuardado {
        legajos_guardados: filas.len(),
        duracion_segundos: inicio.elapsed().as_secs_f64(),
        tabla_destino: TABLA_DESTINO.to_string(),
        periodo,
    };
    tracing::info!(
        periodo = %periodo,
        legajos = resultado.legajos_guardados,
        segundos = resultado.duracion_segundos,
        "guardado en BD completado"
    );
    Ok(resultado)
}

fn error_sql(row_index: usize, err: sqlx::Error) -> SicossError {
    let column = err
        .as_database_error()
        .and_then(|db| db.constraint().map(str::to_string))
        .unwrap_or_else(|| "desconocida".to_string());
    SicossError::PersistenceFailed {
        row_index,
        column,
        detalle: err.to_string(),
    }
}
