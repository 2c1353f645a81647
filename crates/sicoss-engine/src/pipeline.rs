//! # Pipeline Driver
//!
//! Coordinates the processing stages over one fiscal period:
//!
//! 1. concept consolidation (+ otra actividad / obra social joins)
//! 2. SICOSS calculations
//! 3. statutory caps
//! 4. record assembly with invariant enforcement
//! 5. final validation
//! 6. totals and statistics
//!
//! Stages 2–4 are data-parallel per employee (rayon); the cancellation
//! token is checked between employees so a cancel lands promptly without
//! poisoning partial state — the caller simply never sees a result.
//! Per-step wall times are collected for the response metadata.

use std::time::Instant;

use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sicoss_core::{
    CancelToken, DatosExtraidos, PeriodoFiscal, SicossConfig, SicossError, SicossRecord,
    TOPE_ABSOLUTO_IMPORTE,
};

use crate::conceptos::{self, ConsolidadoLegajo};
use crate::totales::{self, Estadisticas, Totales};
use crate::{calculos, topes, validador};

/// Version tag stamped into every output row.
pub const VERSION_SISTEMA: &str = env!("CARGO_PKG_VERSION");
/// Processing-method tag stamped into every output row.
pub const METODO_PROCESAMIENTO: &str = "pipeline_rust";

/// Wall time spent in one named pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasoMetrica {
    pub nombre: String,
    pub milisegundos: f64,
}

/// Run-level metrics attached to the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricasProcesamiento {
    pub tiempo_total_ms: f64,
    pub tiempos_por_paso: Vec<PasoMetrica>,
    pub registros_entrada: usize,
    pub registros_salida: usize,
    pub advertencias: Vec<String>,
}

/// The outcome of one pipeline run. `legajos` holds every processed row
/// with its `valid` flag; callers filter for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultadoProcesamiento {
    pub periodo: PeriodoFiscal,
    pub legajos: Vec<SicossRecord>,
    pub totales: Totales,
    pub estadisticas: Estadisticas,
    pub metricas: MetricasProcesamiento,
}

/// The SICOSS processing coordinator.
#[derive(Debug, Clone)]
pub struct ProcesadorSicoss {
    config: SicossConfig,
}

impl ProcesadorSicoss {
    /// Build a processor, rejecting invalid configuration pre-flight.
    pub fn nuevo(config: SicossConfig) -> Result<Self, SicossError> {
        config.validar()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SicossConfig {
        &self.config
    }

    /// Process one period's extracted data into the final record set.
    pub fn procesar(
        &self,
        periodo: PeriodoFiscal,
        datos: DatosExtraidos,
        cancel: &CancelToken,
    ) -> Result<ResultadoProcesamiento, SicossError> {
        let inicio = Instant::now();
        let mut metricas = MetricasProcesamiento {
            registros_entrada: datos.legajos.len(),
            ..Default::default()
        };

        tracing::info!(
            periodo = %periodo,
            legajos = datos.legajos.len(),
            conceptos = datos.conceptos.len(),
            "iniciando procesamiento SICOSS"
        );

        cancel.verificar()?;

        // 1. Consolidación de conceptos.
        let paso = Instant::now();
        let mut filas = conceptos::consolidar(
            datos.legajos,
            &datos.conceptos,
            &datos.otra_actividad,
            &datos.obra_social,
        )?;
        registrar_paso(&mut metricas, "consolidacion_conceptos", paso);

        // 2. Cálculos SICOSS, por legajo en paralelo.
        let paso = Instant::now();
        filas.par_iter_mut().try_for_each(|fila| {
            cancel.verificar()?;
            calculos::aplicar(fila, &self.config);
            Ok::<(), SicossError>(())
        })?;
        registrar_paso(&mut metricas, "calculos_sicoss", paso);

        // 3. Topes jubilatorios.
        let paso = Instant::now();
        filas.par_iter_mut().try_for_each(|fila| {
            cancel.verificar()?;
            topes::aplicar(fila, &self.config);
            Ok::<(), SicossError>(())
        })?;
        registrar_paso(&mut metricas, "topes_jubilatorios", paso);

        // 4. Armado de registros + invariantes.
        let paso = Instant::now();
        let mut registros: Vec<SicossRecord> = filas
            .par_iter()
            .map(|fila| {
                cancel.verificar()?;
                let registro = armar_registro(periodo, fila, &self.config);
                registro.verificar_invariantes(registro.rem_impo8)?;
                Ok(registro)
            })
            .collect::<Result<_, SicossError>>()?;
        registrar_paso(&mut metricas, "armado_registros", paso);

        // 5. Validación final.
        let paso = Instant::now();
        for (registro, fila) in registros.iter_mut().zip(&filas) {
            if let Some(motivo) = validador::evaluar(fila, &self.config) {
                registro.valid = false;
                registro.motivo_rechazo = Some(motivo);
            }
        }
        registrar_paso(&mut metricas, "validacion_legajos", paso);

        // 6. Totales y estadísticas.
        let paso = Instant::now();
        let totales = totales::calcular(&registros);
        let estadisticas = totales::estadisticas(&registros);
        registrar_paso(&mut metricas, "totales_y_estadisticas", paso);

        if estadisticas.legajos_rechazados > 0 {
            metricas.advertencias.push(format!(
                "{} legajos rechazados por validación",
                estadisticas.legajos_rechazados
            ));
        }
        metricas.registros_salida = estadisticas.legajos_validos as usize;
        metricas.tiempo_total_ms = inicio.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            periodo = %periodo,
            validos = estadisticas.legajos_validos,
            rechazados = estadisticas.legajos_rechazados,
            total_ms = metricas.tiempo_total_ms,
            "procesamiento SICOSS completado"
        );

        Ok(ResultadoProcesamiento {
            periodo,
            legajos: registros,
            totales,
            estadisticas,
            metricas,
        })
    }
}

fn registrar_paso(metricas: &mut MetricasProcesamiento, nombre: &str, inicio: Instant) {
    let ms = inicio.elapsed().as_secs_f64() * 1000.0;
    tracing::debug!(paso = nombre, ms, "paso de pipeline completado");
    metricas.tiempos_por_paso.push(PasoMetrica {
        nombre: nombre.to_string(),
        milisegundos: ms,
    });
}

/// Clamp a monetary output into `[0, 5e7]` and fix it at two decimals.
fn normalizar(importe: Decimal) -> Decimal {
    importe
        .clamp(Decimal::ZERO, TOPE_ABSOLUTO_IMPORTE)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Map one consolidated row to the wide output record.
fn armar_registro(
    periodo: PeriodoFiscal,
    fila: &ConsolidadoLegajo,
    config: &SicossConfig,
) -> SicossRecord {
    let mut r = SicossRecord::nuevo(periodo, &fila.legajo);

    r.cod_os = fila.cod_os.clone();
    r.porc_aporte = config.porc_aporte_adicional_jubilacion;

    // Bases. The gross is re-derived from the clamped components so the
    // cross-field identities survive the clamp.
    r.rem_impo8 = normalizar(fila.remuner_78805);
    r.no_remun = normalizar(fila.importe_no_remun);
    r.rem_total = r.rem_impo8 + r.no_remun;
    r.rem_impo1 = if fila.categoria_diferencial {
        Decimal::ZERO
    } else {
        r.rem_impo8
    };
    r.rem_impo2 = normalizar(fila.importe_imponible_patronal);
    r.rem_impo3 = r.rem_impo2;
    r.rem_impo4 = normalizar(fila.importe_imponible_4);
    r.rem_impo5 = normalizar(fila.importe_imponible_5);
    r.rem_impo6 = normalizar(fila.importe_imponible_6);
    // Banda ART: rem_impo9 <= rem_impo4 * 1.05.
    let banda_art = (r.rem_impo4 * Decimal::new(105, 2))
        .round_dp_with_strategy(2, RoundingStrategy::ToZero);
    r.rem_impo9 = normalizar(fila.importe_imponible_9).min(banda_art);

    // Conceptos.
    r.sac = normalizar(fila.importe_sac);
    r.horas_extras = normalizar(fila.importe_horas_extras);
    r.nro_horas_ext = fila.cantidad_horas_extras.round().to_i32().unwrap_or(0);
    r.zona_desfav = normalizar(fila.importe_zona_desfavorable);
    r.vacaciones = normalizar(fila.importe_vacaciones);
    r.premios = normalizar(fila.importe_premios);
    r.adicionales = normalizar(fila.importe_adicionales);
    r.maternidad = normalizar(fila.importe_maternidad);
    r.asig_fam_pag = normalizar(fila.asignaciones_familiares_pagadas);
    r.seguro_vida = !fila.importe_seguro_vida.is_zero();
    r.sueldo_adicc = normalizar(
        fila.remuner_78805
            - fila.importe_sac
            - fila.importe_horas_extras
            - fila.importe_zona_desfavorable
            - fila.importe_vacaciones
            - fila.importe_premios,
    );

    // Categóricos.
    r.tipo_de_operacion = fila.tipo_de_operacion;
    r.prioridad_tipo_actividad = fila.prioridad_tipo_actividad;
    r.categoria_diferencial = fila.categoria_diferencial;
    r.trabajador_convencionado = fila.legajo.trabajador_convencionado.clone();

    // Sello de procesamiento.
    r.version_sistema = VERSION_SISTEMA.to_string();
    r.metodo_procesamiento = METODO_PROCESAMIENTO.to_string();

    r
}
