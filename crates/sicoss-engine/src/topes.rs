//! # Statutory Cap Engine
//!
//! Applies the retirement caps (topes) and the differential-category rule
//! to one consolidated row. The engine is an explicit state machine:
//!
//! ```text
//! Open -> CappedPatronal -> CappedPersonal -> CappedOtros -> Final
//! ```
//!
//! Each transition applies at most one truncation. After the machine
//! settles, the remunerative total and gross are re-derived from the capped
//! primary base, the band between bases 4 and 5 is repaired, and the ART
//! base is re-clamped against the settled base 4.
//!
//! With `trunca_tope` off, guards are still evaluated but values are left
//! untouched — the fired caps are only recorded for downstream reporting.
//!
//! The differential-category rule zeroes `Imponible_1` while SAC,
//! non-remunerative amounts and bases 4..9 keep their pre-rule values.

use rust_decimal::Decimal;
use sicoss_core::SicossConfig;

use crate::conceptos::{ConsolidadoLegajo, TopeObservado};

/// Cap machine states. One pass, no cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Estado {
    Open,
    CappedPatronal,
    CappedPersonal,
    CappedOtros,
    Final,
}

/// Run the cap state machine over one consolidated row.
///
/// `config.validar()` must have passed before the pipeline started; the
/// engine assumes non-negative caps.
pub fn aplicar(fila: &mut ConsolidadoLegajo, config: &SicossConfig) {
    let mut estado = Estado::Open;
    while estado != Estado::Final {
        estado = paso(estado, fila, config);
    }

    // Re-derive the remunerative total and gross from the capped primary
    // base. The differential rule ran last and touches only Imponible_1,
    // so the pre-rule value is what the totals must reflect.
    let remuner_efectivo = if fila.categoria_diferencial {
        fila.remuner_78805_post_topes(config)
    } else {
        fila.importe_impon
    };
    fila.remuner_78805 = remuner_efectivo;
    fila.importe_bruto = remuner_efectivo + fila.importe_no_remun;

    if config.trunca_tope {
        // Banda I3: Imponible_4 no puede exceder Imponible_5 en más de 10%.
        let banda = fila.importe_imponible_5 * Decimal::new(110, 2);
        if fila.importe_imponible_4 > banda {
            fila.importe_imponible_4 = fila.importe_imponible_5;
        }

        // ART: re-clamp after Imponible_4 settled.
        if config.art_con_tope {
            let tope_art = fila.importe_imponible_4 * Decimal::new(105, 2);
            if fila.importe_imponible_9 > tope_art {
                fila.importe_imponible_9 = tope_art;
            }
        }
    }
}

fn paso(estado: Estado, fila: &mut ConsolidadoLegajo, config: &SicossConfig) -> Estado {
    match estado {
        Estado::Open => {
            if fila.importe_imponible_patronal > config.tope_jubilatorio_patronal {
                fila.topes_observados.push(TopeObservado::Patronal);
                if config.trunca_tope {
                    truncar_patronal(fila, config.tope_jubilatorio_patronal);
                }
            }
            Estado::CappedPatronal
        }
        Estado::CappedPatronal => {
            // Room left under the personal cap after crediting what was
            // already contributed at other employers.
            let disponible = (config.tope_jubilatorio_personal
                - fila.otra_actividad_jubilatorio)
                .max(Decimal::ZERO);
            if fila.importe_impon > disponible {
                fila.topes_observados.push(TopeObservado::Personal);
                if config.trunca_tope {
                    fila.importe_impon = disponible;
                }
            }
            Estado::CappedPersonal
        }
        Estado::CappedPersonal => {
            if fila.importe_imponible_4 + fila.otra_actividad_otros
                > config.tope_otros_aportes_personales
            {
                fila.topes_observados.push(TopeObservado::OtrosAportes);
                if config.trunca_tope {
                    fila.importe_imponible_4 = (config.tope_otros_aportes_personales
                        - fila.otra_actividad_otros)
                        .max(Decimal::ZERO);
                }
            }
            Estado::CappedOtros
        }
        Estado::CappedOtros => {
            if es_categoria_diferencial(fila, config) {
                tracing::debug!(
                    nro_legaj = fila.legajo.nro_legaj,
                    cod_actividad = fila.legajo.cod_actividad,
                    prioridad = fila.prioridad_tipo_actividad,
                    "categoría diferencial: Imponible_1 en cero"
                );
                fila.categoria_diferencial = true;
                fila.importe_impon = Decimal::ZERO;
            }
            Estado::Final
        }
        Estado::Final => Estado::Final,
    }
}

/// Employer-side truncation. The SAC share keeps priority: the non-SAC
/// part only gets what the cap leaves after SAC.
fn truncar_patronal(fila: &mut ConsolidadoLegajo, tope: Decimal) {
    let resto_para_sin_sac = (tope - fila.importe_sac_patronal).max(Decimal::ZERO);
    fila.importe_imponible_sin_sac = fila.importe_imponible_sin_sac.min(resto_para_sin_sac);
    fila.importe_sac_patronal = fila.importe_sac_patronal.min(tope);
    fila.importe_imponible_patronal = fila.importe_imponible_sin_sac + fila.importe_sac_patronal;
    fila.importe_impon = fila.importe_impon.min(fila.importe_imponible_patronal);
}

/// The differential-category predicate. Pure function of the consolidated
/// row and the configuration; membership sets are configuration, not code.
fn es_categoria_diferencial(fila: &ConsolidadoLegajo, config: &SicossConfig) -> bool {
    if config
        .differential_investigator_classes
        .contains(&fila.prioridad_tipo_actividad)
    {
        return true;
    }
    if config
        .differential_activity_codes
        .contains(&fila.legajo.cod_actividad)
    {
        return true;
    }
    // All remunerative mass consumed by the prior caps.
    config.check_sin_activo
        && config.trunca_tope
        && fila.importe_impon.is_zero()
        && fila.remuner_78805 > Decimal::ZERO
}

impl ConsolidadoLegajo {
    /// The primary base as it stood after the cap stages but before the
    /// differential rule zeroed it. Recomputed from the capped columns.
    fn remuner_78805_post_topes(&self, config: &SicossConfig) -> Decimal {
        if !config.trunca_tope {
            return self.remuner_78805;
        }
        let disponible = (config.tope_jubilatorio_personal - self.otra_actividad_jubilatorio)
            .max(Decimal::ZERO);
        self.importe_imponible_patronal.min(disponible).max(Decimal::ZERO)
    }
}
