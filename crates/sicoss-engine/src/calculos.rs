//! # Secondary Base Calculation
//!
//! Computes the secondary contribution bases (`Imponible_4/5/6/9`), the
//! operation-type code, the activity priority, family allowances and the
//! configuration passthroughs. Pure function per employee — no
//! cross-employee dependency, which is what makes the per-employee
//! parallelism of the pipeline sound.

use rust_decimal::Decimal;
use sicoss_core::{SicossConfig, PISO_IMPONIBLE_INVESTIGADOR};

use crate::conceptos::ConsolidadoLegajo;

/// Per-child family allowance.
const ASIGNACION_POR_HIJO: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);
/// Per-spouse family allowance.
const ASIGNACION_POR_CONYUGE: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Apply the SICOSS calculations to one consolidated row.
pub fn aplicar(fila: &mut ConsolidadoLegajo, config: &SicossConfig) {
    // Secondary bases start from the consolidated ones; the cap engine
    // adjusts them afterwards.
    fila.importe_imponible_4 = fila.importe_imponible_sin_sac;
    fila.importe_imponible_5 = fila.remuner_78805;
    fila.importe_imponible_9 = fila.importe_imponible_4;

    // Activity priority: the legajo's own activity code, raised by any
    // investigator-subtype concept. Highest numeric class wins.
    fila.prioridad_tipo_actividad = fila
        .clase_investigador
        .map_or(fila.legajo.cod_actividad, |clase| {
            clase.max(fila.legajo.cod_actividad)
        });

    let es_investigador = fila.prioridad_tipo_actividad >= 38;
    fila.tipo_de_operacion = if es_investigador { 2 } else { 1 };

    // Imponible_6 is investigator-only: the investigator-subtype sum,
    // floored at the statutory minimum for that class.
    fila.importe_imponible_6 = if es_investigador {
        fila.importe_investigador.max(PISO_IMPONIBLE_INVESTIGADOR)
    } else {
        fila.importe_investigador
    };

    // Family allowances.
    fila.asignaciones_familiares_pagadas = if config.asignacion_familiar {
        let hijos = ASIGNACION_POR_HIJO * Decimal::from(fila.legajo.hijos.max(0));
        let conyuge = if fila.legajo.conyuge {
            ASIGNACION_POR_CONYUGE
        } else {
            Decimal::ZERO
        };
        hijos + conyuge + fila.importe_asignaciones_familiares
    } else {
        Decimal::ZERO
    };

    // Config passthrough: convencionado default when the legajo is blank.
    if fila.legajo.trabajador_convencionado.trim().is_empty() {
        fila.legajo.trabajador_convencionado = config.trabajador_convencionado.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conceptos::consolidar;
    use rust_decimal_macros::dec;
    use sicoss_core::{Concepto, Legajo};

    fn legajo() -> Legajo {
        Legajo {
            nro_legaj: 1,
            cuil: "20000000019".into(),
            apnom: "X".into(),
            cod_situacion: 1,
            cod_condicion: 1,
            cod_actividad: 1,
            cod_zona: 0,
            cod_mod_contratacion: 8,
            cod_obra_social: "000000".into(),
            regimen: "1".into(),
            conyuge: true,
            hijos: 2,
            adherentes: 0,
            licencia: false,
            retro_sin_actividad: false,
            trabajador_convencionado: "S".into(),
            provincia_localidad: String::new(),
        }
    }

    fn concepto(importe: Decimal, tags: &[u8]) -> Concepto {
        Concepto {
            nro_legaj: 1,
            codn_conce: 100,
            impp_conce: importe,
            tipos_grupos: tags.to_vec(),
            tipo_conce: 'C',
            nro_orimp: 1,
            cantidad: Decimal::ZERO,
            escalafon: None,
        }
    }

    fn fila_con(conceptos: &[Concepto]) -> ConsolidadoLegajo {
        consolidar(vec![legajo()], conceptos, &[], &[])
            .unwrap()
            .remove(0)
    }

    fn config() -> SicossConfig {
        SicossConfig::con_topes(dec!(1000000), dec!(1000000), dec!(1000000), true)
    }

    #[test]
    fn secondary_bases_follow_consolidated_ones() {
        let mut fila = fila_con(&[
            concepto(dec!(100000), &[1]),
            concepto(dec!(400000), &[7]),
        ]);
        aplicar(&mut fila, &config());

        assert_eq!(fila.importe_imponible_4, dec!(400000)); // sin SAC
        assert_eq!(fila.importe_imponible_5, dec!(500000));
        assert_eq!(fila.importe_imponible_9, dec!(400000));
        assert_eq!(fila.tipo_de_operacion, 1);
    }

    #[test]
    fn investigator_floor_applies_below_minimum() {
        let mut fila = fila_con(&[concepto(dec!(20000), &[11])]);
        aplicar(&mut fila, &config());

        assert_eq!(fila.prioridad_tipo_actividad, 38);
        assert_eq!(fila.tipo_de_operacion, 2);
        assert_eq!(fila.importe_imponible_6, dec!(69290.19));
    }

    #[test]
    fn investigator_above_floor_keeps_its_sum() {
        let mut fila = fila_con(&[concepto(dec!(100000), &[48])]);
        aplicar(&mut fila, &config());

        assert_eq!(fila.prioridad_tipo_actividad, 48);
        assert_eq!(fila.importe_imponible_6, dec!(100000));
    }

    #[test]
    fn non_investigator_keeps_raw_subtype_sum() {
        let mut fila = fila_con(&[concepto(dec!(500), &[1])]);
        aplicar(&mut fila, &config());
        assert_eq!(fila.importe_imponible_6, Decimal::ZERO);
        assert_eq!(fila.tipo_de_operacion, 1);
    }

    #[test]
    fn family_allowances_when_enabled() {
        let mut cfg = config();
        cfg.asignacion_familiar = true;

        let mut fila = fila_con(&[concepto(dec!(300), &[46])]);
        aplicar(&mut fila, &cfg);

        // 2 children * 1000 + spouse 500 + concept-driven 300.
        assert_eq!(fila.asignaciones_familiares_pagadas, dec!(2800));
    }

    #[test]
    fn family_allowances_zero_when_disabled() {
        let mut fila = fila_con(&[concepto(dec!(300), &[46])]);
        aplicar(&mut fila, &config());
        assert_eq!(fila.asignaciones_familiares_pagadas, Decimal::ZERO);
    }

    #[test]
    fn blank_convencionado_takes_config_default() {
        let mut fila = fila_con(&[]);
        fila.legajo.trabajador_convencionado = " ".into();
        aplicar(&mut fila, &config());
        assert_eq!(fila.legajo.trabajador_convencionado, "S");
    }
}
