//! # SICOSS Output Record
//!
//! The wide per-employee result row. One `SicossRecord` per surviving
//! employee per run; `(periodo_fiscal, cuil)` is the natural key. Every
//! monetary column is explicitly zero-initialized — the reporting table is
//! all NOT NULL and the persister enforces that contract at the edge.
//!
//! Imponible numbering: `rem_impo1..9` carry contribution bases 1..9.
//! Base 2 is the employer-side base, base 3 the health-insurance base
//! (equal to the employer base in this system), base 8 is `Remuner78805`.
//! Bases 1, 4, 5, 6 and 9 are the ones constrained by the cap engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::TOPE_ABSOLUTO_IMPORTE;
use crate::error::{Invariante, SicossError};
use crate::periodo::PeriodoFiscal;
use crate::tipos::{Legajo, NroLegajo};

/// Why the validator excluded a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotivoRechazo {
    /// On license with zero remunerative bases (`check_lic`).
    LicSinRemuneracion,
    /// Retro-only liquidation with no current activity (`check_retro`).
    RetroSinActividad,
    /// All primary bases zero (`check_sin_activo`).
    SinActivo,
}

/// One wide output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SicossRecord {
    // -- identity ----------------------------------------------------------
    pub periodo_fiscal: PeriodoFiscal,
    pub nro_legaj: NroLegajo,
    pub cuil: String,
    pub apnom: String,

    // -- family ------------------------------------------------------------
    pub conyuge: bool,
    pub cant_hijos: i32,
    pub cant_adh: i32,

    // -- classification ----------------------------------------------------
    pub cod_situacion: i32,
    pub cod_cond: i32,
    pub cod_act: i32,
    pub cod_zona: i32,
    pub porc_aporte: Decimal,
    pub cod_mod_cont: i32,
    pub cod_os: String,
    pub regimen: String,

    // -- contribution bases ------------------------------------------------
    /// Gross: `Remuner78805 + no_remun`.
    pub rem_total: Decimal,
    /// Base 1 (`IMPORTE_IMPON`). Zeroed by the differential-category rule.
    pub rem_impo1: Decimal,
    /// Base 2: employer-side base after employer caps.
    pub rem_impo2: Decimal,
    /// Base 3: health-insurance base.
    pub rem_impo3: Decimal,
    /// Base 4: other personal contributions.
    pub rem_impo4: Decimal,
    /// Base 5.
    pub rem_impo5: Decimal,
    /// Base 6: investigator base (statutory floor applies).
    pub rem_impo6: Decimal,
    /// Base 7 (type-91 concepts).
    pub rem_impo7: Decimal,
    /// Base 8: `Remuner78805`.
    pub rem_impo8: Decimal,
    /// Base 9: ART base, re-clamped against base 4.
    pub rem_impo9: Decimal,

    // -- concept aggregates -------------------------------------------------
    pub sac: Decimal,
    pub no_remun: Decimal,
    pub sueldo_adicc: Decimal,
    pub horas_extras: Decimal,
    pub nro_horas_ext: i32,
    pub zona_desfav: Decimal,
    pub vacaciones: Decimal,
    pub premios: Decimal,
    pub adicionales: Decimal,
    pub maternidad: Decimal,
    pub rectificacion_remun: Decimal,
    pub asig_fam_pag: Decimal,
    pub aporte_vol: Decimal,
    pub imp_adic_os: Decimal,
    pub aporte_adic_os: Decimal,
    pub seguro_vida: bool,

    // -- categorical ---------------------------------------------------------
    /// 1 = general, 2 = investigator.
    pub tipo_de_operacion: i16,
    pub prioridad_tipo_actividad: i32,
    pub trabajador_convencionado: String,
    /// Set when the differential-category rule zeroed `rem_impo1`.
    pub categoria_diferencial: bool,

    // -- revista ------------------------------------------------------------
    pub sit_rev1: i32,
    pub dia_ini_sit_rev1: i32,
    pub sit_rev2: i32,
    pub dia_ini_sit_rev2: i32,
    pub sit_rev3: i32,
    pub dia_ini_sit_rev3: i32,

    // -- misc NOT NULL columns ----------------------------------------------
    pub cant_dias_trab: i32,
    pub marca_reduccion: i32,
    pub tipo_empresa: i32,

    // -- metadata ------------------------------------------------------------
    pub fecha_procesamiento: DateTime<Utc>,
    pub version_sistema: String,
    pub metodo_procesamiento: String,

    // -- validation ----------------------------------------------------------
    pub valid: bool,
    pub motivo_rechazo: Option<MotivoRechazo>,
}

impl SicossRecord {
    /// Zero-initialized record carrying the legajo's identity and
    /// classification columns. Monetary columns start at zero; the engine
    /// stages fill them in.
    pub fn nuevo(periodo: PeriodoFiscal, legajo: &Legajo) -> Self {
        Self {
            periodo_fiscal: periodo,
            nro_legaj: legajo.nro_legaj,
            cuil: legajo.cuil.clone(),
            apnom: legajo.apnom.clone(),
            conyuge: legajo.conyuge,
            cant_hijos: legajo.hijos,
            cant_adh: legajo.adherentes,
            cod_situacion: legajo.cod_situacion,
            cod_cond: legajo.cod_condicion,
            cod_act: legajo.cod_actividad,
            cod_zona: legajo.cod_zona,
            porc_aporte: Decimal::ZERO,
            cod_mod_cont: legajo.cod_mod_contratacion,
            cod_os: legajo.cod_obra_social.clone(),
            regimen: legajo.regimen.clone(),
            rem_total: Decimal::ZERO,
            rem_impo1: Decimal::ZERO,
            rem_impo2: Decimal::ZERO,
            rem_impo3: Decimal::ZERO,
            rem_impo4: Decimal::ZERO,
            rem_impo5: Decimal::ZERO,
            rem_impo6: Decimal::ZERO,
            rem_impo7: Decimal::ZERO,
            rem_impo8: Decimal::ZERO,
            rem_impo9: Decimal::ZERO,
            sac: Decimal::ZERO,
            no_remun: Decimal::ZERO,
            sueldo_adicc: Decimal::ZERO,
            horas_extras: Decimal::ZERO,
            nro_horas_ext: 0,
            zona_desfav: Decimal::ZERO,
            vacaciones: Decimal::ZERO,
            premios: Decimal::ZERO,
            adicionales: Decimal::ZERO,
            maternidad: Decimal::ZERO,
            rectificacion_remun: Decimal::ZERO,
            asig_fam_pag: Decimal::ZERO,
            aporte_vol: Decimal::ZERO,
            imp_adic_os: Decimal::ZERO,
            aporte_adic_os: Decimal::ZERO,
            seguro_vida: false,
            tipo_de_operacion: 1,
            prioridad_tipo_actividad: legajo.cod_actividad,
            trabajador_convencionado: legajo.trabajador_convencionado.clone(),
            categoria_diferencial: false,
            sit_rev1: legajo.cod_situacion,
            dia_ini_sit_rev1: 1,
            sit_rev2: 0,
            dia_ini_sit_rev2: 0,
            sit_rev3: 0,
            dia_ini_sit_rev3: 0,
            cant_dias_trab: 30,
            marca_reduccion: 0,
            tipo_empresa: 0,
            fecha_procesamiento: Utc::now(),
            version_sistema: String::new(),
            metodo_procesamiento: String::new(),
            valid: true,
            motivo_rechazo: None,
        }
    }

    /// All monetary output columns, for clamping and invariant checks.
    fn columnas_monetarias(&self) -> [(&'static str, Decimal); 20] {
        [
            ("rem_total", self.rem_total),
            ("rem_impo1", self.rem_impo1),
            ("rem_impo2", self.rem_impo2),
            ("rem_impo3", self.rem_impo3),
            ("rem_impo4", self.rem_impo4),
            ("rem_impo5", self.rem_impo5),
            ("rem_impo6", self.rem_impo6),
            ("rem_impo7", self.rem_impo7),
            ("rem_impo8", self.rem_impo8),
            ("rem_impo9", self.rem_impo9),
            ("sac", self.sac),
            ("no_remun", self.no_remun),
            ("sueldo_adicc", self.sueldo_adicc),
            ("horas_extras", self.horas_extras),
            ("zona_desfav", self.zona_desfav),
            ("vacaciones", self.vacaciones),
            ("premios", self.premios),
            ("adicionales", self.adicionales),
            ("maternidad", self.maternidad),
            ("asig_fam_pag", self.asig_fam_pag),
        ]
    }

    /// Check invariants I1–I7 against this row.
    ///
    /// `remuner_78805` is the consolidated remunerative total the engine
    /// computed for this employee (base 8).
    pub fn verificar_invariantes(&self, remuner_78805: Decimal) -> Result<(), SicossError> {
        let violacion = |invariante, detalle: String| SicossError::InvariantViolation {
            nro_legaj: self.nro_legaj,
            invariante,
            detalle,
        };

        // I1 — skipped when the differential rule fired: I6 takes over.
        if !self.categoria_diferencial && self.rem_impo1 != remuner_78805 {
            return Err(violacion(
                Invariante::I1,
                format!("rem_impo1 {} != Remuner78805 {}", self.rem_impo1, remuner_78805),
            ));
        }

        // I2
        if self.rem_total != remuner_78805 + self.no_remun {
            return Err(violacion(
                Invariante::I2,
                format!(
                    "rem_total {} != Remuner78805 {} + no_remun {}",
                    self.rem_total, remuner_78805, self.no_remun
                ),
            ));
        }

        // I3
        let banda_i3 = self.rem_impo5 * Decimal::new(110, 2);
        if self.rem_impo4.is_sign_negative() || self.rem_impo4 > banda_i3 {
            return Err(violacion(
                Invariante::I3,
                format!("rem_impo4 {} fuera de [0, {banda_i3}]", self.rem_impo4),
            ));
        }

        // I4
        let banda_i4 = self.rem_impo4 * Decimal::new(105, 2);
        if self.rem_impo9.is_sign_negative() || self.rem_impo9 > banda_i4 {
            return Err(violacion(
                Invariante::I4,
                format!("rem_impo9 {} fuera de [0, {banda_i4}]", self.rem_impo9),
            ));
        }

        // I5
        if self.prioridad_tipo_actividad >= 38 {
            if self.rem_impo6 < crate::config::PISO_IMPONIBLE_INVESTIGADOR {
                return Err(violacion(
                    Invariante::I5,
                    format!("rem_impo6 {} bajo el piso de investigador", self.rem_impo6),
                ));
            }
            if self.tipo_de_operacion != 2 {
                return Err(violacion(
                    Invariante::I5,
                    format!("tipo_de_operacion {} != 2", self.tipo_de_operacion),
                ));
            }
        }

        // I6
        if self.categoria_diferencial && !self.rem_impo1.is_zero() {
            return Err(violacion(
                Invariante::I6,
                format!("categoría diferencial con rem_impo1 {}", self.rem_impo1),
            ));
        }

        // I7
        for (nombre, valor) in self.columnas_monetarias() {
            if valor.is_sign_negative() || valor > TOPE_ABSOLUTO_IMPORTE {
                return Err(violacion(
                    Invariante::I7,
                    format!("{nombre} {valor} fuera de [0, {TOPE_ABSOLUTO_IMPORTE}]"),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn legajo_base() -> Legajo {
        Legajo {
            nro_legaj: 100,
            cuil: "20123456789".into(),
            apnom: "PEREZ JUAN".into(),
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
        }
    }

    fn record_consistente() -> (SicossRecord, Decimal) {
        let periodo: PeriodoFiscal = "202501".parse().unwrap();
        let mut r = SicossRecord::nuevo(periodo, &legajo_base());
        let remuner = dec!(500000);
        r.rem_impo1 = remuner;
        r.rem_impo2 = remuner;
        r.rem_impo3 = remuner;
        r.rem_impo4 = remuner;
        r.rem_impo5 = remuner;
        r.rem_impo8 = remuner;
        r.rem_impo9 = remuner;
        r.rem_total = remuner;
        (r, remuner)
    }

    #[test]
    fn zero_initialized_record_passes_invariants() {
        let periodo: PeriodoFiscal = "202501".parse().unwrap();
        let r = SicossRecord::nuevo(periodo, &legajo_base());
        assert!(r.verificar_invariantes(Decimal::ZERO).is_ok());
    }

    #[test]
    fn consistent_record_passes() {
        let (r, remuner) = record_consistente();
        assert!(r.verificar_invariantes(remuner).is_ok());
    }

    #[test]
    fn i1_detects_impo1_mismatch() {
        let (mut r, remuner) = record_consistente();
        r.rem_impo1 = dec!(1);
        let err = r.verificar_invariantes(remuner).unwrap_err();
        assert!(err.to_string().contains("I1"));
    }

    #[test]
    fn i4_detects_art_band_breach() {
        let (mut r, remuner) = record_consistente();
        r.rem_impo9 = r.rem_impo4 * dec!(1.06);
        let err = r.verificar_invariantes(remuner).unwrap_err();
        assert!(err.to_string().contains("I4"));
    }

    #[test]
    fn i6_differential_zeroes_only_impo1() {
        let (mut r, remuner) = record_consistente();
        r.categoria_diferencial = true;
        r.rem_impo1 = Decimal::ZERO;
        assert!(r.verificar_invariantes(remuner).is_ok());

        r.rem_impo1 = dec!(10);
        let err = r.verificar_invariantes(remuner).unwrap_err();
        assert!(err.to_string().contains("I6"));
    }

    #[test]
    fn i7_detects_out_of_range_amount() {
        let (mut r, remuner) = record_consistente();
        r.premios = dec!(50000001);
        let err = r.verificar_invariantes(remuner).unwrap_err();
        assert!(err.to_string().contains("I7"));
    }
}
