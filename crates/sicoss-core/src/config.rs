//! # Processing Configuration
//!
//! One immutable configuration value with explicitly enumerated fields.
//! The caps (`topes`) drive the truncation engine; the `check_*` flags
//! drive the final validator; the differential sets drive the
//! differential-category rule. Read-only for the duration of a run.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::SicossError;

/// Statutory minimum for `ImporteImponible_6` when the employee carries
/// investigator priority (class >= 38). Centavos included.
pub const PISO_IMPONIBLE_INVESTIGADOR: Decimal = Decimal::from_parts(6_929_019, 0, 0, false, 2);

/// Upper clamp for every monetary output column.
pub const TOPE_ABSOLUTO_IMPORTE: Decimal = Decimal::from_parts(50_000_000, 0, 0, false, 0);

/// Configuration for one SICOSS processing run.
///
/// Constructed once per run and never mutated. `validar()` must pass before
/// the pipeline starts; negative caps are a fatal pre-flight error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SicossConfig {
    /// Employer-side retirement cap applied to `ImporteImponiblePatronal`.
    pub tope_jubilatorio_patronal: Decimal,
    /// Personal retirement cap applied to `Imponible_1`.
    pub tope_jubilatorio_personal: Decimal,
    /// Cap on other personal contributions, applied to `Imponible_4`.
    pub tope_otros_aportes_personales: Decimal,
    /// When false, caps are reported but no value is changed.
    pub trunca_tope: bool,

    /// Exclude employees on license with zero remunerative bases.
    #[serde(default)]
    pub check_lic: bool,
    /// Exclude retro-only employees with no current activity.
    #[serde(default)]
    pub check_retro: bool,
    /// Exclude (and zero, via the differential rule) employees whose
    /// remunerative mass was fully consumed by prior caps.
    #[serde(default)]
    pub check_sin_activo: bool,

    /// Pay family allowances (1000 per child, 500 per spouse).
    #[serde(default)]
    pub asignacion_familiar: bool,
    /// Value stamped into `TrabajadorConvencionado` when the legajo carries
    /// no value of its own.
    #[serde(default = "default_convencionado")]
    pub trabajador_convencionado: String,
    /// Report scholarship holders (`InformarBecarios`).
    #[serde(default)]
    pub informar_becarios: bool,
    /// Apply the ART cap band to `Imponible_9`.
    #[serde(default = "default_true")]
    pub art_con_tope: bool,
    /// Include non-remunerative concepts in the ART base.
    #[serde(default)]
    pub conceptos_no_remun_en_art: bool,
    /// Additional retirement contribution percentage (`porc_aporte`).
    #[serde(default)]
    pub porc_aporte_adicional_jubilacion: Decimal,

    /// Activity codes that place an employee in the differential category.
    #[serde(default)]
    pub differential_activity_codes: BTreeSet<i32>,
    /// Investigator priority classes treated as differential regime.
    #[serde(default = "default_differential_investigator_classes")]
    pub differential_investigator_classes: BTreeSet<i32>,
}

fn default_convencionado() -> String {
    "S".to_string()
}

fn default_true() -> bool {
    true
}

fn default_differential_investigator_classes() -> BTreeSet<i32> {
    BTreeSet::from([48, 49])
}

impl SicossConfig {
    /// Minimal constructor used by tests and the API defaults: caps plus
    /// truncation switch, everything else at its default.
    pub fn con_topes(
        tope_jubilatorio_patronal: Decimal,
        tope_jubilatorio_personal: Decimal,
        tope_otros_aportes_personales: Decimal,
        trunca_tope: bool,
    ) -> Self {
        Self {
            tope_jubilatorio_patronal,
            tope_jubilatorio_personal,
            tope_otros_aportes_personales,
            trunca_tope,
            check_lic: false,
            check_retro: false,
            check_sin_activo: false,
            asignacion_familiar: false,
            trabajador_convencionado: default_convencionado(),
            informar_becarios: false,
            art_con_tope: true,
            conceptos_no_remun_en_art: false,
            porc_aporte_adicional_jubilacion: Decimal::ZERO,
            differential_activity_codes: BTreeSet::new(),
            differential_investigator_classes: default_differential_investigator_classes(),
        }
    }

    /// SAC share of the personal retirement cap.
    pub fn tope_sac_jubilatorio_pers(&self) -> Decimal {
        self.tope_jubilatorio_personal / Decimal::TWO
    }

    /// SAC share of the employer retirement cap.
    pub fn tope_sac_jubilatorio_patr(&self) -> Decimal {
        self.tope_jubilatorio_patronal / Decimal::TWO
    }

    /// SAC share of the other-contributions cap.
    pub fn tope_sac_jubilatorio_otro_ap(&self) -> Decimal {
        self.tope_otros_aportes_personales / Decimal::TWO
    }

    /// Pre-flight validation. Any negative cap is fatal.
    pub fn validar(&self) -> Result<(), SicossError> {
        for (nombre, valor) in [
            ("tope_jubilatorio_patronal", self.tope_jubilatorio_patronal),
            ("tope_jubilatorio_personal", self.tope_jubilatorio_personal),
            (
                "tope_otros_aportes_personales",
                self.tope_otros_aportes_personales,
            ),
        ] {
            if valor.is_sign_negative() {
                return Err(SicossError::InvalidConfig(format!(
                    "{nombre} negativo: {valor}"
                )));
            }
        }
        if self.porc_aporte_adicional_jubilacion.is_sign_negative() {
            return Err(SicossError::InvalidConfig(format!(
                "porc_aporte_adicional_jubilacion negativo: {}",
                self.porc_aporte_adicional_jubilacion
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sac_caps_are_half_of_their_base_cap() {
        let cfg = SicossConfig::con_topes(dec!(800000), dec!(600000), dec!(700000), true);
        assert_eq!(cfg.tope_sac_jubilatorio_patr(), dec!(400000));
        assert_eq!(cfg.tope_sac_jubilatorio_pers(), dec!(300000));
        assert_eq!(cfg.tope_sac_jubilatorio_otro_ap(), dec!(350000));
    }

    #[test]
    fn negative_cap_is_rejected() {
        let cfg = SicossConfig::con_topes(dec!(-1), dec!(600000), dec!(700000), true);
        let err = cfg.validar().unwrap_err();
        assert!(err.to_string().contains("tope_jubilatorio_patronal"));
    }

    #[test]
    fn valid_config_passes_preflight() {
        let cfg = SicossConfig::con_topes(dec!(800000), dec!(600000), dec!(700000), false);
        assert!(cfg.validar().is_ok());
    }

    #[test]
    fn investigator_floor_constant_has_centavos() {
        assert_eq!(PISO_IMPONIBLE_INVESTIGADOR, dec!(69290.19));
    }

    #[test]
    fn deserializes_with_defaults() {
        let cfg: SicossConfig = serde_json::from_str(
            r#"{
                "tope_jubilatorio_patronal": "800000.00",
                "tope_jubilatorio_personal": "600000.00",
                "tope_otros_aportes_personales": "700000.00",
                "trunca_tope": true
            }"#,
        )
        .unwrap();
        assert!(cfg.art_con_tope);
        assert_eq!(cfg.trabajador_convencionado, "S");
        assert!(cfg.differential_investigator_classes.contains(&48));
        assert!(cfg.differential_activity_codes.is_empty());
    }
}
