//! # Extraction Row Types
//!
//! Typed rows for the four tables the extractor produces per fiscal period:
//! legajos, conceptos, otra actividad and obra social. These are inputs to
//! the engine; they are constructed once per run and never mutated.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Employee number, the primary key within a period.
pub type NroLegajo = i64;

/// One employee master row, as extracted from the HR store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legajo {
    pub nro_legaj: NroLegajo,
    /// 11-digit numeric string.
    pub cuil: String,
    /// Surname + name, at most 40 characters after persistence truncation.
    pub apnom: String,

    pub cod_situacion: i32,
    pub cod_condicion: i32,
    pub cod_actividad: i32,
    pub cod_zona: i32,
    pub cod_mod_contratacion: i32,
    pub cod_obra_social: String,
    /// Retirement regime marker, one character.
    pub regimen: String,

    pub conyuge: bool,
    pub hijos: i32,
    pub adherentes: i32,

    pub licencia: bool,
    /// Retro-only liquidation with no current activity.
    #[serde(default)]
    pub retro_sin_actividad: bool,
    /// One character, e.g. "S"/"N".
    pub trabajador_convencionado: String,
    #[serde(default)]
    pub provincia_localidad: String,
}

/// Salary scale marker carried by some concepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Escalafon {
    /// Teaching scale (docente).
    Doce,
    /// Administrative scale (autoridades).
    Auto,
    /// Non-teaching scale.
    Nodo,
}

/// One liquidated pay concept for one employee.
///
/// `tipos_grupos` is a set of small classification-group tags; a single
/// row may carry several and therefore contribute to several aggregate
/// columns. Negative `impp_conce` is a reversal and flows through sums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concepto {
    pub nro_legaj: NroLegajo,
    pub codn_conce: i32,
    pub impp_conce: Decimal,
    pub tipos_grupos: Vec<u8>,
    /// 'C' (current) or 'N'.
    pub tipo_conce: char,
    pub nro_orimp: i32,
    /// Units liquidated (hour count for overtime concepts).
    #[serde(default)]
    pub cantidad: Decimal,
    #[serde(default)]
    pub escalafon: Option<Escalafon>,
}

/// Contributions at other employers, credited against this employer's
/// personal caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtraActividad {
    pub nro_legaj: NroLegajo,
    /// Amount already contributed toward the retirement cap elsewhere.
    pub importe_jubilatorio: Decimal,
    /// Amount already contributed toward the other-contributions cap.
    pub importe_otros: Decimal,
}

/// Health-insurance code per employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObraSocialCode {
    pub nro_legaj: NroLegajo,
    pub cod_os: String,
}

/// The four tables one extraction produces for a fiscal period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatosExtraidos {
    pub legajos: Vec<Legajo>,
    pub conceptos: Vec<Concepto>,
    pub otra_actividad: Vec<OtraActividad>,
    pub obra_social: Vec<ObraSocialCode>,
}

impl DatosExtraidos {
    pub fn is_empty(&self) -> bool {
        self.legajos.is_empty()
    }
}
