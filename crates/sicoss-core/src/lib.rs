//! # sicoss-core — Shared Domain Types
//!
//! Domain vocabulary for the SICOSS payroll-declaration engine: the fiscal
//! period value object, the processing configuration, the typed extraction
//! rows, the wide output record with its cross-field invariants, the error
//! taxonomy and the cooperative cancellation token.
//!
//! This crate holds no I/O and no algorithm — the computation lives in
//! `sicoss-engine`, the Postgres plumbing in `sicoss-db`.

pub mod cancel;
pub mod config;
pub mod error;
pub mod periodo;
pub mod record;
pub mod tipos;

pub use cancel::CancelToken;
pub use config::{SicossConfig, PISO_IMPONIBLE_INVESTIGADOR, TOPE_ABSOLUTO_IMPORTE};
pub use error::{Invariante, SicossError};
pub use periodo::PeriodoFiscal;
pub use record::{MotivoRechazo, SicossRecord};
pub use tipos::{
    Concepto, DatosExtraidos, Escalafon, Legajo, NroLegajo, ObraSocialCode, OtraActividad,
};
