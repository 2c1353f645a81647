//! # Error Taxonomy
//!
//! One error enum for the whole computation core. Stages raise; the
//! pipeline driver catches, rolls back any open persister transaction and
//! surfaces the error structured. Nothing is recovered locally — retrying
//! an entire run is a caller concern.

use thiserror::Error;

/// Identifier of a violated cross-field invariant (I1..I7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariante {
    /// `rem_impo1 == Remuner78805`.
    I1,
    /// `rem_total == Remuner78805 + no_remun`.
    I2,
    /// `0 <= rem_impo4 <= rem_impo5 * 1.10`.
    I3,
    /// `0 <= rem_impo9 <= rem_impo4 * 1.05`.
    I4,
    /// Investigator floor on `rem_impo6` and `TipoDeOperacion == 2`.
    I5,
    /// Differential category zeroes only `rem_impo1`.
    I6,
    /// All monetary outputs within `[0, 5e7]`.
    I7,
}

impl std::fmt::Display for Invariante {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = match self {
            Self::I1 => "I1",
            Self::I2 => "I2",
            Self::I3 => "I3",
            Self::I4 => "I4",
            Self::I5 => "I5",
            Self::I6 => "I6",
            Self::I7 => "I7",
        };
        f.write_str(id)
    }
}

/// Errors raised by the SICOSS pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum SicossError {
    /// Configuration rejected pre-flight (negative caps, bad period string,
    /// unknown differential class set).
    #[error("configuración inválida: {0}")]
    InvalidConfig(String),

    /// HR-store extraction failed after retries.
    #[error("extracción fallida: {0}")]
    ExtractionFailed(String),

    /// Post-aggregation the consolidated mass does not reconcile with the
    /// mapped concept mass. Fatal: no partial persistence.
    #[error("consolidación incompleta: {0}")]
    ConsolidationIncomplete(String),

    /// A cross-field invariant failed after a stage.
    #[error("invariante {invariante} violada para legajo {nro_legaj}: {detalle}")]
    InvariantViolation {
        nro_legaj: i64,
        invariante: Invariante,
        detalle: String,
    },

    /// Bulk insert rolled back. Carries the offending row and column when
    /// the failure is attributable to one.
    #[error("persistencia fallida en fila {row_index}, columna {column}: {detalle}")]
    PersistenceFailed {
        row_index: usize,
        column: String,
        detalle: String,
    },

    /// Cooperative cancellation observed. Not an error from the API's
    /// perspective.
    #[error("procesamiento cancelado")]
    Cancelled,
}

impl SicossError {
    /// Machine-readable kind, used by the API layer for status mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "invalid_config",
            Self::ExtractionFailed(_) => "extraction_failed",
            Self::ConsolidationIncomplete(_) => "consolidation_incomplete",
            Self::InvariantViolation { .. } => "invariant_violation",
            Self::PersistenceFailed { .. } => "persistence_failed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_violation_names_legajo_and_id() {
        let err = SicossError::InvariantViolation {
            nro_legaj: 12345,
            invariante: Invariante::I4,
            detalle: "rem_impo9 excede banda ART".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("I4"));
        assert!(msg.contains("12345"));
    }

    #[test]
    fn persistence_failure_names_row_and_column() {
        let err = SicossError::PersistenceFailed {
            row_index: 7,
            column: "cuil".into(),
            detalle: "longitud 10, esperado 11".into(),
        };
        assert!(err.to_string().contains("fila 7"));
        assert!(err.to_string().contains("cuil"));
        assert_eq!(err.kind(), "persistence_failed");
    }
}
