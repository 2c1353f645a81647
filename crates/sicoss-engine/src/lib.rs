//! # sicoss-engine — Computation Core
//!
//! The deterministic bulk transformation from extracted per-employee
//! records and per-concept line items into the final SICOSS record set:
//!
//! 1. [`conceptos`] — fold the tagged concept stream into per-employee
//!    consolidated columns and derive the remunerative bases.
//! 2. [`calculos`] — secondary contribution bases, operation type,
//!    family allowances.
//! 3. [`topes`] — the statutory-cap state machine and the
//!    differential-category rule.
//! 4. [`validador`] — the final inclusion predicate.
//! 5. [`totales`] — order-independent totals and statistics.
//! 6. [`pipeline`] — the step driver with metrics, cancellation and
//!    per-employee parallelism.
//!
//! The crate is I/O free; extraction and persistence live in `sicoss-db`.
//! Given identical inputs the output record set is identical modulo the
//! processing timestamp.

pub mod calculos;
pub mod conceptos;
pub mod pipeline;
pub mod topes;
pub mod totales;
pub mod validador;

pub use conceptos::{ConsolidadoLegajo, TopeObservado};
pub use pipeline::{
    MetricasProcesamiento, ProcesadorSicoss, ResultadoProcesamiento, METODO_PROCESAMIENTO,
    VERSION_SISTEMA,
};
pub use totales::{Estadisticas, Totales};
