//! # Application State
//!
//! Shared state for the Axum application: the runtime default
//! configuration (read-mostly, replaceable via `PUT /sicoss/config`), the
//! optional Postgres pool, and the set of fiscal periods currently being
//! processed — the backpressure guard behind the 409 response.
//!
//! Locks are `parking_lot` and never held across `.await` points.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use sicoss_core::{PeriodoFiscal, SicossConfig};
use sqlx::PgPool;

/// Runtime defaults used when the request carries no `config_topes`.
fn config_por_defecto() -> SicossConfig {
    SicossConfig::con_topes(
        Decimal::from(800_000),
        Decimal::from(600_000),
        Decimal::from(700_000),
        true,
    )
}

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    config: Arc<RwLock<SicossConfig>>,
    pub db_pool: Option<PgPool>,
    periodos_en_proceso: Arc<Mutex<HashSet<String>>>,
}

impl AppState {
    pub fn new(db_pool: Option<PgPool>) -> Self {
        Self {
            config: Arc::new(RwLock::new(config_por_defecto())),
            db_pool,
            periodos_en_proceso: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Snapshot of the current runtime configuration.
    pub fn config(&self) -> SicossConfig {
        self.config.read().clone()
    }

    /// Replace the runtime configuration (already validated).
    pub fn set_config(&self, config: SicossConfig) {
        *self.config.write() = config;
    }

    /// Claim a period for processing. Returns a guard that releases the
    /// claim on drop, or `None` when the period is already in flight.
    pub fn comenzar_periodo(&self, periodo: PeriodoFiscal) -> Option<PeriodoEnCurso> {
        let clave = periodo.as_periodo_str();
        let mut en_proceso = self.periodos_en_proceso.lock();
        if !en_proceso.insert(clave.clone()) {
            return None;
        }
        Some(PeriodoEnCurso {
            clave,
            registro: Arc::clone(&self.periodos_en_proceso),
        })
    }
}

/// RAII claim over one fiscal period.
pub struct PeriodoEnCurso {
    clave: String,
    registro: Arc<Mutex<HashSet<String>>>,
}

impl Drop for PeriodoEnCurso {
    fn drop(&mut self) {
        self.registro.lock().remove(&self.clave);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_config_matches_runtime_defaults() {
        let state = AppState::new(None);
        let cfg = state.config();
        assert_eq!(cfg.tope_jubilatorio_patronal, dec!(800000));
        assert!(cfg.trunca_tope);
    }

    #[test]
    fn period_claim_is_exclusive_until_dropped() {
        let state = AppState::new(None);
        let periodo: PeriodoFiscal = "202501".parse().unwrap();

        let guard = state.comenzar_periodo(periodo).unwrap();
        assert!(state.comenzar_periodo(periodo).is_none());

        drop(guard);
        assert!(state.comenzar_periodo(periodo).is_some());
    }

    #[test]
    fn different_periods_do_not_conflict() {
        let state = AppState::new(None);
        let a: PeriodoFiscal = "202501".parse().unwrap();
        let b: PeriodoFiscal = "202502".parse().unwrap();

        let _ga = state.comenzar_periodo(a).unwrap();
        assert!(state.comenzar_periodo(b).is_some());
    }

    #[test]
    fn config_can_be_replaced() {
        let state = AppState::new(None);
        let mut cfg = state.config();
        cfg.trunca_tope = false;
        state.set_config(cfg);
        assert!(!state.config().trunca_tope);
    }
}
