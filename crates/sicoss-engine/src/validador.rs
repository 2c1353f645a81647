//! # Final Validation
//!
//! Inclusion predicate evaluated per employee after the cap engine. Rows
//! keep a `valid` flag and a machine-readable reason; only valid rows reach
//! the persister. Maternity situations (5, 11) and job-reserve (14) are
//! always kept regardless of amounts.

use sicoss_core::{MotivoRechazo, SicossConfig};

use crate::conceptos::ConsolidadoLegajo;

/// Situation codes that bypass the amount checks.
const SITUACIONES_PROTEGIDAS: &[i32] = &[5, 11, 14];

/// Evaluate the inclusion predicate for one row.
///
/// Returns `None` when the row is included, or the rejection reason.
pub fn evaluar(fila: &ConsolidadoLegajo, config: &SicossConfig) -> Option<MotivoRechazo> {
    if SITUACIONES_PROTEGIDAS.contains(&fila.legajo.cod_situacion) {
        return None;
    }

    let sin_remuneracion = fila.remuner_78805.is_zero()
        && fila.importe_impon.is_zero()
        && fila.importe_sac.is_zero();

    if config.check_lic && fila.legajo.licencia && sin_remuneracion {
        return Some(MotivoRechazo::LicSinRemuneracion);
    }

    if config.check_retro && fila.legajo.retro_sin_actividad {
        return Some(MotivoRechazo::RetroSinActividad);
    }

    // The differential rule legitimately zeroes the primary base; those
    // rows are still reported.
    if config.check_sin_activo
        && fila.importe_impon.is_zero()
        && fila.importe_imponible_4.is_zero()
        && fila.importe_sac.is_zero()
        && !fila.categoria_diferencial
    {
        return Some(MotivoRechazo::SinActivo);
    }

    None
}
