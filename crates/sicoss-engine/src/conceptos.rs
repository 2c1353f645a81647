//! # Concept Consolidation
//!
//! Folds the concept line-item stream into per-employee consolidated
//! columns. Each concept row carries a *set* of classification-group tags;
//! a row tagged `{g1..gk}` contributes once per mapped tag, so the same
//! amount can land in several aggregates (e.g. a teaching-scale SAC concept
//! feeds both the SAC column and the SAC-docente memo column).
//!
//! The tag → column mapping is one static table, covered by table-driven
//! tests. Unrecognized tags are logged and ignored; they do not contribute
//! to `Remuner78805`.
//!
//! Contract: total monetary mass is preserved — the sum of exploded mapped
//! contributions equals the sum of destination column totals. A mismatch is
//! a fatal `ConsolidationIncomplete`.

use std::collections::HashMap;

use rust_decimal::Decimal;
use sicoss_core::{
    Concepto, Escalafon, Legajo, NroLegajo, ObraSocialCode, OtraActividad, SicossError,
};

// ---------------------------------------------------------------------------
// Group tag table
// ---------------------------------------------------------------------------

/// Destination aggregate column for one group-tag contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destino {
    Sac,
    /// Memo column for teaching-scale SAC (tag 9 with escalafón DOCE).
    SacDoce,
    HorasExtras,
    ZonaDesfavorable,
    Vacaciones,
    Premios,
    Adicionales,
    Becario,
    NoRemun,
    Maternidad,
    SeguroVida,
    AsignacionesFamiliares,
    /// Investigator subtype; `clase` is the activity class it establishes.
    Investigador {
        clase: i32,
    },
}

/// Known group tags. Kept as data so the mapping has exactly one home.
pub const GRUPOS_CONOCIDOS: &[u8] = &[1, 3, 4, 5, 6, 7, 8, 9, 11, 12, 13, 14, 15, 21, 22, 45, 46, 48, 49];

/// Map one `(tag, escalafón)` pair to its destination columns.
///
/// Returns `None` for tags outside the table.
pub fn destinos_de_grupo(tag: u8, escalafon: Option<Escalafon>) -> Option<Vec<Destino>> {
    let destinos = match tag {
        1 => vec![Destino::Sac],
        3 => vec![Destino::ZonaDesfavorable],
        4 => vec![Destino::Vacaciones],
        5 => vec![Destino::Premios],
        6 => vec![Destino::HorasExtras],
        7 => vec![Destino::Adicionales],
        8 => vec![Destino::Becario],
        9 => match escalafon {
            Some(Escalafon::Doce) => vec![Destino::Sac, Destino::SacDoce],
            _ => vec![Destino::Sac],
        },
        11..=15 => vec![Destino::Investigador {
            clase: 38 + i32::from(tag - 11),
        }],
        21 => vec![Destino::NoRemun],
        22 => vec![Destino::Maternidad],
        45 => vec![Destino::SeguroVida],
        46 => vec![Destino::AsignacionesFamiliares],
        48 | 49 => vec![Destino::Investigador {
            clase: i32::from(tag),
        }],
        _ => return None,
    };
    Some(destinos)
}

// ---------------------------------------------------------------------------
// Consolidated per-employee row
// ---------------------------------------------------------------------------

/// The per-employee wide row the engine stages operate on.
///
/// Built by the consolidator, enriched by the calculator, reshaped by the
/// cap engine, classified by the validator. Conceptually each stage maps
/// `State_n -> State_{n+1}`; in practice the stages own `&mut` access one
/// at a time and there is no cross-employee dependency.
#[derive(Debug, Clone)]
pub struct ConsolidadoLegajo {
    pub legajo: Legajo,
    /// Health-insurance code after the obra-social join ("000000" default).
    pub cod_os: String,

    // -- aggregate columns (one per destination) ----------------------------
    pub importe_sac: Decimal,
    pub importe_sac_doce: Decimal,
    pub importe_horas_extras: Decimal,
    pub cantidad_horas_extras: Decimal,
    pub importe_zona_desfavorable: Decimal,
    pub importe_vacaciones: Decimal,
    pub importe_premios: Decimal,
    pub importe_adicionales: Decimal,
    pub importe_no_remun: Decimal,
    pub importe_imponible_becario: Decimal,
    pub importe_investigador: Decimal,
    pub importe_maternidad: Decimal,
    pub importe_seguro_vida: Decimal,
    pub importe_asignaciones_familiares: Decimal,
    /// Highest investigator activity class among contributing tags.
    pub clase_investigador: Option<i32>,

    // -- derived bases ------------------------------------------------------
    pub remuner_78805: Decimal,
    pub importe_imponible_patronal: Decimal,
    pub importe_sac_patronal: Decimal,
    pub importe_imponible_sin_sac: Decimal,
    pub importe_bruto: Decimal,
    /// `Imponible_1`; the differential-category rule may zero it.
    pub importe_impon: Decimal,

    // -- secondary bases (calculator) ---------------------------------------
    pub importe_imponible_4: Decimal,
    pub importe_imponible_5: Decimal,
    pub importe_imponible_6: Decimal,
    pub importe_imponible_9: Decimal,

    // -- categorical --------------------------------------------------------
    pub tipo_de_operacion: i16,
    pub prioridad_tipo_actividad: i32,
    pub asignaciones_familiares_pagadas: Decimal,

    // -- OtraActividad credits ----------------------------------------------
    pub otra_actividad_jubilatorio: Decimal,
    pub otra_actividad_otros: Decimal,

    // -- cap engine outputs -------------------------------------------------
    pub categoria_diferencial: bool,
    /// Caps that fired (or would have fired in report-only mode).
    pub topes_observados: Vec<TopeObservado>,
}

/// Which statutory cap was (or would have been) applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopeObservado {
    Patronal,
    Personal,
    OtrosAportes,
}

impl ConsolidadoLegajo {
    fn nuevo(legajo: Legajo) -> Self {
        Self {
            legajo,
            cod_os: "000000".to_string(),
            importe_sac: Decimal::ZERO,
            importe_sac_doce: Decimal::ZERO,
            importe_horas_extras: Decimal::ZERO,
            cantidad_horas_extras: Decimal::ZERO,
            importe_zona_desfavorable: Decimal::ZERO,
            importe_vacaciones: Decimal::ZERO,
            importe_premios: Decimal::ZERO,
            importe_adicionales: Decimal::ZERO,
            importe_no_remun: Decimal::ZERO,
            importe_imponible_becario: Decimal::ZERO,
            importe_investigador: Decimal::ZERO,
            importe_maternidad: Decimal::ZERO,
            importe_seguro_vida: Decimal::ZERO,
            importe_asignaciones_familiares: Decimal::ZERO,
            clase_investigador: None,
            remuner_78805: Decimal::ZERO,
            importe_imponible_patronal: Decimal::ZERO,
            importe_sac_patronal: Decimal::ZERO,
            importe_imponible_sin_sac: Decimal::ZERO,
            importe_bruto: Decimal::ZERO,
            importe_impon: Decimal::ZERO,
            importe_imponible_4: Decimal::ZERO,
            importe_imponible_5: Decimal::ZERO,
            importe_imponible_6: Decimal::ZERO,
            importe_imponible_9: Decimal::ZERO,
            tipo_de_operacion: 1,
            prioridad_tipo_actividad: 0,
            asignaciones_familiares_pagadas: Decimal::ZERO,
            otra_actividad_jubilatorio: Decimal::ZERO,
            otra_actividad_otros: Decimal::ZERO,
            categoria_diferencial: false,
            topes_observados: Vec::new(),
        }
    }

    fn acumular(&mut self, destino: Destino, importe: Decimal, cantidad: Decimal) {
        match destino {
            Destino::Sac => self.importe_sac += importe,
            Destino::SacDoce => self.importe_sac_doce += importe,
            Destino::HorasExtras => {
                self.importe_horas_extras += importe;
                self.cantidad_horas_extras += cantidad;
            }
            Destino::ZonaDesfavorable => self.importe_zona_desfavorable += importe,
            Destino::Vacaciones => self.importe_vacaciones += importe,
            Destino::Premios => self.importe_premios += importe,
            Destino::Adicionales => self.importe_adicionales += importe,
            Destino::Becario => self.importe_imponible_becario += importe,
            Destino::NoRemun => self.importe_no_remun += importe,
            Destino::Maternidad => self.importe_maternidad += importe,
            Destino::SeguroVida => self.importe_seguro_vida += importe,
            Destino::AsignacionesFamiliares => self.importe_asignaciones_familiares += importe,
            Destino::Investigador { clase } => {
                self.importe_investigador += importe;
                self.clase_investigador =
                    Some(self.clase_investigador.map_or(clase, |c| c.max(clase)));
            }
        }
    }

    /// Sum of the destination columns, for the mass-conservation check.
    fn masa_destinos(&self) -> Decimal {
        self.importe_sac
            + self.importe_sac_doce
            + self.importe_horas_extras
            + self.importe_zona_desfavorable
            + self.importe_vacaciones
            + self.importe_premios
            + self.importe_adicionales
            + self.importe_imponible_becario
            + self.importe_no_remun
            + self.importe_maternidad
            + self.importe_seguro_vida
            + self.importe_asignaciones_familiares
            + self.importe_investigador
    }

    /// Derive the consolidated base columns from the aggregates.
    fn derivar_bases(&mut self) {
        self.remuner_78805 = self.importe_sac
            + self.importe_horas_extras
            + self.importe_zona_desfavorable
            + self.importe_vacaciones
            + self.importe_premios
            + self.importe_adicionales
            + self.importe_imponible_becario;
        self.importe_imponible_patronal = self.remuner_78805;
        self.importe_sac_patronal = self.importe_sac;
        self.importe_imponible_sin_sac =
            self.importe_imponible_patronal - self.importe_sac_patronal;
        self.importe_bruto = self.importe_imponible_patronal + self.importe_no_remun;
        self.importe_impon = self.remuner_78805;
    }
}

// ---------------------------------------------------------------------------
// Consolidation
// ---------------------------------------------------------------------------

/// Consolidate the concept stream onto the legajo roster.
///
/// Employees with no concepts receive all-zero aggregates. Concepts whose
/// `nro_legaj` is not in the roster are counted as orphans and logged.
pub fn consolidar(
    legajos: Vec<Legajo>,
    conceptos: &[Concepto],
    otra_actividad: &[OtraActividad],
    obra_social: &[ObraSocialCode],
) -> Result<Vec<ConsolidadoLegajo>, SicossError> {
    let mut filas: HashMap<NroLegajo, ConsolidadoLegajo> = legajos
        .into_iter()
        .map(|l| (l.nro_legaj, ConsolidadoLegajo::nuevo(l)))
        .collect();

    let mut masa_explotada = Decimal::ZERO;
    let mut huerfanos = 0usize;

    for concepto in conceptos {
        let Some(fila) = filas.get_mut(&concepto.nro_legaj) else {
            huerfanos += 1;
            continue;
        };
        for &tag in &concepto.tipos_grupos {
            match destinos_de_grupo(tag, concepto.escalafon) {
                Some(destinos) => {
                    for destino in destinos {
                        fila.acumular(destino, concepto.impp_conce, concepto.cantidad);
                        masa_explotada += concepto.impp_conce;
                    }
                }
                None => {
                    tracing::warn!(
                        nro_legaj = concepto.nro_legaj,
                        codn_conce = concepto.codn_conce,
                        tipo_grupo = tag,
                        "grupo de concepto no reconocido, ignorado"
                    );
                }
            }
        }
    }

    if huerfanos > 0 {
        tracing::warn!(huerfanos, "conceptos sin legajo en el padrón");
    }

    // Mass conservation: exploded contributions must equal column totals.
    let masa_columnas: Decimal = filas.values().map(ConsolidadoLegajo::masa_destinos).sum();
    if masa_explotada != masa_columnas {
        return Err(SicossError::ConsolidationIncomplete(format!(
            "masa explotada {masa_explotada} != masa consolidada {masa_columnas}"
        )));
    }

    for fila in filas.values_mut() {
        fila.derivar_bases();
    }

    // OtraActividad join; duplicates keep the first occurrence.
    for otra in otra_actividad {
        if let Some(fila) = filas.get_mut(&otra.nro_legaj) {
            if fila.otra_actividad_jubilatorio.is_zero() && fila.otra_actividad_otros.is_zero() {
                fila.otra_actividad_jubilatorio = otra.importe_jubilatorio;
                fila.otra_actividad_otros = otra.importe_otros;
            } else {
                tracing::warn!(
                    nro_legaj = otra.nro_legaj,
                    "otra_actividad duplicada, se conserva la primera"
                );
            }
        }
    }

    for os in obra_social {
        if let Some(fila) = filas.get_mut(&os.nro_legaj) {
            if !os.cod_os.is_empty() {
                fila.cod_os = os.cod_os.clone();
            }
        }
    }

    let mut resultado: Vec<ConsolidadoLegajo> = filas.into_values().collect();
    // Deterministic output order regardless of hash-map iteration.
    resultado.sort_by_key(|f| f.legajo.nro_legaj);
    Ok(resultado)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn legajo(nro: NroLegajo) -> Legajo {
        Legajo {
            nro_legaj: nro,
            cuil: format!("20{nro:08}9"),
            apnom: format!("LEGAJO {nro}"),
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

    fn concepto(nro: NroLegajo, importe: Decimal, tags: &[u8]) -> Concepto {
        Concepto {
            nro_legaj: nro,
            codn_conce: 100,
            impp_conce: importe,
            tipos_grupos: tags.to_vec(),
            tipo_conce: 'C',
            nro_orimp: 1,
            cantidad: Decimal::ZERO,
            escalafon: None,
        }
    }

    // -- tag table ----------------------------------------------------------

    #[test]
    fn every_known_tag_maps_to_a_destination() {
        for &tag in GRUPOS_CONOCIDOS {
            assert!(
                destinos_de_grupo(tag, None).is_some(),
                "tag {tag} sin destino"
            );
        }
    }

    #[test]
    fn tag_table_fixed_mappings() {
        let casos: &[(u8, Destino)] = &[
            (1, Destino::Sac),
            (3, Destino::ZonaDesfavorable),
            (4, Destino::Vacaciones),
            (5, Destino::Premios),
            (6, Destino::HorasExtras),
            (7, Destino::Adicionales),
            (8, Destino::Becario),
            (21, Destino::NoRemun),
            (22, Destino::Maternidad),
            (45, Destino::SeguroVida),
            (46, Destino::AsignacionesFamiliares),
        ];
        for &(tag, esperado) in casos {
            assert_eq!(destinos_de_grupo(tag, None).unwrap(), vec![esperado]);
        }
    }

    #[test]
    fn tag_nine_doce_feeds_sac_and_sac_doce() {
        assert_eq!(
            destinos_de_grupo(9, Some(Escalafon::Doce)).unwrap(),
            vec![Destino::Sac, Destino::SacDoce]
        );
        assert_eq!(
            destinos_de_grupo(9, Some(Escalafon::Nodo)).unwrap(),
            vec![Destino::Sac]
        );
        assert_eq!(destinos_de_grupo(9, None).unwrap(), vec![Destino::Sac]);
    }

    #[test]
    fn investigator_tags_carry_activity_classes() {
        assert_eq!(
            destinos_de_grupo(11, None).unwrap(),
            vec![Destino::Investigador { clase: 38 }]
        );
        assert_eq!(
            destinos_de_grupo(15, None).unwrap(),
            vec![Destino::Investigador { clase: 42 }]
        );
        assert_eq!(
            destinos_de_grupo(48, None).unwrap(),
            vec![Destino::Investigador { clase: 48 }]
        );
        assert_eq!(
            destinos_de_grupo(49, None).unwrap(),
            vec![Destino::Investigador { clase: 49 }]
        );
    }

    #[test]
    fn unknown_tag_has_no_destination() {
        assert!(destinos_de_grupo(2, None).is_none());
        assert!(destinos_de_grupo(99, None).is_none());
    }

    // -- consolidation ------------------------------------------------------

    #[test]
    fn sums_per_employee_and_destination() {
        let filas = consolidar(
            vec![legajo(1)],
            &[
                concepto(1, dec!(100000), &[1]),
                concepto(1, dec!(50000), &[1]),
                concepto(1, dec!(20000), &[6]),
                concepto(1, dec!(7000), &[21]),
            ],
            &[],
            &[],
        )
        .unwrap();

        let fila = &filas[0];
        assert_eq!(fila.importe_sac, dec!(150000));
        assert_eq!(fila.importe_horas_extras, dec!(20000));
        assert_eq!(fila.importe_no_remun, dec!(7000));
    }

    #[test]
    fn multi_tag_concept_contributes_to_each_aggregate() {
        let mut c = concepto(1, dec!(30000), &[9]);
        c.escalafon = Some(Escalafon::Doce);
        let filas = consolidar(vec![legajo(1)], &[c], &[], &[]).unwrap();

        let fila = &filas[0];
        assert_eq!(fila.importe_sac, dec!(30000));
        assert_eq!(fila.importe_sac_doce, dec!(30000));
    }

    #[test]
    fn derives_base_columns() {
        let filas = consolidar(
            vec![legajo(1)],
            &[
                concepto(1, dec!(100000), &[1]),
                concepto(1, dec!(400000), &[7]),
                concepto(1, dec!(50000), &[21]),
            ],
            &[],
            &[],
        )
        .unwrap();

        let fila = &filas[0];
        assert_eq!(fila.remuner_78805, dec!(500000));
        assert_eq!(fila.importe_imponible_patronal, dec!(500000));
        assert_eq!(fila.importe_sac_patronal, dec!(100000));
        assert_eq!(fila.importe_imponible_sin_sac, dec!(400000));
        assert_eq!(fila.importe_bruto, dec!(550000));
        assert_eq!(fila.importe_impon, dec!(500000));
    }

    #[test]
    fn employee_without_concepts_gets_zero_aggregates() {
        let filas = consolidar(
            vec![legajo(1), legajo(2)],
            &[concepto(1, dec!(1000), &[1])],
            &[],
            &[],
        )
        .unwrap();

        let sin_conceptos = filas.iter().find(|f| f.legajo.nro_legaj == 2).unwrap();
        assert_eq!(sin_conceptos.remuner_78805, Decimal::ZERO);
        assert_eq!(sin_conceptos.importe_bruto, Decimal::ZERO);
    }

    #[test]
    fn negative_reversal_flows_through() {
        let filas = consolidar(
            vec![legajo(1)],
            &[
                concepto(1, dec!(1000), &[7]),
                concepto(1, dec!(-250), &[7]),
            ],
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(filas[0].importe_adicionales, dec!(750));
    }

    #[test]
    fn unmapped_group_does_not_reach_remuner() {
        let filas = consolidar(
            vec![legajo(1)],
            &[
                concepto(1, dec!(500), &[1]),
                concepto(1, dec!(999999), &[99]),
            ],
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(filas[0].remuner_78805, dec!(500));
    }

    #[test]
    fn otra_actividad_joins_first_occurrence() {
        let filas = consolidar(
            vec![legajo(1)],
            &[],
            &[
                OtraActividad {
                    nro_legaj: 1,
                    importe_jubilatorio: dec!(100),
                    importe_otros: dec!(200),
                },
                OtraActividad {
                    nro_legaj: 1,
                    importe_jubilatorio: dec!(999),
                    importe_otros: dec!(999),
                },
            ],
            &[],
        )
        .unwrap();

        assert_eq!(filas[0].otra_actividad_jubilatorio, dec!(100));
        assert_eq!(filas[0].otra_actividad_otros, dec!(200));
    }

    #[test]
    fn obra_social_code_defaults_to_zeros() {
        let filas = consolidar(
            vec![legajo(1), legajo(2)],
            &[],
            &[],
            &[ObraSocialCode {
                nro_legaj: 1,
                cod_os: "112233".into(),
            }],
        )
        .unwrap();

        assert_eq!(
            filas.iter().find(|f| f.legajo.nro_legaj == 1).unwrap().cod_os,
            "112233"
        );
        assert_eq!(
            filas.iter().find(|f| f.legajo.nro_legaj == 2).unwrap().cod_os,
            "000000"
        );
    }

    #[test]
    fn output_is_sorted_by_legajo() {
        let filas = consolidar(vec![legajo(3), legajo(1), legajo(2)], &[], &[], &[]).unwrap();
        let nros: Vec<_> = filas.iter().map(|f| f.legajo.nro_legaj).collect();
        assert_eq!(nros, vec![1, 2, 3]);
    }

    #[test]
    fn investigator_class_takes_highest() {
        let filas = consolidar(
            vec![legajo(1)],
            &[
                concepto(1, dec!(10000), &[11]),
                concepto(1, dec!(10000), &[48]),
            ],
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(filas[0].clase_investigador, Some(48));
        assert_eq!(filas[0].importe_investigador, dec!(20000));
    }
}
