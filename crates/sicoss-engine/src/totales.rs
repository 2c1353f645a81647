//! # Totals & Processing Statistics
//!
//! Pure sums over the surviving record set. The fold is associative and
//! independent of employee order, so any partitioning of the record set
//! into parallel shards yields the same totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sicoss_core::SicossRecord;

/// Monetary totals across the surviving record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totales {
    pub cantidad_legajos: u64,
    pub bruto: Decimal,
    pub imponible_1: Decimal,
    pub imponible_2: Decimal,
    pub imponible_3: Decimal,
    pub imponible_4: Decimal,
    pub imponible_5: Decimal,
    pub imponible_6: Decimal,
    pub imponible_7: Decimal,
    pub imponible_8: Decimal,
    pub imponible_9: Decimal,
    pub sac: Decimal,
    pub no_remun: Decimal,
    pub asignaciones_familiares: Decimal,
}

impl Totales {
    fn acumular(mut self, r: &SicossRecord) -> Self {
        self.cantidad_legajos += 1;
        self.bruto += r.rem_total;
        self.imponible_1 += r.rem_impo1;
        self.imponible_2 += r.rem_impo2;
        self.imponible_3 += r.rem_impo3;
        self.imponible_4 += r.rem_impo4;
        self.imponible_5 += r.rem_impo5;
        self.imponible_6 += r.rem_impo6;
        self.imponible_7 += r.rem_impo7;
        self.imponible_8 += r.rem_impo8;
        self.imponible_9 += r.rem_impo9;
        self.sac += r.sac;
        self.no_remun += r.no_remun;
        self.asignaciones_familiares += r.asig_fam_pag;
        self
    }

    /// Merge two partial totals (the parallel-shard reduction).
    pub fn combinar(mut self, otro: &Totales) -> Self {
        self.cantidad_legajos += otro.cantidad_legajos;
        self.bruto += otro.bruto;
        self.imponible_1 += otro.imponible_1;
        self.imponible_2 += otro.imponible_2;
        self.imponible_3 += otro.imponible_3;
        self.imponible_4 += otro.imponible_4;
        self.imponible_5 += otro.imponible_5;
        self.imponible_6 += otro.imponible_6;
        self.imponible_7 += otro.imponible_7;
        self.imponible_8 += otro.imponible_8;
        self.imponible_9 += otro.imponible_9;
        self.sac += otro.sac;
        self.no_remun += otro.no_remun;
        self.asignaciones_familiares += otro.asignaciones_familiares;
        self
    }
}

/// Totals over the records with `valid == true`.
pub fn calcular(records: &[SicossRecord]) -> Totales {
    records
        .iter()
        .filter(|r| r.valid)
        .fold(Totales::default(), Totales::acumular)
}

/// Processing statistics: accepted vs. rejected counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Estadisticas {
    pub total_legajos: u64,
    pub legajos_validos: u64,
    pub legajos_rechazados: u64,
    pub porcentaje_aprobacion: f64,
}

pub fn estadisticas(records: &[SicossRecord]) -> Estadisticas {
    let total = records.len() as u64;
    let validos = records.iter().filter(|r| r.valid).count() as u64;
    let rechazados = total - validos;
    let porcentaje = if total > 0 {
        (validos as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    Estadisticas {
        total_legajos: total,
        legajos_validos: validos,
        legajos_rechazados: rechazados,
        porcentaje_aprobacion: (porcentaje * 100.0).round() / 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sicoss_core::{Legajo, PeriodoFiscal};

    fn record(nro: i64, bruto: Decimal, valido: bool) -> SicossRecord {
        let legajo = Legajo {
            nro_legaj: nro,
            cuil: format!("20{nro:08}9"),
            apnom: "X".into(),
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
        };
        let periodo: PeriodoFiscal = "202501".parse().unwrap();
        let mut r = SicossRecord::nuevo(periodo, &legajo);
        r.rem_total = bruto;
        r.rem_impo1 = bruto;
        r.valid = valido;
        r
    }

    #[test]
    fn sums_only_valid_records() {
        let records = vec![
            record(1, dec!(100), true),
            record(2, dec!(200), true),
            record(3, dec!(999), false),
        ];
        let t = calcular(&records);
        assert_eq!(t.cantidad_legajos, 2);
        assert_eq!(t.bruto, dec!(300));
        assert_eq!(t.imponible_1, dec!(300));
    }

    #[test]
    fn totals_are_partition_invariant() {
        let records: Vec<_> = (1..=10)
            .map(|i| record(i, Decimal::from(i * 1000), true))
            .collect();

        let entero = calcular(&records);
        let (a, b) = records.split_at(3);
        let particionado = calcular(a).combinar(&calcular(b));

        assert_eq!(entero, particionado);
    }

    #[test]
    fn empty_set_yields_zero_totals() {
        let t = calcular(&[]);
        assert_eq!(t.cantidad_legajos, 0);
        assert_eq!(t.bruto, Decimal::ZERO);
    }

    #[test]
    fn statistics_track_rejections() {
        let records = vec![
            record(1, dec!(1), true),
            record(2, dec!(1), true),
            record(3, dec!(1), false),
        ];
        let e = estadisticas(&records);
        assert_eq!(e.total_legajos, 3);
        assert_eq!(e.legajos_validos, 2);
        assert_eq!(e.legajos_rechazados, 1);
        assert!((e.porcentaje_aprobacion - 66.67).abs() < 0.01);
    }
}
