//! # Fiscal Period
//!
//! Value object for the `(year, month)` pair that keys every SICOSS run.
//! The canonical wire form is `YYYYMM` (e.g. `202501`), which is also the
//! value stored in the `periodo_fiscal` column of the reporting table.
//!
//! Periods are immutable and totally ordered; two runs for the same period
//! must not execute concurrently against the same table (the persister
//! takes an advisory lock keyed on this value).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SicossError;

/// A fiscal period: 4-digit year and month 1..=12.
///
/// Serializes to its canonical `YYYYMM` string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PeriodoFiscal {
    year: u16,
    month: u8,
}

impl PeriodoFiscal {
    /// Construct a period, validating the month range and year width.
    pub fn new(year: u16, month: u8) -> Result<Self, SicossError> {
        if !(1..=12).contains(&month) {
            return Err(SicossError::InvalidConfig(format!(
                "mes inválido: {month} (esperado 1..=12)"
            )));
        }
        if !(1000..=9999).contains(&year) {
            return Err(SicossError::InvalidConfig(format!(
                "año inválido: {year} (esperado 4 dígitos)"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// Canonical `YYYYMM` form, as persisted in `periodo_fiscal`.
    pub fn as_periodo_str(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// The preceding period (December wraps to the previous year).
    pub fn anterior(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The following period (January wraps to the next year).
    pub fn siguiente(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for PeriodoFiscal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_periodo_str())
    }
}

impl FromStr for PeriodoFiscal {
    type Err = SicossError;

    /// Parse the canonical `YYYYMM` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(SicossError::InvalidConfig(format!(
                "período fiscal inválido: \"{s}\" (esperado YYYYMM)"
            )));
        }
        let year: u16 = s[..4].parse().map_err(|_| {
            SicossError::InvalidConfig(format!("período fiscal inválido: \"{s}\""))
        })?;
        let month: u8 = s[4..].parse().map_err(|_| {
            SicossError::InvalidConfig(format!("período fiscal inválido: \"{s}\""))
        })?;
        Self::new(year, month)
    }
}

impl Serialize for PeriodoFiscal {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_periodo_str())
    }
}

impl<'de> Deserialize<'de> for PeriodoFiscal {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
