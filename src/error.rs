// src/error.rs

use std::fmt;
use thiserror::Error;

use crate::indicator::Indicator;

/// Canonical regions absent from one source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRegions {
    pub table: Indicator,
    pub regions: Vec<String>,
}

impl fmt::Display for MissingRegions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.table, self.regions.join(", "))
    }
}

/// Official region aggregation cannot run: some canonical regions have no
/// aggregate row in some tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("regions missing from source tables: {}", render(.missing))]
pub struct CoverageError {
    pub missing: Vec<MissingRegions>,
}

fn render(missing: &[MissingRegions]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    #[error("unknown numeric column `{0}`")]
    UnknownColumn(String),
}
