// src/indicator.rs

use serde::{Deserialize, Serialize};
use std::{fmt, ops::RangeInclusive};

use crate::average::MissingPolicy;

/// The four indicator tables the pipeline knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Population,
    Output,
    Unemployment,
    Mobile,
}

impl Indicator {
    pub const ALL: [Indicator; 4] = [
        Indicator::Population,
        Indicator::Output,
        Indicator::Unemployment,
        Indicator::Mobile,
    ];

    /// Tables that carry official region aggregate rows.
    pub const REGIONAL: [Indicator; 3] = [
        Indicator::Population,
        Indicator::Output,
        Indicator::Unemployment,
    ];

    /// Years covered by the source table.
    pub fn years(&self) -> RangeInclusive<u16> {
        match self {
            Indicator::Mobile => 2010..=2015,
            _ => 2010..=2022,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::Population => "population",
            Indicator::Output => "output",
            Indicator::Unemployment => "unemployment",
            Indicator::Mobile => "mobile",
        }
    }

    /// Default source file name inside a data directory.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }

    /// Unemployment is zero-filled; everything else skips missing years.
    pub fn default_policy(&self) -> MissingPolicy {
        match self {
            Indicator::Unemployment => MissingPolicy::ZeroFill,
            _ => MissingPolicy::Exclude,
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} table", self.as_str())
    }
}
