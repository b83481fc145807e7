// src/average.rs

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::load::{RawIndicatorTable, RawRow};

/// How missing years enter a period average.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Missing years are left out; no present year gives NaN.
    Exclude,
    /// Missing years count as 0 over the whole range.
    ZeroFill,
}

/// Period average of one entity for one indicator. NaN when undefined.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryMetric {
    pub entity_name: String,
    pub entity_code: String,
    pub period_average: f64,
}

/// Arithmetic mean of `row` over `years` under `policy`.
pub fn period_average(row: &RawRow, years: RangeInclusive<u16>, policy: MissingPolicy) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for year in years {
        match (row.value(year), policy) {
            (Some(v), _) => {
                sum += v;
                n += 1;
            }
            (None, MissingPolicy::ZeroFill) => n += 1,
            (None, MissingPolicy::Exclude) => {}
        }
    }
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// One metric per row of `table`, over the indicator's own year range.
pub fn country_metrics(table: &RawIndicatorTable, policy: MissingPolicy) -> Vec<CountryMetric> {
    let years = table.indicator.years();
    table
        .rows
        .iter()
        .map(|row| CountryMetric {
            entity_name: row.entity_name.clone(),
            entity_code: row.entity_code.clone(),
            period_average: period_average(row, years.clone(), policy),
        })
        .collect()
}
