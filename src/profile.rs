// src/profile.rs

use std::collections::HashMap;
use tracing::debug;

use crate::average::CountryMetric;

/// Per-indicator country averages of one run.
#[derive(Debug, Clone, Default)]
pub struct IndicatorMetrics {
    pub population: Vec<CountryMetric>,
    pub output: Vec<CountryMetric>,
    pub unemployment: Vec<CountryMetric>,
    pub mobile: Vec<CountryMetric>,
}

/// A country present in all four indicator tables.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryProfile {
    pub name: String,
    pub code: String,
    pub population: f64,
    pub output: f64,
    pub unemployment: f64,
    pub mobile: f64,
    pub output_per_capita: f64,
}

/// `output / population`, NaN instead of an infinity when population is 0.
pub fn per_capita(output: f64, population: f64) -> f64 {
    if population == 0.0 {
        f64::NAN
    } else {
        output / population
    }
}

/// First metric per exact name.
fn index(metrics: &[CountryMetric]) -> HashMap<&str, &CountryMetric> {
    let mut map = HashMap::with_capacity(metrics.len());
    for m in metrics {
        map.entry(m.entity_name.as_str()).or_insert(m);
    }
    map
}

/// Inner-join the four metric sets on the exact country name.
///
/// Rows come out in output-table order. A name spelled differently in any
/// table drops that country from the result.
pub fn merge_profiles(metrics: &IndicatorMetrics) -> Vec<CountryProfile> {
    let population = index(&metrics.population);
    let mobile = index(&metrics.mobile);
    let unemployment = index(&metrics.unemployment);

    let profiles: Vec<CountryProfile> = metrics
        .output
        .iter()
        .filter_map(|out| {
            let name = out.entity_name.as_str();
            let pop = population.get(name)?;
            let mob = mobile.get(name)?;
            let unemp = unemployment.get(name)?;
            Some(CountryProfile {
                name: out.entity_name.clone(),
                code: out.entity_code.clone(),
                population: pop.period_average,
                output: out.period_average,
                unemployment: unemp.period_average,
                mobile: mob.period_average,
                output_per_capita: per_capita(out.period_average, pop.period_average),
            })
        })
        .collect();

    debug!(
        output_rows = metrics.output.len(),
        profiles = profiles.len(),
        "merged country profiles"
    );
    profiles
}
