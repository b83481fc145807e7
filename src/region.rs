// src/region.rs

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

use crate::{
    average::{period_average, CountryMetric},
    config::ReferenceData,
    error::{CoverageError, MissingRegions},
    filter::{classify, EntityKind},
    indicator::Indicator,
    load::{IndicatorTables, RawRow},
    profile::{per_capita, CountryProfile},
};

/// World Bank regions used by official aggregation.
pub static DEFAULT_CANONICAL_REGIONS: &[&str] = &[
    "East Asia & Pacific",
    "South Asia",
    "Sub-Saharan Africa",
    "Africa Eastern and Southern",
    "Africa Western and Central",
    "Latin America & Caribbean",
    "Middle East & North Africa",
    "Europe & Central Asia",
    "North America",
    "Arab World",
];

/// Hand-maintained country → region assignments.
pub static DEFAULT_REGION_MAP: &[(&str, &str)] = &[
    ("Argentina", "Latin America & Caribbean"),
    ("Australia", "East Asia & Pacific"),
    ("Brazil", "Latin America & Caribbean"),
    ("China", "East Asia & Pacific"),
    ("France", "Europe & Central Asia"),
    ("Germany", "Europe & Central Asia"),
    ("India", "South Asia"),
    ("Indonesia", "East Asia & Pacific"),
    ("Italy", "Europe & Central Asia"),
    ("Japan", "East Asia & Pacific"),
    ("Korea, Rep.", "East Asia & Pacific"),
    ("Mexico", "Latin America & Caribbean"),
    ("Netherlands", "Europe & Central Asia"),
    ("Russian Federation", "Europe & Central Asia"),
    ("Saudi Arabia", "Middle East & North Africa"),
    ("Spain", "Europe & Central Asia"),
    ("Switzerland", "Europe & Central Asia"),
    ("Turkiye", "Europe & Central Asia"),
    ("United Kingdom", "Europe & Central Asia"),
    ("United States", "North America"),
    ("Sudan", "Sub-Saharan Africa"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionMode {
    /// Region rows taken straight from the aggregate rows of the sources.
    Official,
    /// Country profiles bucketed through the region map.
    Manual,
}

/// Country name → region name lookup. Countries not listed belong to no region.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct RegionMap(BTreeMap<String, String>);

impl Default for RegionMap {
    fn default() -> Self {
        DEFAULT_REGION_MAP.iter().copied().collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RegionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl RegionMap {
    pub fn region_of(&self, country: &str) -> Option<&str> {
        self.0.get(country).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn regions(&self) -> impl Iterator<Item = &str> {
        let mut seen: Vec<&str> = self.0.values().map(String::as_str).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.into_iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionProfile {
    pub region: String,
    pub population: f64,
    pub output: f64,
    pub unemployment: f64,
    pub output_per_capita: f64,
    /// NaN when no mapped country reports mobile data.
    pub mobile: f64,
}

/// Mean that skips NaN; NaN if nothing is left.
fn nan_mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Average mobile penetration of the mapped countries, per region.
/// Regions without any mapped mobile country are absent.
pub fn mobile_by_region(mobile: &[CountryMetric], map: &RegionMap) -> BTreeMap<String, f64> {
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for m in mobile {
        if let Some(region) = map.region_of(&m.entity_name) {
            buckets
                .entry(region.to_string())
                .or_default()
                .push(m.period_average);
        }
    }
    buckets
        .into_iter()
        .map(|(region, values)| (region, nan_mean(values)))
        .collect()
}

/// Check every canonical region has an aggregate row in each regional table.
pub fn check_coverage(
    tables: &IndicatorTables,
    reference: &ReferenceData,
) -> Result<(), CoverageError> {
    let mut missing = Vec::new();
    for indicator in Indicator::REGIONAL {
        let table = tables.get(indicator);
        let absent: Vec<String> = reference
            .canonical_regions
            .iter()
            .filter(|region| find_region_row(table.rows.as_slice(), region, reference).is_none())
            .cloned()
            .collect();
        if !absent.is_empty() {
            warn!(%indicator, ?absent, "canonical regions missing");
            missing.push(MissingRegions {
                table: indicator,
                regions: absent,
            });
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoverageError { missing })
    }
}

fn find_region_row<'a>(
    rows: &'a [RawRow],
    region: &str,
    reference: &ReferenceData,
) -> Option<&'a RawRow> {
    rows.iter().find(|r| {
        r.entity_name == region
            && classify(r, &reference.aggregate_names) == EntityKind::Aggregate
    })
}

/// Region profiles from the official aggregate rows.
///
/// Fails without producing any row when a canonical region is absent from
/// the population, output or unemployment table. Mobile figures come from
/// `mobile` (country metrics) bucketed through the region map.
#[instrument(level = "info", skip_all)]
pub fn official_regions(
    tables: &IndicatorTables,
    mobile: &[CountryMetric],
    reference: &ReferenceData,
) -> Result<Vec<RegionProfile>, CoverageError> {
    check_coverage(tables, reference)?;

    let mobile_avg = mobile_by_region(mobile, &reference.region_map);
    let average = |indicator: Indicator, region: &str| -> f64 {
        let table = tables.get(indicator);
        // coverage was checked above
        find_region_row(&table.rows, region, reference)
            .map(|row| period_average(row, indicator.years(), reference.policy(indicator)))
            .unwrap_or(f64::NAN)
    };

    let regions: Vec<RegionProfile> = reference
        .canonical_regions
        .iter()
        .map(|region| {
            let population = average(Indicator::Population, region);
            let output = average(Indicator::Output, region);
            RegionProfile {
                region: region.clone(),
                population,
                output,
                unemployment: average(Indicator::Unemployment, region),
                output_per_capita: per_capita(output, population),
                mobile: mobile_avg.get(region).copied().unwrap_or(f64::NAN),
            }
        })
        .collect();

    info!(regions = regions.len(), "official region profiles");
    Ok(regions)
}

/// Region profiles as unweighted means of the mapped country profiles.
/// Countries absent from the map are left out of every region.
#[instrument(level = "info", skip_all)]
pub fn manual_regions(
    profiles: &[CountryProfile],
    mobile: &[CountryMetric],
    map: &RegionMap,
) -> Vec<RegionProfile> {
    let mut groups: BTreeMap<&str, Vec<&CountryProfile>> = BTreeMap::new();
    for p in profiles {
        if let Some(region) = map.region_of(&p.name) {
            groups.entry(region).or_default().push(p);
        }
    }
    debug!(
        mapped = groups.values().map(Vec::len).sum::<usize>(),
        total = profiles.len(),
        "bucketed country profiles"
    );

    let mobile_avg = mobile_by_region(mobile, map);
    let regions: Vec<RegionProfile> = groups
        .into_iter()
        .map(|(region, members)| RegionProfile {
            region: region.to_string(),
            population: nan_mean(members.iter().map(|p| p.population)),
            output: nan_mean(members.iter().map(|p| p.output)),
            unemployment: nan_mean(members.iter().map(|p| p.unemployment)),
            output_per_capita: nan_mean(members.iter().map(|p| p.output_per_capita)),
            mobile: mobile_avg.get(region).copied().unwrap_or(f64::NAN),
        })
        .collect();

    info!(regions = regions.len(), "manual region profiles");
    regions
}
