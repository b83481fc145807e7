// src/pipeline.rs

use anyhow::Result;
use std::time::Instant;
use tracing::{info, instrument};

use crate::{
    average::country_metrics,
    config::ReferenceData,
    correlation::{correlate, CorrelationMatrix, MOBILE, OUTPUT, POPULATION, PROFILE_COLUMNS, UNEMPLOYMENT},
    filter::countries,
    indicator::Indicator,
    load::{IndicatorTables, SourcePaths, TableCache},
    profile::{merge_profiles, CountryProfile, IndicatorMetrics},
    region::{manual_regions, official_regions, RegionMode, RegionProfile},
};

/// Columns correlated across region profiles.
pub const REGION_COLUMNS: [&str; 4] = [OUTPUT, POPULATION, MOBILE, UNEMPLOYMENT];

#[derive(Debug, Clone)]
pub struct RegionOutput {
    pub mode: RegionMode,
    pub profiles: Vec<RegionProfile>,
    pub correlation: CorrelationMatrix,
}

/// Everything the presentation layer receives from one run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub countries: Vec<CountryProfile>,
    pub country_correlation: CorrelationMatrix,
    pub regions: Vec<RegionOutput>,
}

impl PipelineOutput {
    pub fn regions(&self, mode: RegionMode) -> Option<&RegionOutput> {
        self.regions.iter().find(|r| r.mode == mode)
    }
}

pub struct Pipeline {
    reference: ReferenceData,
    modes: Vec<RegionMode>,
}

impl Pipeline {
    pub fn new(reference: ReferenceData, modes: Vec<RegionMode>) -> Self {
        Self { reference, modes }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Country-only period averages for each indicator.
    pub fn country_metrics(&self, tables: &IndicatorTables) -> IndicatorMetrics {
        let metrics = |indicator: Indicator| {
            let filtered = countries(tables.get(indicator), &self.reference.aggregate_names);
            country_metrics(&filtered, self.reference.policy(indicator))
        };
        IndicatorMetrics {
            population: metrics(Indicator::Population),
            output: metrics(Indicator::Output),
            unemployment: metrics(Indicator::Unemployment),
            mobile: metrics(Indicator::Mobile),
        }
    }

    /// Run every stage on already loaded tables.
    ///
    /// A region coverage gap in official mode aborts the whole run; nothing
    /// computed before it is returned.
    #[instrument(level = "info", skip_all, fields(modes = ?self.modes))]
    pub fn run(&self, tables: &IndicatorTables) -> Result<PipelineOutput> {
        let start = Instant::now();

        // ─── 1) filter + average ─────────────────────────────────────
        let metrics = self.country_metrics(tables);

        // ─── 2) join ─────────────────────────────────────────────────
        let countries = merge_profiles(&metrics);
        info!(countries = countries.len(), "country profiles");

        // ─── 3) regions ──────────────────────────────────────────────
        let mut regions = Vec::with_capacity(self.modes.len());
        for &mode in &self.modes {
            let profiles = match mode {
                RegionMode::Official => official_regions(tables, &metrics.mobile, &self.reference)?,
                RegionMode::Manual => {
                    manual_regions(&countries, &metrics.mobile, &self.reference.region_map)
                }
            };
            let correlation = correlate(&profiles, &REGION_COLUMNS)?;
            regions.push(RegionOutput {
                mode,
                profiles,
                correlation,
            });
        }

        // ─── 4) country correlation ──────────────────────────────────
        let country_correlation = correlate(&countries, &PROFILE_COLUMNS)?;

        info!(elapsed = ?start.elapsed(), "pipeline done");
        Ok(PipelineOutput {
            countries,
            country_correlation,
            regions,
        })
    }

    /// Load through `cache` and run.
    pub fn run_sources(&self, cache: &TableCache, sources: &SourcePaths) -> Result<PipelineOutput> {
        let tables = cache.load_all(sources)?;
        self.run(&tables)
    }
}
