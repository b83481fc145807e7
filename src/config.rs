// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::{info, warn};

use crate::{
    average::MissingPolicy,
    filter::AggregateNames,
    indicator::Indicator,
    load::SourcePaths,
    region::{RegionMap, DEFAULT_CANONICAL_REGIONS},
};

/// Missing-value policy per indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MissingPolicies {
    pub population: MissingPolicy,
    pub output: MissingPolicy,
    pub unemployment: MissingPolicy,
    pub mobile: MissingPolicy,
}

impl Default for MissingPolicies {
    fn default() -> Self {
        Self {
            population: Indicator::Population.default_policy(),
            output: Indicator::Output.default_policy(),
            unemployment: Indicator::Unemployment.default_policy(),
            mobile: Indicator::Mobile.default_policy(),
        }
    }
}

impl MissingPolicies {
    pub fn get(&self, indicator: Indicator) -> MissingPolicy {
        match indicator {
            Indicator::Population => self.population,
            Indicator::Output => self.output,
            Indicator::Unemployment => self.unemployment,
            Indicator::Mobile => self.mobile,
        }
    }
}

/// Fixed enumerations the pipeline classifies and groups by.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub aggregate_names: AggregateNames,
    pub canonical_regions: Vec<String>,
    pub region_map: RegionMap,
    pub missing_policy: MissingPolicies,
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self {
            aggregate_names: AggregateNames::default(),
            canonical_regions: DEFAULT_CANONICAL_REGIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            region_map: RegionMap::default(),
            missing_policy: MissingPolicies::default(),
        }
    }
}

impl ReferenceData {
    pub fn policy(&self, indicator: Indicator) -> MissingPolicy {
        self.missing_policy.get(indicator)
    }

    /// Log entries that can never match anything.
    pub fn warn_inconsistencies(&self) {
        for region in &self.canonical_regions {
            if !self.aggregate_names.contains(region) {
                warn!(region = %region, "canonical region is not listed as an aggregate name");
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sources: Option<SourcePaths>,
    pub reference: ReferenceData,
}

impl PipelineConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing pipeline config")
    }

    /// Read a YAML config; relative source paths resolve against its directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text =
            fs::read_to_string(path).with_context(|| format!("reading config {:?}", path))?;
        let mut cfg = Self::from_yaml(&text).with_context(|| format!("in {:?}", path))?;
        if let Some(base) = path.parent() {
            cfg.sources = cfg.sources.take().map(|s| s.relative_to(base));
        }
        info!(
            aggregates = cfg.reference.aggregate_names.len(),
            regions = cfg.reference.canonical_regions.len(),
            mapped_countries = cfg.reference.region_map.len(),
            "loaded config {}",
            path.display()
        );
        cfg.reference.warn_inconsistencies();
        Ok(cfg)
    }
}
