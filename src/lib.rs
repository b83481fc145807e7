//! Harmonizes four World Bank indicator tables (population, output,
//! unemployment, mobile penetration) into country and region profiles and
//! correlation matrices.

pub mod average;
pub mod config;
pub mod correlation;
pub mod error;
pub mod export;
pub mod filter;
pub mod indicator;
pub mod insights;
pub mod load;
pub mod pipeline;
pub mod profile;
pub mod region;

pub use config::{PipelineConfig, ReferenceData};
pub use error::CoverageError;
pub use indicator::Indicator;
pub use pipeline::{Pipeline, PipelineOutput};
pub use region::RegionMode;
