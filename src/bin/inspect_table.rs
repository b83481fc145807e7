use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use wdi_profiles::{
    filter::{aggregates, countries},
    load::load_indicator_table,
    Indicator, PipelineConfig,
};

/// Load one indicator CSV and print how it was understood.
#[derive(Parser, Debug)]
struct Args {
    /// population | output | unemployment | mobile
    #[arg(value_parser = parse_indicator)]
    indicator: Indicator,

    file: PathBuf,

    /// Optional YAML config for the aggregate-name set
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_indicator(s: &str) -> Result<Indicator, String> {
    Indicator::ALL
        .into_iter()
        .find(|i| i.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown indicator `{}`", s))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    // 1) load with header normalization and row dropping
    let table = load_indicator_table(args.indicator, &args.file)?;
    let names = &cfg.reference.aggregate_names;
    let country_rows = countries(&table, names);
    let aggregate_rows = aggregates(&table, names);

    println!("=== {} : {} ===", args.indicator, args.file.display());
    println!("Rows kept:       {}", table.len());
    println!("Countries:       {}", country_rows.len());
    println!("Aggregates:      {}", aggregate_rows.len());
    println!();

    // 2) headers after normalization
    println!("=== Headers ===");
    for h in &table.headers {
        println!("- {}", h);
    }
    println!();

    // 3) aggregates, and whether each is a canonical region
    println!("=== Aggregate rows ===");
    for row in &aggregate_rows.rows {
        let canonical = cfg.reference.canonical_regions.contains(&row.entity_name);
        println!(
            "- {:<55} {:<5} {}",
            row.entity_name,
            row.entity_code,
            if canonical { "canonical region" } else { "" }
        );
    }
    Ok(())
}
