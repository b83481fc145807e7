use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use wdi_profiles::{
    correlation::CorrelationMatrix,
    export::{correlation_batch, country_batch, region_batch, write_csv},
    insights::{
        compare_regions, connected_low_unemployment, mobile_vs_output_per_capita, top_by,
        year_series,
    },
    load::{IndicatorTables, SourcePaths, TableCache},
    Indicator, Pipeline, PipelineConfig, PipelineOutput, ReferenceData, RegionMode,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Official,
    Manual,
    Both,
}

impl ModeArg {
    fn modes(self) -> Vec<RegionMode> {
        match self {
            ModeArg::Official => vec![RegionMode::Official],
            ModeArg::Manual => vec![RegionMode::Manual],
            ModeArg::Both => vec![RegionMode::Official, RegionMode::Manual],
        }
    }
}

/// Build country and region profiles from four indicator CSVs.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// YAML reference config (aggregate names, regions, region map, sources)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding population.csv, output.csv, unemployment.csv, mobile.csv;
    /// overrides `sources` from the config
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ModeArg::Both)]
    mode: ModeArg,

    /// Rows shown in the ranking sections
    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Print the yearly output and unemployment of a country (repeatable)
    #[arg(long, value_name = "NAME")]
    series: Vec<String>,

    /// Print two regions side by side for every region mode
    #[arg(long, num_args = 2, value_names = ["A", "B"])]
    compare: Option<Vec<String>>,

    /// Write the result tables to stdout as CSV instead of the report
    #[arg(long)]
    csv: bool,
}

fn print_matrix(title: &str, m: &CorrelationMatrix) {
    println!("\n{}", title);
    print!("{:>20}", "");
    for c in &m.columns {
        print!("{:>20}", c);
    }
    println!();
    for (name, row) in m.columns.iter().zip(&m.values) {
        print!("{:>20}", name);
        for v in row {
            print!("{:>20.3}", v);
        }
        println!();
    }
}

fn print_series(tables: &IndicatorTables, reference: &ReferenceData, name: &str) {
    println!("\n{} by year:", name);
    for indicator in [Indicator::Output, Indicator::Unemployment] {
        let policy = reference.policy(indicator);
        match year_series(tables.get(indicator), name, policy) {
            Some(series) => {
                for (year, value) in series {
                    match value {
                        Some(v) => println!("  {:<14} {} {:>20.2}", indicator.as_str(), year, v),
                        None => println!("  {:<14} {} {:>20}", indicator.as_str(), year, ".."),
                    }
                }
            }
            None => println!("  no {} row named {:?}", indicator, name),
        }
    }
}

fn print_comparison(out: &PipelineOutput, a: &str, b: &str) {
    for regions in &out.regions {
        println!("\n{} vs {} ({:?}):", a, b, regions.mode);
        let rows = compare_regions(&regions.profiles, a, b);
        if rows.len() < 2 {
            println!("  region not found");
        }
        for r in rows {
            println!(
                "  {:<30} pop {:>16.0}  per capita {:>10.1}  unemployment {:>6.2}  mobile {:>7.1}",
                r.region, r.population, r.output_per_capita, r.unemployment, r.mobile
            );
        }
    }
}

fn write_tables(out: &PipelineOutput) -> Result<()> {
    let stdout = std::io::stdout();
    println!("# countries");
    write_csv(&country_batch(&out.countries)?, stdout.lock())?;
    println!("\n# country correlation");
    write_csv(&correlation_batch(&out.country_correlation)?, stdout.lock())?;
    for regions in &out.regions {
        println!("\n# regions ({:?})", regions.mode);
        write_csv(&region_batch(&regions.profiles)?, stdout.lock())?;
        println!("\n# region correlation ({:?})", regions.mode);
        write_csv(&correlation_batch(&regions.correlation)?, stdout.lock())?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,wdi_profiles=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(?cli, "startup");

    // ─── 2) config + sources ─────────────────────────────────────────
    let cfg = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    let sources = match (&cli.data_dir, &cfg.sources) {
        (Some(dir), _) => SourcePaths::from_dir(dir),
        (None, Some(sources)) => sources.clone(),
        (None, None) => SourcePaths::from_dir("data"),
    };

    // ─── 3) run ──────────────────────────────────────────────────────
    let cache = TableCache::new();
    let pipeline = Pipeline::new(cfg.reference, cli.mode.modes());
    let tables = cache.load_all(&sources)?;
    let out = pipeline.run(&tables)?;

    if cli.csv {
        write_tables(&out)?;
        info!("all done");
        return Ok(());
    }

    // ─── 4) report ───────────────────────────────────────────────────
    println!("{} countries in all four tables", out.countries.len());

    println!("\nMost populous (period average):");
    for p in top_by(&out.countries, |p| p.population, cli.top) {
        println!("  {:<30} {:>18.0}", p.name, p.population);
    }

    println!("\nHighest average unemployment:");
    for p in top_by(&out.countries, |p| p.unemployment, 1) {
        println!("  {:<30} {:>8.2}%", p.name, p.unemployment);
    }

    println!("\nMore than 100 mobile subscriptions per 100 people and under 5% unemployment:");
    for p in connected_low_unemployment(&out.countries, 100.0, 5.0) {
        println!(
            "  {:<30} mobile {:>7.1}  unemployment {:>5.2}%",
            p.name, p.mobile, p.unemployment
        );
    }

    println!(
        "\nMobile vs output per capita: {:.2}",
        mobile_vs_output_per_capita(&out.countries)
    );
    print_matrix("Country correlation", &out.country_correlation);

    for regions in &out.regions {
        println!("\nRegions ({:?}):", regions.mode);
        for r in &regions.profiles {
            println!(
                "  {:<30} pop {:>16.0}  output {:>20.0}  per capita {:>10.1}  unemployment {:>6.2}  mobile {:>7.1}",
                r.region, r.population, r.output, r.output_per_capita, r.unemployment, r.mobile
            );
        }
        print_matrix(&format!("Region correlation ({:?})", regions.mode), &regions.correlation);
    }

    for name in &cli.series {
        print_series(&tables, pipeline.reference(), name);
    }
    if let Some([a, b]) = cli.compare.as_deref() {
        print_comparison(&out, a, b);
    }

    info!("all done");
    Ok(())
}
