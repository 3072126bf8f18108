//! wpmatch - Query a catalog for similar or identical tracks
//!
//! Usage:
//!   wpmatch <catalog> <query_audio>              # similarity ranking
//!   wpmatch --identify <catalog> <query_audio>   # exact fingerprint lookup

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use waveprint_catalog::CatalogReader;
use waveprint_cli::output::{print_identify_results, print_ranking_results};
use waveprint_core::{analyze_track, ranking, AnalyzerConfig};

#[derive(Parser, Debug)]
#[command(name = "wpmatch")]
#[command(about = "Match an audio file against a catalog", long_about = None)]
struct Args {
    /// Catalog file built by wpcat
    catalog: String,

    /// Query audio file
    query_audio: String,

    /// Number of ranked results to report
    #[arg(short = 'k', long, default_value_t = 5)]
    top_k: usize,

    /// Exact identification via constellation fingerprints instead of
    /// similarity ranking
    #[arg(short, long)]
    identify: bool,

    /// Path to configuration file (TOML). Defaults when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    run_wpmatch(&args)
}

fn run_wpmatch(args: &Args) -> Result<()> {
    let catalog_path = Path::new(&args.catalog);
    let query_path = Path::new(&args.query_audio);

    if !query_path.exists() {
        anyhow::bail!("query file not found: {}", query_path.display());
    }

    let config = match &args.config {
        Some(path) => AnalyzerConfig::from_toml(Path::new(path))?,
        None => AnalyzerConfig::default(),
    };
    config.validate()?;

    log::info!("Loading catalog: {}", catalog_path.display());
    let load_start = std::time::Instant::now();
    let catalog_file = CatalogReader::read(catalog_path)?;
    log::info!(
        "Loaded {} entries in {:.2}s",
        catalog_file.entries.len(),
        load_start.elapsed().as_secs_f64()
    );

    if catalog_file.header.sample_rate != config.sample_rate {
        anyhow::bail!(
            "catalog was built at {} Hz but the configured rate is {} Hz",
            catalog_file.header.sample_rate,
            config.sample_rate
        );
    }

    log::info!("Analyzing query: {}", query_path.display());
    let analysis = analyze_track(query_path, &config)
        .with_context(|| format!("failed to analyze query: {}", query_path.display()))?;

    if args.identify {
        let index = catalog_file.fingerprint_index();
        if index.is_empty() {
            anyhow::bail!("catalog carries no fingerprints; rebuild without --skip-fingerprints");
        }
        let matches = index.query(&analysis.hashes);
        log::info!("Found {} fingerprint matches", matches.len());
        print_identify_results(&args.query_audio, &matches);
    } else {
        let catalog = catalog_file.descriptor_catalog();
        let results = ranking::rank(
            &analysis.descriptor,
            &catalog,
            args.top_k,
            &config.weights,
        );
        print_ranking_results(&args.query_audio, catalog.len(), &results);
    }

    Ok(())
}
