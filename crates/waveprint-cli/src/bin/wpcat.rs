//! wpcat - Catalog builder
//!
//! Usage: wpcat <input_dir> <output_catalog> [--embeddings <json>]

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use waveprint_catalog::{CatalogEntry, CatalogWriter, EmbeddingFile};
use waveprint_core::audio::AudioFormat;
use waveprint_core::{analyze_track, AnalyzerConfig};

#[derive(Parser, Debug)]
#[command(name = "wpcat")]
#[command(about = "Build a track catalog from a directory of audio files", long_about = None)]
struct Args {
    /// Directory of audio files to analyze
    input_dir: String,

    /// Output catalog file path
    output_catalog: String,

    /// JSON embedding sidecar to merge into the catalog
    #[arg(short, long)]
    embeddings: Option<String>,

    /// Path to configuration file (TOML). Defaults when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Skip constellation fingerprinting (descriptor-only catalog)
    #[arg(long)]
    skip_fingerprints: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Default: no logs (clean JSON output for parsing)
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    run_wpcat(&args)
}

fn run_wpcat(args: &Args) -> Result<()> {
    let input_dir = Path::new(&args.input_dir);
    let output_path = Path::new(&args.output_catalog);

    if !input_dir.is_dir() {
        anyhow::bail!("input directory not found: {}", input_dir.display());
    }

    let config = match &args.config {
        Some(path) => AnalyzerConfig::from_toml(Path::new(path))?,
        None => AnalyzerConfig::default(),
    };
    config.validate()?;

    let audio_files: Vec<PathBuf> = std::fs::read_dir(input_dir)
        .with_context(|| format!("failed to read directory: {}", input_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| AudioFormat::from_path(path).is_supported())
        .collect();

    if audio_files.is_empty() {
        anyhow::bail!("no supported audio files in {}", input_dir.display());
    }

    log::info!(
        "Analyzing {} audio files in parallel...",
        audio_files.len()
    );
    let start = std::time::Instant::now();

    let mut entries: Vec<CatalogEntry> = audio_files
        .par_iter()
        .filter_map(|path| match build_entry(path, &config, args.skip_fingerprints) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("skipping {}: {e:#}", path.display());
                None
            }
        })
        .collect();
    entries.sort_by(|a, b| a.track_id.cmp(&b.track_id));

    let analyze_duration = start.elapsed();
    log::info!(
        "Analyzed {} tracks in {:.2}s",
        entries.len(),
        analyze_duration.as_secs_f64()
    );

    let mut embeddings_applied = 0usize;
    if let Some(sidecar_path) = &args.embeddings {
        let sidecar = EmbeddingFile::load(Path::new(sidecar_path))
            .with_context(|| format!("failed to load embedding sidecar: {sidecar_path}"))?;
        embeddings_applied = sidecar.apply_to(&mut entries);
        log::info!(
            "Merged embeddings into {embeddings_applied} of {} entries",
            entries.len()
        );
    }

    CatalogWriter::new().write(output_path, &entries, config.sample_rate)?;

    let result = serde_json::json!({
        "status": "success",
        "input_dir": input_dir.display().to_string(),
        "output_catalog": output_path.display().to_string(),
        "num_tracks": entries.len(),
        "num_skipped": audio_files.len() - entries.len(),
        "embeddings_applied": embeddings_applied,
        "processing_time_seconds": start.elapsed().as_secs_f64(),
    });
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

fn build_entry(path: &Path, config: &AnalyzerConfig, skip_fingerprints: bool) -> Result<CatalogEntry> {
    let track_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .with_context(|| format!("non-UTF-8 filename: {}", path.display()))?;

    log::debug!("analyzing {}", path.display());
    let analysis = analyze_track(path, config)?;

    Ok(CatalogEntry {
        track_id,
        title: None,
        artist: None,
        descriptor: analysis.descriptor,
        hashes: if skip_fingerprints {
            Vec::new()
        } else {
            analysis.hashes
        },
    })
}
