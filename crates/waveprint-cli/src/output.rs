//! JSON output formatting

use serde::Serialize;
use waveprint_core::matching::FingerprintMatch;
use waveprint_core::ranking::RankedMatch;

#[derive(Serialize)]
struct RankingOutput<'a> {
    query_path: String,
    catalog_size: usize,
    results: &'a [RankedMatch],
}

#[derive(Serialize)]
struct IdentifyOutput<'a> {
    query_path: String,
    detections: usize,
    results: &'a [FingerprintMatch],
}

/// Print ranked similarity results as JSON.
pub fn print_ranking_results(query_path: &str, catalog_size: usize, results: &[RankedMatch]) {
    let output = RankingOutput {
        query_path: query_path.to_string(),
        catalog_size,
        results,
    };
    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results: {}", e),
    }
}

/// Print exact-identification results as JSON.
pub fn print_identify_results(query_path: &str, results: &[FingerprintMatch]) {
    let output = IdentifyOutput {
        query_path: query_path.to_string(),
        detections: results.len(),
        results,
    };
    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing results: {}", e),
    }
}
