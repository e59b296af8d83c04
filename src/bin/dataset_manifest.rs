//! Validate a model table and write `<file>.manifest.json` next to it.
//!
//! Run with: cargo run --bin dataset_manifest -- data/models.csv

use effectdash::data::{default_manifest_path, DataError, Dataset, Factor};
use effectdash::view::available_categories;
use serde_json::json;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let path = env::args()
        .nth(1)
        .or_else(|| env::var("DATASET_PATH").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/models.csv"));

    let dataset = match Dataset::load(&path) {
        Ok(ds) => ds,
        Err(err @ DataError::NotFound(_)) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
        Err(err @ DataError::Schema(_)) => {
            eprintln!("{}", err);
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("load failed: {}", err);
            std::process::exit(3);
        }
    };

    let categories: BTreeMap<&str, Vec<String>> = Factor::ALL
        .iter()
        .map(|f| (f.as_str(), available_categories(&dataset, *f).into_iter().collect()))
        .collect();

    let out_path = default_manifest_path(&path);
    let payload = json!({
        "manifest": dataset.manifest(),
        "categories": categories,
    });
    let text = match serde_json::to_string_pretty(&payload) {
        Ok(t) => t,
        Err(err) => {
            eprintln!("failed to encode manifest: {}", err);
            std::process::exit(4);
        }
    };
    if let Err(err) = fs::write(&out_path, text) {
        eprintln!("failed to write {}: {}", out_path.display(), err);
        std::process::exit(4);
    }
    println!("wrote manifest {}", out_path.display());
}
