//! Render both chart outputs for one selection and print them as JSON.
//!
//! Run with: cargo run --bin render -- color=typicality framework=Bayesian checkbox=typical
//!
//! Values are parsed as JSON when possible, otherwise taken as strings;
//! `checkbox` also accepts a comma-separated list. Log records go to
//! stderr so stdout stays valid JSON.

use anyhow::{bail, Context, Result};
use effectdash::config::Config;
use effectdash::data::Dataset;
use effectdash::logging::log_to_stderr;
use effectdash::session::Session;
use serde_json::Value;
use std::sync::Arc;

fn parse_value(control: &str, raw: &str) -> Value {
    if let Ok(v) = serde_json::from_str::<Value>(raw) {
        return v;
    }
    if control == "checkbox" {
        let items = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect();
        return Value::Array(items);
    }
    Value::String(raw.to_string())
}

fn main() -> Result<()> {
    log_to_stderr();
    let cfg = Config::from_env();
    let dataset = Dataset::load(&cfg.dataset_path)
        .with_context(|| format!("loading dataset {}", cfg.dataset_path.display()))?;
    let mut session = Session::new(0, Arc::new(dataset), cfg.canvas());

    for arg in std::env::args().skip(1) {
        let Some((control, raw)) = arg.split_once('=') else {
            bail!("expected control=value, got {:?}", arg);
        };
        let value = parse_value(control, raw);
        session
            .handle(control, &value)
            .with_context(|| format!("applying {}", arg))?;
    }

    let out = serde_json::to_string_pretty(&session.render())?;
    println!("{}", out);
    Ok(())
}
