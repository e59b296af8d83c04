use anyhow::{Context, Result};
use effectdash::config::Config;
use effectdash::data::Dataset;
use effectdash::logging::{log, log_dataset_loaded, obj, run_id, v_str, Domain, Level};
use effectdash::server::{serve, App};
use effectdash::session::SessionRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[
            ("run", v_str(run_id())),
            ("dataset", v_str(&cfg.dataset_path.display().to_string())),
        ]),
    );

    let dataset = Dataset::load(&cfg.dataset_path)
        .with_context(|| format!("loading dataset {}", cfg.dataset_path.display()))?;
    let manifest = dataset.manifest();
    log_dataset_loaded(
        &manifest.path,
        dataset.len(),
        &manifest.hash_sha256,
        serde_json::to_value(&manifest.missing)?,
    );

    let registry = SessionRegistry::new(Arc::new(dataset), cfg.canvas(), cfg.max_sessions);
    let mut app = App::new(registry).with_read_timeout(cfg.request_timeout());
    let listener = TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;

    tokio::select! {
        res = serve(listener, &mut app) => res?,
        res = tokio::signal::ctrl_c() => res.context("waiting for ctrl-c")?,
    }
    log(
        Level::Info,
        Domain::System,
        "shutdown",
        obj(&[("sessions", serde_json::json!(app.sessions().len()))]),
    );
    Ok(())
}
