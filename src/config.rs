use crate::chart::Canvas;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub dataset_path: PathBuf,
    pub bind_addr: String,
    pub plot_height_px: u32,
    pub max_sessions: usize,
    pub request_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            dataset_path: std::env::var("DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/models.csv")),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8765".to_string()),
            plot_height_px: std::env::var("PLOT_HEIGHT_PX").ok().and_then(|v| v.parse().ok()).unwrap_or(500),
            max_sessions: std::env::var("MAX_SESSIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(256),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            height_px: self.plot_height_px,
            ..Canvas::default()
        }
    }
}
