//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `WORKER_SLOTS` — concurrent activity attempts (default: `16`)
/// - `BATCH_INTERVAL_SECS` — seconds between scheduled batches; `0` disables
///   the scheduler (default: `0`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub worker_slots: usize,
    pub batch_interval_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            worker_slots: std::env::var("WORKER_SLOTS")
                .ok()
                .and_then(|w| w.parse().ok())
                .unwrap_or(16),
            batch_interval_secs: std::env::var("BATCH_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Interval of the batch scheduler, `None` when disabled.
    pub fn batch_interval(&self) -> Option<Duration> {
        (self.batch_interval_secs > 0).then(|| Duration::from_secs(self.batch_interval_secs))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            worker_slots: 16,
            batch_interval_secs: 0,
        }
    }
}
