use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Meldekern";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Events kept in the telemetry backlog for late subscribers.
pub const TELEMETRY_BACKLOG: usize = 100;

/// Per-subscriber telemetry queue depth before drop-new kicks in.
pub const TELEMETRY_QUEUE_DEPTH: usize = 256;

/// Default log filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "meldekern=info"
}

/// Get the application data directory.
/// ~/Meldekern/ unless overridden via MELDEKERN_DATA_DIR.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MELDEKERN_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Meldekern")
}

/// Runtime configuration, read once at startup.
///
/// The confidence threshold and extraction timeout are configuration,
/// not per-case logic: operators tune them without touching the gate.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    /// Below this extraction confidence, a case is routed to a human.
    pub confidence_threshold: f64,
    /// Ceiling on a single extraction call before it maps to ExtractionError.
    pub extraction_timeout_secs: u64,
    /// Base URL of the inference backend (Ollama-compatible).
    pub inference_url: String,
    pub model_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8490".parse().expect("valid default bind addr"),
            data_dir: app_data_dir(),
            confidence_threshold: 0.85,
            extraction_timeout_secs: 120,
            inference_url: "http://localhost:11434".into(),
            model_name: "gemma3:12b".into(),
        }
    }
}

impl AppConfig {
    /// Build config from environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("MELDEKERN_BIND_ADDR") {
            if let Ok(parsed) = addr.parse() {
                config.bind_addr = parsed;
            }
        }
        if let Ok(threshold) = std::env::var("MELDEKERN_CONFIDENCE_THRESHOLD") {
            if let Ok(parsed) = threshold.parse::<f64>() {
                config.confidence_threshold = parsed.clamp(0.0, 1.0);
            }
        }
        if let Ok(timeout) = std::env::var("MELDEKERN_EXTRACTION_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse() {
                config.extraction_timeout_secs = parsed;
            }
        }
        if let Ok(url) = std::env::var("MELDEKERN_INFERENCE_URL") {
            config.inference_url = url;
        }
        if let Ok(model) = std::env::var("MELDEKERN_MODEL") {
            config.model_name = model;
        }
        config.data_dir = app_data_dir();
        config
    }

    /// Directory holding staged document uploads.
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }

    /// Path of the case database.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("meldekern.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_in_unit_range() {
        let config = AppConfig::default();
        assert!(config.confidence_threshold > 0.0 && config.confidence_threshold < 1.0);
    }

    #[test]
    fn documents_dir_under_data_dir() {
        let config = AppConfig {
            data_dir: PathBuf::from("/tmp/mk-test"),
            ..Default::default()
        };
        assert!(config.documents_dir().starts_with("/tmp/mk-test"));
        assert!(config.db_path().ends_with("meldekern.db"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
