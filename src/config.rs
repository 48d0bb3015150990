use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "DermaScan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides [`app_data_dir`] when set.
pub const DATA_DIR_ENV: &str = "DERMASCAN_DATA_DIR";

pub const CLASSIFIER_URL_ENV: &str = "DERMASCAN_CLASSIFIER_URL";
pub const CLASSIFIER_TOKEN_ENV: &str = "DERMASCAN_CLASSIFIER_TOKEN";
pub const CLASSIFIER_TIMEOUT_ENV: &str = "DERMASCAN_CLASSIFIER_TIMEOUT_SECS";

/// Minimum confidence the prediction endpoint should report.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;
/// Upper bound on candidates requested per image.
pub const DEFAULT_MAX_PREDICTIONS: u32 = 5;
pub const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 60;
pub const CLASSIFIER_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Get the application data directory.
/// `~/DermaScan/` unless overridden by `DERMASCAN_DATA_DIR`.
pub fn app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Location of the patient record database.
pub fn database_path() -> PathBuf {
    app_data_dir().join("records.db")
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,dermascan_lib=debug"
}

/// Settings for the remote prediction endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Full URL of the `:predict` endpoint.
    pub endpoint: String,
    /// Sent as a bearer token when present.
    pub access_token: Option<String>,
    pub timeout: Duration,
    pub confidence_threshold: f64,
    pub max_predictions: u32,
}

impl ClassifierConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token: None,
            timeout: Duration::from_secs(DEFAULT_CLASSIFIER_TIMEOUT_SECS),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_predictions: DEFAULT_MAX_PREDICTIONS,
        }
    }

    /// Read from the process environment. `None` when no endpoint is configured.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    ///
    /// An unparsable timeout falls back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let endpoint = lookup(CLASSIFIER_URL_ENV).filter(|s| !s.trim().is_empty())?;
        let mut config = Self::new(endpoint.trim());
        config.access_token = lookup(CLASSIFIER_TOKEN_ENV).filter(|s| !s.is_empty());
        if let Some(secs) = lookup(CLASSIFIER_TIMEOUT_ENV) {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %secs, "Ignoring invalid classifier timeout"),
            }
        }
        Some(config)
    }
}
