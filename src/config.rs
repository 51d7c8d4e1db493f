//! Veritrail configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main Veritrail configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VeritrailConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Audit ledger configuration
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Privacy classification and sanitization configuration
    #[serde(default)]
    pub privacy: PrivacyConfig,

    /// Processing tier configuration
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Remote compliance sync configuration
    #[serde(default)]
    pub sync: SyncConfig,
}

impl VeritrailConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 18920,
        }
    }
}

/// Audit ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Directory where event files are stored.
    /// Defaults to `./veritrail-ledger` under the working directory.
    pub storage_dir: Option<PathBuf>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { storage_dir: None }
    }
}

impl LedgerConfig {
    /// Resolve the effective storage directory
    pub fn resolved_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("veritrail-ledger"))
    }
}

/// Privacy classification and sanitization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Terms always redacted at the confidential tier, beyond the built-in
    /// pattern rules (case-insensitive whole words).
    pub confidential_terms: Vec<String>,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            confidential_terms: vec![
                "diagnosis".to_string(),
                "medication".to_string(),
                "prescription".to_string(),
            ],
        }
    }
}

/// Processing tier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Per-request deadline in milliseconds
    pub request_timeout_ms: u64,

    /// Model name reported for the accelerated local tier
    pub accelerated_model: String,

    /// Model name reported for the CPU fallback tier
    pub cpu_model: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            accelerated_model: "moderation-accel-v2".to_string(),
            cpu_model: "moderation-cpu-v2".to_string(),
        }
    }
}

/// Remote compliance sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Enable background sync to the remote compliance store
    pub enabled: bool,

    /// Base URL of the remote compliance API
    pub endpoint: String,

    /// Maximum sync attempts per event before it is left failed
    pub max_attempts: u32,

    /// Backoff base in milliseconds; delay is `base * 2^attempts`
    pub backoff_base_ms: u64,

    /// Interval of the periodic failed-sync retry job, in seconds
    pub retry_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://127.0.0.1:18921".to_string(),
            max_attempts: 3,
            backoff_base_ms: 1_000,
            retry_interval_secs: 60,
        }
    }
}
