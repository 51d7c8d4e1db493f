//! Veritrail error types

use thiserror::Error;

/// Veritrail error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed audit event draft, rejected before append
    #[error("Validation error: {0}")]
    Validation(String),

    /// Ledger storage error (nothing was committed)
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Hash chain integrity violation, detected by validation
    #[error("Chain integrity error: {0}")]
    ChainIntegrity(String),

    /// Sensitivity classification error
    #[error("Privacy error: {0}")]
    Privacy(String),

    /// Capability tier failed to initialize
    #[error("Capability error: {0}")]
    Capability(String),

    /// In-flight processing failure in a capability tier
    #[error("Processing error: {0}")]
    Processing(String),

    /// Request was cancelled or timed out before a decision
    #[error("Processing cancelled: {0}")]
    Cancelled(String),

    /// Transient or persistent remote sync failure
    #[error("Sync error: {0}")]
    Sync(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Veritrail operations
pub type Result<T> = std::result::Result<T, Error>;
