//! Error types for the run harness.

use saiql_adapters::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Production adapters refuse admin identities; runs require a
    /// dedicated migration user.
    #[error("refusing to run as overprivileged identity '{user}': use a dedicated migration user")]
    OverprivilegedIdentity { user: String },

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("bundle io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bundle serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("bundle directory already exists: {0}")]
    BundleExists(String),
}
