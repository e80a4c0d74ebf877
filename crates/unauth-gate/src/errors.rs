use attempt_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that keep a gate from being built.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("invalid blocker configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("attempt store: {0}")]
    Store(#[from] StoreError),
    #[error("failed to open notification sink {target}: {source}")]
    Sink {
        target: String,
        #[source]
        source: std::io::Error,
    },
}
