use thiserror::Error;

use tickrelay_middleware::{LogError, SinkError};

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Log error: {0}")]
    Log(#[from] LogError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}
