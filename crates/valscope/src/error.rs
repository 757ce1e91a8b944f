use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Usage errors. Structural anomalies (cycles, depth limits) and plugin
/// faults are never reported through this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot {operation} while this parser is walking a value")]
    ParseInProgress { operation: &'static str },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown class: {0}")]
    UnknownClass(String),

    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}
