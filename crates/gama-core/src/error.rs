//! error types for gama

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GamaError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("client error: {0}")]
    Client(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sled::Error> for GamaError {
    fn from(e: sled::Error) -> Self {
        GamaError::Storage(e.to_string())
    }
}

impl From<bincode::Error> for GamaError {
    fn from(e: bincode::Error) -> Self {
        GamaError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GamaError>;
