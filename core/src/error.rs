//! Unified error types for the nl2trail-core public API.
//!
//! Each layer keeps its own error enum (`AdapterError` for the inference
//! engine, `TokenizerError` for tokenization); both convert into
//! `Nl2TrailError` at the public boundary.
//!
//! # Error Hierarchy
//!
//! ```text
//! Nl2TrailError
//! ├── Adapter(AdapterError)       -- model load / inference / shape contract
//! ├── Tokenizer(TokenizerError)   -- tokenizer load / encode / decode
//! ├── Config(String)              -- invalid configuration values
//! ├── Io(std::io::Error)          -- I/O errors
//! └── Serialization(String)       -- JSON parsing errors
//! ```

use crate::runtime_adapter::AdapterError;
use crate::tokenizer::TokenizerError;
use thiserror::Error;

/// The canonical error type for nl2trail-core.
#[derive(Error, Debug)]
pub enum Nl2TrailError {
    /// Inference engine failure (load, run, or output contract)
    #[error("Inference engine error: {0}")]
    Adapter(#[from] AdapterError),

    /// Tokenizer failure (load, encode, or decode)
    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for nl2trail-core.
pub type Nl2TrailResult<T> = Result<T, Nl2TrailError>;

impl From<serde_json::Error> for Nl2TrailError {
    fn from(e: serde_json::Error) -> Self {
        Nl2TrailError::Serialization(e.to_string())
    }
}

impl Nl2TrailError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Nl2TrailError::Config(msg.into())
    }

    /// Returns true when the error comes from the engine violating the
    /// logits tensor contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Nl2TrailError::Adapter(AdapterError::ContractViolation(_)))
    }
}
