//! Construction-time configuration.
//!
//! Configs can be built in code or read from JSON:
//!
//! ```json
//! {
//!   "model_path": "onnx_model/t5_creo.onnx",
//!   "tokenizer": { "type": "subword", "path": "onnx_model/tokenizer.json" },
//!   "max_new_tokens": 256,
//!   "session": { "intra_threads": 4 }
//! }
//! ```

use crate::error::{Nl2TrailError, Nl2TrailResult};
use crate::runtime_adapter::SessionOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which tokenizer variant to construct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TokenizerConfig {
    /// Trained subword model (`tokenizer.json`).
    Subword { path: String },
    /// Fixed-vocabulary tokenizer with template decoding.
    Fallback,
}

/// Configuration for [`crate::Nl2Trail`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nl2TrailConfig {
    /// Path to the exported ONNX model.
    /// May be omitted only with the fallback tokenizer, which then decodes
    /// templates straight from the encoded input.
    #[serde(default)]
    pub model_path: Option<String>,

    /// Tokenizer variant.
    pub tokenizer: TokenizerConfig,

    /// Maximum number of decode steps per call.
    /// Default: 256
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,

    /// ONNX Runtime session options.
    #[serde(default)]
    pub session: SessionOptions,
}

fn default_max_new_tokens() -> usize {
    256
}

impl Default for Nl2TrailConfig {
    fn default() -> Self {
        Self::fallback()
    }
}

impl Nl2TrailConfig {
    /// Model plus trained subword tokenizer.
    pub fn new(model_path: impl Into<String>, tokenizer_path: impl Into<String>) -> Self {
        Self {
            model_path: Some(model_path.into()),
            tokenizer: TokenizerConfig::Subword {
                path: tokenizer_path.into(),
            },
            max_new_tokens: default_max_new_tokens(),
            session: SessionOptions::default(),
        }
    }

    /// Fallback tokenizer with no generation model.
    pub fn fallback() -> Self {
        Self {
            model_path: None,
            tokenizer: TokenizerConfig::Fallback,
            max_new_tokens: default_max_new_tokens(),
            session: SessionOptions::default(),
        }
    }

    /// Reads a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Nl2TrailResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Set the model path.
    pub fn with_model_path(mut self, path: impl Into<String>) -> Self {
        self.model_path = Some(path.into());
        self
    }

    /// Set the tokenizer variant.
    pub fn with_tokenizer(mut self, tokenizer: TokenizerConfig) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Set the decode step budget.
    pub fn with_max_new_tokens(mut self, max: usize) -> Self {
        self.max_new_tokens = max;
        self
    }

    /// Set the intra-op thread count for the ONNX session.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.session = self.session.with_intra_threads(threads);
        self
    }

    /// Checks values that can't be expressed in the type.
    pub fn validate(&self) -> Nl2TrailResult<()> {
        if self.max_new_tokens == 0 {
            return Err(Nl2TrailError::config(
                "max_new_tokens must be greater than zero",
            ));
        }
        match (&self.model_path, &self.tokenizer) {
            (Some(path), _) if path.trim().is_empty() => {
                Err(Nl2TrailError::config("model_path must not be empty"))
            }
            (None, TokenizerConfig::Subword { .. }) => Err(Nl2TrailError::config(
                "a subword tokenizer requires model_path",
            )),
            (_, TokenizerConfig::Subword { path }) if path.trim().is_empty() => {
                Err(Nl2TrailError::config("tokenizer path must not be empty"))
            }
            _ => Ok(()),
        }
    }
}
