//! nl2trail core - natural-language to Creo trail command generation.
//!
//! A T5-style encoder-decoder model exported to ONNX turns an instruction
//! such as "create a 50mm cube" into Creo trail text, one greedy decode step
//! at a time.
//!
//! ## Module Organization
//!
//! ### Pipeline
//! - [`orchestrator`] - [`Nl2Trail`], the end-to-end `generate` entry point
//! - [`generation`] - Greedy autoregressive decode loop
//! - [`tokenizer`] - Subword and fallback tokenizers
//! - [`runtime_adapter`] - Inference engine trait and the ONNX Runtime session
//!
//! ### Supporting
//! - [`config`] - Construction-time configuration
//! - [`error`] - Unified error types
//! - [`trail`] - Trail syntax and command validation
//! - [`testing`] - Scripted engine for tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use nl2trail_core::{Nl2Trail, Nl2TrailConfig};
//!
//! let config = Nl2TrailConfig::new("onnx_model/t5_creo.onnx", "onnx_model/tokenizer.json");
//! let nl2trail = Nl2Trail::load(config)?;
//! let trail = nl2trail.generate("create a 50mm cube")?;
//! println!("{}", trail);
//! # Ok::<(), nl2trail_core::Nl2TrailError>(())
//! ```

/// Construction-time configuration
pub mod config;

/// Unified error types
pub mod error;

/// Greedy decode loop
pub mod generation;

/// End-to-end generation
pub mod orchestrator;

/// Inference engine abstraction and ONNX Runtime session
pub mod runtime_adapter;

/// Scripted inference engine for tests
pub mod testing;

/// Text <-> token id conversion
pub mod tokenizer;

/// Trail validation
pub mod trail;

pub use config::{Nl2TrailConfig, TokenizerConfig};
pub use error::{Nl2TrailError, Nl2TrailResult};
pub use generation::{DecodeOutput, GenerationConfig, GreedyDecoder, StopReason};
pub use orchestrator::{Nl2Trail, ValidatedTrail};
pub use runtime_adapter::{AdapterError, InferenceEngine, ONNXSession, SessionOptions};
pub use tokenizer::{FallbackTokenizer, SubwordTokenizer, TokenId, Tokenizer, TokenizerError};
pub use trail::{TrailValidator, ValidationReport, ValidationResult};
