//! Runtime Adapter module - Interface to the neural inference engine.
//!
//! The decode loop treats the model as an opaque capability: given named
//! integer tensors, produce named float tensors. [`InferenceEngine`] is that
//! seam; [`onnx::ONNXSession`] is the ONNX Runtime implementation and
//! [`crate::testing::ScriptedEngine`] the in-memory one used by tests.
//!
//! # Tensor contract
//!
//! | Name | Direction | Dtype | Shape |
//! |------|-----------|-------|-------|
//! | `input_ids` | in | i64 | `[1, N]` |
//! | `attention_mask` | in | i64 | `[1, N]`, all ones |
//! | `decoder_input_ids` | in | i64 | `[1, M]`, grows every step |
//! | `logits` | out | f32 | `[1, M, V]` |
//!
//! # Example
//!
//! ```rust,no_run
//! use nl2trail_core::runtime_adapter::{onnx::{ONNXSession, SessionOptions}, InferenceEngine};
//!
//! let session = ONNXSession::from_file("onnx_model/t5_creo.onnx", SessionOptions::default())?;
//! session.ensure_contract()?;
//! # Ok::<(), nl2trail_core::runtime_adapter::AdapterError>(())
//! ```

use ndarray::{ArrayD, IxDyn};
use std::collections::HashMap;
use thiserror::Error;

pub mod onnx;

pub use onnx::{ONNXSession, SessionOptions};

/// Encoder token ids input name.
pub const INPUT_IDS: &str = "input_ids";
/// Encoder attention mask input name.
pub const ATTENTION_MASK: &str = "attention_mask";
/// Decoder token ids input name.
pub const DECODER_INPUT_IDS: &str = "decoder_input_ids";
/// Logits output name.
pub const LOGITS: &str = "logits";

/// Error type for runtime adapter operations.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    #[error("Failed to load model: {0}")]
    LoadFailed(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Output contract violated: {0}")]
    ContractViolation(String),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

/// Result type for runtime adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Named integer input tensors.
pub type EngineInputs = HashMap<String, ArrayD<i64>>;

/// Named float output tensors.
pub type EngineOutputs = HashMap<String, ArrayD<f32>>;

/// A loaded neural network that maps named input tensors to named outputs.
///
/// Calls are synchronous and must not carry state from one call to the
/// next; weights are fixed at load time. Implementations are shared across
/// threads, so `run` must either be reentrant or serialise internally.
pub trait InferenceEngine: Send + Sync {
    /// Returns a short name for this engine (e.g., "onnx").
    fn name(&self) -> &str;

    /// Runs one forward pass.
    fn run(&self, inputs: EngineInputs) -> AdapterResult<EngineOutputs>;
}

/// Builds a `[1, len]` i64 tensor from a single-example id sequence.
pub fn batch_of_one(values: Vec<i64>) -> AdapterResult<ArrayD<i64>> {
    let len = values.len();
    ArrayD::from_shape_vec(IxDyn(&[1, len]), values)
        .map_err(|e| AdapterError::InvalidInput(format!("Failed to build [1, {}] tensor: {}", len, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_of_one_shape() {
        let tensor = batch_of_one(vec![4, 5, 6]).unwrap();
        assert_eq!(tensor.shape(), &[1, 3]);
        assert_eq!(tensor.as_slice().unwrap(), &[4, 5, 6]);
    }

    #[test]
    fn test_batch_of_one_empty() {
        let tensor = batch_of_one(Vec::new()).unwrap();
        assert_eq!(tensor.shape(), &[1, 0]);
    }

    #[test]
    fn test_error_display() {
        let err = AdapterError::ContractViolation("expected rank 3, got 2".to_string());
        assert_eq!(err.to_string(), "Output contract violated: expected rank 3, got 2");
    }
}
