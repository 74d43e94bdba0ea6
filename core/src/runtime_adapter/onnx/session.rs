//! ONNX Runtime session wrapper for the seq2seq generation model.
//!
//! This module provides a wrapper around an ONNX Runtime session that:
//! - Loads the exported encoder-decoder graph once
//! - Records the model's input/output names
//! - Checks the graph against the generation tensor contract
//! - Runs forward passes with i64 inputs and f32 outputs
//!
//! # Example
//!
//! ```rust,no_run
//! use nl2trail_core::runtime_adapter::onnx::{ONNXSession, SessionOptions};
//!
//! let session = ONNXSession::from_file(
//!     "onnx_model/t5_creo.onnx",
//!     SessionOptions::default().with_intra_threads(4),
//! )?;
//! println!("inputs: {:?}", session.input_names());
//! # Ok::<(), nl2trail_core::runtime_adapter::AdapterError>(())
//! ```

use crate::runtime_adapter::{
    AdapterError, AdapterResult, EngineInputs, EngineOutputs, InferenceEngine, ATTENTION_MASK,
    DECODER_INPUT_IDS, INPUT_IDS, LOGITS,
};
use ndarray::{ArrayD, IxDyn};
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputValue, SessionInputs};
use ort::value::{DynValue, Tensor};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Mutex;

/// Session builder options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Threads used within a single operator. `None` lets ONNX Runtime decide.
    #[serde(default)]
    pub intra_threads: Option<usize>,

    /// Apply full graph optimisation (Level3) instead of none.
    /// Default: true
    #[serde(default = "default_optimize")]
    pub optimize: bool,
}

fn default_optimize() -> bool {
    true
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            intra_threads: None,
            optimize: default_optimize(),
        }
    }
}

impl SessionOptions {
    /// Set the intra-op thread count.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Enable or disable graph optimisation.
    pub fn with_optimize(mut self, enabled: bool) -> Self {
        self.optimize = enabled;
        self
    }
}

/// ONNX Runtime session wrapper.
///
/// `Session::run` needs `&mut`, so the session sits behind a `Mutex`: a
/// shared handle serialises concurrent forward passes, while every caller
/// keeps its own decoder state and tensors.
pub struct ONNXSession {
    session: Mutex<Session>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    model_path: String,
}

impl ONNXSession {
    /// Loads a model file and creates a session.
    ///
    /// # Errors
    ///
    /// - `ModelNotFound` if the file doesn't exist
    /// - `LoadFailed` if ONNX Runtime cannot build a session from it
    pub fn from_file(model_path: impl AsRef<Path>, options: SessionOptions) -> AdapterResult<Self> {
        let path = model_path.as_ref();
        if !path.exists() {
            return Err(AdapterError::ModelNotFound(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        // Initialize ONNX Runtime environment (singleton, safe to call multiple times)
        let _ = ort::init().commit();

        let level = if options.optimize {
            GraphOptimizationLevel::Level3
        } else {
            GraphOptimizationLevel::Disable
        };

        let mut builder = Session::builder()
            .map_err(|e| {
                AdapterError::LoadFailed(format!("Failed to create session builder: {}", e))
            })?
            .with_optimization_level(level)
            .map_err(|e| {
                AdapterError::LoadFailed(format!("Failed to set optimization level: {}", e))
            })?;

        if let Some(threads) = options.intra_threads {
            builder = builder.with_intra_threads(threads).map_err(|e| {
                AdapterError::LoadFailed(format!("Failed to set intra-op threads: {}", e))
            })?;
        }

        let session = builder.commit_from_file(path).map_err(|e| {
            AdapterError::LoadFailed(format!(
                "Failed to load ONNX model {}: {}",
                path.display(),
                e
            ))
        })?;

        let input_names: Vec<String> = session
            .inputs()
            .iter()
            .map(|input| input.name().to_string())
            .collect();
        let output_names: Vec<String> = session
            .outputs()
            .iter()
            .map(|output| output.name().to_string())
            .collect();

        log::info!(
            "Loaded ONNX model {} (inputs: {:?}, outputs: {:?})",
            path.display(),
            input_names,
            output_names
        );

        Ok(Self {
            session: Mutex::new(session),
            input_names,
            output_names,
            model_path: path.display().to_string(),
        })
    }

    /// Verifies the graph declares the generation inputs and the logits output.
    pub fn ensure_contract(&self) -> AdapterResult<()> {
        for required in [INPUT_IDS, ATTENTION_MASK, DECODER_INPUT_IDS] {
            if !self.input_names.iter().any(|name| name == required) {
                return Err(AdapterError::ContractViolation(format!(
                    "Model {} has no '{}' input (found {:?})",
                    self.model_path, required, self.input_names
                )));
            }
        }
        if !self.output_names.iter().any(|name| name == LOGITS) {
            return Err(AdapterError::ContractViolation(format!(
                "Model {} has no '{}' output (found {:?})",
                self.model_path, LOGITS, self.output_names
            )));
        }
        Ok(())
    }

    /// Runs one forward pass.
    ///
    /// `f32` outputs are returned as-is and `i64` outputs are widened to
    /// `f32`. Outputs of any other dtype are dropped, except `logits`, which
    /// must be numeric.
    pub fn run(&self, inputs: EngineInputs) -> AdapterResult<EngineOutputs> {
        let mut ort_inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            Vec::with_capacity(inputs.len());
        for (name, array) in inputs {
            let shape: Vec<i64> = array.shape().iter().map(|&d| d as i64).collect();
            let data: Vec<i64> = array.iter().copied().collect();
            let value: DynValue = Tensor::from_array((shape, data))
                .map_err(|e| {
                    AdapterError::InvalidInput(format!("Failed to convert tensor '{}': {}", name, e))
                })?
                .into_dyn();
            ort_inputs.push((Cow::Owned(name), value.into()));
        }

        let mut session_guard = self
            .session
            .lock()
            .map_err(|e| AdapterError::InferenceFailed(format!("Failed to lock session: {}", e)))?;

        let outputs = session_guard
            .run(SessionInputs::from(ort_inputs))
            .map_err(|e| {
                AdapterError::InferenceFailed(format!("ONNX Runtime inference failed: {}", e))
            })?;

        let mut result = EngineOutputs::new();
        for output_name in &self.output_names {
            if let Some(array) = extract_output(output_name, &outputs[output_name.as_str()])? {
                result.insert(output_name.clone(), array);
            }
        }

        Ok(result)
    }

    /// Returns input names.
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    /// Returns output names.
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    /// Returns the path the model was loaded from.
    pub fn model_path(&self) -> &str {
        &self.model_path
    }
}

/// Copies one output tensor into an `ArrayD<f32>`.
fn extract_output(name: &str, value: &DynValue) -> AdapterResult<Option<ArrayD<f32>>> {
    let (dims, data): (Vec<usize>, Vec<f32>) =
        if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
            (shape.iter().map(|&d| d as usize).collect(), data.to_vec())
        } else if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
            (
                shape.iter().map(|&d| d as usize).collect(),
                data.iter().map(|&x| x as f32).collect(),
            )
        } else if name == LOGITS {
            return Err(AdapterError::InferenceFailed(format!(
                "Failed to extract output '{}': unsupported type (expected f32 or i64)",
                name
            )));
        } else {
            log::debug!("Skipping output '{}': not f32 or i64", name);
            return Ok(None);
        };

    let array = ArrayD::from_shape_vec(IxDyn(&dims), data).map_err(|e| {
        AdapterError::InferenceFailed(format!("Failed to convert output '{}' to ArrayD: {}", name, e))
    })?;
    Ok(Some(array))
}

impl InferenceEngine for ONNXSession {
    fn name(&self) -> &str {
        "onnx"
    }

    fn run(&self, inputs: EngineInputs) -> AdapterResult<EngineOutputs> {
        ONNXSession::run(self, inputs)
    }
}
