//! Mock inference engine for testing.
//!
//! [`ScriptedEngine`] answers every forward pass with a logits tensor of the
//! contract shape `[1, decoder_len, vocab_size]` whose last position peaks at
//! a scripted token. It records every call so tests can assert on what the
//! decode loop sent.

use crate::runtime_adapter::{
    AdapterError, AdapterResult, EngineInputs, EngineOutputs, InferenceEngine, ATTENTION_MASK,
    DECODER_INPUT_IDS, INPUT_IDS, LOGITS,
};
use crate::tokenizer::{TokenId, EOS_ID};
use ndarray::{ArrayD, IxDyn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Misbehaviour to inject into a [`ScriptedEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineFault {
    /// From the given call (0-based) on, report a different vocabulary size.
    VocabDrift { from_call: usize, vocab_size: usize },
    /// Return rank-2 `[1, vocab]` logits.
    FlatLogits,
    /// Return no `logits` output at all.
    MissingLogits,
    /// Fail every call with `InferenceFailed`.
    Fail(String),
}

/// One recorded forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedCall {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub decoder_input_ids: Vec<i64>,
}

/// An inference engine that replays a token script.
///
/// # Example
///
/// ```rust
/// use nl2trail_core::testing::ScriptedEngine;
/// use nl2trail_core::tokenizer::EOS_ID;
///
/// // Emit 7, then 8, then EOS.
/// let engine = ScriptedEngine::new(32).with_script(vec![7, 8, EOS_ID]);
/// assert_eq!(engine.call_count(), 0);
/// ```
pub struct ScriptedEngine {
    vocab_size: usize,
    script: Vec<TokenId>,
    /// Token emitted once the script runs out.
    fallthrough: TokenId,
    fault: Option<EngineFault>,
    call_count: AtomicUsize,
    calls: Mutex<Vec<ObservedCall>>,
}

impl ScriptedEngine {
    /// Create an engine with the given vocabulary that emits EOS at once.
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            script: Vec::new(),
            fallthrough: EOS_ID,
            fault: None,
            call_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Tokens to select at steps 0, 1, 2, ...
    pub fn with_script(mut self, script: Vec<TokenId>) -> Self {
        self.script = script;
        self
    }

    /// Once the script is exhausted, keep selecting `token` (never EOS).
    pub fn never_eos(mut self, token: TokenId) -> Self {
        self.fallthrough = token;
        self
    }

    /// Inject a fault.
    pub fn with_fault(mut self, fault: EngineFault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Number of times `run()` was called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every call seen so far, in order.
    pub fn calls(&self) -> Vec<ObservedCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// Decoder input length of each call, in order.
    pub fn decoder_lengths(&self) -> Vec<usize> {
        self.calls()
            .iter()
            .map(|call| call.decoder_input_ids.len())
            .collect()
    }

    fn flatten(inputs: &EngineInputs, name: &str) -> AdapterResult<Vec<i64>> {
        let tensor = inputs
            .get(name)
            .ok_or_else(|| AdapterError::InvalidInput(format!("Missing input '{}'", name)))?;
        if tensor.ndim() != 2 || tensor.shape()[0] != 1 {
            return Err(AdapterError::InvalidInput(format!(
                "Input '{}' must be [1, N], got {:?}",
                name,
                tensor.shape()
            )));
        }
        Ok(tensor.iter().copied().collect())
    }
}

impl InferenceEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    fn run(&self, inputs: EngineInputs) -> AdapterResult<EngineOutputs> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(EngineFault::Fail(message)) = &self.fault {
            return Err(AdapterError::InferenceFailed(message.clone()));
        }

        let observed = ObservedCall {
            input_ids: Self::flatten(&inputs, INPUT_IDS)?,
            attention_mask: Self::flatten(&inputs, ATTENTION_MASK)?,
            decoder_input_ids: Self::flatten(&inputs, DECODER_INPUT_IDS)?,
        };
        let decoder_len = observed.decoder_input_ids.len();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(observed);
        }

        let vocab_size = match &self.fault {
            Some(EngineFault::VocabDrift {
                from_call,
                vocab_size,
            }) if call >= *from_call => *vocab_size,
            _ => self.vocab_size,
        };
        let token = self.script.get(call).copied().unwrap_or(self.fallthrough) as usize;
        if token >= vocab_size {
            return Err(AdapterError::InvalidInput(format!(
                "Scripted token {} outside vocabulary of {}",
                token, vocab_size
            )));
        }

        let logits = match &self.fault {
            Some(EngineFault::FlatLogits) => {
                let mut data = vec![0.0f32; vocab_size];
                data[token] = 1.0;
                ArrayD::from_shape_vec(IxDyn(&[1, vocab_size]), data)
            }
            _ => {
                let mut data = vec![0.0f32; decoder_len * vocab_size];
                data[(decoder_len - 1) * vocab_size + token] = 1.0;
                ArrayD::from_shape_vec(IxDyn(&[1, decoder_len, vocab_size]), data)
            }
        }
        .map_err(|e| AdapterError::InferenceFailed(format!("Failed to build logits: {}", e)))?;

        let mut outputs = EngineOutputs::new();
        if self.fault != Some(EngineFault::MissingLogits) {
            outputs.insert(LOGITS.to_string(), logits);
        }
        Ok(outputs)
    }
}
