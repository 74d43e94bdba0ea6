//! Greedy autoregressive decoding.
//!
//! The decoder state starts as `[PAD]` and grows by one token per step.
//! Every step resends the full encoder input and the full decoder sequence
//! (no KV cache), reads the logits for the last decoder position and picks
//! the highest-scoring token. Generation stops on EOS, which is never
//! appended, or when `max_new_tokens` steps have run.
//!
//! ```text
//! INIT ──► STEPPING ──┬──► EOS_STOPPED ──────┬──► DONE (strip leading PAD)
//!             ▲  │    └──► BUDGET_EXHAUSTED ─┘
//!             └──┘ append token
//! ```

use crate::runtime_adapter::{
    batch_of_one, AdapterError, AdapterResult, EngineInputs, EngineOutputs, InferenceEngine,
    ATTENTION_MASK, DECODER_INPUT_IDS, INPUT_IDS, LOGITS,
};
use crate::tokenizer::{TokenId, Tokenizer};
use ndarray::{ArrayD, Axis};
use std::fmt;
use std::time::Instant;

mod config;

pub use config::GenerationConfig;

/// Why the decode loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model selected EOS.
    Eos,
    /// `max_new_tokens` steps ran without EOS.
    Budget,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Eos => "eos",
            StopReason::Budget => "length",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one decode call.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutput {
    /// Generated tokens, without the leading PAD and without EOS.
    pub tokens: Vec<TokenId>,
    /// Exit path taken.
    pub stop_reason: StopReason,
    /// Engine invocations made.
    pub steps: usize,
    /// Vocabulary size reported by the first logits frame.
    pub vocab_size: Option<usize>,
}

/// Index of the largest value; the lowest index wins ties and NaN never
/// wins. Returns `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    argmax_iter(values.iter().copied())
}

fn argmax_iter(values: impl IntoIterator<Item = f32>) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut max_value = f32::NEG_INFINITY;
    for (idx, value) in values.into_iter().enumerate() {
        if best.is_none() {
            best = Some(0);
        }
        if value > max_value {
            max_value = value;
            best = Some(idx);
        }
    }
    best
}

/// A validated `[1, decoder_len, vocab_size]` logits tensor.
pub struct LogitsFrame<'a> {
    logits: &'a ArrayD<f32>,
    decoder_len: usize,
    vocab_size: usize,
}

impl<'a> LogitsFrame<'a> {
    /// Pulls the `logits` output and checks it against the decoder length
    /// that was sent.
    pub fn from_outputs(outputs: &'a EngineOutputs, decoder_len: usize) -> AdapterResult<Self> {
        let logits = outputs.get(LOGITS).ok_or_else(|| {
            AdapterError::ContractViolation(format!(
                "Missing '{}' output (got {:?})",
                LOGITS,
                outputs.keys().collect::<Vec<_>>()
            ))
        })?;

        let shape = logits.shape();
        if shape.len() != 3 {
            return Err(AdapterError::ContractViolation(format!(
                "Unexpected logits rank {} (shape {:?}), expected [1, {}, vocab]",
                shape.len(),
                shape,
                decoder_len
            )));
        }
        if decoder_len == 0 || shape[0] != 1 || shape[1] != decoder_len {
            return Err(AdapterError::ContractViolation(format!(
                "Unexpected logits shape {:?}, expected [1, {}, vocab]",
                shape, decoder_len
            )));
        }
        if shape[2] == 0 {
            return Err(AdapterError::ContractViolation(
                "Logits have an empty vocabulary axis".to_string(),
            ));
        }

        Ok(Self {
            logits,
            decoder_len,
            vocab_size: shape[2],
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Greedy choice at the last decoder position.
    pub fn next_token(&self) -> Option<usize> {
        let batch = self.logits.index_axis(Axis(0), 0);
        let last = batch.index_axis(Axis(0), self.decoder_len - 1);
        argmax_iter(last.iter().copied())
    }
}

/// Greedy decoder for an encoder-decoder model.
///
/// Holds only configuration; all per-call state lives on the stack of
/// [`GreedyDecoder::decode`], so one decoder can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct GreedyDecoder {
    config: GenerationConfig,
}

impl GreedyDecoder {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Runs the decode loop for one source sequence.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for an empty source sequence
    /// - `ContractViolation` when the logits tensor has the wrong rank or
    ///   shape, or the vocabulary size changes between steps
    /// - any error the engine returns, unchanged
    pub fn decode(
        &self,
        engine: &dyn InferenceEngine,
        tokenizer: &dyn Tokenizer,
        source: &[TokenId],
    ) -> AdapterResult<DecodeOutput> {
        if source.is_empty() {
            return Err(AdapterError::InvalidInput(
                "Cannot decode an empty source sequence".to_string(),
            ));
        }

        let started = Instant::now();
        let pad_id = tokenizer.pad_id();
        let eos_id = tokenizer.eos_id();

        let input_ids: Vec<i64> = source.iter().map(|&id| i64::from(id)).collect();
        let attention_mask = vec![1i64; input_ids.len()];
        let mut decoder_ids: Vec<TokenId> = vec![pad_id];

        let mut vocab_size: Option<usize> = None;
        let mut stop_reason = StopReason::Budget;
        let mut steps = 0;

        for step in 0..self.config.max_new_tokens {
            let mut inputs = EngineInputs::with_capacity(3);
            inputs.insert(INPUT_IDS.to_string(), batch_of_one(input_ids.clone())?);
            inputs.insert(
                ATTENTION_MASK.to_string(),
                batch_of_one(attention_mask.clone())?,
            );
            inputs.insert(
                DECODER_INPUT_IDS.to_string(),
                batch_of_one(decoder_ids.iter().map(|&id| i64::from(id)).collect())?,
            );

            let outputs = engine.run(inputs)?;
            steps += 1;

            let frame = LogitsFrame::from_outputs(&outputs, decoder_ids.len())?;
            match vocab_size {
                None => vocab_size = Some(frame.vocab_size()),
                Some(expected) if expected != frame.vocab_size() => {
                    return Err(AdapterError::ContractViolation(format!(
                        "Vocabulary size changed from {} to {} at step {}",
                        expected,
                        frame.vocab_size(),
                        step
                    )));
                }
                Some(_) => {}
            }

            let next = frame.next_token().ok_or_else(|| {
                AdapterError::ContractViolation("Logits slice is empty".to_string())
            })?;
            let next = TokenId::try_from(next).map_err(|_| {
                AdapterError::ContractViolation(format!("Token index {} exceeds u32", next))
            })?;

            log::trace!("decode step {}: token {}", step, next);

            if next == eos_id {
                stop_reason = StopReason::Eos;
                break;
            }
            decoder_ids.push(next);
        }

        if decoder_ids.first() == Some(&pad_id) {
            decoder_ids.remove(0);
        }

        log::debug!(
            "Decoded {} tokens from {} source tokens in {} steps ({}, {} ms)",
            decoder_ids.len(),
            source.len(),
            steps,
            stop_reason,
            started.elapsed().as_millis()
        );

        Ok(DecodeOutput {
            tokens: decoder_ids,
            stop_reason,
            steps,
            vocab_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{EngineFault, ScriptedEngine};
    use crate::tokenizer::{FallbackTokenizer, EOS_ID, PAD_ID};
    use ndarray::IxDyn;

    fn decoder(max_new_tokens: usize) -> GreedyDecoder {
        GreedyDecoder::new(GenerationConfig::default().with_max_new_tokens(max_new_tokens))
    }

    #[test]
    fn test_argmax_basic() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[-3.0, -1.0, -2.0]), Some(1));
    }

    #[test]
    fn test_argmax_tie_picks_lowest_index() {
        assert_eq!(argmax(&[0.0, 5.0, 1.0, 5.0]), Some(1));
        assert_eq!(argmax(&[2.0, 2.0, 2.0]), Some(0));
    }

    #[test]
    fn test_argmax_edge_cases() {
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[f32::NAN, 1.0, f32::NAN]), Some(1));
        assert_eq!(argmax(&[f32::NEG_INFINITY, f32::NEG_INFINITY]), Some(0));
    }

    #[test]
    fn test_logits_frame_reads_last_position() {
        // [1, 2, 3]: position 0 prefers token 0, position 1 prefers token 2
        let logits =
            ArrayD::from_shape_vec(IxDyn(&[1, 2, 3]), vec![9.0, 0.0, 0.0, 0.0, 1.0, 4.0]).unwrap();
        let mut outputs = EngineOutputs::new();
        outputs.insert(LOGITS.to_string(), logits);

        let frame = LogitsFrame::from_outputs(&outputs, 2).unwrap();
        assert_eq!(frame.vocab_size(), 3);
        assert_eq!(frame.next_token(), Some(2));
    }

    #[test]
    fn test_logits_frame_rejects_bad_shapes() {
        let mut outputs = EngineOutputs::new();
        outputs.insert(LOGITS.to_string(), ArrayD::zeros(IxDyn(&[1, 8])));
        assert!(matches!(
            LogitsFrame::from_outputs(&outputs, 1),
            Err(AdapterError::ContractViolation(_))
        ));

        outputs.insert(LOGITS.to_string(), ArrayD::zeros(IxDyn(&[1, 3, 8])));
        assert!(matches!(
            LogitsFrame::from_outputs(&outputs, 2),
            Err(AdapterError::ContractViolation(_))
        ));

        outputs.insert(LOGITS.to_string(), ArrayD::zeros(IxDyn(&[2, 1, 8])));
        assert!(LogitsFrame::from_outputs(&outputs, 1).is_err());

        outputs.insert(LOGITS.to_string(), ArrayD::zeros(IxDyn(&[1, 1, 0])));
        assert!(LogitsFrame::from_outputs(&outputs, 1).is_err());

        assert!(LogitsFrame::from_outputs(&EngineOutputs::new(), 1).is_err());
    }

    #[test]
    fn test_eos_at_third_step() {
        let engine = ScriptedEngine::new(32).with_script(vec![7, 8, EOS_ID]);
        let tokenizer = FallbackTokenizer::new();

        let output = decoder(256)
            .decode(&engine, &tokenizer, &[3, 4, 5, 6, 20])
            .unwrap();

        assert_eq!(output.tokens, vec![7, 8]);
        assert_eq!(output.stop_reason, StopReason::Eos);
        assert_eq!(output.steps, 3);
        assert_eq!(engine.call_count(), 3);
        assert_eq!(output.vocab_size, Some(32));
    }

    #[test]
    fn test_three_tokens_then_eos_at_decoder_length_four() {
        let engine = ScriptedEngine::new(32).with_script(vec![7, 8, 9, EOS_ID]);
        let tokenizer = FallbackTokenizer::new();

        let output = decoder(256)
            .decode(&engine, &tokenizer, &[3, 4, 5, 6, 20])
            .unwrap();

        assert_eq!(output.tokens, vec![7, 8, 9]);
        assert_eq!(output.steps, 4);
        assert_eq!(engine.decoder_lengths(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_budget_exhaustion_returns_partial_result() {
        let engine = ScriptedEngine::new(16).never_eos(5);
        let tokenizer = FallbackTokenizer::new();

        let output = decoder(256).decode(&engine, &tokenizer, &[3]).unwrap();

        assert_eq!(output.stop_reason, StopReason::Budget);
        assert_eq!(output.steps, 256);
        assert_eq!(output.tokens.len(), 256);
        assert!(output.tokens.iter().all(|&t| t == 5));
        assert_eq!(engine.call_count(), 256);
    }

    #[test]
    fn test_eos_on_last_permitted_step_counts_as_eos() {
        let engine = ScriptedEngine::new(16).with_script(vec![4, 4, EOS_ID]);
        let tokenizer = FallbackTokenizer::new();

        let output = decoder(3).decode(&engine, &tokenizer, &[3]).unwrap();
        assert_eq!(output.stop_reason, StopReason::Eos);
        assert_eq!(output.tokens, vec![4, 4]);
    }

    #[test]
    fn test_immediate_eos_yields_empty_sequence() {
        let engine = ScriptedEngine::new(16).with_script(vec![EOS_ID]);
        let tokenizer = FallbackTokenizer::new();

        let output = decoder(256).decode(&engine, &tokenizer, &[3, 20]).unwrap();
        assert!(output.tokens.is_empty());
        assert_eq!(output.steps, 1);
    }

    #[test]
    fn test_inputs_follow_contract() {
        let engine = ScriptedEngine::new(16).with_script(vec![9, 10, EOS_ID]);
        let tokenizer = FallbackTokenizer::new();

        decoder(256).decode(&engine, &tokenizer, &[3, 20, 25]).unwrap();

        let calls = engine.calls();
        assert_eq!(calls.len(), 3);
        for call in &calls {
            assert_eq!(call.input_ids, vec![3, 20, 25]);
            assert_eq!(call.attention_mask, vec![1, 1, 1]);
            assert_eq!(call.decoder_input_ids[0], i64::from(PAD_ID));
        }
        assert_eq!(calls[2].decoder_input_ids, vec![0, 9, 10]);
    }

    #[test]
    fn test_generated_pad_is_kept_after_leading_pad() {
        let engine = ScriptedEngine::new(16).with_script(vec![PAD_ID, 6, EOS_ID]);
        let tokenizer = FallbackTokenizer::new();

        let output = decoder(256).decode(&engine, &tokenizer, &[3]).unwrap();
        assert_eq!(output.tokens, vec![PAD_ID, 6]);
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let engine = ScriptedEngine::new(16);
        let tokenizer = FallbackTokenizer::new();

        let result = decoder(256).decode(&engine, &tokenizer, &[]);
        assert!(matches!(result, Err(AdapterError::InvalidInput(_))));
        assert_eq!(engine.call_count(), 0);
    }

    #[test]
    fn test_vocab_drift_is_a_contract_violation() {
        let engine = ScriptedEngine::new(16)
            .never_eos(4)
            .with_fault(EngineFault::VocabDrift { from_call: 2, vocab_size: 17 });
        let tokenizer = FallbackTokenizer::new();

        let result = decoder(256).decode(&engine, &tokenizer, &[3]);
        assert!(matches!(result, Err(AdapterError::ContractViolation(_))));
        assert_eq!(engine.call_count(), 3);
    }

    #[test]
    fn test_wrong_rank_is_a_contract_violation() {
        let engine = ScriptedEngine::new(16).with_fault(EngineFault::FlatLogits);
        let tokenizer = FallbackTokenizer::new();

        let result = decoder(256).decode(&engine, &tokenizer, &[3]);
        assert!(matches!(result, Err(AdapterError::ContractViolation(_))));
    }

    #[test]
    fn test_engine_error_propagates() {
        let engine =
            ScriptedEngine::new(16).with_fault(EngineFault::Fail("device lost".to_string()));
        let tokenizer = FallbackTokenizer::new();

        let result = decoder(256).decode(&engine, &tokenizer, &[3]);
        match result {
            Err(AdapterError::InferenceFailed(msg)) => assert!(msg.contains("device lost")),
            other => panic!("expected InferenceFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::Eos.to_string(), "eos");
        assert_eq!(StopReason::Budget.to_string(), "length");
    }
}
