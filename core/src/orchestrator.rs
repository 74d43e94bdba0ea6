//! Orchestrator - end-to-end NL → trail generation.
//!
//! [`Nl2Trail`] wires the three components together:
//!
//! ```text
//! text ──► Tokenizer::encode ──► GreedyDecoder::decode ──► Tokenizer::decode ──► trail
//!                                   │
//!                                   └──► InferenceEngine::run (once per step)
//! ```
//!
//! All components are loaded once at construction; a failed load is fatal
//! and never downgrades to a different tokenizer or engine. After
//! construction the value is immutable, so a single instance can be shared
//! behind an `Arc` and called from many threads.
//!
//! Without a model (fallback configuration), `generate` skips the decode
//! loop and hands the encoded input straight to the tokenizer's decoder,
//! which renders a trail template from it.

use crate::config::Nl2TrailConfig;
use crate::error::Nl2TrailResult;
use crate::generation::{GenerationConfig, GreedyDecoder};
use crate::runtime_adapter::{InferenceEngine, ONNXSession};
use crate::tokenizer::{load_tokenizer, Tokenizer};
use crate::trail::{TrailValidator, ValidationReport};
use std::sync::Arc;
use std::time::Instant;

/// Generated trail text together with its validation report.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTrail {
    pub trail: String,
    pub report: ValidationReport,
}

/// Natural-language to Creo trail generator.
pub struct Nl2Trail {
    engine: Option<Arc<dyn InferenceEngine>>,
    tokenizer: Arc<dyn Tokenizer>,
    decoder: GreedyDecoder,
}

impl Nl2Trail {
    /// Loads the model and tokenizer named by `config`.
    ///
    /// # Errors
    ///
    /// - `Config` when the configuration fails validation
    /// - `Adapter(ModelNotFound | LoadFailed)` when the model can't be loaded
    /// - `Adapter(ContractViolation)` when the model lacks a required input
    ///   or the `logits` output
    /// - `Tokenizer(NotFound | LoadFailed)` when the tokenizer can't be loaded
    pub fn load(config: Nl2TrailConfig) -> Nl2TrailResult<Self> {
        config.validate()?;

        let engine: Option<Arc<dyn InferenceEngine>> = match &config.model_path {
            Some(path) => {
                let session = ONNXSession::from_file(path, config.session.clone())?;
                session.ensure_contract()?;
                log::info!("Model {} satisfies the tensor contract", session.model_path());
                Some(Arc::new(session))
            }
            None => None,
        };

        let tokenizer = load_tokenizer(&config.tokenizer)?;

        log::info!(
            "nl2trail ready (engine: {}, tokenizer: {}, max_new_tokens: {})",
            engine.as_ref().map(|e| e.name()).unwrap_or("none"),
            tokenizer.name(),
            config.max_new_tokens
        );

        Ok(Self {
            engine,
            tokenizer,
            decoder: GreedyDecoder::new(
                GenerationConfig::default().with_max_new_tokens(config.max_new_tokens),
            ),
        })
    }

    /// Assembles a generator from already-constructed components.
    pub fn with_components(
        engine: Arc<dyn InferenceEngine>,
        tokenizer: Arc<dyn Tokenizer>,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            engine: Some(engine),
            tokenizer,
            decoder: GreedyDecoder::new(generation),
        }
    }

    /// A generator with no model; output comes from the tokenizer's decoder
    /// applied to the encoded input.
    pub fn tokenizer_only(tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            engine: None,
            tokenizer,
            decoder: GreedyDecoder::default(),
        }
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    pub fn generation_config(&self) -> &GenerationConfig {
        self.decoder.config()
    }

    /// Converts a natural-language instruction into trail text.
    ///
    /// Input that encodes to nothing (empty or whitespace-only text) yields
    /// an empty string without touching the engine.
    pub fn generate(&self, text: &str) -> Nl2TrailResult<String> {
        let started = Instant::now();
        let source = self.tokenizer.encode(text)?;
        if source.is_empty() {
            log::debug!("Empty input, nothing to generate");
            return Ok(String::new());
        }

        let trail = match &self.engine {
            Some(engine) => {
                let output = self
                    .decoder
                    .decode(engine.as_ref(), self.tokenizer.as_ref(), &source)?;
                self.tokenizer.decode(&output.tokens)?
            }
            None => self.tokenizer.decode(&source)?,
        };

        log::debug!(
            "Generated {} chars from {} input tokens in {} ms",
            trail.len(),
            source.len(),
            started.elapsed().as_millis()
        );
        Ok(trail)
    }

    /// Generates a trail and validates it. The text is returned exactly as
    /// generated; an invalid trail is reported, not corrected or retried.
    pub fn generate_and_validate(
        &self,
        text: &str,
        validator: &TrailValidator,
    ) -> Nl2TrailResult<ValidatedTrail> {
        let trail = self.generate(text)?;
        let report = validator.validate(&trail);
        if !report.is_valid() {
            log::warn!(
                "Generated trail failed validation ({}, {} errors)",
                report.result,
                report.errors.len()
            );
        }
        Ok(ValidatedTrail { trail, report })
    }
}
