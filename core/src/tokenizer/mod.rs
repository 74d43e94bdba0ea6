//! Tokenizers bridging raw text and the model's integer token space.
//!
//! Two interchangeable implementations sit behind the [`Tokenizer`] trait:
//!
//! - [`SubwordTokenizer`]: a trained subword model loaded from a
//!   HuggingFace `tokenizer.json` (the T5 SentencePiece vocabulary exported
//!   next to the ONNX graph).
//! - [`FallbackTokenizer`]: whitespace splitting against a small fixed
//!   vocabulary, with a template decoder that stands in for a trained model.
//!
//! The variant is chosen at runtime from [`TokenizerConfig`] via
//! [`load_tokenizer`].
//!
//! # Special tokens
//!
//! The T5 family fixes `PAD = 0`, `EOS = 1`, `UNK = 2`. These are part of
//! the interface, not configuration.

use crate::config::TokenizerConfig;
use std::sync::Arc;
use thiserror::Error;

mod fallback;
mod subword;

pub use fallback::{FallbackTokenizer, ShapeFamily, FALLBACK_VOCAB};
pub use subword::SubwordTokenizer;

/// Integer identifier into the model vocabulary.
pub type TokenId = u32;

/// Padding token; also the decoder start token for T5.
pub const PAD_ID: TokenId = 0;
/// End-of-sequence token.
pub const EOS_ID: TokenId = 1;
/// Unknown-word placeholder.
pub const UNK_ID: TokenId = 2;

/// Error type for tokenizer operations.
#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Tokenizer not found: {0}")]
    NotFound(String),
    #[error("Failed to load tokenizer: {0}")]
    LoadFailed(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
    #[error("Decoding failed: {0}")]
    Decode(String),
}

/// Result type for tokenizer operations.
pub type TokenizerResult<T> = Result<T, TokenizerError>;

/// Text <-> token id conversion.
///
/// Implementations are immutable after construction and shared across
/// threads.
pub trait Tokenizer: Send + Sync {
    /// Returns the name of this tokenizer (e.g., "subword", "fallback").
    fn name(&self) -> &str;

    /// Converts text to token ids. Unknown spans map to [`UNK_ID`].
    fn encode(&self, text: &str) -> TokenizerResult<Vec<TokenId>>;

    /// Converts token ids back to text.
    fn decode(&self, ids: &[TokenId]) -> TokenizerResult<String>;

    /// Number of entries in the vocabulary.
    fn vocab_size(&self) -> usize;

    fn pad_id(&self) -> TokenId {
        PAD_ID
    }

    fn eos_id(&self) -> TokenId {
        EOS_ID
    }

    fn unk_id(&self) -> TokenId {
        UNK_ID
    }
}

/// Builds the tokenizer variant named by the configuration.
///
/// Loading the subword model is fatal on failure; there is no silent
/// downgrade to the fallback variant.
pub fn load_tokenizer(config: &TokenizerConfig) -> TokenizerResult<Arc<dyn Tokenizer>> {
    match config {
        TokenizerConfig::Subword { path } => Ok(Arc::new(SubwordTokenizer::from_file(path)?)),
        TokenizerConfig::Fallback => {
            log::warn!("Using fallback tokenizer (no trained subword model)");
            Ok(Arc::new(FallbackTokenizer::new()))
        }
    }
}
