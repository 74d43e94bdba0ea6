//! Model-backed subword tokenizer.
//!
//! Wraps a HuggingFace `tokenizers::Tokenizer` loaded from `tokenizer.json`.
//! Decoding skips special tokens, so a PAD or EOS the model produced never
//! shows up in the text.

use super::{TokenId, Tokenizer, TokenizerError, TokenizerResult};
use std::path::Path;

/// Trained subword segmentation model.
pub struct SubwordTokenizer {
    inner: tokenizers::Tokenizer,
    path: String,
}

impl SubwordTokenizer {
    /// Loads `tokenizer.json` from disk.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file doesn't exist
    /// - `LoadFailed` if the file isn't a valid tokenizer definition
    pub fn from_file(path: impl AsRef<Path>) -> TokenizerResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TokenizerError::NotFound(format!(
                "Tokenizer file not found: {}",
                path.display()
            )));
        }

        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            TokenizerError::LoadFailed(format!(
                "Failed to load tokenizer from {}: {}",
                path.display(),
                e
            ))
        })?;

        log::info!(
            "Loaded subword tokenizer {} (vocab size {})",
            path.display(),
            inner.get_vocab_size(true)
        );

        Ok(Self {
            inner,
            path: path.display().to_string(),
        })
    }

    /// Returns the path the tokenizer was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Tokenizer for SubwordTokenizer {
    fn name(&self) -> &str {
        "subword"
    }

    fn encode(&self, text: &str) -> TokenizerResult<Vec<TokenId>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| TokenizerError::Encode(format!("Tokenization failed: {}", e)))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[TokenId]) -> TokenizerResult<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| TokenizerError::Decode(format!("Failed to decode tokens: {}", e)))
    }

    fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const WORD_LEVEL_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [
            { "id": 0, "content": "<pad>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true },
            { "id": 1, "content": "</s>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true },
            { "id": 2, "content": "<unk>", "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true }
        ],
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "<pad>": 0, "</s>": 1, "<unk>": 2, "create": 3, "a": 4, "cube": 5 },
            "unk_token": "<unk>"
        }
    }"#;

    fn write_tokenizer(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("tokenizer.json");
        fs::write(&path, WORD_LEVEL_JSON).unwrap();
        path
    }

    #[test]
    fn test_encode_known_and_unknown_words() {
        let dir = TempDir::new().unwrap();
        let tokenizer = SubwordTokenizer::from_file(write_tokenizer(&dir)).unwrap();

        assert_eq!(tokenizer.encode("Create a cube").unwrap(), vec![3, 4, 5]);
        assert_eq!(tokenizer.encode("create a torus").unwrap(), vec![3, 4, 2]);
        assert!(tokenizer.encode("").unwrap().is_empty());
    }

    #[test]
    fn test_decode() {
        let dir = TempDir::new().unwrap();
        let tokenizer = SubwordTokenizer::from_file(write_tokenizer(&dir)).unwrap();

        assert_eq!(tokenizer.decode(&[3, 4, 5]).unwrap(), "create a cube");
        assert_eq!(tokenizer.vocab_size(), 6);
    }

    #[test]
    fn test_decode_skips_special_tokens() {
        let dir = TempDir::new().unwrap();
        let tokenizer = SubwordTokenizer::from_file(write_tokenizer(&dir)).unwrap();

        assert_eq!(tokenizer.decode(&[3, 0, 5, 1]).unwrap(), "create cube");
    }

    #[test]
    fn test_path_is_recorded() {
        let dir = TempDir::new().unwrap();
        let path = write_tokenizer(&dir);
        let tokenizer = SubwordTokenizer::from_file(&path).unwrap();

        assert_eq!(tokenizer.path(), path.display().to_string());
    }

    #[test]
    fn test_missing_file() {
        let result = SubwordTokenizer::from_file("/nonexistent/tokenizer.json");
        assert!(matches!(result, Err(TokenizerError::NotFound(_))));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokenizer.json");
        fs::write(&path, "{ \"model\": 42 }").unwrap();

        let result = SubwordTokenizer::from_file(&path);
        assert!(matches!(result, Err(TokenizerError::LoadFailed(_))));
    }
}
