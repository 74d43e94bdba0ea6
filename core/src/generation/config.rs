//! Generation parameters.

use serde::{Deserialize, Serialize};

/// Parameters for greedy decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Maximum tokens to generate (decode steps).
    /// Default: 256
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: usize,
}

fn default_max_new_tokens() -> usize {
    256
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: default_max_new_tokens(),
        }
    }
}

impl GenerationConfig {
    /// Greedy decoding with the default step budget.
    pub fn greedy() -> Self {
        Self::default()
    }

    /// Set max new tokens.
    pub fn with_max_new_tokens(mut self, max: usize) -> Self {
        self.max_new_tokens = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budget() {
        assert_eq!(GenerationConfig::default().max_new_tokens, 256);
        assert_eq!(GenerationConfig::greedy(), GenerationConfig::default());
        let parsed: GenerationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, GenerationConfig::default());
    }

    #[test]
    fn test_with_max_new_tokens() {
        let config = GenerationConfig::default().with_max_new_tokens(8);
        assert_eq!(config.max_new_tokens, 8);
    }
}
