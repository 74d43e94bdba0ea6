//! Fallback tokenizer for running without a trained subword model.
//!
//! Encoding lowercases each whitespace-delimited word and looks it up in
//! [`FALLBACK_VOCAB`]; a word's id is its position there. Decoding does not
//! invert the token stream. It looks for a shape family (cube, circle,
//! rectangle, checked in that order) and returns the matching canned trail
//! script, or a generic "ready" script when none is present.

use super::{TokenId, Tokenizer, TokenizerResult, UNK_ID};
use std::collections::HashMap;

/// Fixed vocabulary. Indices 0-2 are PAD, EOS and UNK.
#[rustfmt::skip]
pub const FALLBACK_VOCAB: [&str; 52] = [
    "<pad>", "<eos>", "<unk>",
    "create", "sketch", "extrude", "revolve", "sweep", "blend",
    "circle", "rectangle", "line", "arc", "spline", "point",
    "dimension", "constraint", "pattern", "mirror", "copy",
    "cube", "cylinder", "sphere", "cone", "torus",
    "mm", "inch", "degree", "radius", "diameter", "length",
    "width", "height", "depth", "angle", "distance",
    "feature", "surface", "solid", "assembly", "part",
    "modify", "edit", "delete", "hide", "show", "zoom",
    "view", "rotate", "translate", "scale", "measure",
];

const CUBE_SCRIPT: &str = "~ Command `ProCmdDashboardActivate`\n\
~ Activate sketch\n\
~ Command `ProCmdSquare`\n\
~ Create square sketch\n\
~ Command `ProCmdDimLinear`\n\
~ Set dimension 50mm\n\
~ Command `ProCmdSketchDone`\n\
~ Exit sketch\n\
~ Command `ProCmdExtrude`\n\
~ Extrude 50mm\n\
~ Command `ProCmdFeatureDone`\n\
! Created 50mm cube";

const CIRCLE_SCRIPT: &str = "~ Command `ProCmdDashboardActivate`\n\
~ Activate sketch\n\
~ Command `ProCmdCircle`\n\
~ Create circle\n\
~ Command `ProCmdDimDiameter`\n\
~ Set diameter\n\
~ Command `ProCmdSketchDone`\n\
! Created circle";

const RECTANGLE_SCRIPT: &str = "~ Command `ProCmdDashboardActivate`\n\
~ Activate sketch\n\
~ Command `ProCmdRectangle`\n\
~ Create rectangle\n\
~ Command `ProCmdDimLinear`\n\
~ Set dimensions\n\
~ Command `ProCmdSketchDone`\n\
! Created rectangle";

const READY_SCRIPT: &str = "~ Command `ProCmdDashboardActivate`\n\
~ Activate modeling environment\n\
! Ready for feature creation";

/// Shape families recognised by the template decoder, in match priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeFamily {
    Cube,
    Circle,
    Rectangle,
}

impl ShapeFamily {
    const PRIORITY: [ShapeFamily; 3] = [
        ShapeFamily::Cube,
        ShapeFamily::Circle,
        ShapeFamily::Rectangle,
    ];

    pub fn word(self) -> &'static str {
        match self {
            ShapeFamily::Cube => "cube",
            ShapeFamily::Circle => "circle",
            ShapeFamily::Rectangle => "rectangle",
        }
    }

    /// Canned trail script for this family.
    pub fn script(self) -> &'static str {
        match self {
            ShapeFamily::Cube => CUBE_SCRIPT,
            ShapeFamily::Circle => CIRCLE_SCRIPT,
            ShapeFamily::Rectangle => RECTANGLE_SCRIPT,
        }
    }
}

/// Whitespace tokenizer over [`FALLBACK_VOCAB`] with a template decoder.
pub struct FallbackTokenizer {
    vocab: Vec<&'static str>,
    index: HashMap<&'static str, TokenId>,
}

impl FallbackTokenizer {
    pub fn new() -> Self {
        let vocab: Vec<&'static str> = FALLBACK_VOCAB.to_vec();
        let index = vocab
            .iter()
            .enumerate()
            .map(|(id, word)| (*word, id as TokenId))
            .collect();
        Self { vocab, index }
    }

    /// Looks up a single (already lowercased) word.
    pub fn token_id(&self, word: &str) -> TokenId {
        self.index.get(word).copied().unwrap_or(UNK_ID)
    }

    /// Returns the vocabulary entry for `id`, if in range.
    pub fn token(&self, id: TokenId) -> Option<&'static str> {
        self.vocab.get(id as usize).copied()
    }

    /// First shape family present in `ids`, by priority rather than position.
    pub fn detect_shape(&self, ids: &[TokenId]) -> Option<ShapeFamily> {
        ShapeFamily::PRIORITY
            .into_iter()
            .find(|family| ids.iter().any(|&id| self.token(id) == Some(family.word())))
    }
}

impl Default for FallbackTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer for FallbackTokenizer {
    fn name(&self) -> &str {
        "fallback"
    }

    fn encode(&self, text: &str) -> TokenizerResult<Vec<TokenId>> {
        Ok(text
            .split_whitespace()
            .map(|word| self.token_id(&word.to_lowercase()))
            .collect())
    }

    fn decode(&self, ids: &[TokenId]) -> TokenizerResult<String> {
        let script = match self.detect_shape(ids) {
            Some(family) => family.script(),
            None => READY_SCRIPT,
        };
        Ok(script.to_string())
    }

    fn vocab_size(&self) -> usize {
        self.vocab.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{EOS_ID, PAD_ID};

    #[test]
    fn test_vocab_layout() {
        let tokenizer = FallbackTokenizer::new();
        assert_eq!(tokenizer.vocab_size(), 52);
        assert_eq!(tokenizer.token(PAD_ID), Some("<pad>"));
        assert_eq!(tokenizer.token(EOS_ID), Some("<eos>"));
        assert_eq!(tokenizer.token(UNK_ID), Some("<unk>"));
        assert_eq!(tokenizer.token_id("create"), 3);
        assert_eq!(tokenizer.token_id("measure"), 51);
        assert_eq!(tokenizer.token(52), None);
    }

    #[test]
    fn test_encode_is_case_insensitive() {
        let tokenizer = FallbackTokenizer::new();
        assert_eq!(
            tokenizer.encode("Cube").unwrap(),
            tokenizer.encode("cube").unwrap()
        );
        assert_eq!(tokenizer.encode("CREATE a CUBE").unwrap(), vec![3, UNK_ID, 20]);
    }

    #[test]
    fn test_encode_unknown_words_map_to_unk() {
        let tokenizer = FallbackTokenizer::new();
        assert_eq!(tokenizer.encode("make 50mm widget").unwrap(), vec![UNK_ID; 3]);
        // punctuation is part of the word
        assert_eq!(tokenizer.encode("cube.").unwrap(), vec![UNK_ID]);
    }

    #[test]
    fn test_encode_empty_and_whitespace() {
        let tokenizer = FallbackTokenizer::new();
        assert!(tokenizer.encode("").unwrap().is_empty());
        assert!(tokenizer.encode(" \t\n ").unwrap().is_empty());
    }

    #[test]
    fn test_decode_cube_wins_over_circle() {
        let tokenizer = FallbackTokenizer::new();
        let ids = tokenizer.encode("circle then cube").unwrap();
        assert_eq!(tokenizer.detect_shape(&ids), Some(ShapeFamily::Cube));
        assert_eq!(tokenizer.decode(&ids).unwrap(), CUBE_SCRIPT);
    }

    #[test]
    fn test_decode_circle_wins_over_rectangle() {
        let tokenizer = FallbackTokenizer::new();
        let ids = tokenizer.encode("rectangle circle").unwrap();
        assert_eq!(tokenizer.decode(&ids).unwrap(), CIRCLE_SCRIPT);
    }

    #[test]
    fn test_decode_rectangle() {
        let tokenizer = FallbackTokenizer::new();
        let ids = tokenizer.encode("sketch a Rectangle").unwrap();
        let script = tokenizer.decode(&ids).unwrap();
        assert!(script.contains("ProCmdRectangle"));
        assert!(script.ends_with("! Created rectangle"));
    }

    #[test]
    fn test_decode_without_shape_is_ready_script() {
        let tokenizer = FallbackTokenizer::new();
        let ids = tokenizer.encode("extrude the part").unwrap();
        assert_eq!(tokenizer.decode(&ids).unwrap(), READY_SCRIPT);
        assert_eq!(tokenizer.decode(&[]).unwrap(), READY_SCRIPT);
    }

    #[test]
    fn test_decode_ignores_out_of_range_ids() {
        let tokenizer = FallbackTokenizer::new();
        assert_eq!(tokenizer.decode(&[9_000, 31_999]).unwrap(), READY_SCRIPT);
    }
}
