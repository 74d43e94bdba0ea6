//! Testing utilities for nl2trail-core.
//!
//! Provides a scripted inference engine so the decode loop and the
//! orchestrator can be exercised without a real ONNX model.
//!
//! ## Usage
//!
//! ```rust
//! use nl2trail_core::testing::ScriptedEngine;
//! use nl2trail_core::tokenizer::EOS_ID;
//!
//! let engine = ScriptedEngine::new(64).with_script(vec![12, 30, EOS_ID]);
//! ```

pub mod mocks;

pub use mocks::*;
