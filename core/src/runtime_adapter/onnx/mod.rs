//! ONNX Runtime backend module.
//!
//! - `ONNXSession`: ONNX Runtime session wrapper implementing [`InferenceEngine`]
//! - `SessionOptions`: session builder knobs (threading, graph optimisation)
//!
//! [`InferenceEngine`]: super::InferenceEngine

mod session;

pub use session::{ONNXSession, SessionOptions};
