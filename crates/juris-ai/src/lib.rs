//! AI inference layer: encoder lifecycle, a deterministic hashing encoder,
//! and ONNX Runtime embeddings/NER behind the `onnx` feature.

mod encoder;
mod hashing;
mod registry;

pub use encoder::{EncodeError, MAX_TOKENS, TextEncoder};
pub use hashing::HashingEncoder;
pub use registry::ModelRegistry;

#[cfg(feature = "onnx")]
mod onnx;
#[cfg(feature = "onnx")]
pub use onnx::OnnxEncoder;
