//! The encoder seam: trait contract and error taxonomy.

use juris_core::TokenTag;
use thiserror::Error;

/// Maximum token window of the legal-domain encoder. Longer inputs are
/// silently truncated; trailing tokens never contribute to the embedding.
pub const MAX_TOKENS: usize = 512;

/// Floor for the L2 norm when normalizing, so a near-zero pooled vector
/// divides by the floor instead of blowing up.
pub(crate) const NORM_EPSILON: f32 = 1e-9;

#[derive(Debug, Error)]
pub enum EncodeError {
    /// No model is loaded. Recoverable: read paths degrade to empty
    /// results, write paths surface it to the caller.
    #[error("encoder model not available")]
    ModelUnavailable,

    #[error("tokenization failed: {0}")]
    Tokenize(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Turns text into a normalized fixed-dimension embedding and, when a
/// tagging head is present, per-token NER labels.
pub trait TextEncoder: Send {
    /// Embedding dimensionality.
    fn dim(&self) -> usize;

    /// Encode `text` (truncated to [`MAX_TOKENS`]) into a unit-norm vector
    /// of `dim()` floats. Embedding is a pure function of its input: the
    /// same text always yields the identical vector.
    fn embed(&mut self, text: &str) -> Result<Vec<f32>, EncodeError>;

    /// One NER label per sub-word token, in model output order.
    ///
    /// `Ok(vec![])` means the encoder has no tagging head or found no
    /// tokens — distinguishable from [`EncodeError::ModelUnavailable`],
    /// but both let the pipeline continue without tags.
    fn tag_tokens(&mut self, text: &str) -> Result<Vec<TokenTag>, EncodeError> {
        let _ = text;
        Ok(Vec::new())
    }
}

/// L2-normalize `v` in place with the denominator clamped at `NORM_EPSILON`.
pub(crate) fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm.max(NORM_EPSILON);
    for x in v.iter_mut() {
        *x /= denom;
    }
}
