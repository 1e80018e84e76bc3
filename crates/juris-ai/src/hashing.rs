//! Deterministic feature-hashing encoder.
//!
//! Hashes word unigrams and bigrams into a fixed number of buckets and
//! L2-normalizes the result. No model files, no tagging head; texts sharing
//! vocabulary land near each other, which is enough for tests and for
//! model-free deployments where the ONNX encoder is not compiled in.

use ring::digest::{SHA256, digest};

use crate::encoder::{EncodeError, MAX_TOKENS, TextEncoder, normalize};

pub struct HashingEncoder {
    dim: usize,
}

impl HashingEncoder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Encoder at the legal-domain default dimension (768).
    pub fn with_default_dim() -> Self {
        Self::new(juris_core::index::DEFAULT_DIM)
    }

    /// Bucket index and sign for one feature, derived from its SHA-256 so
    /// the mapping is identical across processes and platforms.
    fn bucket(&self, feature: &str) -> (usize, f32) {
        let hash = digest(&SHA256, feature.as_bytes());
        let bytes = hash.as_ref();
        let idx = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize % self.dim;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        (idx, sign)
    }
}

impl TextEncoder for HashingEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>, EncodeError> {
        // Same truncation rule as the model encoder: everything past the
        // token window is dropped without error.
        let tokens: Vec<String> = text
            .split_whitespace()
            .take(MAX_TOKENS)
            .map(|w| w.to_lowercase())
            .collect();

        let mut v = vec![0.0f32; self.dim];
        for token in &tokens {
            let (idx, sign) = self.bucket(token);
            v[idx] += sign;
        }
        for pair in tokens.windows(2) {
            let (idx, sign) = self.bucket(&format!("{} {}", pair[0], pair[1]));
            v[idx] += sign;
        }

        normalize(&mut v);
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn same_text_gives_identical_vector() {
        let mut encoder = HashingEncoder::new(128);
        let a = encoder.embed("defendant committed theft under IPC 379").unwrap();
        let b = encoder.embed("defendant committed theft under IPC 379").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn vectors_have_unit_norm() {
        let mut encoder = HashingEncoder::new(128);
        let v = encoder.embed("State of Maharashtra vs Rajesh Kumar").unwrap();
        assert_eq!(v.len(), 128);
        assert!((norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn different_texts_give_different_vectors() {
        let mut encoder = HashingEncoder::new(128);
        let a = encoder.embed("theft under section 379").unwrap();
        let b = encoder.embed("murder under section 302").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let mut encoder = HashingEncoder::new(256);
        let query = encoder.embed("theft under section 379 of the penal code").unwrap();
        let close = encoder.embed("convicted of theft under section 379").unwrap();
        let far = encoder.embed("maritime salvage insurance dispute").unwrap();

        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!(dot(&query, &close) > dot(&query, &far));
    }

    #[test]
    fn input_past_token_window_is_ignored() {
        let mut encoder = HashingEncoder::new(64);
        let first: String = (0..MAX_TOKENS).map(|i| format!("w{i} ")).collect();
        let extended = format!("{first} trailing tokens beyond the window");
        assert_eq!(
            encoder.embed(&first).unwrap(),
            encoder.embed(&extended).unwrap()
        );
    }

    #[test]
    fn empty_text_yields_finite_vector() {
        let mut encoder = HashingEncoder::new(64);
        let v = encoder.embed("").unwrap();
        assert!(v.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn no_tagging_head_returns_empty() {
        let mut encoder = HashingEncoder::new(64);
        assert!(encoder.tag_tokens("State vs Kumar").unwrap().is_empty());
    }
}
