//! ONNX Runtime encoder for legal-domain BERT models (InLegalBERT).
//!
//! The model directory must contain `model.onnx` and `tokenizer.json`; an
//! optional `ner.onnx` token-classification head enables tagging. Embeddings
//! are mean-pooled over the attention mask and L2-normalized.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use juris_core::TokenTag;

use crate::encoder::{EncodeError, MAX_TOKENS, TextEncoder, normalize};

/// Embedding and NER encoder backed by ONNX Runtime.
pub struct OnnxEncoder {
    session: Session,
    ner_session: Option<Session>,
    tokenizer: Tokenizer,
    dim: usize,
}

impl OnnxEncoder {
    /// Load from a directory containing `model.onnx`, `tokenizer.json`,
    /// and optionally `ner.onnx`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let ner_path = model_dir.join("ner.onnx");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let dim = infer_dim(session.outputs()[0].dtype())
            .unwrap_or(juris_core::index::DEFAULT_DIM);

        // The tagging head is optional; without it `tag_tokens` returns empty.
        let ner_session = if ner_path.exists() {
            Some(Session::builder()?.commit_from_file(&ner_path)?)
        } else {
            None
        };

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;

        // Truncate at the encoder window; trailing tokens are dropped silently.
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;

        info!(
            dim,
            ner = ner_session.is_some(),
            model = %model_path.display(),
            "loaded ONNX encoder"
        );
        Ok(Self {
            session,
            ner_session,
            tokenizer,
            dim,
        })
    }

    /// Tokenize one text and build the three input tensors.
    fn encode_inputs(
        &self,
        text: &str,
    ) -> Result<(tokenizers::Encoding, [Tensor<i64>; 3]), EncodeError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EncodeError::Tokenize(e.to_string()))?;

        let seq_len = encoding.get_ids().len();
        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let type_ids: Vec<i64> = encoding
            .get_type_ids()
            .iter()
            .map(|&t| t as i64)
            .collect();

        let shape = [1i64, seq_len as i64];
        let tensors = [
            Tensor::from_array((shape, ids.into_boxed_slice()))
                .map_err(|e| EncodeError::Inference(e.to_string()))?,
            Tensor::from_array((shape, mask.into_boxed_slice()))
                .map_err(|e| EncodeError::Inference(e.to_string()))?,
            Tensor::from_array((shape, type_ids.into_boxed_slice()))
                .map_err(|e| EncodeError::Inference(e.to_string()))?,
        ];
        Ok((encoding, tensors))
    }
}

impl TextEncoder for OnnxEncoder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>, EncodeError> {
        let (encoding, [ids, mask, type_ids]) = self.encode_inputs(text)?;
        let attention_mask = encoding.get_attention_mask();
        let seq_len = attention_mask.len();

        let outputs = self
            .session
            .run(ort::inputs![
                "input_ids" => ids,
                "attention_mask" => mask,
                "token_type_ids" => type_ids,
            ])
            .map_err(|e| EncodeError::Inference(e.to_string()))?;

        // Token embeddings: [1, seq_len, dim].
        let (output_shape, output_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncodeError::Inference(e.to_string()))?;
        let dims: &[i64] = output_shape;
        if dims.len() != 3 || dims[2] as usize != self.dim {
            return Err(EncodeError::Inference(format!(
                "unexpected output shape {dims:?}, expected [1, {seq_len}, {}]",
                self.dim
            )));
        }

        // Mean pooling over non-padding tokens.
        let mut pooled = vec![0.0f32; self.dim];
        let mut token_count = 0.0f32;
        for (j, &mask_val) in attention_mask.iter().enumerate().take(dims[1] as usize) {
            if mask_val > 0 {
                let offset = j * self.dim;
                for (d, p) in pooled.iter_mut().enumerate() {
                    *p += output_data[offset + d];
                }
                token_count += 1.0;
            }
        }
        if token_count > 0.0 {
            for p in &mut pooled {
                *p /= token_count;
            }
        }
        normalize(&mut pooled);
        Ok(pooled)
    }

    fn tag_tokens(&mut self, text: &str) -> Result<Vec<TokenTag>, EncodeError> {
        if self.ner_session.is_none() {
            return Ok(Vec::new());
        }
        let (encoding, [ids, mask, type_ids]) = self.encode_inputs(text)?;

        let Some(ner_session) = self.ner_session.as_mut() else {
            return Ok(Vec::new());
        };
        let outputs = ner_session
            .run(ort::inputs![
                "input_ids" => ids,
                "attention_mask" => mask,
                "token_type_ids" => type_ids,
            ])
            .map_err(|e| EncodeError::Inference(e.to_string()))?;

        // Logits: [1, seq_len, num_labels]; argmax per token.
        let (logit_shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EncodeError::Inference(e.to_string()))?;
        let dims: &[i64] = logit_shape;
        if dims.len() != 3 {
            return Err(EncodeError::Inference(format!(
                "unexpected NER logit shape {dims:?}"
            )));
        }
        let num_labels = dims[2] as usize;

        let tags = encoding
            .get_tokens()
            .iter()
            .enumerate()
            .take(dims[1] as usize)
            .map(|(j, token)| {
                let row = &logits[j * num_labels..(j + 1) * num_labels];
                let label_id = row
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i as i64)
                    .unwrap_or(0);
                TokenTag {
                    token: token.clone(),
                    label_id,
                }
            })
            .collect();
        Ok(tags)
    }
}

/// Infer the embedding dimension from the model's output tensor shape.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("models")
            .join("inlegalbert")
    }

    fn require_model() -> PathBuf {
        let dir = model_dir();
        if !dir.join("model.onnx").exists() {
            panic!(
                "Model not found. Export law-ai/InLegalBERT to ONNX into {:?} \
                 (model.onnx + tokenizer.json, optional ner.onnx)",
                dir
            );
        }
        dir
    }

    #[test]
    fn embed_is_deterministic_and_normalized() {
        let dir = require_model();
        let mut encoder = OnnxEncoder::load(&dir).unwrap();

        let a = encoder
            .embed("theft under Section 379 of the Indian Penal Code")
            .unwrap();
        let b = encoder
            .embed("theft under Section 379 of the Indian Penal Code")
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), encoder.dim());

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "expected unit norm, got {norm}");
    }

    #[test]
    fn tag_tokens_without_ner_head_is_empty() {
        let dir = require_model();
        let mut encoder = OnnxEncoder::load(&dir).unwrap();
        if encoder.ner_session.is_none() {
            assert!(encoder.tag_tokens("State vs Kumar").unwrap().is_empty());
        }
    }
}
