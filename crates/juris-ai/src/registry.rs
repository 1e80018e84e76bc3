//! Process-wide encoder lifecycle.

use std::sync::Mutex;

use juris_core::TokenTag;
use tracing::info;

use crate::encoder::{EncodeError, TextEncoder};

/// Holds the process-wide encoder behind an explicit lifecycle.
///
/// The registry starts empty; [`initialize`](Self::initialize) installs an
/// encoder, and every operation on an empty registry reports
/// [`EncodeError::ModelUnavailable`]. Injected into the search service
/// rather than accessed as ambient state, so tests can install a
/// deterministic encoder.
#[derive(Default)]
pub struct ModelRegistry {
    encoder: Mutex<Option<Box<dyn TextEncoder>>>,
}

impl ModelRegistry {
    /// An empty registry; everything fails with `ModelUnavailable` until
    /// an encoder is installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with `encoder` already installed.
    pub fn with_encoder(encoder: Box<dyn TextEncoder>) -> Self {
        let registry = Self::new();
        registry.initialize(encoder);
        registry
    }

    /// Install an encoder. A repeated call replaces the previous one.
    pub fn initialize(&self, encoder: Box<dyn TextEncoder>) {
        info!(dim = encoder.dim(), "encoder installed");
        *self.encoder.lock().unwrap() = Some(encoder);
    }

    pub fn is_ready(&self) -> bool {
        self.encoder.lock().unwrap().is_some()
    }

    /// Embedding dimensionality of the installed encoder, if any.
    pub fn dim(&self) -> Option<usize> {
        self.encoder.lock().unwrap().as_ref().map(|e| e.dim())
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EncodeError> {
        match self.encoder.lock().unwrap().as_mut() {
            Some(encoder) => encoder.embed(text),
            None => Err(EncodeError::ModelUnavailable),
        }
    }

    pub fn tag_tokens(&self, text: &str) -> Result<Vec<TokenTag>, EncodeError> {
        match self.encoder.lock().unwrap().as_mut() {
            Some(encoder) => encoder.tag_tokens(text),
            None => Err(EncodeError::ModelUnavailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::HashingEncoder;

    #[test]
    fn empty_registry_reports_model_unavailable() {
        let registry = ModelRegistry::new();
        assert!(!registry.is_ready());
        assert!(registry.dim().is_none());
        assert!(matches!(
            registry.embed("some text"),
            Err(EncodeError::ModelUnavailable)
        ));
        assert!(matches!(
            registry.tag_tokens("some text"),
            Err(EncodeError::ModelUnavailable)
        ));
    }

    #[test]
    fn initialized_registry_embeds() {
        let registry = ModelRegistry::with_encoder(Box::new(HashingEncoder::new(64)));
        assert!(registry.is_ready());
        assert_eq!(registry.dim(), Some(64));
        assert_eq!(registry.embed("theft under section 379").unwrap().len(), 64);
    }

    #[test]
    fn reinitialize_replaces_encoder() {
        let registry = ModelRegistry::with_encoder(Box::new(HashingEncoder::new(64)));
        registry.initialize(Box::new(HashingEncoder::new(128)));
        assert_eq!(registry.dim(), Some(128));
    }
}
