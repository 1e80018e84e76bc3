//! The precedent search service.
//!
//! Composes the encoder registry and the index store, and owns the failure
//! policy: a missing model degrades a *search* to empty results (the
//! pipeline keeps going), but fails an *add* outright, because a write the
//! caller believes succeeded must never be dropped silently.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use juris_ai::{EncodeError, ModelRegistry};
use juris_core::{PrecedentHit, TokenTag, content_key};
use juris_store::{IndexStore, StoreError};

/// Precedent text shown in results is cut at this many characters.
const SNIPPET_CHARS: usize = 150;

const TOP_K_MIN: usize = 1;
const TOP_K_MAX: usize = 100;

#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Client error: rejected before any work begins.
    #[error("text must not be empty")]
    EmptyText,

    /// Client error: `top_k` is validated, never clamped.
    #[error("top_k must be between {TOP_K_MIN} and {TOP_K_MAX}, got {0}")]
    TopKOutOfRange(usize),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of one similarity search.
#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub ner: Vec<TokenTag>,
    pub embedding_dim: usize,
    pub precedents: Vec<PrecedentHit>,
    pub total_precedents_in_db: usize,
}

/// Confirmation that a precedent was embedded and persisted.
#[derive(Debug, Serialize)]
pub struct AddReceipt {
    pub total: usize,
    pub case_id: String,
}

pub struct PrecedentSearchService {
    registry: ModelRegistry,
    store: IndexStore,
}

impl PrecedentSearchService {
    pub fn new(registry: ModelRegistry, store: IndexStore) -> Self {
        Self { registry, store }
    }

    /// Whether an encoder is installed.
    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    /// Find the `top_k` most similar stored precedents to `text`.
    ///
    /// Empty text and out-of-range `top_k` are client errors. Encoding
    /// failures are not: the report comes back with empty tags and
    /// precedents and processing continues.
    pub fn find_similar(
        &self,
        text: &str,
        top_k: usize,
    ) -> Result<SearchReport, RetrievalError> {
        if text.is_empty() {
            return Err(RetrievalError::EmptyText);
        }
        if !(TOP_K_MIN..=TOP_K_MAX).contains(&top_k) {
            return Err(RetrievalError::TopKOutOfRange(top_k));
        }

        let (index, meta) = self.store.load_or_create();
        let total_precedents_in_db = meta.len();

        let embedding = match self.registry.embed(text) {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!(error = %e, "embedding unavailable, returning no precedents");
                None
            }
        };
        let ner = match self.registry.tag_tokens(text) {
            Ok(tags) => tags,
            Err(e) => {
                warn!(error = %e, "tagging unavailable, returning no tags");
                Vec::new()
            }
        };

        let embedding_dim = embedding.as_ref().map(|v| v.len()).unwrap_or(0);
        let precedents = match embedding {
            Some(vector) => index
                .search(&vector, top_k)
                .into_iter()
                .filter_map(|(position, distance)| {
                    meta.get(position).map(|m| PrecedentHit {
                        text: snippet(&m.text),
                        distance,
                        case_id: m.id.clone(),
                        similarity_score: 1.0 / (1.0 + distance),
                    })
                })
                .collect(),
            None => Vec::new(),
        };

        info!(
            hits = precedents.len(),
            total = total_precedents_in_db,
            "precedent search complete"
        );
        Ok(SearchReport {
            ner,
            embedding_dim,
            precedents,
            total_precedents_in_db,
        })
    }

    /// Embed `text` and append it to the durable index.
    ///
    /// When no id is supplied, one is derived from the content hash so the
    /// same text always receives the same id. Both a missing model and a
    /// failed persist surface as errors here.
    pub fn add_precedent(
        &self,
        text: &str,
        id: Option<&str>,
    ) -> Result<AddReceipt, RetrievalError> {
        if text.is_empty() {
            return Err(RetrievalError::EmptyText);
        }

        let vector = self.registry.embed(text)?;
        let case_id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("case_{}", &content_key(text)[..12]),
        };
        let total = self.store.add(vector, text, &case_id)?;
        Ok(AddReceipt { total, case_id })
    }

    /// Number of precedents in the last-persisted snapshot.
    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// Delete every stored precedent.
    pub fn clear(&self) -> Result<(), RetrievalError> {
        self.store.clear()?;
        Ok(())
    }
}

/// Truncate display text at [`SNIPPET_CHARS`] characters, appending an
/// ellipsis marker when anything was cut. Counts characters, not bytes,
/// so multi-byte text never splits mid-character.
fn snippet(text: &str) -> String {
    let mut chars = text.char_indices();
    match chars.nth(SNIPPET_CHARS) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use juris_ai::HashingEncoder;
    use tempfile::TempDir;

    const DIM: usize = 64;

    fn service(tmp: &TempDir) -> PrecedentSearchService {
        let registry = ModelRegistry::with_encoder(Box::new(HashingEncoder::new(DIM)));
        let store = IndexStore::open(tmp.path().join("precedent_index"), DIM).unwrap();
        PrecedentSearchService::new(registry, store)
    }

    fn degraded_service(tmp: &TempDir) -> PrecedentSearchService {
        let store = IndexStore::open(tmp.path().join("precedent_index"), DIM).unwrap();
        PrecedentSearchService::new(ModelRegistry::new(), store)
    }

    #[test]
    fn add_then_search_finds_the_precedent() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);

        let receipt = service
            .add_precedent(
                "State of Maharashtra vs Rajesh Kumar: theft under Section 379 IPC",
                Some("p1"),
            )
            .unwrap();
        assert_eq!(receipt.total, 1);
        assert_eq!(receipt.case_id, "p1");

        let report = service
            .find_similar("defendant committed theft under IPC Section 379", 1)
            .unwrap();
        assert_eq!(report.precedents.len(), 1);
        assert_eq!(report.precedents[0].case_id, "p1");
        assert!(report.precedents[0].distance >= 0.0);
        assert_eq!(report.total_precedents_in_db, 1);
        assert_eq!(report.embedding_dim, DIM);
    }

    #[test]
    fn top_k_zero_and_above_hundred_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        assert!(matches!(
            service.find_similar("text", 0),
            Err(RetrievalError::TopKOutOfRange(0))
        ));
        assert!(matches!(
            service.find_similar("text", 101),
            Err(RetrievalError::TopKOutOfRange(101))
        ));
        // The boundaries themselves are valid.
        assert!(service.find_similar("text", 1).is_ok());
        assert!(service.find_similar("text", 100).is_ok());
    }

    #[test]
    fn top_k_larger_than_index_returns_everything() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        service.add_precedent("first precedent about theft", None).unwrap();
        service.add_precedent("second precedent about fraud", None).unwrap();

        let report = service.find_similar("theft and fraud", 5).unwrap();
        assert_eq!(report.precedents.len(), 2);
    }

    #[test]
    fn empty_text_is_rejected_before_any_work() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        assert!(matches!(
            service.find_similar("", 5),
            Err(RetrievalError::EmptyText)
        ));
        assert!(matches!(
            service.add_precedent("", None),
            Err(RetrievalError::EmptyText)
        ));
    }

    #[test]
    fn search_on_empty_index_returns_empty_not_error() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        let report = service.find_similar("anything at all", 10).unwrap();
        assert!(report.precedents.is_empty());
        assert_eq!(report.total_precedents_in_db, 0);
    }

    #[test]
    fn missing_model_degrades_search_to_empty() {
        let tmp = TempDir::new().unwrap();
        let service = degraded_service(&tmp);

        let report = service.find_similar("some case text", 5).unwrap();
        assert!(report.ner.is_empty());
        assert!(report.precedents.is_empty());
        assert_eq!(report.embedding_dim, 0);
    }

    #[test]
    fn missing_model_fails_add() {
        let tmp = TempDir::new().unwrap();
        let service = degraded_service(&tmp);
        assert!(matches!(
            service.add_precedent("some case text", None),
            Err(RetrievalError::Encode(EncodeError::ModelUnavailable))
        ));
        assert_eq!(service.count(), 0);
    }

    #[test]
    fn generated_id_is_content_derived_and_stable() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        let a = service.add_precedent("identical text", None).unwrap();
        let b = service.add_precedent("identical text", None).unwrap();
        assert!(a.case_id.starts_with("case_"));
        assert_eq!(a.case_id, b.case_id);

        let c = service.add_precedent("different text", None).unwrap();
        assert_ne!(a.case_id, c.case_id);
    }

    #[test]
    fn long_precedent_text_is_truncated_with_ellipsis() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        let long_text = "theft ".repeat(60);
        service.add_precedent(&long_text, Some("p1")).unwrap();

        let report = service.find_similar("theft", 1).unwrap();
        let shown = &report.precedents[0].text;
        assert!(shown.ends_with("..."));
        assert_eq!(shown.chars().count(), 153);
    }

    #[test]
    fn short_text_is_shown_untruncated() {
        assert_eq!(snippet("short"), "short");
        let exactly_150: String = "x".repeat(150);
        assert_eq!(snippet(&exactly_150), exactly_150);
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = "§".repeat(200);
        let cut = snippet(&text);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 153);
    }

    #[test]
    fn similarity_score_is_inverse_distance() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        let text = "theft under section 379";
        service.add_precedent(text, Some("p1")).unwrap();

        // Identical query: distance 0, similarity exactly 1.
        let report = service.find_similar(text, 1).unwrap();
        let hit = &report.precedents[0];
        assert!(hit.distance.abs() < 1e-5);
        assert!((hit.similarity_score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn distances_come_back_ascending() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        service.add_precedent("theft under section 379 of the penal code", Some("a")).unwrap();
        service.add_precedent("murder under section 302 of the penal code", Some("b")).unwrap();
        service.add_precedent("civil property boundary dispute", Some("c")).unwrap();

        let report = service.find_similar("theft under section 379", 3).unwrap();
        assert_eq!(report.precedents.len(), 3);
        for pair in report.precedents.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        assert_eq!(report.precedents[0].case_id, "a");
    }

    #[test]
    fn clear_empties_the_index() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        service.add_precedent("text one", None).unwrap();
        service.add_precedent("text two", None).unwrap();
        assert_eq!(service.count(), 2);

        service.clear().unwrap();
        assert_eq!(service.count(), 0);
        let report = service.find_similar("text one", 5).unwrap();
        assert!(report.precedents.is_empty());
    }
}
