//! Case analysis fan-in: per-document retrieval, then aggregation.

use std::path::{Path, PathBuf};

use tracing::warn;

use juris_core::{AggregationEngine, CaseRecord, DocumentExtraction};
use juris_retrieval::PrecedentSearchService;

/// Precedents retrieved per document before case-level dedup.
const DOC_TOP_K: usize = 5;

/// Read each extraction file, attach retrieval output for its text, and
/// merge everything into one case record.
///
/// One bad document never aborts the batch: an unreadable or malformed
/// file degrades to a placeholder document carrying the error as its only
/// fact, and a failed retrieval just leaves that document without
/// precedents.
pub fn run(
    service: &PrecedentSearchService,
    case_id: &str,
    files: &[PathBuf],
) -> CaseRecord {
    let mut docs = Vec::with_capacity(files.len());
    for path in files {
        let mut doc = match read_extraction(path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "unreadable extraction file");
                error_document(path, &e)
            }
        };
        if doc.file_name.is_empty() {
            doc.file_name = path.display().to_string();
        }

        // Retrieval runs only when the document brought its own text and
        // the extraction layer did not already attach precedents.
        if !doc.text.is_empty() && doc.precedents.is_empty() {
            match service.find_similar(&doc.text, DOC_TOP_K) {
                Ok(report) => {
                    doc.precedents = report.precedents;
                    doc.ner = report.ner;
                }
                Err(e) => {
                    warn!(file = %doc.file_name, error = %e, "precedent retrieval failed");
                }
            }
        }
        docs.push(doc);
    }

    AggregationEngine::aggregate(case_id, &docs)
}

fn read_extraction(path: &Path) -> anyhow::Result<DocumentExtraction> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn error_document(path: &Path, error: &anyhow::Error) -> DocumentExtraction {
    DocumentExtraction {
        file_name: path.display().to_string(),
        key_facts: vec![format!("Error processing {}: {error}", path.display())],
        ..Default::default()
    }
}
