//! Cross-document aggregation of extraction results into one case record.
//!
//! Each source document yields its own facts, entities, timeline events,
//! legal issues, and retrieved precedents. The engine folds them, in
//! document order, into a single [`CaseRecord`]:
//!
//! - entities are deduplicated per kind by lowercased name, first seen wins
//! - facts, issues, and timeline events are concatenated; caps apply only
//!   at the case level
//! - the merged timeline is sorted lexicographically by date (empty first)
//! - precedents are deduplicated by id, falling back to a content hash when
//!   the id is empty, then ranked by similarity score descending

use ring::digest::{SHA256, digest};
use std::collections::HashSet;
use tracing::warn;

use crate::types::{
    CaseRecord, DocumentExtraction, EntityMention, EntitySet, LegalIssue, PrecedentHit, Severity,
    TimelineEvent,
};

/// Case-level caps. Per-document output is never truncated; only the
/// merged lists are.
const MAX_FACTS: usize = 20;
const MAX_ISSUES: usize = 10;
const MAX_TIMELINE: usize = 20;
const MAX_PRECEDENTS: usize = 10;

/// SHA-256 of the text as lowercase hex.
///
/// Used as the dedup key for precedents without an id and as the stable
/// suffix of generated case ids, so identical content always maps to the
/// same key across processes.
pub fn content_key(text: &str) -> String {
    let hash = digest(&SHA256, text.as_bytes());
    hash.as_ref().iter().map(|b| format!("{b:02x}")).collect()
}

/// Folds per-document extraction results into one case-level record.
pub struct AggregationEngine;

impl AggregationEngine {
    /// Merge `docs` (in arrival order) into a single [`CaseRecord`].
    pub fn aggregate(case_id: &str, docs: &[DocumentExtraction]) -> CaseRecord {
        let mut key_facts: Vec<String> = Vec::new();
        let mut people: Vec<EntityMention> = Vec::new();
        let mut organizations: Vec<EntityMention> = Vec::new();
        let mut locations: Vec<EntityMention> = Vec::new();
        let mut timeline: Vec<TimelineEvent> = Vec::new();
        let mut legal_issues: Vec<LegalIssue> = Vec::new();
        let mut precedents: Vec<PrecedentHit> = Vec::new();
        let mut ner_token_count = 0usize;

        for doc in docs {
            key_facts.extend(doc.key_facts.iter().filter(|f| !f.is_empty()).cloned());
            people.extend(doc.entities.people.iter().cloned());
            organizations.extend(doc.entities.organizations.iter().cloned());
            locations.extend(doc.entities.locations.iter().cloned());
            timeline.extend(doc.timeline.iter().cloned());
            legal_issues.extend(doc.legal_issues.iter().cloned());
            precedents.extend(doc.precedents.iter().cloned());
            ner_token_count += doc.ner.len();
        }

        let entities = EntitySet {
            people: dedup_mentions(people),
            organizations: dedup_mentions(organizations),
            locations: dedup_mentions(locations),
        };

        // Stable sort keeps document order among events sharing a date;
        // empty dates sort before any ISO 8601 date.
        timeline.sort_by(|a, b| a.date.cmp(&b.date));
        timeline.truncate(MAX_TIMELINE);

        let precedents = dedup_precedents(precedents);
        let total_precedents = precedents.len();
        let precedents: Vec<PrecedentHit> =
            precedents.into_iter().take(MAX_PRECEDENTS).collect();

        if key_facts.is_empty() {
            warn!(case_id, "no key facts extracted, using fallback");
            key_facts.push(format!("Evidence files processed: {} files", docs.len()));
        }
        key_facts.truncate(MAX_FACTS);

        if legal_issues.is_empty() {
            warn!(case_id, "no legal issues extracted, using fallback");
            legal_issues.push(LegalIssue {
                issue: "Case evidence analysis".into(),
                severity: Severity::Medium,
                description: "Evidence files have been processed and analyzed. \
                              Review extracted information for legal issues."
                    .into(),
            });
        }
        legal_issues.truncate(MAX_ISSUES);

        let case_summary = build_case_summary(
            case_id,
            docs,
            &key_facts,
            &entities,
            &timeline,
            &legal_issues,
            total_precedents,
        );

        CaseRecord {
            case_id: case_id.to_string(),
            case_summary,
            key_facts,
            entities,
            timeline,
            legal_issues,
            precedents,
            total_precedents,
            ner_token_count,
            files_processed: docs.len(),
            analysis_timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Deduplicate entity mentions by lowercased, trimmed name.
///
/// The first occurrence's full record is retained; later mentions with the
/// same name are discarded even when they carry a different role. Mentions
/// with an empty name are dropped.
fn dedup_mentions(mentions: Vec<EntityMention>) -> Vec<EntityMention> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for mention in mentions {
        let key = mention.name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        if seen.insert(key) {
            out.push(mention);
        }
    }
    out
}

/// Deduplicate precedents and rank them by similarity, best first.
///
/// The key is the precedent id when non-empty, otherwise the SHA-256 of its
/// text, so two no-id hits collapse only when their text is byte-identical.
/// First occurrence wins; the sort is stable so ties keep arrival order.
fn dedup_precedents(hits: Vec<PrecedentHit>) -> Vec<PrecedentHit> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique: Vec<PrecedentHit> = Vec::new();
    for hit in hits {
        let key = if hit.case_id.is_empty() {
            content_key(&hit.text)
        } else {
            hit.case_id.clone()
        };
        if seen.insert(key) {
            unique.push(hit);
        }
    }
    unique.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    unique
}

fn build_case_summary(
    case_id: &str,
    docs: &[DocumentExtraction],
    key_facts: &[String],
    entities: &EntitySet,
    timeline: &[TimelineEvent],
    legal_issues: &[LegalIssue],
    total_precedents: usize,
) -> String {
    let doc_summaries: Vec<&str> = docs
        .iter()
        .map(|d| d.summary.as_str())
        .filter(|s| !s.is_empty())
        .take(3)
        .collect();

    let mut summary = format!(
        "Case analysis summary for {case_id}.\n\
         This case involves analysis of {} evidence file(s). {}\n\
         Key facts extracted: {}. Entities identified: {} people, {} organizations, \
         {} locations. Legal issues: {}. Timeline events: {}.",
        docs.len(),
        doc_summaries.join(" "),
        key_facts.len(),
        entities.people.len(),
        entities.organizations.len(),
        entities.locations.len(),
        legal_issues.len(),
        timeline.len(),
    );

    if total_precedents > 0 {
        summary.push_str(&format!(
            "\nPrecedents found: {total_precedents} similar legal precedents identified."
        ));
    }

    summary
}
