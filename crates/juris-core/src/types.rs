//! Boundary types exchanged with the extraction layer.
//!
//! Every structure the upstream extraction service hands us is an explicit
//! schema here, so malformed payloads are rejected when the JSON is parsed
//! rather than surfacing later as missing-field lookups. Unknown and absent
//! optional fields default to empty.

use serde::{Deserialize, Serialize};

/// Importance of a timeline event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

/// Severity of an identified legal issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    #[default]
    Medium,
    Low,
}

/// A named entity mentioned in a document (person, organization, or location).
///
/// Some extractors emit `type` instead of `role` for non-person entities;
/// both spellings parse into `role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMention {
    pub name: String,
    #[serde(default, alias = "type")]
    pub role: String,
}

/// Entities grouped by kind, as produced per document by the extraction layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySet {
    #[serde(default)]
    pub people: Vec<EntityMention>,
    #[serde(default)]
    pub organizations: Vec<EntityMention>,
    #[serde(default)]
    pub locations: Vec<EntityMention>,
}

/// A dated event extracted from the evidence.
///
/// `date` is an ISO 8601 date string or empty when unknown; the merged
/// case timeline sorts lexicographically on it, so empty dates sort first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    pub description: String,
    #[serde(default)]
    pub importance: Importance,
}

/// A legal issue identified in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalIssue {
    pub issue: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

/// One sub-word token with its NER label id, in model output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTag {
    pub token: String,
    pub label_id: i64,
}

/// A retrieved precedent: stored case text (truncated for display) with
/// its distance to the query and the derived similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrecedentHit {
    pub text: String,
    pub distance: f32,
    pub case_id: String,
    pub similarity_score: f32,
}

/// Everything extracted from a single source document: the structured
/// analysis from the extraction layer plus the retrieval output for
/// that document's text.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentExtraction {
    #[serde(default)]
    pub file_name: String,
    /// Full extracted document text, used for per-document precedent
    /// retrieval; never echoed into the case record.
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub key_facts: Vec<String>,
    #[serde(default)]
    pub entities: EntitySet,
    #[serde(default)]
    pub timeline: Vec<TimelineEvent>,
    #[serde(default)]
    pub legal_issues: Vec<LegalIssue>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub precedents: Vec<PrecedentHit>,
    #[serde(default)]
    pub ner: Vec<TokenTag>,
}

/// The merged, case-level record produced by the aggregation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub case_id: String,
    pub case_summary: String,
    pub key_facts: Vec<String>,
    pub entities: EntitySet,
    pub timeline: Vec<TimelineEvent>,
    pub legal_issues: Vec<LegalIssue>,
    /// Deduplicated precedents across all documents, best match first.
    pub precedents: Vec<PrecedentHit>,
    /// Unique precedents found before the top-10 cap was applied.
    pub total_precedents: usize,
    pub ner_token_count: usize,
    pub files_processed: usize,
    /// RFC 3339 timestamp of when the aggregation ran.
    pub analysis_timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_parses_with_all_fields_absent() {
        let doc: DocumentExtraction = serde_json::from_str("{}").unwrap();
        assert!(doc.key_facts.is_empty());
        assert!(doc.entities.people.is_empty());
        assert!(doc.precedents.is_empty());
    }

    #[test]
    fn entity_role_accepts_type_alias() {
        let org: EntityMention =
            serde_json::from_str(r#"{"name": "Acme Corp", "type": "employer"}"#).unwrap();
        assert_eq!(org.role, "employer");
    }

    #[test]
    fn importance_defaults_to_medium() {
        let event: TimelineEvent =
            serde_json::from_str(r#"{"description": "contract signed"}"#).unwrap();
        assert_eq!(event.importance, Importance::Medium);
        assert_eq!(event.date, "");
    }

    #[test]
    fn severity_round_trips_lowercase() {
        let issue = LegalIssue {
            issue: "breach of contract".into(),
            severity: Severity::High,
            description: String::new(),
        };
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains(r#""severity":"high""#));
        let back: LegalIssue = serde_json::from_str(&json).unwrap();
        assert_eq!(back.severity, Severity::High);
    }

    #[test]
    fn extraction_rejects_wrong_shape() {
        // key_facts must be a list of strings, not a scalar.
        let result = serde_json::from_str::<DocumentExtraction>(r#"{"key_facts": "one fact"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn missing_entity_name_is_an_error() {
        let result = serde_json::from_str::<EntityMention>(r#"{"role": "witness"}"#);
        assert!(result.is_err());
    }
}
