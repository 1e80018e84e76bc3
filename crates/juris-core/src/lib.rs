pub mod aggregate;
pub mod schema;
pub mod types;

pub use aggregate::{AggregationEngine, content_key};
pub use schema::index;
pub use types::{
    CaseRecord, DocumentExtraction, EntityMention, EntitySet, Importance, LegalIssue,
    PrecedentHit, Severity, TimelineEvent, TokenTag,
};
