//! Records recovered from model output
//!
//! All records are plain values: produced once per parse call and owned by
//! the caller afterwards.

use crate::taxonomy::{MemoryType, Priority};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Returns true when `value` lies in the inclusive range [0.0, 1.0].
///
/// NaN is never in range.
pub fn confidence_in_range(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

/// A named thing mentioned in the source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Surface name of the entity
    pub name: String,

    /// Entity type (e.g. "person", "organization")
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Optional free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Model confidence in [0.0, 1.0]
    pub confidence: f64,
}

/// A directed, typed edge between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// Source entity name
    pub from: String,

    /// Target entity name
    pub to: String,

    /// Relationship type (e.g. "works_at")
    #[serde(rename = "type")]
    pub relationship_type: String,

    /// Model confidence in [0.0, 1.0]
    pub confidence: f64,
}

impl RelationshipRecord {
    /// Label used in skip audits and logs: `from→to`
    pub fn label(&self) -> String {
        format!("{}→{}", self.from, self.to)
    }
}

/// Whole-record classification of a piece of content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationRecord {
    /// Kind of memory the content represents
    pub memory_type: MemoryType,

    /// Category; any value is accepted
    pub category: String,

    /// Optional finer classification label
    pub classification: Option<String>,

    /// Optional subcategory
    pub subcategory: Option<String>,

    /// Importance of the content
    pub priority: Priority,

    /// Context labels attached by the model
    pub context_labels: Vec<String>,

    /// Free-form tags
    pub tags: Vec<String>,

    /// Model confidence in [0.0, 1.0]
    pub confidence: f64,
}

/// Summary of a piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Prose summary
    pub summary: String,

    /// Bullet-style key points
    #[serde(default, alias = "keyPoints")]
    pub key_points: Vec<String>,
}

/// Keywords extracted from a piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRecord {
    /// Keywords in model order
    pub keywords: Vec<String>,
}

/// Which batch an audited item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SkipDomain {
    /// Entity batch
    Entity,
    /// Relationship batch
    Relationship,
}

impl SkipDomain {
    /// Get the domain name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipDomain::Entity => "entity",
            SkipDomain::Relationship => "relationship",
        }
    }
}

impl fmt::Display for SkipDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an item was moved to the skip list
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SkipReason {
    /// Type string is not in the allow-list
    UnknownType,
    /// Confidence outside [0.0, 1.0]
    ConfidenceOutOfRange(f64),
    /// Item is not an object of the expected shape (missing or mistyped field)
    Malformed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownType => f.write_str("type not allowed"),
            SkipReason::ConfidenceOutOfRange(c) => {
                write!(f, "confidence {} out of range [0.0, 1.0]", c)
            }
            SkipReason::Malformed => f.write_str("malformed item"),
        }
    }
}

/// Audit entry for an item that was rejected inside an otherwise valid batch
///
/// The item either failed a domain rule or did not have the expected shape.
/// For a malformed item, type and name are whatever the raw JSON held, empty
/// when absent. Skips never fail a parse call. They exist so callers can
/// observe what the model produced and the validator threw away.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    /// Batch the item came from
    pub domain: SkipDomain,

    /// Type string as the model wrote it
    pub rejected_type: String,

    /// Entity name, or `from→to` for a relationship
    pub identifying_name: String,

    /// Rule the item failed
    pub reason: SkipReason,
}
