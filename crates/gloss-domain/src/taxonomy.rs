//! System taxonomies used by the validator allow-lists

use serde::Serialize;

/// Entity types accepted when the caller supplies no allow-list
pub const ENTITY_TYPES: &[&str] = &[
    "person",
    "organization",
    "location",
    "technology",
    "concept",
    "project",
    "event",
    "product",
    "tool",
    "language",
    "framework",
    "document",
];

/// Relationship types accepted when the caller supplies no allow-list
pub const RELATIONSHIP_TYPES: &[&str] = &[
    "works_at",
    "works_on",
    "uses",
    "depends_on",
    "part_of",
    "created_by",
    "located_in",
    "related_to",
    "knows",
    "manages",
    "implements",
    "mentions",
];

/// Kind of memory a classified piece of content represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// A statement about the world
    Fact,
    /// A stated like or dislike
    Preference,
    /// A choice that was made, with or without rationale
    Decision,
    /// Something to be done
    Task,
    /// Something that happened
    Event,
    /// Source code or a technical snippet
    Code,
    /// Pointer to an external resource
    Reference,
    /// A derived observation or lesson
    Insight,
}

impl MemoryType {
    /// Every memory type, in declaration order
    pub const ALL: [MemoryType; 8] = [
        MemoryType::Fact,
        MemoryType::Preference,
        MemoryType::Decision,
        MemoryType::Task,
        MemoryType::Event,
        MemoryType::Code,
        MemoryType::Reference,
        MemoryType::Insight,
    ];

    /// Get the memory type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Fact => "fact",
            MemoryType::Preference => "preference",
            MemoryType::Decision => "decision",
            MemoryType::Task => "task",
            MemoryType::Event => "event",
            MemoryType::Code => "code",
            MemoryType::Reference => "reference",
            MemoryType::Insight => "insight",
        }
    }

    /// Parse a memory type, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid memory type: {}", s))
    }
}

/// Importance attached to a classified piece of content
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Nice to know
    Low,
    /// Default importance
    Medium,
    /// Should be surfaced
    High,
    /// Must be surfaced
    Critical,
}

impl Priority {
    /// Get the priority name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    /// Parse a priority, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid priority: {}", s))
    }
}
