//! Parse and validate LLM output into typed records
//!
//! Every shape goes through the same steps: recover the JSON object from the
//! raw text, deserialize it, then validate. Batch shapes (entities,
//! relationships) validate item by item and move rejects to a skip list;
//! classification validates the whole record and fails outright.

use crate::error::ExtractorError;
use crate::types::ValidatedBatch;
use gloss_domain::records::confidence_in_range;
use gloss_domain::{
    ClassificationRecord, EntityRecord, KeywordRecord, MemoryType, Priority, RelationshipRecord,
    SkipDomain, SkipReason, SkippedRecord, SummaryRecord, ENTITY_TYPES, RELATIONSHIP_TYPES,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

/// A batch item that carries a type string and a confidence
pub trait Screened: DeserializeOwned {
    /// Batch this item belongs to
    const DOMAIN: SkipDomain;

    /// JSON key holding the item array
    const KEY: &'static str;

    /// System allow-list used when the caller supplies none
    const SYSTEM_TYPES: &'static [&'static str];

    /// Type string as the model wrote it
    fn kind(&self) -> &str;

    /// Identifying label for skip audits
    fn label(&self) -> String;

    /// Identifying label read straight from raw JSON, for items that did
    /// not deserialize. Missing fields read as empty.
    fn raw_label(item: &Value) -> String;

    /// Model confidence
    fn confidence(&self) -> f64;

    /// Key under which two items count as the same thing when merging chunks
    fn identity(&self) -> String;
}

impl Screened for EntityRecord {
    const DOMAIN: SkipDomain = SkipDomain::Entity;
    const KEY: &'static str = "entities";
    const SYSTEM_TYPES: &'static [&'static str] = ENTITY_TYPES;

    fn kind(&self) -> &str {
        &self.entity_type
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn raw_label(item: &Value) -> String {
        raw_str(item, "name").to_string()
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn identity(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

impl Screened for RelationshipRecord {
    const DOMAIN: SkipDomain = SkipDomain::Relationship;
    const KEY: &'static str = "relationships";
    const SYSTEM_TYPES: &'static [&'static str] = RELATIONSHIP_TYPES;

    fn kind(&self) -> &str {
        &self.relationship_type
    }

    fn label(&self) -> String {
        RelationshipRecord::label(self)
    }

    fn raw_label(item: &Value) -> String {
        match (raw_str(item, "from"), raw_str(item, "to")) {
            ("", "") => String::new(),
            (from, to) => format!("{}→{}", from, to),
        }
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }

    fn identity(&self) -> String {
        format!(
            "{}\u{0}{}\u{0}{}",
            self.from.trim().to_lowercase(),
            self.to.trim().to_lowercase(),
            self.relationship_type.trim().to_lowercase()
        )
    }
}

fn raw_str<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Recover the JSON object embedded in `text`.
///
/// Code fences (with or without a language tag) are stripped first. The
/// result runs from the first `{` to its balanced closing `}`, ignoring
/// braces inside string literals. Without a `{`, or without a balanced
/// close, the fence-stripped text is returned as is and parsing fails
/// downstream.
pub fn extract_json(text: &str) -> String {
    let stripped = strip_code_fences(text);
    match balanced_object(&stripped) {
        Some(object) => object.to_string(),
        None => stripped,
    }
}

fn strip_code_fences(text: &str) -> String {
    const FENCE: &str = "```";

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(FENCE) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + FENCE.len()..];

        // A language tag only counts when it runs to the end of the line.
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
            .unwrap_or(rest.len());
        if tag_len > 0 && matches!(rest[tag_len..].chars().next(), None | Some('\n' | '\r')) {
            rest = &rest[tag_len..];
        }
    }
    out.push_str(rest);
    out
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    // Every delimiter is ASCII, so byte scanning is UTF-8 safe.
    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Recover and deserialize a whole document. Syntax or shape errors are
/// fatal for the call.
fn parse_document<D: DeserializeOwned>(raw: &str) -> Result<D, ExtractorError> {
    let json = extract_json(raw);
    serde_json::from_str(&json).map_err(ExtractorError::from)
}

/// Parse a batch of `T` and screen every item against `allowed_types`
/// (the system taxonomy when `None`) and the confidence range.
///
/// Items that fail a rule, or are not objects of the right shape, go to the
/// skip list. Only an unparseable document is an error.
pub fn parse_batch<T: Screened>(
    raw: &str,
    allowed_types: Option<&[&str]>,
) -> Result<ValidatedBatch<T>, ExtractorError> {
    let mut document: serde_json::Map<String, Value> = parse_document(raw)?;
    let items = match document.remove(T::KEY) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            return Err(ExtractorError::MalformedResponse(format!(
                "'{}' is not an array: {}",
                T::KEY,
                other
            )))
        }
    };

    let allowed: HashSet<String> = allowed_types
        .unwrap_or(T::SYSTEM_TYPES)
        .iter()
        .map(|t| t.trim().to_lowercase())
        .collect();

    let domain = T::DOMAIN;
    let mut batch = ValidatedBatch::default();
    for (index, item) in items.into_iter().enumerate() {
        let record = match T::deserialize(&item) {
            Ok(record) => record,
            Err(e) => {
                let rejected_type = raw_str(&item, "type").to_string();
                let identifying_name = T::raw_label(&item);
                warn!(
                    domain = %domain,
                    index,
                    rejected_type = %rejected_type,
                    name = %identifying_name,
                    error = %e,
                    "skipping malformed item"
                );
                batch.skipped.push(SkippedRecord {
                    domain,
                    rejected_type,
                    identifying_name,
                    reason: SkipReason::Malformed,
                });
                continue;
            }
        };

        match screen(&record, &allowed) {
            None => batch.valid.push(record),
            Some(reason) => {
                warn!(
                    domain = %domain,
                    rejected_type = record.kind(),
                    name = %record.label(),
                    %reason,
                    "skipping item"
                );
                batch.skipped.push(SkippedRecord {
                    domain,
                    rejected_type: record.kind().to_string(),
                    identifying_name: record.label(),
                    reason,
                });
            }
        }
    }

    debug!(
        domain = %domain,
        valid = batch.valid.len(),
        skipped = batch.skipped.len(),
        "batch parsed"
    );
    Ok(batch)
}

fn screen<T: Screened>(record: &T, allowed: &HashSet<String>) -> Option<SkipReason> {
    if !allowed.contains(&record.kind().trim().to_lowercase()) {
        return Some(SkipReason::UnknownType);
    }
    if !confidence_in_range(record.confidence()) {
        return Some(SkipReason::ConfidenceOutOfRange(record.confidence()));
    }
    None
}

/// Parse `{"entities": [...]}`
pub fn parse_entities(
    raw: &str,
    allowed_types: Option<&[&str]>,
) -> Result<ValidatedBatch<EntityRecord>, ExtractorError> {
    parse_batch(raw, allowed_types)
}

/// Parse `{"relationships": [...]}`
pub fn parse_relationships(
    raw: &str,
    allowed_types: Option<&[&str]>,
) -> Result<ValidatedBatch<RelationshipRecord>, ExtractorError> {
    parse_batch(raw, allowed_types)
}

#[derive(Deserialize)]
struct RawClassification {
    #[serde(alias = "memoryType")]
    memory_type: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    classification: Option<String>,
    #[serde(default)]
    subcategory: Option<String>,
    priority: String,
    #[serde(default, alias = "contextLabels")]
    context_labels: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    confidence: f64,
}

/// Parse a classification object.
///
/// Memory type, priority and confidence are enforced on the whole record;
/// any violation fails the call. Category is free-form.
pub fn parse_classification(raw: &str) -> Result<ClassificationRecord, ExtractorError> {
    let raw: RawClassification = parse_document(raw)?;

    let memory_type = MemoryType::parse(&raw.memory_type).ok_or_else(|| {
        ExtractorError::InvalidRecord(format!("unknown memory type '{}'", raw.memory_type))
    })?;
    let priority = Priority::parse(&raw.priority)
        .ok_or_else(|| ExtractorError::InvalidRecord(format!("unknown priority '{}'", raw.priority)))?;
    if !confidence_in_range(raw.confidence) {
        return Err(ExtractorError::InvalidRecord(format!(
            "confidence {} out of range [0.0, 1.0]",
            raw.confidence
        )));
    }

    Ok(ClassificationRecord {
        memory_type,
        category: raw.category,
        classification: raw.classification,
        subcategory: raw.subcategory,
        priority,
        context_labels: raw.context_labels,
        tags: raw.tags,
        confidence: raw.confidence,
    })
}

/// Parse `{"summary": "...", "key_points": [...]}`
pub fn parse_summary(raw: &str) -> Result<SummaryRecord, ExtractorError> {
    parse_document(raw)
}

/// Parse `{"keywords": [...]}`; keywords are trimmed, blanks and repeats dropped
pub fn parse_keywords(raw: &str) -> Result<KeywordRecord, ExtractorError> {
    let record: KeywordRecord = parse_document(raw)?;
    Ok(KeywordRecord {
        keywords: normalize_keywords(record.keywords),
    })
}

pub(crate) fn normalize_keywords(keywords: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && seen.insert(k.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_markdown() {
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), r#"{"a":1}"#);
    }

    #[test]
    fn test_extract_json_from_markdown_without_language() {
        assert_eq!(extract_json("```\n{\"key\": \"value\"}\n```"), r#"{"key": "value"}"#);
    }

    #[test]
    fn test_extract_json_without_object_is_unchanged() {
        assert_eq!(extract_json("no json here"), "no json here");
    }

    #[test]
    fn test_extract_json_ignores_braces_in_strings() {
        assert_eq!(extract_json(r#"{"s":"a } b"}"#), r#"{"s":"a } b"}"#);
        assert_eq!(
            extract_json(r#"Sure! {"s":"quote \" and } brace","n":{"x":1}} trailing {junk}"#),
            r#"{"s":"quote \" and } brace","n":{"x":1}}"#
        );
    }

    #[test]
    fn test_extract_json_surrounded_by_prose() {
        let raw = "Here is the result:\n```json\n{\"entities\": []}\n```\nLet me know!";
        assert_eq!(extract_json(raw), r#"{"entities": []}"#);
    }

    #[test]
    fn test_extract_json_unbalanced_returns_text() {
        assert_eq!(extract_json(r#"{"entities":[{"name":"J""#), r#"{"entities":[{"name":"J""#);
    }

    #[test]
    fn test_fence_tag_needs_line_end() {
        assert_eq!(strip_code_fences("```rust\nfn x() {}\n```"), "\nfn x() {}\n");
        assert_eq!(strip_code_fences("a ```b c"), "a b c");
    }

    #[test]
    fn test_parse_entities_skips_unknown_type() {
        let raw = r#"{"entities":[{"name":"John","type":"person","confidence":0.9},{"name":"X","type":"bogus","confidence":0.9}]}"#;
        let batch = parse_entities(raw, None).unwrap();

        assert_eq!(batch.valid.len(), 1);
        assert_eq!(batch.valid[0].name, "John");
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].domain, SkipDomain::Entity);
        assert_eq!(batch.skipped[0].rejected_type, "bogus");
        assert_eq!(batch.skipped[0].identifying_name, "X");
        assert_eq!(batch.skipped[0].reason, SkipReason::UnknownType);
    }

    #[test]
    fn test_parse_entities_filters_confidence_out_of_range() {
        let raw = r#"{"entities":[{"name":"J","type":"person","confidence":1.5}]}"#;
        let batch = parse_entities(raw, None).unwrap();

        assert!(batch.valid.is_empty());
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].reason, SkipReason::ConfidenceOutOfRange(1.5));
    }

    #[test]
    fn test_parse_entities_truncated_is_error() {
        let result = parse_entities(r#"{"entities":[{"name":"J""#, None);
        assert!(matches!(result, Err(ExtractorError::MalformedResponse(_))));
    }

    #[test]
    fn test_parse_entities_not_json_is_error() {
        assert!(parse_entities("This is not JSON", None).is_err());
    }

    #[test]
    fn test_parse_entities_canned_response() {
        let raw = r#"{"entities":[{"name":"Alice","type":"person","confidence":0.9},{"name":"Google","type":"organization","confidence":0.95}]}"#;
        let batch = parse_entities(raw, None).unwrap();
        assert_eq!(batch.valid.len(), 2);
        assert!(batch.skipped.is_empty());
    }

    #[test]
    fn test_parse_entities_with_custom_allow_list() {
        let raw = r#"{"entities":[
            {"name":"Tokio","type":"crate","confidence":0.8},
            {"name":"Alice","type":"person","confidence":0.8}
        ]}"#;
        let batch = parse_entities(raw, Some(&["crate"])).unwrap();

        assert_eq!(batch.valid.len(), 1);
        assert_eq!(batch.valid[0].name, "Tokio");
        assert_eq!(batch.skipped[0].rejected_type, "person");
    }

    #[test]
    fn test_type_match_ignores_case_but_skip_keeps_original() {
        let raw = r#"{"entities":[{"name":"A","type":"Person","confidence":0.5},{"name":"B","type":"Alien","confidence":0.5}]}"#;
        let batch = parse_entities(raw, None).unwrap();
        assert_eq!(batch.valid[0].entity_type, "Person");
        assert_eq!(batch.skipped[0].rejected_type, "Alien");
    }

    #[test]
    fn test_parse_entities_records_malformed_items() {
        let raw = r#"{"entities":[
            {"name":"Alice","type":"person","confidence":0.9},
            {"name":"NoType","confidence":0.9},
            "just a string",
            {"name":"Acme","type":"organization","confidence":0.7,"description":"A company"}
        ]}"#;
        let batch = parse_entities(raw, None).unwrap();

        assert_eq!(batch.valid.len(), 2);
        assert_eq!(batch.valid[1].description.as_deref(), Some("A company"));
        assert_eq!(batch.skipped.len(), 2);
        assert!(batch
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::Malformed && s.domain == SkipDomain::Entity));
        assert_eq!(batch.skipped[0].identifying_name, "NoType");
        assert_eq!(batch.skipped[0].rejected_type, "");
        assert_eq!(batch.skipped[1].identifying_name, "");
    }

    #[test]
    fn test_mistyped_fields_are_skipped_not_dropped() {
        let raw = r#"{"entities":[
            {"name":"A","type":"person"},
            {"name":"B","type":"person","confidence":"high"}
        ]}"#;
        let batch = parse_entities(raw, None).unwrap();

        assert!(batch.valid.is_empty());
        assert_eq!(batch.skipped.len(), 2);
        for (skip, name) in batch.skipped.iter().zip(["A", "B"]) {
            assert_eq!(skip.reason, SkipReason::Malformed);
            assert_eq!(skip.rejected_type, "person");
            assert_eq!(skip.identifying_name, name);
        }
    }

    #[test]
    fn test_malformed_relationship_keeps_raw_endpoints() {
        let raw = r#"{"relationships":[{"from":"Alice","to":"Bob","type":"knows","confidence":null}]}"#;
        let batch = parse_relationships(raw, None).unwrap();

        assert!(batch.valid.is_empty());
        assert_eq!(batch.skipped[0].domain, SkipDomain::Relationship);
        assert_eq!(batch.skipped[0].identifying_name, "Alice→Bob");
        assert_eq!(batch.skipped[0].rejected_type, "knows");
        assert_eq!(batch.skipped[0].reason, SkipReason::Malformed);
    }

    #[test]
    fn test_parse_entities_missing_or_null_key_is_empty() {
        assert!(parse_entities("{}", None).unwrap().valid.is_empty());
        assert!(parse_entities(r#"{"entities":null}"#, None).unwrap().valid.is_empty());
        assert!(parse_entities(r#"{"entities":"nope"}"#, None).is_err());
    }

    #[test]
    fn test_parse_relationships() {
        let raw = r#"```json
{"relationships":[
    {"from":"Alice","to":"Google","type":"works_at","confidence":0.9},
    {"from":"Alice","to":"Bob","type":"is_rival_of","confidence":0.6},
    {"from":"Google","to":"Python","type":"uses","confidence":-0.1}
]}
```"#;
        let batch = parse_relationships(raw, None).unwrap();

        assert_eq!(batch.valid.len(), 1);
        assert_eq!(batch.valid[0].relationship_type, "works_at");
        assert_eq!(batch.skipped.len(), 2);
        assert_eq!(batch.skipped[0].domain, SkipDomain::Relationship);
        assert_eq!(batch.skipped[0].identifying_name, "Alice→Bob");
        assert_eq!(batch.skipped[0].rejected_type, "is_rival_of");
        assert_eq!(batch.skipped[1].identifying_name, "Google→Python");
    }

    #[test]
    fn test_parse_classification() {
        let raw = r#"Classification follows.
{"memoryType":"decision","category":"architecture","priority":"High",
 "contextLabels":["backend"],"tags":["db"],"confidence":0.8}"#;
        let record = parse_classification(raw).unwrap();

        assert_eq!(record.memory_type, MemoryType::Decision);
        assert_eq!(record.category, "architecture");
        assert_eq!(record.priority, Priority::High);
        assert_eq!(record.context_labels, vec!["backend"]);
        assert_eq!(record.classification, None);
    }

    #[test]
    fn test_parse_classification_accepts_custom_category() {
        let raw = r#"{"memory_type":"fact","category":"my-own-thing","subcategory":"x","priority":"low","confidence":0.3}"#;
        let record = parse_classification(raw).unwrap();
        assert_eq!(record.category, "my-own-thing");
        assert_eq!(record.subcategory.as_deref(), Some("x"));
    }

    #[test]
    fn test_parse_classification_rejects_whole_record() {
        let bad_type = r#"{"memory_type":"gossip","category":"c","priority":"low","confidence":0.5}"#;
        let bad_priority = r#"{"memory_type":"fact","category":"c","priority":"urgent","confidence":0.5}"#;
        let bad_confidence = r#"{"memory_type":"fact","category":"c","priority":"low","confidence":2.0}"#;

        for raw in [bad_type, bad_priority, bad_confidence] {
            assert!(matches!(
                parse_classification(raw),
                Err(ExtractorError::InvalidRecord(_))
            ));
        }
    }

    #[test]
    fn test_parse_summary() {
        let raw = r#"{"summary":"Alice joined Google.","key_points":["new job","Python"]}"#;
        let record = parse_summary(raw).unwrap();
        assert_eq!(record.summary, "Alice joined Google.");
        assert_eq!(record.key_points.len(), 2);

        assert!(parse_summary(r#"{"key_points":[]}"#).is_err());
    }

    #[test]
    fn test_parse_keywords_normalizes() {
        let raw = r#"{"keywords":[" rust ","async","","rust","Async"]}"#;
        let record = parse_keywords(raw).unwrap();
        assert_eq!(record.keywords, vec!["rust", "async", "Async"]);
    }
}
