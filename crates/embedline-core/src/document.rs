use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::clean::clean_text;

/// A single input record to embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Cleans the text and drops the document if either the id or the
    /// cleaned text ends up empty.
    pub fn cleaned(self) -> Option<Self> {
        if self.id.is_empty() {
            return None;
        }
        let text = clean_text(&self.text);
        if text.is_empty() {
            return None;
        }
        Some(Self { id: self.id, text })
    }
}

/// Normalizes a caller-supplied id into its string form.
///
/// Accepts plain strings, numbers and the extended-JSON object-id form
/// `{"$oid": "..."}`. Returns `None` for null, empty strings and shapes with
/// no sensible string form (arrays, objects without `$oid`).
pub fn normalize_id(raw: &Value) -> Option<String> {
    let id = match raw {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => match map.get("$oid") {
            Some(Value::String(oid)) => oid.clone(),
            _ => return None,
        },
        Value::Null | Value::Array(_) => return None,
    };
    if id.is_empty() { None } else { Some(id) }
}

/// One line of the newline-delimited JSON input stream.
#[derive(Debug, Deserialize)]
pub struct RawRecord {
    #[serde(rename = "_id")]
    pub id: Option<Value>,
    pub text: Option<String>,
}

impl RawRecord {
    /// Converts the raw record into a document when both required fields
    /// are present. Text is left uncleaned.
    pub fn into_document(self) -> Option<Document> {
        let id = normalize_id(self.id.as_ref()?)?;
        let text = self.text?;
        Some(Document { id, text })
    }
}

/// An ordered group of documents submitted in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub documents: Vec<Document>,
}

impl Batch {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.text.clone()).collect()
    }

    /// Returns a batch holding only the documents that survive cleaning,
    /// in their original order.
    pub fn cleaned(self) -> Self {
        Self {
            documents: self
                .documents
                .into_iter()
                .filter_map(Document::cleaned)
                .collect(),
        }
    }
}

impl From<Vec<Document>> for Batch {
    fn from(documents: Vec<Document>) -> Self {
        Self::new(documents)
    }
}

/// Outcome of one batch's attempt sequence, as seen by the metrics collector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub latency_ms: f64,
    pub doc_count: usize,
    pub token_count: usize,
    pub error: bool,
}

impl Sample {
    pub fn ok(latency_ms: f64, doc_count: usize, token_count: usize) -> Self {
        Self {
            latency_ms,
            doc_count,
            token_count,
            error: false,
        }
    }

    pub fn failed(latency_ms: f64, doc_count: usize, token_count: usize) -> Self {
        Self {
            latency_ms,
            doc_count,
            token_count,
            error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_plain_string_id() {
        assert_eq!(normalize_id(&json!("abc")), Some("abc".into()));
    }

    #[test]
    fn normalize_numeric_id() {
        assert_eq!(normalize_id(&json!(1234567890123u64)), Some("1234567890123".into()));
    }

    #[test]
    fn normalize_oid_id() {
        let raw = json!({"$oid": "64b7f0c2a1e4"});
        assert_eq!(normalize_id(&raw), Some("64b7f0c2a1e4".into()));
    }

    #[test]
    fn normalize_rejects_empty_and_unknown_shapes() {
        assert_eq!(normalize_id(&json!("")), None);
        assert_eq!(normalize_id(&json!(null)), None);
        assert_eq!(normalize_id(&json!([1, 2])), None);
        assert_eq!(normalize_id(&json!({"id": "x"})), None);
    }

    #[test]
    fn raw_record_with_oid() {
        let rec: RawRecord =
            serde_json::from_str(r#"{"_id": {"$oid": "a1"}, "text": "hello"}"#).unwrap();
        let doc = rec.into_document().unwrap();
        assert_eq!(doc.id, "a1");
        assert_eq!(doc.text, "hello");
    }

    #[test]
    fn raw_record_missing_text() {
        let rec: RawRecord = serde_json::from_str(r#"{"_id": "a1"}"#).unwrap();
        assert!(rec.into_document().is_none());
    }

    #[test]
    fn raw_record_ignores_extra_fields() {
        let rec: RawRecord =
            serde_json::from_str(r#"{"_id": 7, "text": "t", "lang": "en"}"#).unwrap();
        assert_eq!(rec.into_document().unwrap().id, "7");
    }

    #[test]
    fn cleaned_drops_empty_text() {
        assert!(Document::new("1", "   https://t.co/x  ").cleaned().is_none());
        assert!(Document::new("", "hello").cleaned().is_none());
    }

    #[test]
    fn batch_cleaned_preserves_order() {
        let batch = Batch::new(vec![
            Document::new("1", "first #one"),
            Document::new("2", ""),
            Document::new("3", "third @three"),
        ])
        .cleaned();
        assert_eq!(batch.ids(), vec!["1", "3"]);
        assert_eq!(batch.texts(), vec!["first one", "third three"]);
    }

    #[test]
    fn sample_constructors() {
        let ok = Sample::ok(12.5, 32, 900);
        assert!(!ok.error);
        let failed = Sample::failed(40.0, 32, 900);
        assert!(failed.error);
        assert_eq!(failed.doc_count, 32);
    }
}
