//! Sink documents
//!
//! A [`Document`] is the unit handed to the search sink: an identifier plus a
//! field map. Field values are JSON scalars, ordered string lists, or the
//! empty string, which the sink interprets as a field-clear marker rather
//! than a document delete.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One search document, built per row event and discarded after flush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Non-empty document identifier
    pub id: String,
    /// Indexing score
    pub score: f32,
    /// Field name to field value
    pub fields: HashMap<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: 1.0,
            fields: HashMap::new(),
        }
    }

    /// Set a field value, replacing any previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Set the empty-string clear marker on a field.
    pub fn clear_field(&mut self, field: impl Into<String>) {
        self.fields.insert(field.into(), Value::String(String::new()));
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_document_defaults() {
        let doc = Document::new("7");
        assert_eq!(doc.id, "7");
        assert_eq!(doc.score, 1.0);
        assert!(doc.is_empty());
    }

    #[test]
    fn test_set_replaces() {
        let mut doc = Document::new("7");
        doc.set("n", json!("a"));
        doc.set("n", json!("b"));
        assert_eq!(doc.fields.get("n"), Some(&json!("b")));
    }

    #[test]
    fn test_clear_field_marker() {
        let mut doc = Document::new("7");
        doc.clear_field("n");
        assert_eq!(doc.fields.get("n"), Some(&json!("")));
    }
}
