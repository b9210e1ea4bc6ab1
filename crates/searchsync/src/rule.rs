//! Per-table sync rules
//!
//! One [`Rule`] per source table: which columns flow to the index, under what
//! field names, and how the document identifier is derived. Rules are loaded
//! at startup and immutable afterwards; the replication client attaches the
//! current [`TableInfo`] before events start flowing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::schema::TableInfo;

/// Normalized lookup key for a rule, `schema:table` lowercased.
pub fn rule_key(schema: &str, table: &str) -> String {
    format!("{}:{}", schema.to_lowercase(), table.to_lowercase())
}

/// Sync rule for one source table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Rule {
    /// Source schema (database) name
    pub schema: String,
    /// Source table name
    pub table: String,

    /// Columns forming the document identifier. When absent the table's
    /// primary key is used.
    #[serde(default)]
    pub id: Option<Vec<String>>,

    /// Prefix prepended to every identifier as `prefix:`
    #[serde(default)]
    pub id_prefix: Option<String>,

    /// Column-to-field mapping. Keyed by source column name; the value is a
    /// `target-field[,type]` spec where type is one of `list`,
    /// `numeric_bool`, `geo_lat`, `geo_lon`.
    #[serde(default)]
    pub field_mapping: HashMap<String, String>,

    /// Columns to sync. When absent every column passes.
    #[serde(default)]
    pub filter: Option<Vec<String>>,

    /// Current schema descriptor, attached by the replication client.
    #[serde(skip)]
    pub table_info: Arc<TableInfo>,
}

impl Rule {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn with_table_info(mut self, table_info: Arc<TableInfo>) -> Self {
        self.table_info = table_info;
        self
    }

    /// The rule's lookup key.
    pub fn key(&self) -> String {
        rule_key(&self.schema, &self.table)
    }

    /// Whether a column passes this rule's filter.
    pub fn check_filter(&self, column: &str) -> bool {
        match &self.filter {
            None => true,
            Some(columns) => columns.iter().any(|c| c == column),
        }
    }
}
