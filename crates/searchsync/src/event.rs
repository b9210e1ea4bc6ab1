//! Replication row events
//!
//! The decoded shape the replication client hands to the event handler. For
//! updates the rows come in before/after pairs, so `rows.len()` is always
//! even for a well-formed update event.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::schema::{RawValue, TableInfo};

/// Row mutation kinds carried by the replication stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Insert,
    Update,
    Delete,
    /// Delivered by some sources; the sync engine does not support it.
    Truncate,
}

impl fmt::Display for RowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RowAction::Insert => "insert",
            RowAction::Update => "update",
            RowAction::Delete => "delete",
            RowAction::Truncate => "truncate",
        };
        f.write_str(s)
    }
}

/// One rows event: an action plus the affected row images.
#[derive(Debug, Clone)]
pub struct RowsEvent {
    /// Schema descriptor of the affected table
    pub table: Arc<TableInfo>,
    pub action: RowAction,
    /// Row images; before/after pairs for updates
    pub rows: Vec<Vec<RawValue>>,
}

impl RowsEvent {
    pub fn new(table: Arc<TableInfo>, action: RowAction, rows: Vec<Vec<RawValue>>) -> Self {
        Self {
            table,
            action,
            rows,
        }
    }
}
