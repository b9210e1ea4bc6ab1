//! Table metadata and raw row values supplied by the replication source
//!
//! The replication client owns connection management and binlog decoding; the
//! sync engine only sees the decoded shapes below. [`TableInfo`] is read-only
//! input: it is built (and refreshed on DDL) by the client, never mutated
//! here.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SyncError};

/// Declared column type tags as carried by the binlog table map.
///
/// Only a subset drives coercion; everything else passes values through
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Number,
    MediumInt,
    Float,
    Decimal,
    Enum,
    Set,
    String,
    Datetime,
    Timestamp,
    Date,
    Time,
    Bit,
    Json,
    Binary,
}

/// One column of a source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name
    pub name: String,
    /// Declared type tag
    pub column_type: ColumnType,
    /// Permitted tokens, in declared order (ENUM columns only)
    #[serde(default)]
    pub enum_values: Vec<String>,
    /// Permitted tokens, in declared order (SET columns only)
    #[serde(default)]
    pub set_values: Vec<String>,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            enum_values: Vec::new(),
            set_values: Vec::new(),
        }
    }

    /// Set the ordered ENUM tokens
    pub fn with_enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = values;
        self
    }

    /// Set the ordered SET tokens
    pub fn with_set_values(mut self, values: Vec<String>) -> Self {
        self.set_values = values;
        self
    }
}

/// Schema descriptor for one source table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Schema (database) name
    pub schema: String,
    /// Table name
    pub name: String,
    /// Columns in ordinal order
    pub columns: Vec<TableColumn>,
    /// Indexes into `columns` forming the primary key
    #[serde(default)]
    pub pk_columns: Vec<usize>,
}

impl TableInfo {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
            pk_columns: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<TableColumn>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_pk_columns(mut self, pk_columns: Vec<usize>) -> Self {
        self.pk_columns = pk_columns;
        self
    }

    /// Qualified `schema.table` name
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Find a column's ordinal position by name
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Read the primary-key values from one row, in key order.
    pub fn pk_values<'a>(&self, row: &'a [RawValue]) -> Result<Vec<&'a RawValue>> {
        if self.pk_columns.is_empty() {
            return Err(SyncError::config(format!(
                "table {} has no PK",
                self.full_name()
            )));
        }
        self.pk_columns
            .iter()
            .map(|&i| {
                row.get(i).ok_or_else(|| {
                    SyncError::transform(format!(
                        "row of {} is missing primary-key column {}",
                        self.full_name(),
                        i
                    ))
                })
            })
            .collect()
    }

    /// Read a named column's value from one row.
    pub fn column_value<'a>(&self, name: &str, row: &'a [RawValue]) -> Result<&'a RawValue> {
        let i = self.find_column(name).ok_or_else(|| {
            SyncError::config(format!("column {} not found in {}", name, self.full_name()))
        })?;
        row.get(i).ok_or_else(|| {
            SyncError::transform(format!(
                "row of {} is missing column {}",
                self.full_name(),
                name
            ))
        })
    }
}

/// A raw column value as decoded from the binary log (or a dump).
///
/// The same column can surface under different shapes depending on where the
/// value came from: ENUM and SET arrive as integers from the binlog but as
/// strings from a dump, textual types arrive as either bytes or text. The
/// coercion layer normalizes these; structural equality on the raw value is
/// what the update diff compares.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => Ok(()),
            RawValue::Int(v) => write!(f, "{}", v),
            RawValue::UInt(v) => write!(f, "{}", v),
            RawValue::Float(v) => write!(f, "{}", v),
            RawValue::Text(v) => f.write_str(v),
            RawValue::Bytes(v) => f.write_str(&String::from_utf8_lossy(v)),
        }
    }
}
