//! Row-to-document transformation
//!
//! Builds sink documents from row images: field-mapping dispatch, composite
//! geo assembly, the update diff that drops unchanged columns, and document
//! identifier derivation.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::coerce::coerce_column;
use crate::document::Document;
use crate::error::{Result, SyncError};
use crate::rule::Rule;
use crate::schema::RawValue;

/// Field assignment strategies declared in a mapping spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldKind {
    #[default]
    Plain,
    /// Comma-separated string becomes an ordered string list
    List,
    /// Positive integer becomes 1, anything else 0
    NumericBool,
    /// Latitude half of a composite geo field
    GeoLat,
    /// Longitude half of a composite geo field
    GeoLon,
}

impl FieldKind {
    fn parse(tag: &str) -> Self {
        match tag {
            "list" => FieldKind::List,
            "numeric_bool" => FieldKind::NumericBool,
            "geo_lat" => FieldKind::GeoLat,
            "geo_lon" => FieldKind::GeoLon,
            _ => FieldKind::Plain,
        }
    }
}

/// A parsed `target-field[,type]` mapping for one source column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping<'a> {
    pub source: &'a str,
    pub target: &'a str,
    pub kind: FieldKind,
}

/// Parse a rule-level mapping spec. An empty target field falls back to the
/// source column name; a type tag is only honored in a two-part spec.
pub fn parse_mapping<'a>(column: &'a str, spec: &'a str) -> FieldMapping<'a> {
    let parts: Vec<&str> = spec.split(',').collect();

    let mut target = parts[0];
    if target.is_empty() {
        target = column;
    }

    let kind = if parts.len() == 2 {
        FieldKind::parse(parts[1])
    } else {
        FieldKind::Plain
    };

    FieldMapping {
        source: column,
        target,
        kind,
    }
}

/// Per-row scratch for composite geo fields, keyed by target field.
///
/// Deliberately local to one row transformation: a longer-lived map would
/// leak a half-assembled point into later rows.
#[derive(Default)]
struct GeoPoint {
    lat: Option<Value>,
    lon: Option<Value>,
}

type GeoScratch = HashMap<String, GeoPoint>;

fn assign(doc: &mut Document, target: &str, kind: FieldKind, value: Value, geo: &mut GeoScratch) {
    match kind {
        FieldKind::Plain => doc.set(target, value),
        FieldKind::List => match value {
            Value::String(s) => {
                let items: Vec<Value> =
                    s.split(',').map(|p| Value::String(p.to_string())).collect();
                doc.set(target, Value::Array(items));
            }
            v => doc.set(target, v),
        },
        FieldKind::NumericBool => {
            let truthy = value.as_i64().is_some_and(|n| n > 0);
            doc.set(target, Value::from(i64::from(truthy)));
        }
        FieldKind::GeoLat | FieldKind::GeoLon => {
            let point = geo.entry(target.to_string()).or_default();
            if kind == FieldKind::GeoLat {
                point.lat = Some(value);
            } else {
                point.lon = Some(value);
            }
            // Emitted only once both halves are present as strings, lon first.
            if let (Some(Value::String(lat)), Some(Value::String(lon))) = (&point.lat, &point.lon)
            {
                doc.set(target, Value::String(format!("{} {}", lon, lat)));
            }
        }
    }
}

fn fill_insert(doc: &mut Document, rule: &Rule, row: &[RawValue]) {
    let mut geo = GeoScratch::new();

    for (i, col) in rule.table_info.columns.iter().enumerate() {
        if !rule.check_filter(&col.name) {
            continue;
        }
        if i >= row.len() {
            continue;
        }

        let mut mapped = false;
        for (column, spec) in &rule.field_mapping {
            let mapping = parse_mapping(column, spec);
            if mapping.source != col.name {
                continue;
            }
            mapped = true;

            let Some(value) = coerce_column(col, &row[i]) else {
                continue;
            };
            assign(doc, mapping.target, mapping.kind, value, &mut geo);
        }

        if !mapped {
            if let Some(value) = coerce_column(col, &row[i]) {
                doc.set(&col.name, value);
            }
        }
    }
}

fn fill_delete(doc: &mut Document, rule: &Rule, row: &[RawValue]) {
    for (i, col) in rule.table_info.columns.iter().enumerate() {
        if !rule.check_filter(&col.name) {
            continue;
        }
        if i >= row.len() {
            continue;
        }

        let mut mapped = false;
        for (column, spec) in &rule.field_mapping {
            let mapping = parse_mapping(column, spec);
            if mapping.source == col.name {
                mapped = true;
                doc.clear_field(mapping.target);
            }
        }

        if !mapped {
            doc.clear_field(&col.name);
        }
    }
}

fn fill_update(doc: &mut Document, rule: &Rule, before: &[RawValue], after: &[RawValue]) {
    let mut geo = GeoScratch::new();

    for (i, col) in rule.table_info.columns.iter().enumerate() {
        if !rule.check_filter(&col.name) {
            continue;
        }
        if i >= before.len() || i >= after.len() {
            continue;
        }
        if before[i] == after[i] {
            // nothing changed
            continue;
        }

        let mut mapped = false;
        for (column, spec) in &rule.field_mapping {
            let mapping = parse_mapping(column, spec);
            if mapping.source != col.name {
                continue;
            }
            mapped = true;

            match coerce_column(col, &after[i]) {
                // The column changed to an absent value: erase the field.
                None => doc.clear_field(mapping.target),
                Some(value) => assign(doc, mapping.target, mapping.kind, value, &mut geo),
            }
        }

        if !mapped {
            match coerce_column(col, &after[i]) {
                None => doc.clear_field(&col.name),
                Some(value) => doc.set(&col.name, value),
            }
        }
    }
}

/// Build upsert documents for an insert event.
///
/// Documents with no properties (every filtered column coerced to null) are
/// dropped.
pub fn build_insert(rule: &Rule, rows: &[Vec<RawValue>]) -> Result<Vec<Document>> {
    let mut docs = Vec::with_capacity(rows.len());

    for row in rows {
        let mut doc = Document::new(doc_id(rule, row)?);
        fill_insert(&mut doc, rule, row);
        if !doc.is_empty() {
            docs.push(doc);
        }
    }

    Ok(docs)
}

/// Build field-clearing documents for a delete event.
pub fn build_delete(rule: &Rule, rows: &[Vec<RawValue>]) -> Result<Vec<Document>> {
    let mut docs = Vec::with_capacity(rows.len());

    for row in rows {
        let mut doc = Document::new(doc_id(rule, row)?);
        fill_delete(&mut doc, rule, row);
        if !doc.is_empty() {
            docs.push(doc);
        }
    }

    Ok(docs)
}

/// Build documents for an update event.
///
/// Rows arrive in before/after pairs. The identifier is derived from the
/// before image; primary-key changes are not supported. Columns with deeply
/// equal before/after values are skipped.
pub fn build_update(rule: &Rule, rows: &[Vec<RawValue>]) -> Result<Vec<Document>> {
    if rows.len() % 2 != 0 {
        return Err(SyncError::transform(format!(
            "invalid update rows event, must have 2x rows, but {}",
            rows.len()
        )));
    }

    let mut docs = Vec::with_capacity(rows.len() / 2);

    for pair in rows.chunks_exact(2) {
        let mut doc = Document::new(doc_id(rule, &pair[0])?);
        fill_update(&mut doc, rule, &pair[0], &pair[1]);
        if !doc.is_empty() {
            docs.push(doc);
        }
    }

    Ok(docs)
}

/// Derive the document identifier for one row.
///
/// Uses the rule's declared ID columns, falling back to the table's primary
/// key. Components are joined with `:`; a configured prefix is prepended the
/// same way. Null components are an error.
pub fn doc_id(rule: &Rule, row: &[RawValue]) -> Result<String> {
    let values: Vec<&RawValue> = match &rule.id {
        None => rule.table_info.pk_values(row)?,
        Some(columns) => columns
            .iter()
            .map(|c| rule.table_info.column_value(c, row))
            .collect::<Result<_>>()?,
    };

    let mut id = String::new();
    for (i, value) in values.iter().enumerate() {
        if value.is_null() {
            return Err(SyncError::transform(format!(
                "the {}-th id or PK value is nil",
                i
            )));
        }
        if i > 0 {
            id.push(':');
        }
        let _ = write!(id, "{}", value);
    }

    match rule.id_prefix.as_deref().filter(|p| !p.is_empty()) {
        Some(prefix) => Ok(format!("{}:{}", prefix, id)),
        None => Ok(id),
    }
}

/// Resolve a named column's stringified value from a row.
pub fn parent_id(rule: &Rule, row: &[RawValue], column: &str) -> Result<String> {
    let index = rule.table_info.find_column(column).ok_or_else(|| {
        SyncError::config(format!(
            "parent id not found {}({})",
            rule.table_info.name, column
        ))
    })?;

    row.get(index).map(ToString::to_string).ok_or_else(|| {
        SyncError::transform(format!(
            "row of {} is missing column {}",
            rule.table_info.full_name(),
            column
        ))
    })
}
