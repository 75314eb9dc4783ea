// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Tabular result types
//!
//! Provider responses are reshaped into one of two tables:
//!
//! - [`TimeSeriesFrame`]: rows indexed by UTC timestamp, named `f64` columns. Used for
//!   metric and TVL histories. Multi-level column names are joined with `/`
//!   (for example `aave/Ethereum/totalLiquidityUSD`).
//! - [`RecordTable`]: rows keyed by a string id, each row a flat JSON object. Used for
//!   asset listings and profile data.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer, ser::SerializeSeq};
use serde_json::{Map, Value};

/// Separator between levels of a multi-level column name
pub const COLUMN_LEVEL_SEPARATOR: char = '/';

/// Time-indexed table of `f64` columns
///
/// Cells may be missing, which is how outer joins of series with different
/// date ranges are represented.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesFrame {
    columns: Vec<String>,
    // Same names as `columns`, for constant time membership checks
    known_columns: HashSet<String>,
    rows: BTreeMap<DateTime<Utc>, HashMap<String, f64>>,
}

impl TimeSeriesFrame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single cell, creating the row and column as needed
    pub fn insert(&mut self, timestamp: DateTime<Utc>, column: impl Into<String>, value: f64) {
        let column = column.into();
        self.add_column(&column);
        self.rows.entry(timestamp).or_default().insert(column, value);
    }

    /// Read a single cell
    pub fn get(&self, timestamp: DateTime<Utc>, column: &str) -> Option<f64> {
        self.rows.get(&timestamp)?.get(column).copied()
    }

    /// All present values of one column in index order
    pub fn column(&self, name: &str) -> Vec<(DateTime<Utc>, f64)> {
        self.rows
            .iter()
            .filter_map(|(ts, row)| row.get(name).map(|v| (*ts, *v)))
            .collect()
    }

    /// Column names in insertion order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the frame has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row timestamps in ascending order
    pub fn index(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.rows.keys().copied()
    }

    /// Union of both indexes with `other`'s columns appended
    ///
    /// A column present in both frames takes `other`'s value wherever `other`
    /// has one.
    #[must_use]
    pub fn outer_join(mut self, other: Self) -> Self {
        for column in &other.columns {
            self.add_column(column);
        }
        for (ts, row) in other.rows {
            self.rows.entry(ts).or_default().extend(row);
        }
        self
    }

    /// Append `suffix` verbatim to every column name
    #[must_use]
    pub fn with_suffix(self, suffix: &str) -> Self {
        self.map_columns(|c| format!("{c}{suffix}"))
    }

    /// Prepend `prefix` as a new top level of every column name
    #[must_use]
    pub fn with_prefix(self, prefix: &str) -> Self {
        self.map_columns(|c| format!("{prefix}{COLUMN_LEVEL_SEPARATOR}{c}"))
    }

    /// Rename a column, returning `false` if it does not exist
    pub fn rename_column(&mut self, from: &str, to: impl Into<String>) -> bool {
        let Some(position) = self.columns.iter().position(|c| c == from) else {
            return false;
        };
        let to = to.into();
        for row in self.rows.values_mut() {
            if let Some(value) = row.remove(from) {
                row.insert(to.clone(), value);
            }
        }
        self.known_columns.remove(from);
        if self.known_columns.contains(&to) {
            self.columns.remove(position);
        } else {
            self.known_columns.insert(to.clone());
            self.columns[position] = to;
        }
        true
    }

    /// Keep rows whose UTC calendar date falls within `[start, end]`
    ///
    /// Both bounds are inclusive; `None` leaves that side open.
    #[must_use]
    pub fn filter_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.rows.retain(|ts, _| {
            let date = ts.date_naive();
            start.is_none_or(|s| date >= s) && end.is_none_or(|e| date <= e)
        });
        self
    }

    /// Rows as JSON records with a `timestamp` field
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|(ts, row)| self.record(*ts, row))
            .collect()
    }

    fn record(&self, timestamp: DateTime<Utc>, row: &HashMap<String, f64>) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("timestamp".to_string(), Value::String(timestamp.to_rfc3339()));
        for column in &self.columns {
            let value = row
                .get(column)
                .and_then(|v| serde_json::Number::from_f64(*v))
                .map_or(Value::Null, Value::Number);
            record.insert(column.clone(), value);
        }
        record
    }

    fn map_columns(mut self, rename: impl Fn(&str) -> String) -> Self {
        let renames: HashMap<String, String> = self
            .columns
            .iter()
            .map(|c| (c.clone(), rename(c)))
            .collect();
        for row in self.rows.values_mut() {
            *row = row
                .drain()
                .map(|(k, v)| (renames.get(&k).cloned().unwrap_or(k), v))
                .collect();
        }
        let columns = std::mem::take(&mut self.columns);
        self.known_columns.clear();
        for column in &columns {
            self.add_column(&rename(column));
        }
        self
    }

    fn add_column(&mut self, column: &str) {
        if !self.known_columns.contains(column) {
            self.known_columns.insert(column.to_string());
            self.columns.push(column.to_string());
        }
    }
}

impl Serialize for TimeSeriesFrame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for (ts, row) in &self.rows {
            seq.serialize_element(&self.record(*ts, row))?;
        }
        seq.end()
    }
}

/// Table of flat JSON rows keyed by a string id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RecordTable {
    rows: BTreeMap<String, Map<String, Value>>,
}

impl RecordTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row
    pub fn insert_row(&mut self, id: impl Into<String>, row: Map<String, Value>) {
        self.rows.insert(id.into(), row);
    }

    /// Look up a row by id
    pub fn row(&self, id: &str) -> Option<&Map<String, Value>> {
        self.rows.get(id)
    }

    /// Row ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Sorted union of the column names of all rows
    pub fn columns(&self) -> Vec<String> {
        self.rows
            .values()
            .flat_map(|row| row.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Project every row onto `columns`; absent cells are dropped
    #[must_use]
    pub fn select(&self, columns: &[&str]) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|(id, row)| {
                let projected = row
                    .iter()
                    .filter(|(k, _)| columns.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                (id.clone(), projected)
            })
            .collect();
        Self { rows }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate `(id, row)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Map<String, Value>)> for RecordTable {
    fn from_iter<I: IntoIterator<Item = (String, Map<String, Value>)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Flatten nested JSON objects into a single level, joining keys with `_`
///
/// Arrays and scalars are leaves. A non-object input yields an empty map.
pub fn flatten_json(value: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    if let Value::Object(object) = value {
        flatten_into(&mut out, None, object);
    }
    out
}

fn flatten_into(out: &mut Map<String, Value>, prefix: Option<&str>, object: &Map<String, Value>) {
    for (key, value) in object {
        let name = match prefix {
            Some(p) => format!("{p}_{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(out, Some(&name), inner),
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}
