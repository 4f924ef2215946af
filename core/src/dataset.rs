//! Tabular input: one row per account, keyed by a stable identifier.

use crate::{
    error::{PanelError, PanelResult},
    types::AccountId,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One dataset value.
///
/// Deserializes untagged from JSON: `null`, booleans, numbers,
/// `YYYY-MM-DD` strings (as dates) and any other string (as text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

static NULL_CELL: Cell = Cell::Null;

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Coerce to a calendar date. Text may be a plain date, a
    /// `YYYY-MM-DD HH:MM:SS` timestamp or RFC 3339; the time is dropped.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// Coerce to a number. NaN counts as missing.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(n) => *n,
            Cell::Bool(b) => f64::from(u8::from(*b)),
            Cell::Text(s) => s.trim().parse().ok()?,
            Cell::Null | Cell::Date(_) => return None,
        };
        (!value.is_nan()).then_some(value)
    }

    /// Coerce to a flag: non-zero numbers and `true` are set.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            other => other.as_f64().map(|n| n != 0.0),
        }
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d)
    }
}

impl From<Option<NaiveDate>> for Cell {
    fn from(d: Option<NaiveDate>) -> Self {
        d.map_or(Cell::Null, Cell::Date)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// Render a JSON identifier verbatim. Numbers keep their exact digits.
fn json_key(value: serde_json::Value) -> Option<AccountId> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

#[derive(Debug, Clone)]
pub struct DatasetRow {
    pub id: AccountId,
    pub values: HashMap<String, Cell>,
}

impl DatasetRow {
    pub fn get(&self, column: &str) -> &Cell {
        self.values.get(column).unwrap_or(&NULL_CELL)
    }
}

/// Ordered rows with a known column set. Identifiers are unique.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<DatasetRow>,
    ids: HashSet<AccountId>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a column up front, so it exists even if every row leaves it empty.
    pub fn with_column(mut self, name: &str) -> Self {
        self.register_column(name);
        self
    }

    pub fn push_row<I, K, V>(&mut self, id: impl Into<AccountId>, values: I) -> PanelResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Cell>,
    {
        let id = id.into();
        if !self.ids.insert(id.clone()) {
            return Err(PanelError::DuplicateAccount { account_id: id });
        }
        let mut map = HashMap::new();
        for (k, v) in values {
            let k = k.into();
            self.register_column(&k);
            map.insert(k, v.into());
        }
        self.rows.push(DatasetRow { id, values: map });
        Ok(())
    }

    fn register_column(&mut self, name: &str) {
        if !self.columns.iter().any(|c| c == name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The named column as a series keyed by account identifier.
    pub fn column(&self, name: &str) -> PanelResult<HashMap<AccountId, Cell>> {
        if !self.has_column(name) {
            return Err(PanelError::MissingColumn { column: name.to_string() });
        }
        Ok(self
            .rows
            .iter()
            .map(|r| (r.id.clone(), r.get(name).clone()))
            .collect())
    }

    /// Parse a JSON array of objects. The identifier is taken from `id_col`
    /// and removed from the row's values.
    pub fn from_json_records(json: &str, id_col: &str) -> PanelResult<Self> {
        let records: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(json)?;
        let mut dataset = Dataset::new();
        for mut record in records {
            let id = record
                .remove(id_col)
                .and_then(json_key)
                .ok_or_else(|| PanelError::MissingColumn { column: id_col.to_string() })?;
            let mut values = Vec::with_capacity(record.len());
            for (k, v) in record {
                values.push((k, serde_json::from_value::<Cell>(v)?));
            }
            dataset.push_row(id, values)?;
        }
        log::debug!("parsed {} dataset rows, {} columns", dataset.len(), dataset.columns.len());
        Ok(dataset)
    }

    pub fn load_json(path: &str, id_col: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(Self::from_json_records(&content, id_col)?)
    }
}
