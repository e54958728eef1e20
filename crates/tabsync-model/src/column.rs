#![deny(unsafe_code)]

use std::collections::BTreeSet;

use crate::ModelError;
use crate::ids::ColumnKey;
use crate::value::{CellValue, SortKey};

/// How a column turns a cell into display, search and sort material.
///
/// Registered once per column instead of being guessed from the runtime
/// shape of each value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// Number, date or text shown and compared as itself.
    #[default]
    Scalar,
    /// Attributed record shown, searched and sorted by its `name`.
    DisplayName,
    /// Shown as-is but not sortable (paths, blobs).
    Opaque,
}

impl Projection {
    pub fn display(self, value: &CellValue) -> String {
        match (self, value) {
            (Self::DisplayName, CellValue::Reference(reference)) => reference.name.clone(),
            _ => value.scalar_text(),
        }
    }

    /// Lowercased text used by substring search.
    pub fn search_text(self, value: &CellValue) -> String {
        self.display(value).to_lowercase()
    }

    /// Comparable key, or `None` for unsortable projections.
    pub fn sort_key(self, value: &CellValue) -> Option<SortKey> {
        if self == Self::Opaque {
            return None;
        }
        Some(match value {
            CellValue::Null => SortKey::Null,
            CellValue::Number(n) => SortKey::Number(*n),
            CellValue::Date(date) => SortKey::Date(*date),
            CellValue::Text(text) => SortKey::Text(text.to_lowercase()),
            CellValue::Reference(_) => SortKey::Text(self.search_text(value)),
        })
    }

    pub fn is_sortable(self) -> bool {
        self != Self::Opaque
    }
}

/// Display, sort and search descriptor of one column.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Column {
    pub key: ColumnKey,
    pub label: String,
    #[serde(default)]
    pub projection: Projection,
}

impl Column {
    pub fn new(key: &str, label: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            key: ColumnKey::new(key)?,
            label: label.into(),
            projection: Projection::Scalar,
        })
    }

    #[must_use]
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn display(&self, value: &CellValue) -> String {
        self.projection.display(value)
    }
}

/// Ordered, immutable column layout supplied by the hosting page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct ColumnSet {
    columns: Vec<Column>,
}

impl ColumnSet {
    pub fn new(columns: Vec<Column>) -> Result<Self, ModelError> {
        let mut seen = BTreeSet::new();
        for column in &columns {
            if !seen.insert(column.key.as_str()) {
                return Err(ModelError::DuplicateColumn(column.key.clone()));
            }
        }
        Ok(Self { columns })
    }

    /// Built-in layouts with keys known to be distinct.
    pub(crate) fn from_static(columns: Vec<Column>) -> Self {
        debug_assert!(Self::new(columns.clone()).is_ok());
        Self { columns }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.key.as_str() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> BTreeSet<ColumnKey> {
        self.columns.iter().map(|column| column.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl TryFrom<Vec<Column>> for ColumnSet {
    type Error = ModelError;

    fn try_from(columns: Vec<Column>) -> Result<Self, Self::Error> {
        Self::new(columns)
    }
}

impl From<ColumnSet> for Vec<Column> {
    fn from(set: ColumnSet) -> Self {
        set.columns
    }
}
