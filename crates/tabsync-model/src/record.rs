#![deny(unsafe_code)]

use std::collections::BTreeMap;

use crate::ids::RecordId;
use crate::value::CellValue;

/// Typed field values keyed by column key.
pub type FieldMap = BTreeMap<String, CellValue>;

/// Raw form input keyed by column key.
///
/// Values stay untyped text until the source validates them.
pub type RawFields = BTreeMap<String, String>;

/// One row of a collection as delivered by the record source.
///
/// On the wire a record is a flat object with an `id` member next to its
/// fields.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            fields: FieldMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Value of `key`, or `Null` when the record does not carry the field.
    pub fn get(&self, key: &str) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.fields.get(key).unwrap_or(&NULL)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Copy of this record with raw text overlaid on the given fields.
    #[must_use]
    pub fn overlay(&self, changes: &RawFields) -> Self {
        let mut merged = self.clone();
        for (key, raw) in changes {
            merged.fields.insert(key.clone(), CellValue::Text(raw.clone()));
        }
        merged
    }
}
