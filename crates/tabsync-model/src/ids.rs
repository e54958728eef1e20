#![deny(unsafe_code)]

use std::borrow::Borrow;
use std::fmt;

use crate::ModelError;

/// Key of a column in the page layout (`name`, `created_by`, ...).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnKey(String);

impl ColumnKey {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidColumnKey(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ColumnKey {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ColumnKey> for String {
    fn from(key: ColumnKey) -> Self {
        key.0
    }
}

impl Borrow<str> for ColumnKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier assigned by the record source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a displayed row.
///
/// Provisional keys are handed out for rows created locally and still waiting
/// for the source to confirm them. They are never reused and never compare
/// equal to a persisted key, so a provisional row can't shadow a real one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowKey {
    Persisted(RecordId),
    Provisional(u64),
}

impl RowKey {
    pub fn record_id(self) -> Option<RecordId> {
        match self {
            Self::Persisted(id) => Some(id),
            Self::Provisional(_) => None,
        }
    }

    pub fn is_provisional(self) -> bool {
        matches!(self, Self::Provisional(_))
    }
}

impl From<RecordId> for RowKey {
    fn from(id: RecordId) -> Self {
        Self::Persisted(id)
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persisted(id) => write!(f, "{id}"),
            Self::Provisional(n) => write!(f, "new-{n}"),
        }
    }
}

/// Sequence number of an outgoing page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestSeq(u64);

impl RequestSeq {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for RequestSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle of a create/update/delete intent awaiting the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MutationId(u64);

impl MutationId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_key_trims_and_rejects_blank() {
        assert_eq!(ColumnKey::new("  name ").unwrap().as_str(), "name");
        assert!(ColumnKey::new("   ").is_err());
    }

    #[test]
    fn provisional_keys_never_match_persisted() {
        let persisted = RowKey::from(RecordId::new(1));
        let provisional = RowKey::Provisional(1);
        assert_ne!(persisted, provisional);
        assert_eq!(provisional.record_id(), None);
        assert_eq!(provisional.to_string(), "new-1");
    }
}
