#![deny(unsafe_code)]

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Display format for date cells (`24-03-09`).
pub const DISPLAY_DATE_FORMAT: &str = "%y-%m-%d";

/// Wire format for date cells (`2024-03-09`).
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";

/// An attributed user, as embedded in `created_by` / `updated_by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Reference {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// One cell of a record.
///
/// Untagged on the wire: `null`, numbers, `YYYY-MM-DD` strings, other strings
/// and `{name, email}` objects map to the variants in that order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    #[serde(serialize_with = "serialize_date", deserialize_with = "deserialize_date")]
    Date(NaiveDate),
    Text(String),
    Reference(Reference),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Plain rendering of the value.
    ///
    /// References render as `name <email>`; columns that want only the
    /// name register a display-name projection instead.
    pub fn scalar_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Number(n) => format_number(*n),
            Self::Date(date) => date.format(DISPLAY_DATE_FORMAT).to_string(),
            Self::Text(text) => text.clone(),
            Self::Reference(reference) if reference.email.is_empty() => reference.name.clone(),
            Self::Reference(reference) => format!("{} <{}>", reference.name, reference.email),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<Reference> for CellValue {
    fn from(value: Reference) -> Self {
        Self::Reference(value)
    }
}

/// Parse a date in either wire (`2024-03-09`) or display (`24-03-09`) form.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    match text.len() {
        10 => NaiveDate::parse_from_str(text, WIRE_DATE_FORMAT).ok(),
        8 => NaiveDate::parse_from_str(text, DISPLAY_DATE_FORMAT).ok(),
        _ => None,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn serialize_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(WIRE_DATE_FORMAT))
}

fn deserialize_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_date(&text).ok_or_else(|| serde::de::Error::custom(format!("not a date: {text:?}")))
}

// =============================================================================
// SORT KEYS
// =============================================================================

/// Comparable projection of a cell.
///
/// Keys of different kinds order as null < number < date < text so mixed
/// columns still sort deterministically.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Null,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Number(_) => 1,
            Self::Date(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_map_to_variants() {
        let values: Vec<CellValue> = serde_json::from_str(
            r#"[null, 4, "2024-03-09", "Active", {"name": "Ada", "email": "ada@example.com"}]"#,
        )
        .unwrap();
        assert_eq!(values[0], CellValue::Null);
        assert_eq!(values[1], CellValue::Number(4.0));
        assert_eq!(
            values[2],
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
        );
        assert_eq!(values[3], CellValue::text("Active"));
        assert_eq!(
            values[4],
            CellValue::Reference(Reference::new("Ada", "ada@example.com"))
        );
    }

    #[test]
    fn dates_display_as_short_year() {
        let date = CellValue::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(date.scalar_text(), "24-03-09");
        assert_eq!(serde_json::to_string(&date).unwrap(), r#""2024-03-09""#);
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(CellValue::Number(12.0).scalar_text(), "12");
        assert_eq!(CellValue::Number(2.5).scalar_text(), "2.5");
    }

    #[test]
    fn mixed_sort_keys_order_by_kind() {
        let mut keys = vec![
            SortKey::Text("b".into()),
            SortKey::Number(2.0),
            SortKey::Null,
            SortKey::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            SortKey::Number(-1.0),
        ];
        keys.sort();
        assert_eq!(keys[0], SortKey::Null);
        assert_eq!(keys[1], SortKey::Number(-1.0));
        assert_eq!(keys[4], SortKey::Text("b".into()));
    }
}
