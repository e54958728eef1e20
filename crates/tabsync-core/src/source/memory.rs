//! In-memory record source with the admin backend's query semantics.
//!
//! - Search is a case-insensitive substring match over the searchable
//!   columns, any column matching.
//! - Without a sort the collection is ordered by `created_at`, newest first.
//! - Pages are length-aware: `last_page` is `ceil(total / per_page)` but
//!   never below 1, and a page past the end comes back empty with the
//!   requested page number.
//! - Submitted text is coerced per column. Date columns must parse as
//!   dates, numeric fields stay numeric, attributed columns are stamped by
//!   the source and cannot be written.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::{debug, trace};

use tabsync_model::{
    CellValue, Column, ColumnSet, DEFAULT_SEARCHABLE_COLUMNS, DEFAULT_SORT_FIELD, FetchQuery,
    PageMetadata, PageResponse, Projection, RawFields, Record, RecordId, Reference, SortDirection,
    SourceError, parse_date,
};

use super::RecordSource;
use crate::composer::compare_cells;

/// Columns holding calendar dates unless configured otherwise.
const DEFAULT_DATE_COLUMNS: [&str; 2] = ["created_at", "due_date"];

/// Longest accepted `name`.
const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone)]
pub struct MemorySource {
    columns: ColumnSet,
    records: Vec<Record>,
    searchable: Vec<String>,
    date_columns: BTreeSet<String>,
    next_id: u64,
    today: NaiveDate,
    author: Option<Reference>,
}

impl MemorySource {
    pub fn new(columns: ColumnSet) -> Self {
        Self {
            columns,
            records: Vec::new(),
            searchable: DEFAULT_SEARCHABLE_COLUMNS
                .iter()
                .map(|key| (*key).to_string())
                .collect(),
            date_columns: DEFAULT_DATE_COLUMNS
                .iter()
                .map(|key| (*key).to_string())
                .collect(),
            next_id: 1,
            today: chrono::Local::now().date_naive(),
            author: None,
        }
    }

    /// Seed the collection. Later creates get ids above the highest seeded id.
    #[must_use]
    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        let highest = records.iter().map(|record| record.id.get()).max().unwrap_or(0);
        self.next_id = self.next_id.max(highest + 1);
        self.records = records;
        self
    }

    #[must_use]
    pub fn with_searchable_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Date stamped into `created_at` of new records.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// User stamped into `created_by` / `updated_by`.
    #[must_use]
    pub fn with_author(mut self, author: Reference) -> Self {
        self.author = Some(author);
        self
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    fn position(&self, id: RecordId) -> Result<usize, SourceError> {
        self.records
            .iter()
            .position(|record| record.id == id)
            .ok_or(SourceError::NotFound(id))
    }

    fn column(&self, key: &str) -> Result<&Column, SourceError> {
        self.columns.get(key).ok_or_else(|| SourceError::Validation {
            field: key.to_string(),
            message: "unknown column".to_string(),
        })
    }

    fn matches(&self, record: &Record, needle: &str) -> bool {
        self.searchable.iter().any(|key| {
            let projection = self
                .columns
                .get(key)
                .map(|column| column.projection)
                .unwrap_or_default();
            projection.search_text(record.get(key)).contains(needle)
        })
    }

    fn sort_column(&self, query: &FetchQuery) -> Result<Option<&Column>, SourceError> {
        let Some(field) = query.sort_field.as_deref() else {
            return Ok(self.columns.get(DEFAULT_SORT_FIELD));
        };
        let column = self.columns.get(field).ok_or_else(|| SourceError::Validation {
            field: "sort_field".to_string(),
            message: format!("unknown column `{field}`"),
        })?;
        if !column.projection.is_sortable() {
            return Err(SourceError::Validation {
                field: "sort_field".to_string(),
                message: format!("column `{field}` is not sortable"),
            });
        }
        Ok(Some(column))
    }

    /// Typed value for `raw` in `column`, given what is stored now.
    fn coerce(
        &self,
        column: &Column,
        raw: &str,
        current: &CellValue,
    ) -> Result<CellValue, SourceError> {
        let key = column.key.as_str();
        let invalid = |message: &str| SourceError::Validation {
            field: key.to_string(),
            message: message.to_string(),
        };
        let text = raw.trim();

        if column.projection == Projection::DisplayName {
            // Only an unchanged display name round-trips.
            let unchanged = match current {
                CellValue::Null => text.is_empty(),
                other => column.display(other) == text || other.scalar_text() == text,
            };
            return if unchanged {
                Ok(current.clone())
            } else {
                Err(invalid("is set by the server"))
            };
        }
        if text.is_empty() {
            return Ok(CellValue::Null);
        }
        if column.projection == Projection::Opaque {
            return Ok(CellValue::text(text));
        }
        if self.date_columns.contains(key) || matches!(current, CellValue::Date(_)) {
            return parse_date(text)
                .map(CellValue::Date)
                .ok_or_else(|| invalid("expected a date (YYYY-MM-DD)"));
        }
        if matches!(current, CellValue::Number(_)) {
            return text
                .parse::<f64>()
                .map(CellValue::Number)
                .map_err(|_| invalid("expected a number"));
        }
        Ok(CellValue::text(text))
    }

    fn check_name(record: &Record) -> Result<(), SourceError> {
        let name = record.get("name").scalar_text();
        let message = if name.trim().is_empty() {
            "is required"
        } else if name.chars().count() > MAX_NAME_LEN {
            "may not be longer than 255 characters"
        } else {
            return Ok(());
        };
        Err(SourceError::Validation {
            field: "name".to_string(),
            message: message.to_string(),
        })
    }

    fn stamp(&self, record: &mut Record, key: &str) {
        if let Some(author) = &self.author {
            if self.columns.contains(key) {
                record.set(key, author.clone());
            }
        }
    }
}

impl RecordSource for MemorySource {
    fn fetch(&self, query: &FetchQuery) -> Result<PageResponse, SourceError> {
        if query.per_page == 0 {
            return Err(SourceError::Validation {
                field: "per_page".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);
        let mut matching: Vec<&Record> = self
            .records
            .iter()
            .filter(|record| needle.as_deref().is_none_or(|needle| self.matches(record, needle)))
            .collect();

        if let Some(column) = self.sort_column(query)? {
            let key = column.key.as_str();
            let direction = query.sort_direction.unwrap_or(SortDirection::Desc);
            matching.sort_by(|a, b| {
                let ordering = compare_cells(column, a.get(key), b.get(key));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let total = matching.len() as u64;
        let metadata = PageMetadata::for_page(query.page, query.per_page, total);
        let skip = (metadata.current_page as usize - 1).saturating_mul(metadata.per_page as usize);
        let records: Vec<Record> = matching
            .into_iter()
            .skip(skip)
            .take(metadata.per_page as usize)
            .cloned()
            .collect();
        debug!(
            search = query.search.as_deref().unwrap_or(""),
            page = metadata.current_page,
            total,
            returned = records.len(),
            "served page"
        );
        Ok(PageResponse {
            records,
            pagination: metadata,
        })
    }

    fn create(&mut self, fields: &RawFields) -> Result<Record, SourceError> {
        let mut record = Record::new(RecordId::new(self.next_id));
        for (key, raw) in fields {
            let column = self.column(key)?;
            let value = self.coerce(column, raw, &CellValue::Null)?;
            if !value.is_null() {
                record.set(key.as_str(), value);
            }
        }
        Self::check_name(&record)?;
        if self.columns.contains("created_at") {
            record.set("created_at", self.today);
        }
        self.stamp(&mut record, "created_by");
        self.stamp(&mut record, "updated_by");

        self.next_id += 1;
        trace!(id = %record.id, "record stored");
        self.records.push(record.clone());
        Ok(record)
    }

    fn update(&mut self, id: RecordId, submitted: &Record) -> Result<Record, SourceError> {
        let index = self.position(id)?;
        let mut record = self.records[index].clone();
        for (key, value) in &submitted.fields {
            let current = record.get(key);
            if value == current {
                continue;
            }
            let column = self.column(key)?;
            let next = match value {
                CellValue::Text(raw) => self.coerce(column, raw, current)?,
                _ if column.projection == Projection::DisplayName => {
                    return Err(SourceError::Validation {
                        field: key.clone(),
                        message: "is set by the server".to_string(),
                    });
                }
                typed => typed.clone(),
            };
            record.set(key.as_str(), next);
        }
        Self::check_name(&record)?;
        self.stamp(&mut record, "updated_by");
        trace!(%id, "record updated");
        self.records[index] = record.clone();
        Ok(record)
    }

    fn delete(&mut self, id: RecordId) -> Result<(), SourceError> {
        let index = self.position(id)?;
        self.records.remove(index);
        trace!(%id, "record deleted");
        Ok(())
    }
}
