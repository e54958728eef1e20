//! View parameters and the outgoing query they serialize to.
//!
//! `QueryState` is an immutable value. Every user interaction goes through
//! one of the `with_*` transitions, which return the next state and leave
//! the current one untouched. Responses from the record source never feed
//! back into it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::column::ColumnSet;
use crate::error::{ModelError, QueryError};
use crate::ids::ColumnKey;

/// Default rows per page, matching the record source's own default.
pub const DEFAULT_PER_PAGE: u32 = 10;

// =============================================================================
// SORT
// =============================================================================

/// Sort direction.
///
/// Serialized as `asc` / `desc`. The long forms `ascending` / `descending`
/// are accepted on input and normalized.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc", alias = "ascending")]
    Asc,
    #[serde(rename = "desc", alias = "descending")]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            _ => Err(ModelError::InvalidSortDirection(s.to_string())),
        }
    }
}

/// Sort field and direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: ColumnKey,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: ColumnKey, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

// =============================================================================
// QUERY STATE
// =============================================================================

/// Current user-controlled view parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    search: String,
    sort: Option<SortSpec>,
    page: u32,
    per_page: u32,
    visible_columns: BTreeSet<ColumnKey>,
}

impl QueryState {
    /// Initial state: no search, no sort, page 1, every column visible.
    pub fn new(columns: &ColumnSet, per_page: u32) -> Result<Self, QueryError> {
        if per_page == 0 {
            return Err(QueryError::InvalidPerPage);
        }
        Ok(Self {
            search: String::new(),
            sort: None,
            page: 1,
            per_page,
            visible_columns: columns.keys(),
        })
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn visible_columns(&self) -> &BTreeSet<ColumnKey> {
        &self.visible_columns
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.visible_columns.contains(key)
    }

    /// New search text. The result set changes, so the page resets to 1.
    #[must_use]
    pub fn with_search(&self, text: impl Into<String>) -> Self {
        Self {
            search: text.into(),
            page: 1,
            ..self.clone()
        }
    }

    /// Sort by `field`; flips the direction when it is already the sort field.
    pub fn with_sort(&self, columns: &ColumnSet, field: &str) -> Result<Self, QueryError> {
        let column = columns
            .get(field)
            .ok_or_else(|| QueryError::UnknownColumn(field.to_string()))?;
        if !column.projection.is_sortable() {
            return Err(QueryError::NotSortable(column.key.clone()));
        }
        let direction = match &self.sort {
            Some(current) if current.field == column.key => current.direction.toggled(),
            _ => SortDirection::Asc,
        };
        Ok(Self {
            sort: Some(SortSpec::new(column.key.clone(), direction)),
            ..self.clone()
        })
    }

    /// Replace the sort outright (restoring a saved view, default sort).
    pub fn with_sort_spec(&self, columns: &ColumnSet, spec: SortSpec) -> Result<Self, QueryError> {
        let column = columns
            .get(spec.field.as_str())
            .ok_or_else(|| QueryError::UnknownColumn(spec.field.to_string()))?;
        if !column.projection.is_sortable() {
            return Err(QueryError::NotSortable(spec.field));
        }
        Ok(Self {
            sort: Some(spec),
            ..self.clone()
        })
    }

    /// Go to `page`; 0 is treated as 1.
    #[must_use]
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// New page size. The page position is meaningless afterwards, so it
    /// resets to 1.
    pub fn with_per_page(&self, per_page: u32) -> Result<Self, QueryError> {
        if per_page == 0 {
            return Err(QueryError::InvalidPerPage);
        }
        Ok(Self {
            per_page,
            page: 1,
            ..self.clone()
        })
    }

    /// Show or hide a column. Hiding the last visible column is allowed.
    pub fn with_column_toggled(&self, columns: &ColumnSet, key: &str) -> Result<Self, QueryError> {
        let column = columns
            .get(key)
            .ok_or_else(|| QueryError::UnknownColumn(key.to_string()))?;
        let mut visible_columns = self.visible_columns.clone();
        if !visible_columns.remove(key) {
            visible_columns.insert(column.key.clone());
        }
        Ok(Self {
            visible_columns,
            ..self.clone()
        })
    }

    /// Outgoing query for the record source.
    pub fn to_fetch_query(&self) -> FetchQuery {
        let search = self.search.trim();
        FetchQuery {
            search: (!search.is_empty()).then(|| search.to_string()),
            sort_field: self.sort.as_ref().map(|spec| spec.field.to_string()),
            sort_direction: self.sort.as_ref().map(|spec| spec.direction),
            page: self.page,
            per_page: self.per_page,
        }
    }
}

// =============================================================================
// OUTGOING QUERY
// =============================================================================

/// Query parameters sent to the record source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn first_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for FetchQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort_field: None,
            sort_direction: None,
            page: first_page(),
            per_page: default_per_page(),
        }
    }
}

impl FetchQuery {
    /// Name/value pairs in query-string order.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(5);
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(field) = &self.sort_field {
            pairs.push(("sort_field", field.clone()));
        }
        if let Some(direction) = self.sort_direction {
            pairs.push(("sort_direction", direction.to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("per_page", self.per_page.to_string()));
        pairs
    }
}
