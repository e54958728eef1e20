//! Column layouts of the administrative collections.

use std::fmt;
use std::str::FromStr;

use crate::column::{Column, ColumnSet, Projection};
use crate::ids::ColumnKey;

/// Columns the record source searches by default.
pub const DEFAULT_SEARCHABLE_COLUMNS: [&str; 5] =
    ["name", "description", "status", "created_by", "updated_by"];

/// Column the record source sorts by when the query names none.
pub const DEFAULT_SORT_FIELD: &str = "created_at";

/// Collections served by the admin table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    #[default]
    Projects,
    Tasks,
}

impl CollectionKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Projects => "Projects",
            Self::Tasks => "Tasks",
        }
    }

    pub fn columns(&self) -> ColumnSet {
        match self {
            Self::Projects => project_columns(),
            Self::Tasks => task_columns(),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "projects" | "project" => Ok(Self::Projects),
            "tasks" | "task" => Ok(Self::Tasks),
            other => Err(format!("unknown collection: {other}")),
        }
    }
}

/// Project table layout.
pub fn project_columns() -> ColumnSet {
    build(&[
        ("name", "Project Name", Projection::Scalar),
        ("description", "Description", Projection::Scalar),
        ("status", "Status", Projection::Scalar),
        ("created_at", "Created At", Projection::Scalar),
        ("due_date", "Due Date", Projection::Scalar),
        ("created_by", "Created By", Projection::DisplayName),
        ("updated_by", "Updated By", Projection::DisplayName),
        ("image_path", "Image", Projection::Opaque),
    ])
}

/// Task table layout.
pub fn task_columns() -> ColumnSet {
    build(&[
        ("name", "Task Name", Projection::Scalar),
        ("description", "Description", Projection::Scalar),
        ("status", "Status", Projection::Scalar),
        ("priority", "Priority", Projection::Scalar),
        ("created_at", "Created At", Projection::Scalar),
        ("due_date", "Due Date", Projection::Scalar),
        ("assigned_user", "Assigned To", Projection::DisplayName),
        ("created_by", "Created By", Projection::DisplayName),
        ("updated_by", "Updated By", Projection::DisplayName),
        ("image_path", "Image", Projection::Opaque),
    ])
}

fn build(entries: &[(&'static str, &str, Projection)]) -> ColumnSet {
    ColumnSet::from_static(
        entries
            .iter()
            .map(|(key, label, projection)| Column {
                key: ColumnKey::from_static(key),
                label: (*label).to_string(),
                projection: *projection,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_layout_matches_record_shape() {
        let columns = project_columns();
        assert_eq!(columns.len(), 8);
        assert_eq!(
            columns.get("created_by").unwrap().projection,
            Projection::DisplayName
        );
        assert!(!columns.get("image_path").unwrap().projection.is_sortable());
        for key in DEFAULT_SEARCHABLE_COLUMNS {
            assert!(columns.contains(key), "{key} missing");
        }
        assert!(columns.contains(DEFAULT_SORT_FIELD));
    }

    #[test]
    fn collection_names_parse() {
        assert_eq!("Tasks".parse::<CollectionKind>(), Ok(CollectionKind::Tasks));
        assert!("users".parse::<CollectionKind>().is_err());
    }
}
