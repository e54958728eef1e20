//! Projection of the synced page and local edits into displayable rows.

use std::borrow::Cow;
use std::cmp::Ordering;

use tabsync_model::{
    CellValue, Column, ColumnKey, ColumnSet, FieldMap, QueryState, Record, RowKey, SortDirection,
    SortKey,
};

use crate::edit_store::{RowEditStore, RowState};

/// Client-side narrowing search over the rows already on the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalFilter {
    pub term: String,
    /// Restrict matching to one column; `None` searches every searchable column.
    pub column: Option<ColumnKey>,
}

impl LocalFilter {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            column: None,
        }
    }

    #[must_use]
    pub fn in_column(mut self, column: ColumnKey) -> Self {
        self.column = Some(column);
        self
    }

    fn needle(&self) -> Option<String> {
        let term = self.term.trim();
        (!term.is_empty()).then(|| term.to_lowercase())
    }
}

/// Everything a composition reads.
#[derive(Debug, Clone, Copy)]
pub struct ComposeInput<'a> {
    pub columns: &'a ColumnSet,
    pub query: &'a QueryState,
    pub records: &'a [Record],
    pub edits: &'a RowEditStore,
    pub filter: &'a LocalFilter,
    pub searchable_columns: &'a [String],
    pub show_provisional_rows: bool,
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRow {
    pub key: RowKey,
    /// Cell text per visible column, in layout order.
    pub cells: Vec<String>,
    pub state: RowState,
}

/// Visible columns and the rows to draw under them.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedView {
    pub columns: Vec<Column>,
    pub rows: Vec<DisplayRow>,
}

impl ComposedView {
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.label.as_str()).collect()
    }

    pub fn row(&self, key: RowKey) -> Option<&DisplayRow> {
        self.rows.iter().find(|row| row.key == key)
    }
}

struct Candidate<'a> {
    key: RowKey,
    fields: Cow<'a, FieldMap>,
}

impl Candidate<'_> {
    fn value(&self, column: &str) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.fields.get(column).unwrap_or(&NULL)
    }
}

/// Build the rows for the current page.
///
/// Search and sort look at committed values only; the edit buffer affects
/// nothing but the cells of the row being edited.
pub fn compose(input: ComposeInput<'_>) -> ComposedView {
    let columns: Vec<Column> = input
        .columns
        .iter()
        .filter(|column| input.query.is_visible(column.key.as_str()))
        .cloned()
        .collect();

    let mut candidates: Vec<Candidate<'_>> = input
        .records
        .iter()
        .map(|record| Candidate {
            key: RowKey::Persisted(record.id),
            fields: Cow::Borrowed(&record.fields),
        })
        .collect();
    if input.show_provisional_rows {
        candidates.extend(input.edits.provisional_rows().iter().map(|row| Candidate {
            key: row.key,
            fields: Cow::Owned(
                row.fields
                    .iter()
                    .map(|(key, raw)| (key.clone(), CellValue::text(raw.as_str())))
                    .collect(),
            ),
        }));
    }

    if let Some(needle) = input.filter.needle() {
        let search_columns = search_columns(&input);
        candidates.retain(|candidate| {
            search_columns.iter().any(|column| {
                column
                    .projection
                    .search_text(candidate.value(column.key.as_str()))
                    .contains(&needle)
            })
        });
    }

    if let Some(sort) = input.query.sort() {
        if let Some(column) = input.columns.get(sort.field.as_str()) {
            let mut keyed: Vec<(Option<SortKey>, Candidate<'_>)> = candidates
                .into_iter()
                .map(|candidate| {
                    let key = column.projection.sort_key(candidate.value(column.key.as_str()));
                    (key, candidate)
                })
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                let ordering = a.cmp(b);
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
            candidates = keyed.into_iter().map(|(_, candidate)| candidate).collect();
        }
    }

    let rows = candidates
        .iter()
        .map(|candidate| {
            let buffer = input.edits.buffer(candidate.key);
            let cells = columns
                .iter()
                .map(|column| {
                    buffer
                        .and_then(|buffer| buffer.change(column.key.as_str()))
                        .map_or_else(
                            || column.display(candidate.value(column.key.as_str())),
                            str::to_string,
                        )
                })
                .collect();
            DisplayRow {
                key: candidate.key,
                cells,
                state: input.edits.row_state(candidate.key),
            }
        })
        .collect();

    ComposedView { columns, rows }
}

fn search_columns<'a>(input: &ComposeInput<'a>) -> Vec<&'a Column> {
    match &input.filter.column {
        Some(key) => input.columns.get(key.as_str()).into_iter().collect(),
        None => input
            .searchable_columns
            .iter()
            .filter_map(|key| input.columns.get(key))
            .collect(),
    }
}

/// Compare two cells under a column's projection, for hosts that sort
/// their own lists the same way the table does.
pub fn compare_cells(column: &Column, a: &CellValue, b: &CellValue) -> Ordering {
    column
        .projection
        .sort_key(a)
        .cmp(&column.projection.sort_key(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ViewOptions;
    use tabsync_model::{RawFields, RecordId, Reference, project_columns};

    fn records() -> Vec<Record> {
        vec![
            Record::new(RecordId::new(1))
                .with_field("name", "Apollo")
                .with_field("status", "pending")
                .with_field("created_by", Reference::new("Zed", "z@x.io")),
            Record::new(RecordId::new(2))
                .with_field("name", "beacon")
                .with_field("status", "completed")
                .with_field("created_by", Reference::new("Ada", "a@x.io")),
            Record::new(RecordId::new(3))
                .with_field("name", "Comet")
                .with_field("status", "in_progress")
                .with_field("created_by", Reference::new("Mia", "m@x.io")),
        ]
    }

    struct Fixture {
        columns: ColumnSet,
        query: QueryState,
        records: Vec<Record>,
        edits: RowEditStore,
        filter: LocalFilter,
        options: ViewOptions,
    }

    impl Fixture {
        fn new() -> Self {
            let columns = project_columns();
            let query = QueryState::new(&columns, 10).unwrap();
            let edits = RowEditStore::new(&columns);
            Self {
                columns,
                query,
                records: records(),
                edits,
                filter: LocalFilter::default(),
                options: ViewOptions::default(),
            }
        }

        fn compose(&self) -> ComposedView {
            compose(ComposeInput {
                columns: &self.columns,
                query: &self.query,
                records: &self.records,
                edits: &self.edits,
                filter: &self.filter,
                searchable_columns: &self.options.searchable_columns,
                show_provisional_rows: self.options.show_provisional_rows,
            })
        }
    }

    fn names(view: &ComposedView) -> Vec<String> {
        view.rows.iter().map(|row| row.cells[0].clone()).collect()
    }

    #[test]
    fn hidden_columns_are_left_out() {
        let mut fixture = Fixture::new();
        fixture.query = fixture
            .query
            .with_column_toggled(&fixture.columns, "description")
            .unwrap();
        let view = fixture.compose();
        assert_eq!(view.columns.len(), 7);
        assert!(!view.headers().contains(&"Description"));
        assert_eq!(view.rows[0].cells.len(), 7);
    }

    #[test]
    fn display_name_columns_sort_by_name() {
        let mut fixture = Fixture::new();
        fixture.query = fixture.query.with_sort(&fixture.columns, "created_by").unwrap();
        assert_eq!(names(&fixture.compose()), ["beacon", "Comet", "Apollo"]);
        fixture.query = fixture.query.with_sort(&fixture.columns, "created_by").unwrap();
        assert_eq!(names(&fixture.compose()), ["Apollo", "Comet", "beacon"]);
    }

    #[test]
    fn local_filter_is_case_insensitive_and_column_scoped() {
        let mut fixture = Fixture::new();
        fixture.filter = LocalFilter::new("ADA");
        assert_eq!(names(&fixture.compose()), ["beacon"]);

        fixture.filter = LocalFilter::new("ada").in_column(ColumnKey::new("name").unwrap());
        assert!(fixture.compose().rows.is_empty());
    }

    #[test]
    fn edit_buffer_shows_in_cells_but_not_in_search() {
        let mut fixture = Fixture::new();
        let record = fixture.records[0].clone();
        let key = RowKey::Persisted(record.id);
        fixture.edits.begin_edit(&record).unwrap();
        fixture.edits.update_field(key, "name", "Zephyr").unwrap();

        let view = fixture.compose();
        let row = view.row(key).unwrap();
        assert_eq!(row.cells[0], "Zephyr");
        assert_eq!(row.state, RowState::Editing);

        fixture.filter = LocalFilter::new("zephyr");
        assert!(fixture.compose().rows.is_empty());
    }

    #[test]
    fn provisional_rows_follow_the_option() {
        let mut fixture = Fixture::new();
        let mut fields = RawFields::new();
        fields.insert("name".into(), "Draft".into());
        let request = fixture.edits.add_row(fields).unwrap();

        let view = fixture.compose();
        let row = view.row(request.key()).unwrap();
        assert_eq!(row.state, RowState::Provisional);
        assert_eq!(row.cells[0], "Draft");

        fixture.options = fixture.options.clone().with_provisional_rows(false);
        assert_eq!(fixture.compose().rows.len(), 3);
    }

    #[test]
    fn empty_visible_set_still_lists_rows() {
        let mut fixture = Fixture::new();
        for column in fixture.columns.clone().iter() {
            fixture.query = fixture
                .query
                .with_column_toggled(&fixture.columns, column.key.as_str())
                .unwrap();
        }
        let view = fixture.compose();
        assert!(view.columns.is_empty());
        assert_eq!(view.rows.len(), 3);
        assert!(view.rows.iter().all(|row| row.cells.is_empty()));
    }
}
