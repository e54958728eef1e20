//! Terminal rendering of pages, records and column layouts.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use tabsync_core::{DisplayRow, PageItem, RowState, TableView, ViewOptions};
use tabsync_model::{ColumnSet, Projection, Record};

/// The current page as a table, with a leading key column and a trailing
/// state column.
pub fn page_table(view: &TableView) -> Table {
    let composed = view.rows();
    let mut table = Table::new();
    let mut header = vec![header_cell("#")];
    header.extend(composed.headers().into_iter().map(header_cell));
    header.push(header_cell("State"));
    table.set_header(header);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);

    for row in &composed.rows {
        table.add_row(row_cells(row));
    }
    table
}

fn row_cells(row: &DisplayRow) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(row.cells.len() + 2);
    cells.push(dim_cell(row.key));
    cells.extend(row.cells.iter().map(|text| styled(Cell::new(text), row.state)));
    cells.push(state_cell(row.state));
    cells
}

fn styled(cell: Cell, state: RowState) -> Cell {
    match state {
        RowState::Clean => cell,
        RowState::Editing | RowState::Saving => cell.fg(Color::Cyan),
        RowState::Provisional => cell.fg(Color::Yellow),
        RowState::PendingDelete => cell.fg(Color::DarkGrey).add_attribute(Attribute::CrossedOut),
    }
}

fn state_cell(state: RowState) -> Cell {
    match state {
        RowState::Clean => Cell::new(""),
        RowState::Editing => Cell::new("editing").fg(Color::Cyan),
        RowState::Saving => Cell::new("saving").fg(Color::Cyan),
        RowState::Provisional => Cell::new("unsaved").fg(Color::Yellow),
        RowState::PendingDelete => Cell::new("deleting").fg(Color::Red),
    }
}

/// Pagination bar: `« ‹ 1 … 3 4 [5] 6 7 … 10 › »`.
///
/// First/previous and next/last markers are left out when they would do
/// nothing.
pub fn pagination_line(view: &TableView) -> String {
    let navigation = view.navigation();
    let mut parts: Vec<String> = Vec::new();
    if navigation.first.is_some() {
        parts.push("«".to_string());
    }
    if navigation.prev.is_some() {
        parts.push("‹".to_string());
    }
    parts.extend(view.pagination_window().iter().map(|item| match item {
        PageItem::Page(n) if *n == navigation.current => format!("[{n}]"),
        other => other.to_string(),
    }));
    if navigation.next.is_some() {
        parts.push("›".to_string());
    }
    if navigation.last_target.is_some() {
        parts.push("»".to_string());
    }
    parts.join(" ")
}

/// Footer under the table: item range, page position and page sizes.
pub fn footer(view: &TableView) -> String {
    let summary = view.summary();
    let sizes: Vec<String> = view
        .per_page_options()
        .iter()
        .map(|size| {
            if *size == view.query().per_page() {
                format!("[{size}]")
            } else {
                size.to_string()
            }
        })
        .collect();
    format!(
        "{summary} | Page {} of {} | Rows per page: {}",
        summary.current,
        summary.last,
        sizes.join(" ")
    )
}

/// One record, field per line.
pub fn record_table(columns: &ColumnSet, record: &Record) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Field"), header_cell("Value")]);
    apply_table_style(&mut table);
    table.add_row(vec![dim_cell("id"), Cell::new(record.id)]);
    for column in columns.iter() {
        table.add_row(vec![
            dim_cell(&column.label),
            Cell::new(column.display(record.get(column.key.as_str()))),
        ]);
    }
    table
}

/// Column layout with what each column supports.
pub fn columns_table(columns: &ColumnSet, options: &ViewOptions) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Key"),
        header_cell("Label"),
        header_cell("Shown as"),
        header_cell("Sortable"),
        header_cell("Searched"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Center);
    for column in columns.iter() {
        let shown_as = match column.projection {
            Projection::Scalar => "value",
            Projection::DisplayName => "name",
            Projection::Opaque => "raw",
        };
        let searched = options
            .searchable_columns
            .iter()
            .any(|key| key == column.key.as_str());
        table.add_row(vec![
            Cell::new(column.key.as_str()),
            Cell::new(&column.label),
            Cell::new(shown_as),
            check_cell(column.projection.is_sortable()),
            check_cell(searched),
        ]);
    }
    table
}

fn check_cell(value: bool) -> Cell {
    if value {
        Cell::new("✓").fg(Color::Green)
    } else {
        dim_cell("-")
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
