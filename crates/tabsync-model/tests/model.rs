//! Tests for tabsync-model wire shapes.

use tabsync_model::{
    CellValue, PageResponse, QueryState, Reference, SortDirection, SortSpec, project_columns,
};

const PROJECT_PAGE: &str = r#"{
    "records": [
        {
            "id": 3,
            "name": "Apollo",
            "description": "Moonshot",
            "status": "in_progress",
            "created_at": "2024-02-01",
            "due_date": "2024-12-31",
            "image_path": null,
            "created_by": {"name": "Ada", "email": "ada@example.com"},
            "updated_by": {"name": "Grace", "email": "grace@example.com"}
        }
    ],
    "pagination": {"current_page": 1, "last_page": 1, "per_page": 10, "total": 1}
}"#;

#[test]
fn project_page_deserializes_with_typed_cells() {
    let page: PageResponse = serde_json::from_str(PROJECT_PAGE).expect("parse page");
    let record = &page.records[0];
    let columns = project_columns();

    assert!(record.get("image_path").is_null());
    assert_eq!(
        record.get("created_by"),
        &CellValue::Reference(Reference::new("Ada", "ada@example.com"))
    );

    let display: Vec<String> = columns
        .iter()
        .map(|column| column.display(record.get(column.key.as_str())))
        .collect();
    assert_eq!(
        display,
        vec![
            "Apollo",
            "Moonshot",
            "in_progress",
            "24-02-01",
            "24-12-31",
            "Ada",
            "Grace",
            ""
        ]
    );
}

#[test]
fn fetch_query_snapshot() {
    let columns = project_columns();
    let state = QueryState::new(&columns, 10)
        .expect("initial state")
        .with_page(3)
        .with_search("apollo")
        .with_sort_spec(
            &columns,
            SortSpec::new(
                columns.get("due_date").expect("due_date").key.clone(),
                SortDirection::Desc,
            ),
        )
        .expect("sortable");

    insta::assert_json_snapshot!(state.to_fetch_query(), @r#"
    {
      "search": "apollo",
      "sort_field": "due_date",
      "sort_direction": "desc",
      "page": 1,
      "per_page": 10
    }
    "#);
}
