//! Data model for the admin table: records, columns, query state and
//! pagination, plus the error taxonomy shared by every tabsync crate.

pub mod column;
pub mod error;
pub mod ids;
pub mod layout;
pub mod page;
pub mod query;
pub mod record;
pub mod value;

pub use column::{Column, ColumnSet, Projection};
pub use error::{
    InvariantViolation, ModelError, MutationError, MutationKind, PaginationError, QueryError, Result,
    SourceError, SyncError, TabsyncError,
};
pub use ids::{ColumnKey, MutationId, RecordId, RequestSeq, RowKey};
pub use layout::{
    CollectionKind, DEFAULT_SEARCHABLE_COLUMNS, DEFAULT_SORT_FIELD, project_columns, task_columns,
};
pub use page::{PageMetadata, PageResponse, ReconciledPage};
pub use query::{DEFAULT_PER_PAGE, FetchQuery, QueryState, SortDirection, SortSpec};
pub use record::{FieldMap, RawFields, Record};
pub use value::{CellValue, Reference, SortKey, parse_date};
