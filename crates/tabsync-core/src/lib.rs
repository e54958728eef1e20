//! Client-side state for a paginated, server-backed admin table.
//!
//! [`TableView`] ties the pieces together:
//!
//! - [`sync::RemoteQuerySync`] turns query states into sequence-numbered
//!   fetches and accepts only the answer to the latest one.
//! - [`edit_store::RowEditStore`] holds the open edit buffer and the pending
//!   create/update/delete intents.
//! - [`paginator`] derives the page window and navigation targets from the
//!   authoritative page metadata.
//! - [`composer`] projects the page and local edits into display rows.
//!
//! Nothing here performs I/O. Requests are returned to the host, which
//! executes them against a [`source::RecordSource`] and feeds the results
//! back.

pub mod composer;
pub mod edit_store;
pub mod options;
pub mod paginator;
pub mod source;
pub mod sync;
pub mod table_view;

pub use composer::{ComposeInput, ComposedView, DisplayRow, LocalFilter, compose};
pub use edit_store::{
    EditBuffer, MutationOutcome, MutationRequest, MutationResponse, ProvisionalRow,
    ProvisionalStatus, RejectedAdd, RowEditStore, RowState,
};
pub use options::{DEFAULT_WINDOW_RADIUS, PER_PAGE_OPTIONS, ViewOptions};
pub use paginator::{Navigation, PageItem, PageSummary, clamp_page, compute_window};
pub use source::{MemorySource, RecordSource};
pub use sync::{FetchRequest, RemoteQuerySync, SyncOutcome, SyncedPage};
pub use table_view::TableView;
