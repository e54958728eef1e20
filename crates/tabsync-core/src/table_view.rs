//! The table as a whole: query transitions, page sync, row edits and the
//! derived view, behind one owner.
//!
//! `TableView` never performs I/O. Interactions return the [`FetchRequest`]
//! or [`MutationRequest`] the host has to execute; the host answers through
//! [`TableView::receive_page`] and [`TableView::complete_mutation`]. The
//! `drive_*` helpers do both steps against a synchronous [`RecordSource`].

use tracing::{debug, info};

use tabsync_model::{
    ColumnKey, ColumnSet, MutationError, MutationId, PageMetadata, PageResponse, QueryError,
    QueryState, RawFields, Record, RequestSeq, RowKey, SourceError, SyncError,
};

use crate::composer::{ComposeInput, ComposedView, LocalFilter, compose};
use crate::edit_store::{
    EditBuffer, MutationOutcome, MutationRequest, MutationResponse, RejectedAdd, RowEditStore,
};
use crate::options::ViewOptions;
use crate::paginator::{Navigation, PageItem, PageSummary, clamp_page, compute_window};
use crate::source::RecordSource;
use crate::sync::{FetchRequest, RemoteQuerySync, SyncOutcome};

#[derive(Debug)]
pub struct TableView {
    columns: ColumnSet,
    options: ViewOptions,
    query: QueryState,
    sync: RemoteQuerySync,
    edits: RowEditStore,
    filter: LocalFilter,
}

impl TableView {
    pub fn new(columns: ColumnSet, options: ViewOptions) -> Result<Self, QueryError> {
        let query = QueryState::new(&columns, options.default_per_page)?;
        let edits = RowEditStore::new(&columns);
        Ok(Self {
            columns,
            options,
            query,
            sync: RemoteQuerySync::new(),
            edits,
            filter: LocalFilter::default(),
        })
    }

    /// Request the current query unconditionally (first load, manual refresh).
    pub fn refresh(&mut self) -> FetchRequest {
        self.sync.request(&self.query)
    }

    fn transition(&mut self, next: QueryState) -> Option<FetchRequest> {
        self.query = next;
        self.sync.request_if_changed(&self.query)
    }

    // =========================================================================
    // Query transitions
    // =========================================================================

    pub fn search(&mut self, text: impl Into<String>) -> Option<FetchRequest> {
        let next = self.query.with_search(text);
        self.transition(next)
    }

    pub fn sort_by(&mut self, field: &str) -> Result<Option<FetchRequest>, QueryError> {
        let next = self.query.with_sort(&self.columns, field)?;
        Ok(self.transition(next))
    }

    pub fn go_to_page(&mut self, page: u32) -> Option<FetchRequest> {
        let next = self.query.with_page(page);
        self.transition(next)
    }

    /// Go to `page`, clamped into the pages the source reported.
    pub fn jump_to_page(&mut self, page: u32) -> Option<FetchRequest> {
        let target = clamp_page(page, self.metadata().last_page);
        self.go_to_page(target)
    }

    pub fn first_page(&mut self) -> Option<FetchRequest> {
        let target = self.navigation().first?;
        self.go_to_page(target)
    }

    pub fn prev_page(&mut self) -> Option<FetchRequest> {
        let target = self.navigation().prev?;
        self.go_to_page(target)
    }

    pub fn next_page(&mut self) -> Option<FetchRequest> {
        let target = self.navigation().next?;
        self.go_to_page(target)
    }

    pub fn last_page(&mut self) -> Option<FetchRequest> {
        let target = self.navigation().last_target?;
        self.go_to_page(target)
    }

    pub fn set_per_page(&mut self, per_page: u32) -> Result<Option<FetchRequest>, QueryError> {
        let next = self.query.with_per_page(per_page)?;
        Ok(self.transition(next))
    }

    /// Show or hide a column. Visibility is not part of the outgoing query,
    /// so this only fetches when retrying a failed sync.
    pub fn toggle_column(&mut self, key: &str) -> Result<Option<FetchRequest>, QueryError> {
        let next = self.query.with_column_toggled(&self.columns, key)?;
        Ok(self.transition(next))
    }

    // =========================================================================
    // Local narrowing
    // =========================================================================

    pub fn set_local_filter(&mut self, term: impl Into<String>) {
        self.filter.term = term.into();
    }

    /// Restrict the local filter to one column, or search all searchable
    /// columns with `None`.
    pub fn set_local_filter_column(&mut self, column: Option<&str>) -> Result<(), QueryError> {
        self.filter.column = match column {
            None => None,
            Some(key) => Some(
                self.columns
                    .get(key)
                    .map(|column| column.key.clone())
                    .ok_or_else(|| QueryError::UnknownColumn(key.to_string()))?,
            ),
        };
        Ok(())
    }

    pub fn local_filter(&self) -> &LocalFilter {
        &self.filter
    }

    // =========================================================================
    // Sync
    // =========================================================================

    /// Feed back the answer to a fetch. An applied page prunes edit state
    /// for rows that are no longer shown.
    pub fn receive_page(
        &mut self,
        seq: RequestSeq,
        result: Result<PageResponse, SourceError>,
    ) -> SyncOutcome {
        let outcome = self.sync.receive(seq, result);
        if outcome.is_applied() {
            if let Some(page) = self.sync.page() {
                self.edits.retain_rows(&page.record_ids());
            }
        }
        outcome
    }

    // =========================================================================
    // Row edits
    // =========================================================================

    pub fn begin_edit(&mut self, key: RowKey) -> Result<Option<EditBuffer>, MutationError> {
        let record = key
            .record_id()
            .and_then(|id| self.sync.page().and_then(|page| page.record(id)))
            .ok_or(MutationError::NotOnPage(key))?;
        self.edits.begin_edit(record)
    }

    pub fn update_field(
        &mut self,
        key: RowKey,
        column: &str,
        raw: impl Into<String>,
    ) -> Result<(), MutationError> {
        self.edits.update_field(key, column, raw)
    }

    pub fn commit_edit(&mut self, key: RowKey) -> Result<MutationRequest, MutationError> {
        self.edits.commit_edit(key)
    }

    pub fn cancel_edit(&mut self, key: RowKey) -> Result<EditBuffer, MutationError> {
        self.edits.cancel_edit(key)
    }

    pub fn add_row(&mut self, fields: RawFields) -> Result<MutationRequest, MutationError> {
        self.edits.add_row(fields)
    }

    /// Flag a row on the current page for deletion.
    pub fn delete_row(&mut self, key: RowKey) -> Result<MutationRequest, MutationError> {
        if let Some(id) = key.record_id() {
            let on_page = self.sync.page().is_some_and(|page| page.record(id).is_some());
            if !on_page {
                return Err(MutationError::NotOnPage(key));
            }
        }
        self.edits.delete_row(key)
    }

    /// Resolve a mutation. On success the current query is fetched again,
    /// since the change may move rows across pages.
    pub fn complete_mutation(
        &mut self,
        id: MutationId,
        result: Result<MutationResponse, SourceError>,
    ) -> Result<(MutationOutcome, FetchRequest), MutationError> {
        let outcome = self.edits.complete(id, result)?;
        let refresh = self.sync.request(&self.query);
        debug!(mutation = %id, seq = %refresh.seq, "refreshing after mutation");
        Ok((outcome, refresh))
    }

    pub fn take_rejected_add(&mut self) -> Option<RejectedAdd> {
        self.edits.take_rejected_add()
    }

    // =========================================================================
    // Synchronous drivers
    // =========================================================================

    /// Execute `request` against `source` and apply the result.
    pub fn drive_fetch<S>(&mut self, source: &S, request: FetchRequest) -> SyncOutcome
    where
        S: RecordSource + ?Sized,
    {
        let result = source.fetch(&request.query);
        self.receive_page(request.seq, result)
    }

    /// Execute `request` against `source`, then run the refresh it triggers.
    pub fn drive_mutation<S>(
        &mut self,
        source: &mut S,
        request: MutationRequest,
    ) -> Result<MutationOutcome, MutationError>
    where
        S: RecordSource + ?Sized,
    {
        let result = match &request {
            MutationRequest::Create { fields, .. } => {
                source.create(fields).map(MutationResponse::Created)
            }
            MutationRequest::Update { record, .. } => {
                source.update(record.id, record).map(MutationResponse::Updated)
            }
            MutationRequest::Delete { record_id, .. } => {
                source.delete(*record_id).map(|()| MutationResponse::Deleted)
            }
        };
        let (outcome, refresh) = self.complete_mutation(request.id(), result)?;
        let synced = self.drive_fetch(source, refresh);
        info!(kind = %request.kind(), row = %request.key(), refreshed = synced.is_applied(), "mutation applied");
        Ok(outcome)
    }

    // =========================================================================
    // Derived view
    // =========================================================================

    pub fn rows(&self) -> ComposedView {
        compose(ComposeInput {
            columns: &self.columns,
            query: &self.query,
            records: self.sync.records(),
            edits: &self.edits,
            filter: &self.filter,
            searchable_columns: &self.options.searchable_columns,
            show_provisional_rows: self.options.show_provisional_rows,
        })
    }

    /// Authoritative metadata, or an empty first page before any sync.
    pub fn metadata(&self) -> PageMetadata {
        self.sync
            .metadata()
            .copied()
            .unwrap_or_else(|| PageMetadata::empty(self.query.per_page()))
    }

    pub fn pagination_window(&self) -> Vec<PageItem> {
        let metadata = self.metadata();
        compute_window(
            metadata.current_page,
            metadata.last_page,
            self.options.window_radius,
        )
    }

    pub fn navigation(&self) -> Navigation {
        Navigation::new(&self.metadata())
    }

    pub fn summary(&self) -> PageSummary {
        PageSummary::new(&self.metadata())
    }

    pub fn per_page_options(&self) -> &[u32] {
        &self.options.per_page_options
    }

    /// Records of the last accepted page, unfiltered.
    pub fn records(&self) -> &[Record] {
        self.sync.records()
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn edits(&self) -> &RowEditStore {
        &self.edits
    }

    pub fn is_loading(&self) -> bool {
        self.sync.is_loading()
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.sync.last_error()
    }

    pub fn is_visible(&self, key: &ColumnKey) -> bool {
        self.query.is_visible(key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabsync_model::{Record, RecordId, project_columns};

    fn page(ids: &[u64], current_page: u32, total: u64) -> PageResponse {
        PageResponse {
            records: ids
                .iter()
                .map(|id| Record::new(RecordId::new(*id)).with_field("name", format!("P{id}")))
                .collect(),
            pagination: PageMetadata::for_page(current_page, 10, total),
        }
    }

    fn loaded() -> TableView {
        let mut view = TableView::new(project_columns(), ViewOptions::default()).unwrap();
        let request = view.refresh();
        view.receive_page(request.seq, Ok(page(&[1, 2, 3], 1, 42)));
        view
    }

    #[test]
    fn toggling_a_column_does_not_fetch() {
        let mut view = loaded();
        assert_eq!(view.toggle_column("description").unwrap(), None);
        assert!(!view.rows().headers().contains(&"Description"));
    }

    #[test]
    fn toggling_after_failure_retries() {
        let mut view = loaded();
        let request = view.next_page().expect("page 2 requested");
        view.receive_page(request.seq, Err(SourceError::Network("offline".into())));
        assert!(view.last_error().is_some());
        let retry = view.toggle_column("status").unwrap().expect("retry issued");
        assert_eq!(retry.query.page, 2);
    }

    #[test]
    fn selecting_the_current_page_is_a_no_op() {
        let mut view = loaded();
        assert!(view.go_to_page(1).is_none());
        assert!(view.first_page().is_none());
        assert!(view.prev_page().is_none());
    }

    #[test]
    fn navigation_follows_authoritative_metadata() {
        let mut view = loaded();
        assert_eq!(view.jump_to_page(77).unwrap().query.page, 5);
        // Already requested; the last-page control has nothing new to ask.
        assert!(view.last_page().is_none());
        assert_eq!(view.summary().to_string(), "Showing 1 - 10 of 42 results");
    }

    #[test]
    fn editing_requires_the_row_on_the_page() {
        let mut view = loaded();
        let missing = RowKey::Persisted(RecordId::new(99));
        assert_eq!(view.begin_edit(missing), Err(MutationError::NotOnPage(missing)));
        assert!(view.begin_edit(RowKey::Persisted(RecordId::new(2))).unwrap().is_none());
    }

    #[test]
    fn deleting_requires_the_row_on_the_page() {
        let mut view = loaded();
        let missing = RowKey::Persisted(RecordId::new(99));
        assert_eq!(view.delete_row(missing), Err(MutationError::NotOnPage(missing)));
        assert_eq!(view.edits().pending_count(), 0);
        assert_eq!(
            view.delete_row(RowKey::Provisional(1)),
            Err(MutationError::ProvisionalRow(RowKey::Provisional(1)))
        );
        assert!(view.delete_row(RowKey::Persisted(RecordId::new(3))).is_ok());
    }

    #[test]
    fn successful_mutation_requests_a_refresh() {
        let mut view = loaded();
        let key = RowKey::Persisted(RecordId::new(2));
        let request = view.delete_row(key).unwrap();
        let (outcome, refresh) = view
            .complete_mutation(request.id(), Ok(MutationResponse::Deleted))
            .unwrap();
        assert_eq!(outcome, MutationOutcome::Deleted { key });
        assert_eq!(refresh.query, view.query().to_fetch_query());
        assert!(view.is_loading());
    }

    #[test]
    fn local_filter_column_must_exist() {
        let mut view = loaded();
        assert!(view.set_local_filter_column(Some("name")).is_ok());
        assert_eq!(
            view.set_local_filter_column(Some("budget")),
            Err(QueryError::UnknownColumn("budget".into()))
        );
        view.set_local_filter("p2");
        assert_eq!(view.rows().rows.len(), 1);
    }
}
