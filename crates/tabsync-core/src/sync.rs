//! Query-to-page synchronization with last-request-wins ordering.
//!
//! Every issued request carries a sequence number. Only the response to the
//! most recently issued request is applied; anything else that arrives is a
//! leftover of a superseded query and is dropped on arrival. There is no
//! transport-level cancellation.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use tabsync_model::{
    FetchQuery, InvariantViolation, PageMetadata, PageResponse, QueryState, Record, RecordId,
    RequestSeq, SourceError, SyncError,
};

/// A page request the host must execute and answer with [`RemoteQuerySync::receive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub seq: RequestSeq,
    pub query: FetchQuery,
}

/// What happened to a response.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The page replaced the previous one. Violations were clamped.
    Applied {
        seq: RequestSeq,
        violations: Vec<InvariantViolation>,
    },
    /// Response to a superseded or already answered request; ignored.
    Stale { seq: RequestSeq },
    /// The latest request failed; the previous page stays.
    Failed(SyncError),
}

impl SyncOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// The last page accepted from the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedPage {
    pub seq: RequestSeq,
    pub records: Vec<Record>,
    pub metadata: PageMetadata,
}

impl SyncedPage {
    pub fn record_ids(&self) -> BTreeSet<RecordId> {
        self.records.iter().map(|record| record.id).collect()
    }

    pub fn record(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }
}

#[derive(Debug, Default)]
pub struct RemoteQuerySync {
    last_issued: Option<RequestSeq>,
    last_query: Option<FetchQuery>,
    pending: Option<RequestSeq>,
    page: Option<SyncedPage>,
    last_error: Option<SyncError>,
}

impl RemoteQuerySync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a request for `state`, superseding any request in flight.
    pub fn request(&mut self, state: &QueryState) -> FetchRequest {
        let seq = self
            .last_issued
            .map_or(RequestSeq::new(1), RequestSeq::next);
        let query = state.to_fetch_query();
        if let Some(superseded) = self.pending {
            debug!(%superseded, %seq, "superseding page request");
        }
        debug!(
            %seq,
            page = query.page,
            per_page = query.per_page,
            sort_field = query.sort_field.as_deref().unwrap_or(""),
            "issuing page request"
        );
        self.last_issued = Some(seq);
        self.last_query = Some(query.clone());
        self.pending = Some(seq);
        FetchRequest { seq, query }
    }

    /// Issue a request only when the outgoing query differs from the last
    /// one issued, or when the last sync failed and this is the retry.
    pub fn request_if_changed(&mut self, state: &QueryState) -> Option<FetchRequest> {
        let unchanged = self.last_query.as_ref() == Some(&state.to_fetch_query());
        if unchanged && self.last_error.is_none() {
            return None;
        }
        Some(self.request(state))
    }

    /// Apply or discard the answer to request `seq`.
    pub fn receive(
        &mut self,
        seq: RequestSeq,
        result: Result<PageResponse, SourceError>,
    ) -> SyncOutcome {
        if self.pending != Some(seq) {
            debug!(%seq, latest = ?self.last_issued, "discarding stale page response");
            return SyncOutcome::Stale { seq };
        }
        self.pending = None;

        let response = match result {
            Ok(response) => response,
            Err(source) => {
                warn!(%seq, error = %source, "page request failed; keeping last page");
                return self.fail(SyncError::Fetch { seq, source });
            }
        };
        let page = match response.reconcile() {
            Ok(page) => page,
            Err(reason) => {
                warn!(%seq, %reason, "malformed pagination; keeping last page");
                return self.fail(SyncError::MalformedPagination { seq, reason });
            }
        };
        for violation in &page.violations {
            warn!(%seq, %violation, "pagination invariant violated; clamped");
        }
        info!(
            %seq,
            records = page.records.len(),
            current_page = page.metadata.current_page,
            last_page = page.metadata.last_page,
            total = page.metadata.total,
            "page applied"
        );
        self.last_error = None;
        self.page = Some(SyncedPage {
            seq,
            records: page.records,
            metadata: page.metadata,
        });
        SyncOutcome::Applied {
            seq,
            violations: page.violations,
        }
    }

    fn fail(&mut self, error: SyncError) -> SyncOutcome {
        self.last_error = Some(error.clone());
        SyncOutcome::Failed(error)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn page(&self) -> Option<&SyncedPage> {
        self.page.as_ref()
    }

    pub fn records(&self) -> &[Record] {
        self.page
            .as_ref()
            .map_or(&[][..], |page| page.records.as_slice())
    }

    pub fn metadata(&self) -> Option<&PageMetadata> {
        self.page.as_ref().map(|page| &page.metadata)
    }

    pub fn last_error(&self) -> Option<&SyncError> {
        self.last_error.as_ref()
    }

    pub fn latest_seq(&self) -> Option<RequestSeq> {
        self.last_issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabsync_model::{CellValue, PaginationError, project_columns};

    fn page_of(ids: &[u64], current_page: u32, total: u64) -> PageResponse {
        PageResponse {
            records: ids
                .iter()
                .map(|id| Record::new(RecordId::new(*id)).with_field("name", format!("P{id}")))
                .collect(),
            pagination: PageMetadata::for_page(current_page, 10, total),
        }
    }

    fn state() -> QueryState {
        QueryState::new(&project_columns(), 10).unwrap()
    }

    #[test]
    fn slow_earlier_response_cannot_overwrite_newer_one() {
        let mut sync = RemoteQuerySync::new();
        let first = sync.request(&state());
        let second = sync.request(&state().with_page(2));

        let applied = sync.receive(second.seq, Ok(page_of(&[11, 12], 2, 20)));
        assert!(applied.is_applied());
        let late = sync.receive(first.seq, Ok(page_of(&[1, 2], 1, 20)));
        assert_eq!(late, SyncOutcome::Stale { seq: first.seq });

        let page = sync.page().unwrap();
        assert_eq!(page.metadata.current_page, 2);
        assert_eq!(page.records[0].get("name"), &CellValue::text("P11"));
    }

    #[test]
    fn superseded_response_arriving_first_is_dropped() {
        let mut sync = RemoteQuerySync::new();
        let first = sync.request(&state());
        let second = sync.request(&state().with_search("x"));

        assert!(matches!(
            sync.receive(first.seq, Ok(page_of(&[1], 1, 1))),
            SyncOutcome::Stale { .. }
        ));
        assert!(sync.is_loading());
        assert!(sync.page().is_none());
        assert!(sync.receive(second.seq, Ok(page_of(&[5], 1, 1))).is_applied());
        assert!(!sync.is_loading());
    }

    #[test]
    fn failure_keeps_last_good_page_and_retries_on_next_transition() {
        let mut sync = RemoteQuerySync::new();
        let first = sync.request(&state());
        sync.receive(first.seq, Ok(page_of(&[1, 2], 1, 2)));

        let next_state = state().with_page(2);
        let failing = sync.request(&next_state);
        let outcome = sync.receive(failing.seq, Err(SourceError::Network("offline".into())));
        assert!(matches!(outcome, SyncOutcome::Failed(SyncError::Fetch { .. })));
        assert_eq!(sync.records().len(), 2);
        assert!(sync.last_error().is_some());

        // Same query again: retried because the last attempt failed.
        let retry = sync.request_if_changed(&next_state).expect("retry issued");
        sync.receive(retry.seq, Ok(page_of(&[], 1, 2)));
        assert!(sync.last_error().is_none());
        assert!(sync.request_if_changed(&next_state).is_none());
    }

    #[test]
    fn duplicate_response_is_stale() {
        let mut sync = RemoteQuerySync::new();
        let request = sync.request(&state());
        assert!(sync.receive(request.seq, Ok(page_of(&[1], 1, 1))).is_applied());
        assert!(matches!(
            sync.receive(request.seq, Ok(page_of(&[2], 1, 1))),
            SyncOutcome::Stale { .. }
        ));
    }

    #[test]
    fn malformed_pagination_is_a_sync_error() {
        let mut sync = RemoteQuerySync::new();
        let request = sync.request(&state());
        let mut response = page_of(&[1], 1, 1);
        response.pagination.per_page = 0;
        let outcome = sync.receive(request.seq, Ok(response));
        assert!(matches!(
            outcome,
            SyncOutcome::Failed(SyncError::MalformedPagination {
                reason: PaginationError::ZeroPerPage,
                ..
            })
        ));
        assert!(sync.page().is_none());
    }
}
