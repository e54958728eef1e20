//! Local row edits and the create/update/delete intents they turn into.
//!
//! # Model
//!
//! - At most one row is open for editing. Its buffer holds raw text per
//!   changed column over a snapshot of the record as it was displayed.
//! - Each submitted intent gets a [`MutationId`] and stays pending until
//!   the host reports the source's answer through [`RowEditStore::complete`].
//! - A row has at most one outstanding intent. A second intent for the same
//!   row is rejected with [`MutationError::RowBusy`] instead of racing.
//! - Created rows get a provisional key. Once the source confirms them
//!   they are dropped on the next accepted page, which is authoritative for
//!   whether and where the row shows up.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use tabsync_model::{
    ColumnKey, ColumnSet, MutationError, MutationId, MutationKind, RawFields, Record, RecordId,
    RowKey, SourceError,
};

// =============================================================================
// EDIT BUFFER
// =============================================================================

/// Uncommitted changes to one row.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBuffer {
    key: RowKey,
    base: Record,
    changes: RawFields,
}

impl EditBuffer {
    fn new(base: Record) -> Self {
        Self {
            key: RowKey::Persisted(base.id),
            base,
            changes: RawFields::new(),
        }
    }

    pub fn key(&self) -> RowKey {
        self.key
    }

    /// Record as displayed when editing began.
    pub fn base(&self) -> &Record {
        &self.base
    }

    /// Raw text entered so far, per column.
    pub fn changes(&self) -> &RawFields {
        &self.changes
    }

    pub fn change(&self, column: &str) -> Option<&str> {
        self.changes.get(column).map(String::as_str)
    }

    /// Full record to submit: the snapshot with the changes laid over it.
    pub fn merged(&self) -> Record {
        self.base.overlay(&self.changes)
    }
}

// =============================================================================
// REQUESTS AND OUTCOMES
// =============================================================================

/// A mutation the host must send to the record source.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRequest {
    Create {
        id: MutationId,
        key: RowKey,
        fields: RawFields,
    },
    Update {
        id: MutationId,
        record: Record,
    },
    Delete {
        id: MutationId,
        record_id: RecordId,
    },
}

impl MutationRequest {
    pub fn id(&self) -> MutationId {
        match self {
            Self::Create { id, .. } | Self::Update { id, .. } | Self::Delete { id, .. } => *id,
        }
    }

    pub fn key(&self) -> RowKey {
        match self {
            Self::Create { key, .. } => *key,
            Self::Update { record, .. } => RowKey::Persisted(record.id),
            Self::Delete { record_id, .. } => RowKey::Persisted(*record_id),
        }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Create { .. } => MutationKind::Create,
            Self::Update { .. } => MutationKind::Update,
            Self::Delete { .. } => MutationKind::Delete,
        }
    }
}

/// What the source answered to a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationResponse {
    Created(Record),
    Updated(Record),
    Deleted,
}

/// A confirmed mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Created { provisional: RowKey, record: Record },
    Updated { record: Option<Record>, key: RowKey },
    Deleted { key: RowKey },
}

/// A create the source refused, kept so the form can be filled in again.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedAdd {
    pub key: RowKey,
    pub fields: RawFields,
    pub error: MutationError,
}

/// Lifecycle of a locally created row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionalStatus {
    Pending,
    Confirmed(Option<RecordId>),
}

/// A row created locally and not yet part of an accepted page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalRow {
    pub key: RowKey,
    pub fields: RawFields,
    pub status: ProvisionalStatus,
}

/// How a row should be presented given its local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Clean,
    Editing,
    Saving,
    PendingDelete,
    Provisional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingOp {
    key: RowKey,
    kind: MutationKind,
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug)]
pub struct RowEditStore {
    columns: BTreeSet<ColumnKey>,
    open: Option<EditBuffer>,
    pending: BTreeMap<MutationId, PendingOp>,
    busy: BTreeMap<RowKey, MutationId>,
    provisional: Vec<ProvisionalRow>,
    rejected_adds: Vec<RejectedAdd>,
    next_mutation: u64,
    next_provisional: u64,
}

impl RowEditStore {
    pub fn new(columns: &ColumnSet) -> Self {
        Self {
            columns: columns.keys(),
            open: None,
            pending: BTreeMap::new(),
            busy: BTreeMap::new(),
            provisional: Vec::new(),
            rejected_adds: Vec::new(),
            next_mutation: 1,
            next_provisional: 1,
        }
    }

    /// Open `record` for editing, closing any other open row.
    ///
    /// Returns the buffer that was discarded to make room, if any. Reopening
    /// the row already being edited keeps its buffer; a buffer whose save is
    /// still pending blocks the switch with `RowBusy`.
    pub fn begin_edit(&mut self, record: &Record) -> Result<Option<EditBuffer>, MutationError> {
        let key = RowKey::Persisted(record.id);
        self.ensure_idle(key)?;
        if self.open.as_ref().is_some_and(|buffer| buffer.key == key) {
            return Ok(None);
        }
        // A buffer under save must survive until the source answers.
        if let Some(open) = &self.open {
            if self.busy.contains_key(&open.key) {
                return Err(MutationError::RowBusy(open.key));
            }
        }
        let discarded = self.open.replace(EditBuffer::new(record.clone()));
        if let Some(previous) = &discarded {
            debug!(row = %previous.key, "discarding open edit buffer");
        }
        debug!(row = %key, "edit buffer opened");
        Ok(discarded)
    }

    /// Record raw text for one column of the row being edited.
    pub fn update_field(
        &mut self,
        key: RowKey,
        column: &str,
        raw: impl Into<String>,
    ) -> Result<(), MutationError> {
        if !self.columns.contains(column) {
            return Err(MutationError::UnknownColumn(column.to_string()));
        }
        self.ensure_idle(key)?;
        let buffer = self.open_buffer_mut(key)?;
        buffer.changes.insert(column.to_string(), raw.into());
        Ok(())
    }

    /// Submit the open buffer as an update.
    ///
    /// The buffer stays open until the source confirms the update, so a
    /// failed save loses nothing.
    pub fn commit_edit(&mut self, key: RowKey) -> Result<MutationRequest, MutationError> {
        self.ensure_idle(key)?;
        let record = self.open_buffer_mut(key)?.merged();
        let id = self.track(key, MutationKind::Update);
        debug!(row = %key, mutation = %id, "committing edit");
        Ok(MutationRequest::Update { id, record })
    }

    /// Throw the open buffer away.
    pub fn cancel_edit(&mut self, key: RowKey) -> Result<EditBuffer, MutationError> {
        match self.open.take() {
            Some(buffer) if buffer.key == key => {
                debug!(row = %key, "edit cancelled");
                Ok(buffer)
            }
            other => {
                self.open = other;
                Err(MutationError::NotEditing(key))
            }
        }
    }

    /// Submit a new row.
    pub fn add_row(&mut self, fields: RawFields) -> Result<MutationRequest, MutationError> {
        if let Some(unknown) = fields.keys().find(|key| !self.columns.contains(key.as_str())) {
            return Err(MutationError::UnknownColumn(unknown.clone()));
        }
        let key = RowKey::Provisional(self.next_provisional);
        self.next_provisional += 1;
        self.provisional.push(ProvisionalRow {
            key,
            fields: fields.clone(),
            status: ProvisionalStatus::Pending,
        });
        let id = self.track(key, MutationKind::Create);
        debug!(row = %key, mutation = %id, columns = ?fields.keys().collect::<Vec<_>>(), "adding row");
        Ok(MutationRequest::Create { id, key, fields })
    }

    /// Submit a delete. The row stays visible until the source confirms.
    pub fn delete_row(&mut self, key: RowKey) -> Result<MutationRequest, MutationError> {
        let Some(record_id) = key.record_id() else {
            return Err(MutationError::ProvisionalRow(key));
        };
        self.ensure_idle(key)?;
        if self.open.as_ref().is_some_and(|buffer| buffer.key == key) {
            debug!(row = %key, "delete clears open edit buffer");
            self.open = None;
        }
        let id = self.track(key, MutationKind::Delete);
        debug!(row = %key, mutation = %id, "deleting row");
        Ok(MutationRequest::Delete { id, record_id })
    }

    /// Resolve a pending intent with the source's answer.
    pub fn complete(
        &mut self,
        id: MutationId,
        result: Result<MutationResponse, SourceError>,
    ) -> Result<MutationOutcome, MutationError> {
        let op = self
            .pending
            .remove(&id)
            .ok_or(MutationError::UnknownMutation(id))?;
        self.busy.remove(&op.key);

        let response = match result {
            Ok(response) => response,
            Err(source) => return Err(self.reject(op, source)),
        };
        info!(row = %op.key, mutation = %id, kind = %op.kind, "mutation confirmed");
        match op.kind {
            MutationKind::Create => {
                let record = match response {
                    MutationResponse::Created(record) | MutationResponse::Updated(record) => record,
                    MutationResponse::Deleted => {
                        self.confirm_provisional(op.key, None);
                        return Ok(MutationOutcome::Deleted { key: op.key });
                    }
                };
                self.confirm_provisional(op.key, Some(record.id));
                Ok(MutationOutcome::Created {
                    provisional: op.key,
                    record,
                })
            }
            MutationKind::Update => {
                if self.open.as_ref().is_some_and(|buffer| buffer.key == op.key) {
                    self.open = None;
                }
                let record = match response {
                    MutationResponse::Created(record) | MutationResponse::Updated(record) => {
                        Some(record)
                    }
                    MutationResponse::Deleted => None,
                };
                Ok(MutationOutcome::Updated {
                    record,
                    key: op.key,
                })
            }
            MutationKind::Delete => Ok(MutationOutcome::Deleted { key: op.key }),
        }
    }

    fn reject(&mut self, op: PendingOp, source: SourceError) -> MutationError {
        warn!(row = %op.key, kind = %op.kind, error = %source, "mutation rejected");
        let error = MutationError::Rejected {
            key: op.key,
            kind: op.kind,
            source,
        };
        if op.kind == MutationKind::Create {
            if let Some(index) = self.provisional.iter().position(|row| row.key == op.key) {
                let row = self.provisional.remove(index);
                self.rejected_adds.push(RejectedAdd {
                    key: row.key,
                    fields: row.fields,
                    error: error.clone(),
                });
            }
        }
        error
    }

    /// Reconcile with a freshly accepted page.
    ///
    /// Drops the open buffer when its row left the page (unless a save is in
    /// flight for it) and drops provisional rows the source has confirmed.
    pub fn retain_rows(&mut self, present: &BTreeSet<RecordId>) {
        if let Some(buffer) = &self.open {
            let gone = buffer
                .key
                .record_id()
                .is_some_and(|id| !present.contains(&id));
            if gone && !self.busy.contains_key(&buffer.key) {
                debug!(row = %buffer.key, "row left the page; dropping edit buffer");
                self.open = None;
            }
        }
        self.provisional.retain(|row| {
            let keep = row.status == ProvisionalStatus::Pending;
            if !keep {
                debug!(row = %row.key, status = ?row.status, "provisional row reconciled");
            }
            keep
        });
    }

    fn confirm_provisional(&mut self, key: RowKey, id: Option<RecordId>) {
        if let Some(row) = self.provisional.iter_mut().find(|row| row.key == key) {
            row.status = ProvisionalStatus::Confirmed(id);
        }
    }

    fn track(&mut self, key: RowKey, kind: MutationKind) -> MutationId {
        let id = MutationId::new(self.next_mutation);
        self.next_mutation += 1;
        self.pending.insert(id, PendingOp { key, kind });
        self.busy.insert(key, id);
        id
    }

    fn ensure_idle(&self, key: RowKey) -> Result<(), MutationError> {
        match self.pending_kind(key) {
            None => Ok(()),
            Some(MutationKind::Delete) => Err(MutationError::PendingDelete(key)),
            Some(_) => Err(MutationError::RowBusy(key)),
        }
    }

    fn open_buffer_mut(&mut self, key: RowKey) -> Result<&mut EditBuffer, MutationError> {
        self.open
            .as_mut()
            .filter(|buffer| buffer.key == key)
            .ok_or(MutationError::NotEditing(key))
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn open_buffer(&self) -> Option<&EditBuffer> {
        self.open.as_ref()
    }

    pub fn buffer(&self, key: RowKey) -> Option<&EditBuffer> {
        self.open.as_ref().filter(|buffer| buffer.key == key)
    }

    pub fn is_editing(&self, key: RowKey) -> bool {
        self.buffer(key).is_some()
    }

    /// Kind of the intent outstanding for `key`, if any.
    pub fn pending_kind(&self, key: RowKey) -> Option<MutationKind> {
        let id = self.busy.get(&key)?;
        self.pending.get(id).map(|op| op.kind)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn provisional_rows(&self) -> &[ProvisionalRow] {
        &self.provisional
    }

    /// Oldest refused create, so the host can reopen its form.
    pub fn take_rejected_add(&mut self) -> Option<RejectedAdd> {
        if self.rejected_adds.is_empty() {
            None
        } else {
            Some(self.rejected_adds.remove(0))
        }
    }

    pub fn row_state(&self, key: RowKey) -> RowState {
        match self.pending_kind(key) {
            Some(MutationKind::Delete) => RowState::PendingDelete,
            Some(MutationKind::Update) => RowState::Saving,
            Some(MutationKind::Create) => RowState::Provisional,
            None if self.is_editing(key) => RowState::Editing,
            None if key.is_provisional() => RowState::Provisional,
            None => RowState::Clean,
        }
    }
}
