//! Error taxonomy shared by the model, the sync core and the hosts.
//!
//! Every error here is local to one interaction. None of them ends the
//! session: the host renders `user_message()` and the user retries by
//! repeating the interaction.

use std::fmt;

use thiserror::Error;

use crate::ids::{ColumnKey, MutationId, RecordId, RequestSeq, RowKey};

/// Errors raised while constructing model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid column key: {0:?}")]
    InvalidColumnKey(String),
    #[error("duplicate column key: {0}")]
    DuplicateColumn(ColumnKey),
    #[error("unknown sort direction: {0:?}")]
    InvalidSortDirection(String),
}

/// Errors reported by a record source.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The request never reached the source or the connection dropped.
    #[error("network error: {0}")]
    Network(String),

    /// The source answered with an error status.
    #[error("record source returned status {code}: {message}")]
    Status {
        /// HTTP-style status code.
        code: u16,
        /// Body or reason phrase.
        message: String,
    },

    /// A submitted field failed typed validation.
    #[error("invalid value for `{field}`: {message}")]
    Validation {
        /// Column key of the offending field.
        field: String,
        /// Why the value was refused.
        message: String,
    },

    /// The record no longer exists.
    #[error("record {0} not found")]
    NotFound(RecordId),

    /// I/O error in a file-backed source.
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed JSON payload.
    #[error("JSON parse error: {0}")]
    Json(String),
}

impl SourceError {
    /// Whether repeating the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Io(_) => true,
            Self::Status { code, .. } => *code >= 500 || *code == 429,
            Self::Validation { .. } | Self::NotFound(_) | Self::Json(_) => false,
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

impl From<std::io::Error> for SourceError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Errors raised by query state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("column `{0}` is not sortable")]
    NotSortable(ColumnKey),
    #[error("rows per page must be greater than zero")]
    InvalidPerPage,
}

/// A page fetch that could not be applied.
///
/// The last good page stays on screen; the next query transition retries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("page request {seq} failed: {source}")]
    Fetch {
        seq: RequestSeq,
        #[source]
        source: SourceError,
    },

    #[error("page response {seq} has malformed pagination: {reason}")]
    MalformedPagination {
        seq: RequestSeq,
        #[source]
        reason: PaginationError,
    },
}

impl SyncError {
    #[must_use]
    pub fn seq(&self) -> RequestSeq {
        match self {
            Self::Fetch { seq, .. } | Self::MalformedPagination { seq, .. } => *seq,
        }
    }

    /// Returns a user-friendly error message suitable for display in the UI.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Fetch {
                source: SourceError::Network(_),
                ..
            } => "Could not reach the server. Showing the last loaded page.",
            Self::Fetch { .. } => "Could not load this page. Showing the last loaded page.",
            Self::MalformedPagination { .. } => {
                "The server sent an unreadable page. Showing the last loaded page."
            }
        }
    }

    /// Sync failures are always retried by the next query transition.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// Pagination metadata that cannot be clamped into shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("per_page is 0")]
    ZeroPerPage,
}

/// Kind of a row mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// A row operation that was refused locally or failed at the source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error("row {0} is not being edited")]
    NotEditing(RowKey),

    #[error("row {0} is not on the current page")]
    NotOnPage(RowKey),

    #[error("row {0} already has a pending change")]
    RowBusy(RowKey),

    #[error("row {0} is pending deletion")]
    PendingDelete(RowKey),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("row {0} has not been saved yet")]
    ProvisionalRow(RowKey),

    #[error("no pending change {0}")]
    UnknownMutation(MutationId),

    #[error("{kind} of row {key} failed: {source}")]
    Rejected {
        key: RowKey,
        kind: MutationKind,
        #[source]
        source: SourceError,
    },
}

impl MutationError {
    /// Returns a user-friendly error message suitable for display in the UI.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected {
                source: SourceError::Validation { field, message },
                ..
            } => format!("{field}: {message}"),
            Self::Rejected {
                kind: MutationKind::Create,
                ..
            } => "Could not add the row. Your input was kept.".to_string(),
            Self::Rejected {
                kind: MutationKind::Update,
                ..
            } => "Could not save the row. Your changes were kept.".to_string(),
            Self::Rejected {
                kind: MutationKind::Delete,
                ..
            } => "Could not delete the row.".to_string(),
            Self::RowBusy(_) => "This row is still being saved.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether resubmitting the same intent may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected { source, .. } => source.is_retryable(),
            Self::RowBusy(_) => true,
            _ => false,
        }
    }
}

/// Authoritative pagination that contradicts its own invariants.
///
/// These are clamped, logged and reported; they never fail a sync.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("current page {reported} outside 1..={last_page}")]
    PageOutOfRange { reported: u32, last_page: u32 },

    #[error("last page reported as 0")]
    LastPageZero,

    #[error("page {page} starts past the {total} available records")]
    PageBeyondTotal { page: u32, total: u64 },

    #[error("page holds {records} records but per_page is {per_page}")]
    OversizedPage { records: usize, per_page: u32 },
}

/// Umbrella error for hosts that want a single `?` target.
#[derive(Debug, Error)]
pub enum TabsyncError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Mutation(#[from] MutationError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

pub type Result<T> = std::result::Result<T, TabsyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        let busy = SourceError::Status {
            code: 503,
            message: "busy".into(),
        };
        let bad = SourceError::Status {
            code: 422,
            message: "bad".into(),
        };
        assert!(busy.is_retryable());
        assert!(!bad.is_retryable());
    }

    #[test]
    fn validation_failure_names_the_field() {
        let error = MutationError::Rejected {
            key: RowKey::Persisted(RecordId::new(3)),
            kind: MutationKind::Update,
            source: SourceError::Validation {
                field: "due_date".into(),
                message: "expected a date".into(),
            },
        };
        assert_eq!(error.user_message(), "due_date: expected a date");
        assert!(!error.is_retryable());
    }
}
