//! Record sources the table can be driven against.

mod memory;

pub use memory::MemorySource;

use tabsync_model::{FetchQuery, PageResponse, RawFields, Record, RecordId, SourceError};

/// The authority holding the full collection.
///
/// Fetches are read-only. Mutations return the record as stored so callers
/// see server-side coercion and stamping.
pub trait RecordSource {
    fn fetch(&self, query: &FetchQuery) -> Result<PageResponse, SourceError>;

    fn create(&mut self, fields: &RawFields) -> Result<Record, SourceError>;

    fn update(&mut self, id: RecordId, record: &Record) -> Result<Record, SourceError>;

    fn delete(&mut self, id: RecordId) -> Result<(), SourceError>;
}
