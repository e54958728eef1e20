//! JSON data file acting as the record source.
//!
//! The file holds `{"records": [...]}` with each record a flat object. It is
//! read once on open and rewritten after every successful mutation, through
//! a temp file and a rename so a crash never leaves half a file behind. A
//! mutation whose write fails leaves both the file and the loaded
//! collection as they were.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tabsync_core::{MemorySource, RecordSource};
use tabsync_model::{FetchQuery, PageResponse, RawFields, Record, RecordId, SourceError};

#[derive(Debug, Default, Serialize, Deserialize)]
struct DataFile {
    #[serde(alias = "data")]
    records: Vec<Record>,
}

#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    inner: MemorySource,
}

impl FileSource {
    /// Load `path` into `source`. A missing file is an empty collection.
    pub fn open(path: impl Into<PathBuf>, source: MemorySource) -> Result<Self, SourceError> {
        let path = path.into();
        let data = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            serde_json::from_reader::<_, DataFile>(reader)?
        } else {
            debug!(path = %path.display(), "data file missing; starting empty");
            DataFile::default()
        };
        info!(path = %path.display(), records = data.records.len(), "data file loaded");
        Ok(Self {
            path,
            inner: source.with_records(data.records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[Record] {
        self.inner.records()
    }

    /// Run `change` on a copy of the collection and keep the copy only once
    /// it is on disk.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut MemorySource) -> Result<T, SourceError>,
    ) -> Result<T, SourceError> {
        let mut next = self.inner.clone();
        let value = change(&mut next)?;
        self.persist(&next)?;
        self.inner = next;
        Ok(value)
    }

    fn persist(&self, source: &MemorySource) -> Result<(), SourceError> {
        let data = DataFile {
            records: source.records().to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&data)?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;
        debug!(path = %self.path.display(), records = data.records.len(), "data file saved");
        Ok(())
    }
}

impl RecordSource for FileSource {
    fn fetch(&self, query: &FetchQuery) -> Result<PageResponse, SourceError> {
        self.inner.fetch(query)
    }

    fn create(&mut self, fields: &RawFields) -> Result<Record, SourceError> {
        self.commit(|source| source.create(fields))
    }

    fn update(&mut self, id: RecordId, record: &Record) -> Result<Record, SourceError> {
        self.commit(|source| source.update(id, record))
    }

    fn delete(&mut self, id: RecordId) -> Result<(), SourceError> {
        self.commit(|source| source.delete(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabsync_model::project_columns;
    use tempfile::tempdir;

    #[test]
    fn missing_file_starts_empty_and_is_created_on_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.json");
        let mut source = FileSource::open(&path, MemorySource::new(project_columns())).unwrap();
        assert!(source.records().is_empty());

        let mut fields = RawFields::new();
        fields.insert("name".into(), "Apollo".into());
        source.create(&fields).unwrap();

        let reopened = FileSource::open(&path, MemorySource::new(project_columns())).unwrap();
        assert_eq!(reopened.records().len(), 1);
        assert_eq!(reopened.records()[0].get("name").scalar_text(), "Apollo");
    }

    #[test]
    fn data_alias_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(&path, r#"{"data": [{"id": 4, "name": "Comet"}]}"#).unwrap();
        let source = FileSource::open(&path, MemorySource::new(project_columns())).unwrap();
        assert_eq!(source.records()[0].id, RecordId::new(4));
    }

    #[test]
    fn malformed_file_is_a_json_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FileSource::open(&path, MemorySource::new(project_columns())),
            Err(SourceError::Json(_))
        ));
    }

    #[test]
    fn failed_mutation_leaves_the_file_alone() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("projects.json");
        let mut source = FileSource::open(&path, MemorySource::new(project_columns())).unwrap();
        assert!(source.delete(RecordId::new(1)).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_file_leaves_the_collection_unchanged() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let path = blocker.join("projects.json");
        let mut source = FileSource::open(&path, MemorySource::new(project_columns())).unwrap();

        let mut fields = RawFields::new();
        fields.insert("name".into(), "Apollo".into());
        assert!(matches!(source.create(&fields), Err(SourceError::Io(_))));
        assert!(source.records().is_empty());

        let page = source.fetch(&FetchQuery::default()).unwrap();
        assert_eq!(page.pagination.total, 0);
    }
}
