use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info, info_span, warn};

use tabsync_cli::config::CliConfig;
use tabsync_cli::file_source::FileSource;
use tabsync_cli::logging::redact_value;
use tabsync_cli::render::{columns_table, footer, page_table, pagination_line, record_table};
use tabsync_core::{FetchRequest, MemorySource, MutationOutcome, SyncOutcome, TableView};
use tabsync_model::{
    CollectionKind, MutationError, PageResponse, RawFields, RecordId, RowKey, SortDirection,
};

use crate::cli::{AddArgs, DeleteArgs, EditArgs, ListArgs};

/// A table view wired to the data file.
struct Session {
    view: TableView,
    source: FileSource,
}

impl Session {
    fn open(data: &Path, collection: CollectionKind, config: &CliConfig) -> Result<Self> {
        let columns = collection.columns();
        let mut memory = MemorySource::new(columns.clone())
            .with_searchable_columns(config.view.searchable_columns.clone());
        if let Some(author) = &config.author {
            memory = memory.with_author(author.clone());
        }
        let source = FileSource::open(data, memory)
            .with_context(|| format!("open data file {}", data.display()))?;
        let view = TableView::new(columns, config.view.clone()).context("build table view")?;
        Ok(Self { view, source })
    }

    /// Run `request` if there is one; a failed sync ends the command.
    fn sync(&mut self, request: Option<FetchRequest>) -> Result<()> {
        let Some(request) = request else {
            return Ok(());
        };
        match self.view.drive_fetch(&self.source, request) {
            SyncOutcome::Applied { violations, .. } => {
                if !violations.is_empty() {
                    warn!(count = violations.len(), "page metadata was clamped");
                }
                Ok(())
            }
            SyncOutcome::Stale { seq } => {
                debug!(%seq, "response superseded");
                Ok(())
            }
            SyncOutcome::Failed(error) => {
                let message = error.user_message().to_string();
                Err(anyhow::Error::new(error).context(message))
            }
        }
    }

    /// Page through the collection until `id` is on the current page.
    fn locate(&mut self, id: RecordId) -> Result<RowKey> {
        let largest = self.view.per_page_options().iter().copied().max();
        let request = match largest {
            Some(per_page) => self.view.set_per_page(per_page)?,
            None => None,
        };
        let request = request.unwrap_or_else(|| self.view.refresh());
        self.sync(Some(request))?;
        loop {
            if self.view.records().iter().any(|record| record.id == id) {
                return Ok(RowKey::Persisted(id));
            }
            match self.view.next_page() {
                Some(request) => self.sync(Some(request))?,
                None => bail!("record {id} not found"),
            }
        }
    }
}

fn mutation_error(error: MutationError) -> anyhow::Error {
    let message = error.user_message();
    anyhow::Error::new(error).context(message)
}

fn fields_from(assignments: &[(String, String)]) -> RawFields {
    let mut fields = RawFields::new();
    for (column, raw) in assignments {
        debug!(%column, value = redact_value(raw), "field set");
        fields.insert(column.clone(), raw.clone());
    }
    fields
}

pub fn run_list(
    data: &Path,
    collection: CollectionKind,
    config: &CliConfig,
    args: &ListArgs,
) -> Result<()> {
    let span = info_span!("list", collection = %collection);
    let _guard = span.enter();
    let mut session = Session::open(data, collection, config)?;
    let view = &mut session.view;

    // Later transitions supersede earlier requests; only the last one runs.
    let mut latest = Some(view.refresh());
    if let Some(per_page) = args.per_page {
        latest = view.set_per_page(per_page)?.or(latest);
    }
    if let Some(search) = &args.search {
        latest = view.search(search.as_str()).or(latest);
    }
    if let Some(field) = &args.sort {
        latest = view.sort_by(field)?.or(latest);
        if args.direction == Some(SortDirection::Desc) {
            latest = view.sort_by(field)?.or(latest);
        }
    }
    session.sync(latest)?;

    if args.page > 1 {
        let request = session.view.jump_to_page(args.page);
        session.sync(request)?;
    }
    for column in &args.hide {
        let request = session.view.toggle_column(column)?;
        session.sync(request)?;
    }
    if let Some(filter) = &args.filter {
        session.view.set_local_filter(filter.as_str());
        session
            .view
            .set_local_filter_column(args.filter_column.as_deref())?;
    }

    let view = &session.view;
    if args.json {
        let page = PageResponse {
            records: view.records().to_vec(),
            pagination: view.metadata(),
        };
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!("{}", collection.display_name());
    if view.rows().rows.is_empty() {
        println!("No records found.");
    } else {
        println!("{}", page_table(view));
    }
    println!("{}", pagination_line(view));
    println!("{}", footer(view));
    Ok(())
}

pub fn run_add(
    data: &Path,
    collection: CollectionKind,
    config: &CliConfig,
    args: &AddArgs,
) -> Result<()> {
    let span = info_span!("add", collection = %collection);
    let _guard = span.enter();
    let mut session = Session::open(data, collection, config)?;

    let request = session
        .view
        .add_row(fields_from(&args.fields))
        .map_err(mutation_error)?;
    match session.view.drive_mutation(&mut session.source, request) {
        Ok(MutationOutcome::Created { record, .. }) => {
            info!(id = %record.id, "record added");
            println!("{}", record_table(session.view.columns(), &record));
            Ok(())
        }
        Ok(other) => Err(anyhow!("unexpected outcome for add: {other:?}")),
        Err(error) => {
            if let Some(rejected) = session.view.take_rejected_add() {
                debug!(columns = ?rejected.fields.keys().collect::<Vec<_>>(), "add rejected");
            }
            Err(mutation_error(error))
        }
    }
}

pub fn run_edit(
    data: &Path,
    collection: CollectionKind,
    config: &CliConfig,
    args: &EditArgs,
) -> Result<()> {
    let id = RecordId::new(args.id);
    let span = info_span!("edit", collection = %collection, %id);
    let _guard = span.enter();
    let mut session = Session::open(data, collection, config)?;
    let key = session.locate(id)?;

    session.view.begin_edit(key).map_err(mutation_error)?;
    for (column, raw) in fields_from(&args.fields) {
        session
            .view
            .update_field(key, &column, raw)
            .map_err(mutation_error)?;
    }
    let request = session.view.commit_edit(key).map_err(mutation_error)?;
    let outcome = session
        .view
        .drive_mutation(&mut session.source, request)
        .map_err(mutation_error)?;

    let record = match outcome {
        MutationOutcome::Updated {
            record: Some(record),
            ..
        } => record,
        _ => session
            .source
            .records()
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("record {id} vanished after saving"))?,
    };
    info!("record updated");
    println!("{}", record_table(session.view.columns(), &record));
    Ok(())
}

pub fn run_delete(
    data: &Path,
    collection: CollectionKind,
    config: &CliConfig,
    args: &DeleteArgs,
) -> Result<()> {
    let id = RecordId::new(args.id);
    let span = info_span!("delete", collection = %collection, %id);
    let _guard = span.enter();
    let mut session = Session::open(data, collection, config)?;
    let key = session.locate(id)?;

    let request = session.view.delete_row(key).map_err(mutation_error)?;
    session
        .view
        .drive_mutation(&mut session.source, request)
        .map_err(mutation_error)?;
    info!("record deleted");
    println!("Deleted record {id}. {}", session.view.summary());
    Ok(())
}

pub fn run_columns(collection: CollectionKind, config: &CliConfig) -> Result<()> {
    println!("{}", collection.display_name());
    println!("{}", columns_table(&collection.columns(), &config.view));
    Ok(())
}
