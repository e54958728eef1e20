//! Command-line arguments for `tabsync`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

use tabsync_model::{CollectionKind, SortDirection};

#[derive(Parser)]
#[command(
    name = "tabsync",
    version,
    about = "Browse and edit a paginated collection from the terminal",
    long_about = "Browse and edit a paginated collection stored in a JSON data file.\n\n\
                  Searching, sorting and paging are answered by the data file the same way\n\
                  the admin backend answers them; edits go through the same row edit flow."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON data file holding the collection.
    #[arg(long, value_name = "PATH", default_value = "tabsync.json", global = true)]
    pub data: PathBuf,

    /// Column layout of the collection.
    #[arg(long, value_enum, default_value = "projects", global = true)]
    pub collection: CollectionArg,

    /// TOML file with view options and the author stamped on writes.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Include field values in log events.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show one page of the collection.
    List(ListArgs),

    /// Add a record.
    Add(AddArgs),

    /// Change fields of a record.
    Edit(EditArgs),

    /// Delete a record.
    Delete(DeleteArgs),

    /// Show the column layout.
    Columns,
}

#[derive(Args)]
pub struct ListArgs {
    /// Search text sent to the data source.
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Column to sort by.
    #[arg(long, value_name = "COLUMN")]
    pub sort: Option<String>,

    /// Sort direction (asc, desc, ascending, descending).
    #[arg(long, value_name = "DIRECTION", value_parser = parse_direction, requires = "sort")]
    pub direction: Option<SortDirection>,

    /// Page to show; clamped to the last page.
    #[arg(long, short = 'p', default_value_t = 1)]
    pub page: u32,

    /// Rows per page.
    #[arg(long = "per-page", value_name = "N")]
    pub per_page: Option<u32>,

    /// Hide a column (repeatable).
    #[arg(long, value_name = "COLUMN")]
    pub hide: Vec<String>,

    /// Narrow the fetched page further without asking the source.
    #[arg(long, value_name = "TEXT")]
    pub filter: Option<String>,

    /// Restrict --filter to one column.
    #[arg(long = "filter-column", value_name = "COLUMN", requires = "filter")]
    pub filter_column: Option<String>,

    /// Print the page as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Field value as COLUMN=VALUE (repeatable).
    #[arg(long = "set", value_name = "COLUMN=VALUE", value_parser = parse_assignment, required = true)]
    pub fields: Vec<(String, String)>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Record id.
    pub id: u64,

    /// New field value as COLUMN=VALUE (repeatable).
    #[arg(long = "set", value_name = "COLUMN=VALUE", value_parser = parse_assignment, required = true)]
    pub fields: Vec<(String, String)>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Record id.
    pub id: u64,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CollectionArg {
    Projects,
    Tasks,
}

impl From<CollectionArg> for CollectionKind {
    fn from(arg: CollectionArg) -> Self {
        match arg {
            CollectionArg::Projects => Self::Projects,
            CollectionArg::Tasks => Self::Tasks,
        }
    }
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_direction(value: &str) -> Result<SortDirection, String> {
    value.parse().map_err(|error| format!("{error}"))
}

fn parse_assignment(value: &str) -> Result<(String, String), String> {
    let (column, raw) = value
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=VALUE, got {value:?}"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in {value:?}"));
    }
    Ok((column.to_string(), raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arguments_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignments_split_on_the_first_equals() {
        assert_eq!(
            parse_assignment("description=a=b"),
            Ok(("description".to_string(), "a=b".to_string()))
        );
        assert!(parse_assignment("=x").is_err());
        assert!(parse_assignment("name").is_err());
    }

    #[test]
    fn list_accepts_long_direction_names() {
        let cli = Cli::try_parse_from([
            "tabsync", "list", "--sort", "due_date", "--direction", "descending",
        ])
        .unwrap();
        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.direction, Some(SortDirection::Desc));
    }
}
