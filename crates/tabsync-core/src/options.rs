use serde::{Deserialize, Serialize};

use tabsync_model::{DEFAULT_PER_PAGE, DEFAULT_SEARCHABLE_COLUMNS};

/// Page-size choices offered by the rows-per-page selector.
pub const PER_PAGE_OPTIONS: [u32; 4] = [5, 10, 20, 50];

/// Pages shown on each side of the current page in the pagination bar.
pub const DEFAULT_WINDOW_RADIUS: u32 = 2;

/// Tunables of a table view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub default_per_page: u32,
    pub per_page_options: Vec<u32>,
    pub window_radius: u32,
    /// Columns the local narrowing search looks at.
    pub searchable_columns: Vec<String>,
    /// Show rows created locally while the source has not confirmed them.
    pub show_provisional_rows: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            default_per_page: DEFAULT_PER_PAGE,
            per_page_options: PER_PAGE_OPTIONS.to_vec(),
            window_radius: DEFAULT_WINDOW_RADIUS,
            searchable_columns: DEFAULT_SEARCHABLE_COLUMNS
                .iter()
                .map(|key| (*key).to_string())
                .collect(),
            show_provisional_rows: true,
        }
    }
}

impl ViewOptions {
    #[must_use]
    pub fn with_default_per_page(mut self, per_page: u32) -> Self {
        self.default_per_page = per_page;
        self
    }

    #[must_use]
    pub fn with_window_radius(mut self, radius: u32) -> Self {
        self.window_radius = radius;
        self
    }

    #[must_use]
    pub fn with_searchable_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_provisional_rows(mut self, show: bool) -> Self {
        self.show_provisional_rows = show;
        self
    }
}
