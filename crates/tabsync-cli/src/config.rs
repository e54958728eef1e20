//! Optional TOML configuration file.
//!
//! ```toml
//! [view]
//! default_per_page = 20
//! window_radius = 1
//! searchable_columns = ["name", "status"]
//!
//! [author]
//! name = "Ada Lovelace"
//! email = "ada@example.com"
//! ```
//!
//! Every key is optional. Command-line flags win over the file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use tabsync_core::ViewOptions;
use tabsync_model::Reference;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub view: ViewOptions,
    /// User stamped into `created_by` / `updated_by` of written records.
    pub author: Option<Reference>,
}

impl CliConfig {
    /// Read `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.view.default_per_page == 0 {
            bail!("view.default_per_page must be greater than zero");
        }
        if self.view.per_page_options.contains(&0) {
            bail!("view.per_page_options may not contain zero");
        }
        Ok(())
    }
}
