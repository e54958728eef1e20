//! Library side of the `tabsync` binary: logging setup, configuration,
//! the JSON file record source and terminal rendering.

pub mod config;
pub mod file_source;
pub mod logging;
pub mod render;
