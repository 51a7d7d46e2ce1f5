//! CLI command implementations

pub mod check;
pub mod generate;
pub mod init;
pub mod run;
pub mod schema;

use std::path::Path;

use crate::cli::error::CliError;
use crate::warehouse::config::WarehouseConfig;

/// Load `.warehouse.toml` from `workspace`, falling back to defaults
pub(crate) fn load_config(workspace: &Path) -> Result<WarehouseConfig, CliError> {
    WarehouseConfig::load(workspace).map_err(CliError::from)
}
