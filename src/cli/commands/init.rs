//! `init` command: write a sample `.warehouse.toml`

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::warehouse::config::{CONFIG_FILENAME, WarehouseConfig, sample_config};

/// Init command arguments
#[derive(Debug, Clone)]
pub struct InitArgs {
    /// Directory to write the configuration into
    pub dir: PathBuf,
    /// Overwrite an existing configuration file
    pub force: bool,
}

pub fn handle_init(args: &InitArgs) -> Result<(), CliError> {
    if !args.dir.is_dir() {
        return Err(CliError::FileNotFound(args.dir.clone()));
    }

    let path = args.dir.join(CONFIG_FILENAME);
    if WarehouseConfig::exists(&args.dir) && !args.force {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        )));
    }

    std::fs::write(&path, sample_config())
        .map_err(|e| CliError::FileWriteError(path.clone(), e.to_string()))?;

    println!("Wrote {}", path.display());
    Ok(())
}
