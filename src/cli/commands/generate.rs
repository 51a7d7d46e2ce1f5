//! `generate` command: write sample source files

use std::path::PathBuf;

use super::load_config;
use crate::cli::error::CliError;
use crate::staging::{GenerateOptions, append_sales, generate_directory};

/// Sales appended by `--append` when `--sales` is not given
pub const DEFAULT_APPEND_SALES: usize = 10;

/// Generate command arguments
#[derive(Debug, Clone)]
pub struct GenerateArgs {
    /// Workspace holding `.warehouse.toml`
    pub workspace: PathBuf,
    /// Output directory; defaults to `[staging] data_dir`
    pub out: Option<PathBuf>,
    pub products: usize,
    pub customers: usize,
    /// Sales to write, or to append with `append`
    pub sales: Option<usize>,
    pub seed: u64,
    /// Add sales to an existing sales file instead of writing all three files
    pub append: bool,
}

pub fn handle_generate(args: &GenerateArgs) -> Result<(), CliError> {
    let config = load_config(&args.workspace)?;
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| config.data_dir(&args.workspace));

    let options = GenerateOptions {
        products: args.products,
        customers: args.customers,
        sales: args
            .sales
            .unwrap_or(GenerateOptions::default().sales),
        seed: args.seed,
    };
    if options.products == 0 || options.customers == 0 {
        return Err(CliError::InvalidArgument(
            "--products and --customers must be at least 1".to_string(),
        ));
    }

    if args.append {
        let count = args.sales.unwrap_or(DEFAULT_APPEND_SALES);
        let summary = append_sales(&out, &config.staging, options, count)?;
        println!(
            "Appended {} sales to {}",
            summary.sales,
            out.join(&config.staging.sales_file).display()
        );
    } else {
        let summary = generate_directory(&out, &config.staging, options)?;
        println!(
            "Wrote {} products, {} customers, {} sales to {}",
            summary.products,
            summary.customers,
            summary.sales,
            out.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::stage_directory;
    use crate::warehouse::config::StagingSection;
    use tempfile::TempDir;

    fn args(dir: &TempDir) -> GenerateArgs {
        GenerateArgs {
            workspace: dir.path().to_path_buf(),
            out: None,
            products: 15,
            customers: 20,
            sales: Some(40),
            seed: 3,
            append: false,
        }
    }

    #[test]
    fn test_generate_then_append() {
        let dir = TempDir::new().unwrap();
        handle_generate(&args(&dir)).unwrap();

        let data_dir = dir.path().join("data");
        let staged = stage_directory(&data_dir, &StagingSection::default()).unwrap();
        assert_eq!(staged.cleanse.products.raw_rows, 15);
        assert_eq!(staged.cleanse.sales.raw_rows, 40);

        handle_generate(&GenerateArgs {
            append: true,
            sales: None,
            ..args(&dir)
        })
        .unwrap();
        let staged = stage_directory(&data_dir, &StagingSection::default()).unwrap();
        assert_eq!(staged.cleanse.sales.raw_rows, 40 + DEFAULT_APPEND_SALES);
    }

    #[test]
    fn test_generate_rejects_empty_dimensions() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            handle_generate(&GenerateArgs {
                products: 0,
                ..args(&dir)
            }),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
