//! CSV source ingestion
//!
//! Reads the three source extracts (`products.csv`, `customers.csv`,
//! `sales.csv`) into untyped records. Every field is kept as text; typing
//! and data-quality rules are applied afterwards by the cleanse step.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::{StagingError, StagingResult};
use crate::warehouse::config::StagingSection;

/// Maximum number of row errors kept verbatim in [`IngestStats`]
const MAX_RECORDED_ERRORS: usize = 100;

/// A product row as it appears in the source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub price: String,
}

impl ProductRecord {
    pub const COLUMNS: &'static [&'static str] =
        &["product_id", "product_name", "category", "price"];
}

/// A customer row as it appears in the source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub country: String,
}

impl CustomerRecord {
    pub const COLUMNS: &'static [&'static str] = &["customer_id", "name", "email", "country"];
}

/// A sale row as it appears in the source file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub transaction_id: String,
    pub product_id: String,
    pub customer_id: String,
    pub quantity: String,
    pub transaction_date: String,
}

impl SaleRecord {
    pub const COLUMNS: &'static [&'static str] = &[
        "transaction_id",
        "product_id",
        "customer_id",
        "quantity",
        "transaction_date",
    ];
}

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Number of files read
    pub files_processed: usize,
    /// Number of records read across all files
    pub records_read: usize,
    /// Total bytes read
    pub bytes_processed: u64,
    /// Number of unreadable rows
    pub errors_count: usize,
    /// Unreadable rows (limited to the first 100)
    pub errors: Vec<String>,
    /// Duration of the ingestion
    #[serde(skip)]
    pub duration: Duration,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error (limited to 100)
    pub fn add_error(&mut self, error: String) {
        self.errors_count += 1;
        if self.errors.len() < MAX_RECORDED_ERRORS {
            self.errors.push(error);
        }
    }

    /// Records per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.records_read as f64 / secs
        }
    }
}

/// Untyped contents of the three source files
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    pub products: Vec<ProductRecord>,
    pub customers: Vec<CustomerRecord>,
    pub sales: Vec<SaleRecord>,
}

/// Locations of the three source files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFiles {
    pub products: PathBuf,
    pub customers: PathBuf,
    pub sales: PathBuf,
}

impl SourceFiles {
    /// Resolve the source files inside `data_dir`.
    ///
    /// All three must exist; nothing is read until they do.
    pub fn discover(data_dir: &Path, staging: &StagingSection) -> StagingResult<Self> {
        let files = Self {
            products: data_dir.join(&staging.products_file),
            customers: data_dir.join(&staging.customers_file),
            sales: data_dir.join(&staging.sales_file),
        };

        for path in [&files.products, &files.customers, &files.sales] {
            if !path.is_file() {
                tracing::error!("Required input file not found: {}", path.display());
                return Err(StagingError::FileNotFound(path.clone()));
            }
        }

        Ok(files)
    }

    /// Read all three files
    pub fn read(&self) -> StagingResult<(SourceBatch, IngestStats)> {
        let start = Instant::now();
        let mut stats = IngestStats::new();

        tracing::info!(
            "Reading source files: {}, {}, {}",
            self.products.display(),
            self.customers.display(),
            self.sales.display()
        );

        let batch = SourceBatch {
            products: read_products_csv(&self.products, &mut stats)?,
            customers: read_customers_csv(&self.customers, &mut stats)?,
            sales: read_sales_csv(&self.sales, &mut stats)?,
        };

        stats.duration = start.elapsed();
        tracing::info!(
            "Read {} products, {} customers, {} sales ({} unreadable rows)",
            batch.products.len(),
            batch.customers.len(),
            batch.sales.len(),
            stats.errors_count
        );

        Ok((batch, stats))
    }
}

pub fn read_products_csv(path: &Path, stats: &mut IngestStats) -> StagingResult<Vec<ProductRecord>> {
    read_records(path, ProductRecord::COLUMNS, stats)
}

pub fn read_customers_csv(
    path: &Path,
    stats: &mut IngestStats,
) -> StagingResult<Vec<CustomerRecord>> {
    read_records(path, CustomerRecord::COLUMNS, stats)
}

pub fn read_sales_csv(path: &Path, stats: &mut IngestStats) -> StagingResult<Vec<SaleRecord>> {
    read_records(path, SaleRecord::COLUMNS, stats)
}

/// Read one headed CSV file into records of type `T`.
///
/// Columns are matched by header name, so column order in the file does not
/// matter and extra columns are ignored. A row that cannot be decoded is
/// counted in `stats` and skipped.
pub fn read_records<T: DeserializeOwned>(
    path: &Path,
    required_columns: &[&str],
    stats: &mut IngestStats,
) -> StagingResult<Vec<T>> {
    let file = File::open(path)?;
    let size = fs::metadata(path)?.len();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| StagingError::csv(path, e))?
        .clone();
    for column in required_columns {
        if !headers.iter().any(|h| h == *column) {
            return Err(StagingError::MissingColumn {
                path: path.to_path_buf(),
                column: (*column).to_string(),
            });
        }
    }

    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<T>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                // Header is line 1, first data row is line 2
                stats.add_error(format!("{}:{}: {}", path.display(), index + 2, e));
            }
        }
    }

    stats.files_processed += 1;
    stats.records_read += records.len();
    stats.bytes_processed += size;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_read_products_by_header_name() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "products.csv",
            "price,product_id,category,product_name\n9.99,P0001,Tools,Widget\nN/A,P0002,books,\n",
        );

        let mut stats = IngestStats::new();
        let records: Vec<ProductRecord> =
            read_records(&path, ProductRecord::COLUMNS, &mut stats).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].product_id, "P0001");
        assert_eq!(records[0].price, "9.99");
        assert_eq!(records[1].product_name, "");
        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.records_read, 2);
        assert!(stats.bytes_processed > 0);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "customers.csv",
            "customer_id,name,email\nC0001,Ann,a@x.com\n",
        );

        let mut stats = IngestStats::new();
        let err = read_records::<CustomerRecord>(&path, CustomerRecord::COLUMNS, &mut stats)
            .unwrap_err();
        assert!(matches!(err, StagingError::MissingColumn { ref column, .. } if column == "country"));
    }

    #[test]
    fn test_short_rows_are_counted_and_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "sales.csv",
            "transaction_id,product_id,customer_id,quantity,transaction_date\n\
             T000001,P0001,C0001,3,2024-01-05\n\
             T000002,P0001\n",
        );

        let mut stats = IngestStats::new();
        let records: Vec<SaleRecord> =
            read_records(&path, SaleRecord::COLUMNS, &mut stats).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(stats.errors_count, 1);
        assert!(stats.errors[0].contains(":3:"));
    }

    #[test]
    fn test_discover_requires_all_files() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "products.csv", "product_id,product_name,category,price\n");
        write_file(dir.path(), "customers.csv", "customer_id,name,email,country\n");

        let err = SourceFiles::discover(dir.path(), &StagingSection::default()).unwrap_err();
        assert!(matches!(err, StagingError::FileNotFound(ref p) if p.ends_with("sales.csv")));
    }

    #[test]
    fn test_ingest_stats_error_limit() {
        let mut stats = IngestStats::new();
        for i in 0..150 {
            stats.add_error(format!("row {}", i));
        }
        assert_eq!(stats.errors_count, 150);
        assert_eq!(stats.errors.len(), 100);
    }

    #[test]
    fn test_ingest_stats_throughput() {
        let stats = IngestStats {
            records_read: 1000,
            duration: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(stats.throughput(), 100.0);
        assert_eq!(IngestStats::new().throughput(), 0.0);
    }
}
