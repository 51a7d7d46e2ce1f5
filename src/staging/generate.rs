//! Synthetic source extracts
//!
//! Writes `products.csv`, `customers.csv` and `sales.csv` carrying the same
//! defects real extracts carry: blank names, unknown or oddly cased
//! categories, negative and non-numeric prices, malformed emails, conflicting
//! customer rows, missing ids, non-positive quantities and mixed date
//! layouts. The first rows of each file carry one defect kind each, so every
//! cleansing rule has something to catch even in a small sample. Output
//! depends only on [`GenerateOptions`], seed included.

use std::fs::OpenOptions;
use std::path::Path;

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{StagingError, StagingResult};
use super::ingest::{CustomerRecord, IngestStats, ProductRecord, SaleRecord, read_sales_csv};
use crate::validation::input::parse_transaction_date;
use crate::warehouse::config::StagingSection;

static RE_TRANSACTION_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^T(\d+)$").expect("Invalid regex"));

/// Category text no cleansing rule recognises
pub const UNKNOWN_CATEGORIES: &[&str] = &["Toys", "Garden", "misc"];

pub const COUNTRIES: &[&str] = &["United States", "Canada", "Germany", "France", "Romania", ""];

const PRODUCT_NAMES: &[(&str, &[&str])] = &[
    (
        "Electronics",
        &[
            "Wireless Mouse",
            "Bluetooth Speaker",
            "USB Keyboard",
            "Wireless Headphones",
            "Portable Charger",
            "Smartwatch",
            "LED Monitor",
        ],
    ),
    (
        "Clothing",
        &[
            "Cotton T-Shirt",
            "Running Shoes",
            "Leather Jacket",
            "Wool Sweater",
            "Raincoat",
            "Denim Jeans",
        ],
    ),
    (
        "Books",
        &[
            "Paperback Book",
            "Science Fiction Novel",
            "History Book",
            "Cookbook",
            "Programming Guide",
        ],
    ),
    (
        "Home",
        &[
            "Ceramic Mug",
            "Non-stick Pan",
            "Vacuum Cleaner",
            "Table Lamp",
            "Throw Pillow",
        ],
    ),
    (
        "Sports",
        &[
            "Yoga Mat",
            "Basketball",
            "Tennis Racket",
            "Hiking Backpack",
            "Jump Rope",
        ],
    ),
];

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bogdan", "Chloe", "David", "Elena", "Farid", "Greta", "Hugo", "Ines", "Jonas", "Keiko",
    "Luca", "Maya", "Noah", "Olga", "Pavel",
];

const LAST_NAMES: &[&str] = &[
    "Popescu", "Schmidt", "Martin", "Smith", "Tremblay", "Ionescu", "Weber", "Dubois", "Brown",
    "Roy", "Novak", "Garcia",
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "mail.example.org", "shop.example.net"];

/// Sales dates are drawn from this many days after [`first_sale_date`]
const SALES_DAY_SPAN: u64 = 700;

fn first_sale_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProductDefect {
    MissingName,
    UnknownCategory,
    NegativePrice,
    NonNumericPrice,
}

const PRODUCT_DEFECTS: &[ProductDefect] = &[
    ProductDefect::MissingName,
    ProductDefect::UnknownCategory,
    ProductDefect::NegativePrice,
    ProductDefect::NonNumericPrice,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CustomerDefect {
    MissingName,
    InvalidEmail,
    ConflictingDuplicate,
}

const CUSTOMER_DEFECTS: &[CustomerDefect] = &[
    CustomerDefect::MissingName,
    CustomerDefect::InvalidEmail,
    CustomerDefect::ConflictingDuplicate,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaleDefect {
    MissingProductId,
    MissingCustomerId,
    ZeroQuantity,
    NegativeQuantity,
    FractionalQuantity,
    InvalidDate,
    SlashDate,
    MonthNameDate,
    UnknownProduct,
    UnknownCustomer,
}

const SALE_DEFECTS: &[SaleDefect] = &[
    SaleDefect::MissingProductId,
    SaleDefect::MissingCustomerId,
    SaleDefect::ZeroQuantity,
    SaleDefect::NegativeQuantity,
    SaleDefect::FractionalQuantity,
    SaleDefect::InvalidDate,
    SaleDefect::SlashDate,
    SaleDefect::MonthNameDate,
    SaleDefect::UnknownProduct,
    SaleDefect::UnknownCustomer,
];

/// Sizes and seed of a generated data set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub products: usize,
    pub customers: usize,
    pub sales: usize,
    pub seed: u64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            products: 150,
            customers: 600,
            sales: 1500,
            seed: 42,
        }
    }
}

/// Rows written per file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSummary {
    pub products: usize,
    pub customers: usize,
    pub sales: usize,
}

/// Seeded generator of source records
pub struct SourceGenerator {
    options: GenerateOptions,
    rng: ChaCha8Rng,
}

impl SourceGenerator {
    pub fn new(options: GenerateOptions) -> Self {
        Self {
            options,
            rng: ChaCha8Rng::seed_from_u64(options.seed),
        }
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn product_id(&mut self) -> String {
        format!("P{:04}", self.rng.gen_range(1..=self.options.products.max(1)))
    }

    fn customer_id(&mut self) -> String {
        format!("C{:04}", self.rng.gen_range(1..=self.options.customers.max(1)))
    }

    fn person(&mut self) -> (String, String) {
        let first = self.pick(FIRST_NAMES);
        let last = self.pick(LAST_NAMES);
        (first.to_string(), last.to_string())
    }

    fn sale_date(&mut self) -> NaiveDate {
        first_sale_date() + Days::new(self.rng.gen_range(0..=SALES_DAY_SPAN))
    }

    pub fn products(&mut self) -> Vec<ProductRecord> {
        (1..=self.options.products)
            .map(|i| {
                let defect = PRODUCT_DEFECTS.get(i - 1).copied();

                let category_index = self.rng.gen_range(0..PRODUCT_NAMES.len());
                let (canonical, names) = PRODUCT_NAMES[category_index];
                let mut product_name = self.pick(names).to_string();
                let mut category = canonical.to_string();
                // 5.00 to 500.00
                let mut price = rust_decimal::Decimal::new(self.rng.gen_range(500..=50_000), 2)
                    .to_string();

                match defect {
                    Some(ProductDefect::MissingName) => product_name.clear(),
                    Some(ProductDefect::UnknownCategory) => {
                        category = self.pick(UNKNOWN_CATEGORIES).to_string()
                    }
                    Some(ProductDefect::NegativePrice) => price = format!("-{}", price),
                    Some(ProductDefect::NonNumericPrice) => price = "N/A".to_string(),
                    None => {
                        if self.rng.gen_bool(0.08) {
                            product_name.clear();
                        }
                        if self.rng.gen_bool(0.03) {
                            category = self.pick(UNKNOWN_CATEGORIES).to_string();
                        } else if self.rng.gen_bool(0.20) {
                            category = match self.rng.gen_range(0..3) {
                                0 => category.to_lowercase(),
                                1 => category.to_uppercase(),
                                _ => format!(" {} ", category),
                            };
                        }
                        if self.rng.gen_bool(0.05) {
                            price = format!("-{}", price);
                        } else if self.rng.gen_bool(0.05) {
                            price = "N/A".to_string();
                        }
                    }
                }

                ProductRecord {
                    product_id: format!("P{:04}", i),
                    product_name,
                    category,
                    price,
                }
            })
            .collect()
    }

    pub fn customers(&mut self) -> Vec<CustomerRecord> {
        let mut rows = Vec::with_capacity(self.options.customers);

        for i in 1..=self.options.customers {
            let defect = CUSTOMER_DEFECTS.get(i - 1).copied();
            let customer_id = format!("C{:04}", i);
            let (first, last) = self.person();
            let domain = self.pick(EMAIL_DOMAINS);
            let mut name = format!("{} {}", first, last);
            let mut email = format!(
                "{}.{}{}@{}",
                first.to_lowercase(),
                last.to_lowercase(),
                i,
                domain
            );
            let country = self.pick(COUNTRIES).to_string();

            let duplicate = match defect {
                Some(CustomerDefect::MissingName) => {
                    name.clear();
                    false
                }
                Some(CustomerDefect::InvalidEmail) => {
                    email = email.replace('@', "");
                    false
                }
                Some(CustomerDefect::ConflictingDuplicate) => true,
                None => {
                    if self.rng.gen_bool(0.02) {
                        name.clear();
                    }
                    if self.rng.gen_bool(0.05) {
                        email = email.replace('@', "");
                    }
                    self.rng.gen_bool(0.05)
                }
            };

            rows.push(CustomerRecord {
                customer_id: customer_id.clone(),
                name,
                email,
                country: country.clone(),
            });

            if duplicate {
                let (first, last) = self.person();
                rows.push(CustomerRecord {
                    customer_id,
                    name: format!("{} {}", first, last),
                    email: format!("{}.{}@{}", first.to_lowercase(), last.to_lowercase(), domain),
                    country,
                });
            }
        }

        rows
    }

    pub fn sales(&mut self) -> Vec<SaleRecord> {
        (1..=self.options.sales)
            .map(|i| {
                let defect = SALE_DEFECTS.get(i - 1).copied();

                let mut product_id = self.product_id();
                let mut customer_id = self.customer_id();
                let mut quantity = self.rng.gen_range(1..=10i64).to_string();
                let date = self.sale_date();
                let mut transaction_date = date.format("%Y-%m-%d").to_string();

                match defect {
                    Some(SaleDefect::MissingProductId) => product_id.clear(),
                    Some(SaleDefect::MissingCustomerId) => customer_id.clear(),
                    Some(SaleDefect::ZeroQuantity) => quantity = "0".to_string(),
                    Some(SaleDefect::NegativeQuantity) => quantity = format!("-{}", quantity),
                    Some(SaleDefect::FractionalQuantity) => quantity = "2.5".to_string(),
                    Some(SaleDefect::InvalidDate) => transaction_date = "N/A".to_string(),
                    Some(SaleDefect::SlashDate) => {
                        transaction_date = date.format("%Y/%m/%d").to_string()
                    }
                    Some(SaleDefect::MonthNameDate) => {
                        transaction_date = date.format("%b %d %Y").to_string()
                    }
                    Some(SaleDefect::UnknownProduct) => {
                        product_id = format!("P{:04}", self.options.products + 1)
                    }
                    Some(SaleDefect::UnknownCustomer) => {
                        customer_id = format!("C{:04}", self.options.customers + 1)
                    }
                    None => {
                        if self.rng.gen_bool(0.03) {
                            product_id.clear();
                        }
                        if self.rng.gen_bool(0.03) {
                            customer_id.clear();
                        }
                        if self.rng.gen_bool(0.05) {
                            quantity = "0".to_string();
                        } else if self.rng.gen_bool(0.03) {
                            quantity = format!("-{}", quantity);
                        } else if self.rng.gen_bool(0.01) {
                            quantity = "2.5".to_string();
                        }
                        if self.rng.gen_bool(0.05) {
                            transaction_date = date.format("%Y/%m/%d").to_string();
                        } else if self.rng.gen_bool(0.05) {
                            transaction_date = date.format("%b %d %Y").to_string();
                        } else if self.rng.gen_bool(0.01) {
                            transaction_date = "N/A".to_string();
                        }
                    }
                }

                SaleRecord {
                    transaction_id: format!("T{:06}", i),
                    product_id,
                    customer_id,
                    quantity,
                    transaction_date,
                }
            })
            .collect()
    }

    /// `count` clean sales following on from `existing`.
    ///
    /// Transaction numbers continue after the highest `T<number>` id and
    /// dates start the day after the latest parseable date, one day apart.
    pub fn next_sales(&mut self, existing: &[SaleRecord], count: usize) -> Vec<SaleRecord> {
        let last_number = existing
            .iter()
            .filter_map(|s| RE_TRANSACTION_NUMBER.captures(s.transaction_id.trim()))
            .filter_map(|c| c[1].parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        let start = existing
            .iter()
            .filter_map(|s| parse_transaction_date(&s.transaction_date).ok())
            .max()
            .map(|d| d + Days::new(1))
            .unwrap_or_else(first_sale_date);

        (0..count)
            .map(|i| SaleRecord {
                transaction_id: format!("T{:06}", last_number + i as u64 + 1),
                product_id: self.product_id(),
                customer_id: self.customer_id(),
                quantity: self.rng.gen_range(1..=10i64).to_string(),
                transaction_date: (start + Days::new(i as u64)).format("%Y-%m-%d").to_string(),
            })
            .collect()
    }
}

/// Header first, so an empty file still carries its columns
fn write_records<T: Serialize>(path: &Path, columns: &[&str], records: &[T]) -> StagingResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| StagingError::csv(path, e))?;
    writer
        .write_record(columns)
        .map_err(|e| StagingError::csv(path, e))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| StagingError::csv(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write all three source files into `out`, replacing existing ones
pub fn generate_directory(
    out: &Path,
    staging: &StagingSection,
    options: GenerateOptions,
) -> StagingResult<GenerateSummary> {
    std::fs::create_dir_all(out)?;
    let mut generator = SourceGenerator::new(options);

    let products = generator.products();
    let customers = generator.customers();
    let sales = generator.sales();

    write_records(&out.join(&staging.products_file), ProductRecord::COLUMNS, &products)?;
    write_records(&out.join(&staging.customers_file), CustomerRecord::COLUMNS, &customers)?;
    write_records(&out.join(&staging.sales_file), SaleRecord::COLUMNS, &sales)?;

    tracing::info!(
        "Generated {} products, {} customers, {} sales in {} (seed {})",
        products.len(),
        customers.len(),
        sales.len(),
        out.display(),
        options.seed
    );

    Ok(GenerateSummary {
        products: products.len(),
        customers: customers.len(),
        sales: sales.len(),
    })
}

/// Append `count` new sales to the sales file in `out`
pub fn append_sales(
    out: &Path,
    staging: &StagingSection,
    options: GenerateOptions,
    count: usize,
) -> StagingResult<GenerateSummary> {
    let path = out.join(&staging.sales_file);
    if !path.is_file() {
        return Err(StagingError::FileNotFound(path));
    }

    let mut stats = IngestStats::new();
    let existing = read_sales_csv(&path, &mut stats)?;
    let rows = SourceGenerator::new(options).next_sales(&existing, count);

    let file = OpenOptions::new().append(true).open(&path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    for row in &rows {
        writer
            .serialize(row)
            .map_err(|e| StagingError::csv(&path, e))?;
    }
    writer.flush()?;

    if let Some(first) = rows.first() {
        tracing::info!(
            "Appended {} sales to {} starting from {}",
            rows.len(),
            path.display(),
            first.transaction_date
        );
    }

    Ok(GenerateSummary {
        sales: rows.len(),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictPolicy, RejectReason};
    use crate::staging::stage_directory;
    use crate::warehouse::Warehouse;
    use tempfile::TempDir;

    fn small() -> GenerateOptions {
        GenerateOptions {
            products: 20,
            customers: 25,
            sales: 60,
            seed: 7,
        }
    }

    #[test]
    fn test_same_seed_same_records() {
        let a = SourceGenerator::new(small()).sales();
        let b = SourceGenerator::new(small()).sales();
        assert_eq!(a, b);

        let c = SourceGenerator::new(GenerateOptions { seed: 8, ..small() }).sales();
        assert_ne!(a, c);
    }

    #[test]
    fn test_first_rows_carry_each_defect() {
        let mut generator = SourceGenerator::new(small());

        let products = generator.products();
        assert_eq!(products.len(), 20);
        assert!(products[0].product_name.is_empty());
        assert!(UNKNOWN_CATEGORIES.contains(&products[1].category.as_str()));
        assert!(products[2].price.starts_with('-'));
        assert_eq!(products[3].price, "N/A");

        let customers = generator.customers();
        assert!(customers.len() >= 26);
        assert!(customers[0].name.is_empty());
        assert!(!customers[1].email.contains('@'));
        assert_eq!(customers[2].customer_id, customers[3].customer_id);
        assert_ne!(customers[2].email, customers[3].email);

        let sales = generator.sales();
        assert!(sales[0].product_id.is_empty());
        assert!(sales[1].customer_id.is_empty());
        assert_eq!(sales[2].quantity, "0");
        assert!(sales[3].quantity.starts_with('-'));
        assert_eq!(sales[4].quantity, "2.5");
        assert_eq!(sales[5].transaction_date, "N/A");
        assert!(sales[6].transaction_date.contains('/'));
        assert_eq!(sales[8].product_id, "P0021");
        assert_eq!(sales[9].customer_id, "C0026");
        assert_eq!(sales[59].transaction_id, "T000060");
    }

    #[test]
    fn test_generated_files_trip_every_cleansing_rule() {
        let dir = TempDir::new().unwrap();
        let staging = StagingSection::default();
        let summary = generate_directory(dir.path(), &staging, small()).unwrap();
        assert_eq!(summary.products, 20);
        assert_eq!(summary.sales, 60);

        let staged = stage_directory(dir.path(), &staging).unwrap();
        let report = &staged.cleanse;
        assert_eq!(staged.ingest.errors_count, 0);

        assert!(report.products.missing_critical > 0);
        assert!(report.products.unknown_category > 0);
        assert!(report.products.negative_price > 0);
        assert!(report.products.invalid_price > 0);

        assert!(report.customers.missing_critical > 0);
        assert!(report.customers.invalid_email > 0);

        assert!(report.sales.missing_critical > 0);
        assert!(report.sales.non_positive_quantity >= 2);
        assert!(report.sales.invalid_quantity > 0);
        assert!(report.sales.invalid_date > 0);
        assert!(report.rows_dropped() > 0);

        let warehouse = Warehouse::initialized().unwrap();
        let load = warehouse
            .load(&staged.area, ConflictPolicy::default())
            .unwrap();
        assert!(load.customers.conflicts_resolved > 0);

        let reasons = load.rejections_by_reason();
        assert!(reasons.get(&RejectReason::InvalidProductId).copied().unwrap_or(0) > 0);
        assert!(reasons.get(&RejectReason::InvalidCustomerId).copied().unwrap_or(0) > 0);
    }

    #[test]
    fn test_append_continues_ids_and_dates() {
        let dir = TempDir::new().unwrap();
        let staging = StagingSection::default();
        generate_directory(dir.path(), &staging, small()).unwrap();

        let path = dir.path().join(&staging.sales_file);
        let mut stats = IngestStats::new();
        let before = read_sales_csv(&path, &mut stats).unwrap();
        let latest = before
            .iter()
            .filter_map(|s| parse_transaction_date(&s.transaction_date).ok())
            .max()
            .unwrap();

        let summary = append_sales(dir.path(), &staging, small(), 10).unwrap();
        assert_eq!(summary.sales, 10);

        let after = read_sales_csv(&path, &mut stats).unwrap();
        assert_eq!(after.len(), before.len() + 10);
        assert_eq!(after[60].transaction_id, "T000061");
        assert_eq!(after[69].transaction_id, "T000070");
        assert_eq!(
            parse_transaction_date(&after[60].transaction_date).unwrap(),
            latest + Days::new(1)
        );
        assert_eq!(
            parse_transaction_date(&after[69].transaction_date).unwrap(),
            latest + Days::new(10)
        );

        let staged = stage_directory(dir.path(), &staging).unwrap();
        assert_eq!(staged.cleanse.sales.raw_rows, 70);
    }

    #[test]
    fn test_empty_sales_file_keeps_header() {
        let dir = TempDir::new().unwrap();
        let staging = StagingSection::default();
        generate_directory(dir.path(), &staging, GenerateOptions { sales: 0, ..small() }).unwrap();

        let staged = stage_directory(dir.path(), &staging).unwrap();
        assert!(staged.area.sales.is_empty());

        append_sales(dir.path(), &staging, small(), 3).unwrap();
        let staged = stage_directory(dir.path(), &staging).unwrap();
        assert_eq!(staged.area.sales.len(), 3);
        assert_eq!(staged.area.sales[0].transaction_id, "T000001");
        assert_eq!(
            staged.area.sales[0].transaction_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_append_requires_sales_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            append_sales(dir.path(), &StagingSection::default(), small(), 5),
            Err(StagingError::FileNotFound(_))
        ));
    }
}
