//! Warehouse configuration file support
//!
//! Handles parsing of `.warehouse.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{WarehouseError, WarehouseResult};
use crate::models::ConflictPolicy;

/// Default database filename for DuckDB
pub const DEFAULT_DUCKDB_FILENAME: &str = ".warehouse.duckdb";

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".warehouse.toml";

/// Environment variable for the staging data directory
pub const ENV_DATA_DIR: &str = "WAREHOUSE_DATA_DIR";

/// Environment variable for the duplicate natural key policy
pub const ENV_CONFLICT_POLICY: &str = "WAREHOUSE_CONFLICT_POLICY";

/// Environment variable for the warehouse backend
pub const ENV_BACKEND: &str = "WAREHOUSE_BACKEND";

/// Environment variable for DuckDB path
pub const ENV_DUCKDB_PATH: &str = "WAREHOUSE_DUCKDB_PATH";

/// Warehouse backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Native in-memory snapshot store (default)
    #[default]
    Memory,
    /// DuckDB embedded database
    DuckDB,
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(BackendType::Memory),
            "duckdb" => Ok(BackendType::DuckDB),
            _ => Err(format!(
                "Unknown warehouse backend: {}. Use 'memory' or 'duckdb'.",
                s
            )),
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Memory => write!(f, "memory"),
            BackendType::DuckDB => write!(f, "duckdb"),
        }
    }
}

/// Staging source configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingSection {
    /// Directory holding the source files (relative to the workspace)
    pub data_dir: String,
    pub products_file: String,
    pub customers_file: String,
    pub sales_file: String,
}

impl Default for StagingSection {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            products_file: "products.csv".to_string(),
            customers_file: "customers.csv".to_string(),
            sales_file: "sales.csv".to_string(),
        }
    }
}

/// Load configuration section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSection {
    /// How conflicting rows for one natural key are resolved
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

/// Report parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsSection {
    /// Rows returned by the top products report
    pub top_products_limit: usize,
    /// Look-back window of the frequent customers report, in days
    pub frequent_window_days: u64,
    /// A customer must have strictly more purchases than this in the window
    pub frequent_min_purchases: u64,
}

/// Report parameters as passed to [`super::Reports`]
pub type ReportConfig = ReportsSection;

impl Default for ReportsSection {
    fn default() -> Self {
        Self {
            top_products_limit: 10,
            frequent_window_days: 720,
            frequent_min_purchases: 5,
        }
    }
}

/// Database configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Warehouse backend type
    #[serde(default)]
    pub backend: BackendType,

    /// Path to DuckDB database file (relative to workspace)
    #[serde(default = "default_duckdb_path")]
    pub path: String,
}

fn default_duckdb_path() -> String {
    DEFAULT_DUCKDB_FILENAME.to_string()
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            path: default_duckdb_path(),
        }
    }
}

/// Main configuration structure
///
/// Represents the `.warehouse.toml` configuration file format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default)]
    pub staging: StagingSection,

    #[serde(default)]
    pub load: LoadSection,

    #[serde(default)]
    pub reports: ReportsSection,

    #[serde(default)]
    pub database: DatabaseSection,
}

impl WarehouseConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a DuckDB configuration
    pub fn duckdb(path: impl Into<String>) -> Self {
        Self {
            database: DatabaseSection {
                backend: BackendType::DuckDB,
                path: path.into(),
            },
            ..Default::default()
        }
    }

    /// Load configuration from a workspace directory
    ///
    /// Looks for `.warehouse.toml` in the workspace directory.
    /// Falls back to defaults if not found.
    pub fn load(workspace_path: &Path) -> WarehouseResult<Self> {
        let config_path = workspace_path.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| WarehouseError::IoError(format!("Failed to read config: {}", e)))?;

            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> WarehouseResult<Self> {
        toml::from_str(content)
            .map_err(|e| WarehouseError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a workspace directory
    pub fn save(&self, workspace_path: &Path) -> WarehouseResult<()> {
        let config_path = workspace_path.join(CONFIG_FILENAME);
        let content = self.to_toml()?;

        std::fs::write(&config_path, content)
            .map_err(|e| WarehouseError::IoError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> WarehouseResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            WarehouseError::SerializationError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            self.staging.data_dir = dir;
        }

        if let Ok(policy) = std::env::var(ENV_CONFLICT_POLICY) {
            match policy.parse() {
                Ok(policy) => self.load.conflict_policy = policy,
                Err(e) => tracing::warn!("Ignoring {}: {}", ENV_CONFLICT_POLICY, e),
            }
        }

        if let Ok(backend) = std::env::var(ENV_BACKEND)
            && let Ok(backend_type) = backend.parse()
        {
            self.database.backend = backend_type;
        }

        if let Ok(path) = std::env::var(ENV_DUCKDB_PATH) {
            self.database.path = path;
        }
    }

    /// Resolve the staging data directory for a workspace
    pub fn data_dir(&self, workspace_path: &Path) -> PathBuf {
        resolve(workspace_path, &self.staging.data_dir, "")
    }

    /// Get the DuckDB database path for a workspace
    pub fn get_duckdb_path(&self, workspace_path: &Path) -> PathBuf {
        resolve(workspace_path, &self.database.path, DEFAULT_DUCKDB_FILENAME)
    }

    /// Check if configuration exists in a workspace
    pub fn exists(workspace_path: &Path) -> bool {
        workspace_path.join(CONFIG_FILENAME).exists()
    }
}

fn resolve(workspace_path: &Path, configured: &str, fallback: &str) -> PathBuf {
    if configured.is_empty() {
        workspace_path.join(fallback)
    } else if Path::new(configured).is_absolute() {
        PathBuf::from(configured)
    } else {
        workspace_path.join(configured)
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Sales Warehouse Configuration

[staging]
# Directory holding the source extracts (relative to this file, or absolute)
data_dir = "data"
products_file = "products.csv"
customers_file = "customers.csv"
sales_file = "sales.csv"

[load]
# Duplicate natural keys with different attributes:
# "first-seen", "last-seen", "most-complete" (default) or "reject"
conflict_policy = "most-complete"

[reports]
top_products_limit = 10
# Customers with more than `frequent_min_purchases` purchases
# in the last `frequent_window_days` days
frequent_window_days = 720
frequent_min_purchases = 5

[database]
# Warehouse backend: "memory" (default) or "duckdb"
backend = "memory"

# Path to DuckDB database file (used when backend = "duckdb")
path = ".warehouse.duckdb"
"#
}
