use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::vendor::VendorTable;

/// Web prefix for primary images when an asset root declares none.
pub const DEFAULT_URL_PREFIX: &str = "/images/products";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    /// Image extensions the scanner accepts (case-insensitive, no dot).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub assets: Vec<AssetRootConfig>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub vendors: VendorTable,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "webp"].iter().map(|e| e.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Assets + sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct AssetRootConfig {
    pub root: String,
    /// Vendor every asset under this root belongs to.
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub url_prefix: Option<String>,
}

impl AssetRootConfig {
    pub fn url_prefix(&self) -> &str {
        self.url_prefix
            .as_deref()
            .map(|p| p.trim_end_matches('/'))
            .unwrap_or(DEFAULT_URL_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Json,
    Csv,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub vendor: String,
    pub file: String,
    /// Inferred from the file extension when omitted.
    #[serde(default)]
    pub format: Option<SourceFormat>,
    #[serde(default = "default_true")]
    pub required: bool,
}

impl SourceConfig {
    pub fn format(&self) -> SourceFormat {
        match self.format {
            Some(f) => f,
            None if self.file.to_lowercase().ends_with(".csv") => SourceFormat::Csv,
            None => SourceFormat::Json,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// One curated `filename-substring → product_id` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct ExplicitMapping {
    pub pattern: String,
    pub product_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Checked in order; the first entry whose pattern hits wins.
    #[serde(default)]
    pub explicit: Vec<ExplicitMapping>,
    /// Minimum name-token length (in chars) that counts toward overlap.
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
    #[serde(default = "default_min_token_matches")]
    pub min_token_matches: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            explicit: Vec::new(),
            min_token_len: default_min_token_len(),
            min_token_matches: default_min_token_matches(),
        }
    }
}

fn default_min_token_len() -> usize {
    4
}

fn default_min_token_matches() -> usize {
    2
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Case-insensitive regular expressions; a hit in name or description removes the record.
    #[serde(default = "default_banned_patterns")]
    pub banned_patterns: Vec<String>,
    /// Supports `{name}`, `{category}`, `{vendor}` and `{vendor_id}`.
    #[serde(default = "default_description_template")]
    pub description_template: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            banned_patterns: default_banned_patterns(),
            description_template: default_description_template(),
        }
    }
}

fn default_banned_patterns() -> Vec<String> {
    ["test", "dummy", "sample", "placeholder", "TODO", "FIXME"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_description_template() -> String {
    "Premium {category} from {vendor}. High-quality vegan ingredients.".into()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlDialect {
    #[default]
    Postgres,
    Mysql,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_catalog_path")]
    pub catalog: String,
    #[serde(default = "default_report_path")]
    pub report: String,
    #[serde(default)]
    pub typescript: Option<String>,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default = "default_sql_table")]
    pub sql_table: String,
    #[serde(default)]
    pub sql_dialect: SqlDialect,
    #[serde(default = "default_typescript_export")]
    pub typescript_export: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog_path(),
            report: default_report_path(),
            typescript: None,
            sql: None,
            sql_table: default_sql_table(),
            sql_dialect: SqlDialect::default(),
            typescript_export: default_typescript_export(),
        }
    }
}

impl OutputConfig {
    /// Every configured destination, keyed by its config field name.
    pub fn paths(&self) -> Vec<(&'static str, &str)> {
        let mut paths = vec![("catalog", self.catalog.as_str()), ("report", self.report.as_str())];
        if let Some(ts) = &self.typescript {
            paths.push(("typescript", ts.as_str()));
        }
        if let Some(sql) = &self.sql {
            paths.push(("sql", sql.as_str()));
        }
        paths
    }
}

fn default_catalog_path() -> String {
    "out/catalog.json".into()
}

fn default_report_path() -> String {
    "out/report.json".into()
}

fn default_sql_table() -> String {
    "products".into()
}

fn default_typescript_export() -> String {
    "correctedProductCatalog".into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.sources.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one catalog source is required".into(),
            ));
        }

        if self.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "extensions must list at least one image extension".into(),
            ));
        }

        if self.vendors.whitelist.is_empty() {
            return Err(ReconError::ConfigValidation(
                "vendor whitelist must not be empty".into(),
            ));
        }

        let known = self.vendors.known_vendors();
        for keyword in &self.vendors.keywords {
            if !known.contains(keyword.vendor.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "keyword '{}': vendor '{}' is neither whitelisted nor an alias target",
                    keyword.pattern, keyword.vendor
                )));
            }
        }

        for source in &self.sources {
            if self.vendors.resolve(&source.vendor).is_none() {
                return Err(ReconError::UnknownVendor {
                    source: source.file.clone(),
                    record_id: String::new(),
                    vendor: source.vendor.clone(),
                });
            }
        }

        for root in &self.assets {
            if let Some(ref vendor) = root.vendor {
                if self.vendors.resolve(vendor).is_none() {
                    return Err(ReconError::ConfigValidation(format!(
                        "asset root '{}': unknown vendor '{vendor}'",
                        root.root
                    )));
                }
            }
        }

        for (i, mapping) in self.matching.explicit.iter().enumerate() {
            if mapping.pattern.is_empty() || mapping.product_id.is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "explicit mapping #{i}: pattern and product_id must be non-empty"
                )));
            }
        }

        if self.matching.min_token_matches == 0 {
            return Err(ReconError::ConfigValidation(
                "min_token_matches must be at least 1".into(),
            ));
        }

        for pattern in &self.validation.banned_patterns {
            regex::RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    ReconError::ConfigValidation(format!("banned pattern '{pattern}': {e}"))
                })?;
        }

        if !is_identifier(&self.output.sql_table) {
            return Err(ReconError::ConfigValidation(format!(
                "sql_table '{}' is not a plain identifier",
                self.output.sql_table
            )));
        }
        if !is_identifier(&self.output.typescript_export) {
            return Err(ReconError::ConfigValidation(format!(
                "typescript_export '{}' is not a plain identifier",
                self.output.typescript_export
            )));
        }

        let mut seen: Vec<(&str, PathBuf)> = Vec::new();
        for (key, path) in self.output.paths() {
            let normalized = normalize_output_path(path);
            if normalized.as_os_str().is_empty() {
                return Err(ReconError::ConfigValidation(format!("output.{key} must not be empty")));
            }
            if let Some((other, _)) = seen.iter().find(|(_, p)| *p == normalized) {
                return Err(ReconError::ConfigValidation(format!(
                    "output.{key} and output.{other} both write '{path}'"
                )));
            }
            seen.push((key, normalized));
        }

        Ok(())
    }
}

/// `./out//catalog.json` and `out/catalog.json` name the same file.
fn normalize_output_path(path: &str) -> PathBuf {
    Path::new(path.trim())
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
