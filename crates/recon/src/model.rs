use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::report::ReconReport;
use crate::source::CatalogSource;

/// One raw catalog entry as yielded by a source adapter, before normalization.
pub type RawRecord = Map<String, Value>;

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// An image file found by the scanner, not yet associated with a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    /// Filesystem path as walked (root joined with the relative path).
    pub path: String,
    pub file_name: String,
    /// Vendor declared for the asset root, if any. Path keyword detection
    /// happens later in the strategy chain.
    pub vendor_hint: Option<String>,
    /// Public path the storefront serves this asset under.
    pub web_path: String,
}

impl AssetRecord {
    /// Build an asset whose web path is `/images/products/<file_name>`.
    pub fn new(path: impl Into<String>, vendor_hint: Option<&str>) -> Self {
        let path = path.into();
        let file_name = path
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&path)
            .to_string();
        let web_path = format!("{}/{}", crate::config::DEFAULT_URL_PREFIX, file_name);
        Self {
            path,
            file_name,
            vendor_hint: vendor_hint.map(str::to_string),
            web_path,
        }
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(dot) if dot > 0 => &self.file_name[..dot],
            _ => &self.file_name,
        }
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFlags {
    pub is_vegan: bool,
    pub is_kosher: bool,
}

impl Default for ProductFlags {
    fn default() -> Self {
        Self {
            is_vegan: true,
            is_kosher: true,
        }
    }
}

/// A normalized product record.
///
/// Serialized field order is fixed and `extra` is sorted, so the emitted
/// catalog is byte-stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image: Option<String>,
    pub tags: BTreeSet<String>,
    #[serde(flatten)]
    pub flags: ProductFlags,
    pub image_verified: bool,
    pub image_confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_method: Option<MatchMethod>,
    pub all_images: Vec<String>,
    /// Fields the loader does not model, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
    /// Label of the catalog source this record came from.
    #[serde(skip)]
    pub source: String,
    /// Flags the loader filled in because the source omitted them.
    #[serde(skip)]
    pub defaulted_flags: Vec<&'static str>,
}

impl ProductRecord {
    pub fn new(id: impl Into<String>, vendor_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            vendor_id: vendor_id.into(),
            name: name.into(),
            price: None,
            description: None,
            image: None,
            tags: BTreeSet::new(),
            flags: ProductFlags::default(),
            image_verified: false,
            image_confidence: 0,
            image_method: None,
            all_images: Vec::new(),
            extra: BTreeMap::new(),
            source: String::new(),
            defaulted_flags: Vec::new(),
        }
    }

    pub fn category(&self) -> Option<&str> {
        self.extra
            .get("category")
            .and_then(Value::as_str)
            .filter(|c| !c.trim().is_empty())
    }

    pub fn price_value(&self) -> Option<f64> {
        self.price.as_ref().and_then(Number::as_f64)
    }
}

/// Single-owned product arena passed from stage to stage.
///
/// Insertion order is catalog iteration order, which the strategy chain
/// relies on for tie-breaking.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<ProductRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Records with an empty id are kept (validation removes
    /// them later) but are not indexed. Returns the existing record's source
    /// label when the id is already taken.
    pub fn insert(&mut self, record: ProductRecord) -> Result<(), String> {
        if !record.id.is_empty() {
            if let Some(&existing) = self.index.get(&record.id) {
                return Err(self.products[existing].source.clone());
            }
            self.index.insert(record.id.clone(), self.products.len());
        }
        self.products.push(record);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ProductRecord> {
        self.index.get(id).map(|&i| &self.products[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ProductRecord> {
        match self.index.get(id) {
            Some(&i) => self.products.get_mut(i),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProductRecord> {
        self.products.iter()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn into_products(self) -> Vec<ProductRecord> {
        self.products
    }
}

/// Test-only builder. Production catalogs go through [`Catalog::insert`],
/// which reports duplicates instead of hiding them.
#[cfg(test)]
impl FromIterator<ProductRecord> for Catalog {
    fn from_iter<T: IntoIterator<Item = ProductRecord>>(iter: T) -> Self {
        let mut catalog = Catalog::new();
        for record in iter {
            let id = record.id.clone();
            if catalog.insert(record).is_err() {
                panic!("duplicate product id '{id}' in test catalog");
            }
        }
        catalog
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Matcher strategies, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMethod {
    ExplicitMap,
    IdInFilename,
    VendorAndNameTokens,
}

impl MatchMethod {
    /// Chain order. Earlier strategies encode curated knowledge and are never
    /// overridden by later ones.
    pub const CHAIN: [MatchMethod; 3] = [
        MatchMethod::ExplicitMap,
        MatchMethod::IdInFilename,
        MatchMethod::VendorAndNameTokens,
    ];

    pub fn confidence(self) -> u8 {
        match self {
            Self::ExplicitMap => 95,
            Self::IdInFilename => 85,
            Self::VendorAndNameTokens => 70,
        }
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExplicitMap => write!(f, "EXPLICIT_MAP"),
            Self::IdInFilename => write!(f, "ID_IN_FILENAME"),
            Self::VendorAndNameTokens => write!(f, "VENDOR_AND_NAME_TOKENS"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub product_id: String,
    pub asset: AssetRecord,
    pub confidence: u8,
    pub method: MatchMethod,
}

/// A winning strategy that had more than one qualifying candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ambiguity {
    pub file_name: String,
    pub path: String,
    pub method: MatchMethod,
    pub chosen_product_id: String,
    pub other_product_ids: Vec<String>,
    pub tie_break: &'static str,
}

/// What the strategy chain concluded for one asset.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetOutcome {
    Matched {
        result: MatchResult,
        ambiguity: Option<Ambiguity>,
    },
    Unmatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    /// High is 90 and up, medium 70 to 89, low below 70.
    pub fn of(confidence: u8) -> Self {
        match confidence {
            90..=u8::MAX => Self::High,
            70..=89 => Self::Medium,
            _ => Self::Low,
        }
    }
}

// ---------------------------------------------------------------------------
// Run input + output
// ---------------------------------------------------------------------------

/// Everything one run consumes. Assets are collected up front; the scanner
/// that produced them is restartable, so a second run simply re-walks.
pub struct ReconInput<'a> {
    pub sources: Vec<&'a dyn CatalogSource>,
    pub assets: Vec<AssetRecord>,
    /// Asset roots the scanner could not read.
    pub skipped_asset_roots: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub report: ReconReport,
    /// Validated catalog: the only thing emitters render from.
    pub catalog: Vec<ProductRecord>,
}
