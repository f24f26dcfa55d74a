//! Canonical catalog loader: N heterogeneous sources in, one normalized catalog out.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Number, Value};

use crate::error::ReconError;
use crate::model::{Catalog, ProductFlags, ProductRecord, RawRecord};
use crate::source::CatalogSource;
use crate::vendor::VendorTable;

/// Column or key names accepted as the product id.
pub const ID_KEYS: &[&str] = &["id", "productId", "product_id"];
const VENDOR_KEYS: &[&str] = &["vendor_id", "vendorId", "vendor_name", "vendorName", "vendor"];
const NAME_KEYS: &[&str] = &["name", "productName", "product_name"];
const PRICE_KEYS: &[&str] = &["price"];
const DESCRIPTION_KEYS: &[&str] = &["description"];
const IMAGE_KEYS: &[&str] = &["image", "imagePath", "image_path", "imageUrl", "image_url"];
const TAG_KEYS: &[&str] = &["tags"];
const ALL_IMAGES_KEYS: &[&str] = &["allImages", "all_images"];
const VEGAN_KEYS: &[&str] = &["isVegan", "is_vegan"];
const KOSHER_KEYS: &[&str] = &["isKosher", "is_kosher"];

/// Verification output of a previous run. Always recomputed, never trusted.
const RECOMPUTED_KEYS: &[&str] = &[
    "imageVerified",
    "image_verified",
    "imageConfidence",
    "image_confidence",
    "imageMethod",
    "image_method",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedSource {
    pub source: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    /// Optional sources that failed to load.
    pub skipped_sources: Vec<SkippedSource>,
}

/// Load every source in order into one catalog.
///
/// Fatal: a required source fails to load, a vendor name cannot be resolved,
/// or a product id repeats (within or across sources).
pub fn load_catalog(
    sources: &[&dyn CatalogSource],
    vendors: &VendorTable,
) -> Result<LoadedCatalog, ReconError> {
    let mut catalog = Catalog::new();
    let mut skipped_sources = Vec::new();

    for source in sources {
        let label = source.label();
        let source_vendor = vendors.resolve(source.vendor()).ok_or_else(|| {
            ReconError::UnknownVendor {
                source: label.into(),
                record_id: String::new(),
                vendor: source.vendor().into(),
            }
        })?;

        let records = match source.load() {
            Ok(records) => records,
            Err(e) if !source.required() => {
                log::warn!("skipping optional catalog source '{label}': {e}");
                skipped_sources.push(SkippedSource {
                    source: label.into(),
                    reason: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        log::debug!("loaded {} record(s) from '{label}'", records.len());

        for (index, raw) in records.into_iter().enumerate() {
            let record = normalize_record(raw, label, &source_vendor, vendors, index)?;
            let id = record.id.clone();
            catalog
                .insert(record)
                .map_err(|first_source| ReconError::DuplicateId {
                    id,
                    first_source,
                    second_source: label.into(),
                })?;
        }
    }

    Ok(LoadedCatalog {
        catalog,
        skipped_sources,
    })
}

/// Normalize one raw record. Known field aliases collapse to the canonical
/// field; everything else passes through in `extra`.
pub fn normalize_record(
    mut raw: RawRecord,
    source: &str,
    source_vendor: &str,
    vendors: &VendorTable,
    index: usize,
) -> Result<ProductRecord, ReconError> {
    let invalid = |message: String| ReconError::InvalidRecord {
        source: source.into(),
        index,
        message,
    };

    let id = match take_first(&mut raw, ID_KEYS) {
        Some(v) => scalar_string(&v).ok_or_else(|| invalid(format!("id must be a string, got {v}")))?,
        None => String::new(),
    };

    let vendor_id = match take_first(&mut raw, VENDOR_KEYS) {
        Some(v) => {
            let name = scalar_string(&v)
                .ok_or_else(|| invalid(format!("vendor must be a string, got {v}")))?;
            if name.is_empty() {
                source_vendor.to_string()
            } else {
                vendors.resolve(&name).ok_or_else(|| ReconError::UnknownVendor {
                    source: source.into(),
                    record_id: id.clone(),
                    vendor: name,
                })?
            }
        }
        None => source_vendor.to_string(),
    };

    let name = take_first(&mut raw, NAME_KEYS)
        .and_then(|v| scalar_string(&v))
        .unwrap_or_default();

    let price = take_first(&mut raw, PRICE_KEYS).and_then(|v| match v {
        Value::Number(n) => Some(n),
        Value::String(s) => s.trim().parse::<Number>().ok(),
        _ => None,
    });

    let description = take_first(&mut raw, DESCRIPTION_KEYS)
        .and_then(|v| scalar_string(&v))
        .filter(|d| !d.is_empty());

    let image = take_first(&mut raw, IMAGE_KEYS)
        .and_then(|v| scalar_string(&v))
        .filter(|i| !i.is_empty());

    let tags = take_first(&mut raw, TAG_KEYS)
        .map(|v| string_list(&v).into_iter().collect::<BTreeSet<_>>())
        .unwrap_or_default();

    let mut all_images: Vec<String> = Vec::new();
    if let Some(v) = take_first(&mut raw, ALL_IMAGES_KEYS) {
        for name in string_list(&v) {
            if !all_images.contains(&name) {
                all_images.push(name);
            }
        }
    }

    let (flags, defaulted_flags) = take_flags(&mut raw, source, &id);

    for key in RECOMPUTED_KEYS {
        raw.remove(*key);
    }

    let mut record = ProductRecord::new(id, vendor_id, name);
    record.price = price;
    record.description = description;
    record.image = image;
    record.tags = tags;
    record.flags = flags;
    record.all_images = all_images;
    record.extra = raw.into_iter().collect();
    record.source = source.into();
    record.defaulted_flags = defaulted_flags;
    Ok(record)
}

/// Remove every alias key; the first non-null value (in key order) wins.
fn take_first(raw: &mut RawRecord, keys: &[&str]) -> Option<Value> {
    let mut found = None;
    for key in keys {
        if let Some(v) = raw.remove(*key) {
            if found.is_none() && !v.is_null() {
                found = Some(v);
            }
        }
    }
    found
}

fn scalar_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Arrays of strings, or one string split on `;`, `|` or `,`.
fn string_list(v: &Value) -> Vec<String> {
    match v {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_string)
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(|c| c == ';' || c == '|' || c == ',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_flag(v: &Value) -> Option<bool> {
    match v {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Read vegan/kosher from top-level keys or a nested `flags` object. Missing
/// (or unreadable) flags default to `true` and are listed for the report.
fn take_flags(raw: &mut RawRecord, source: &str, id: &str) -> (ProductFlags, Vec<&'static str>) {
    let mut nested = match raw.remove("flags") {
        Some(Value::Object(map)) => map,
        Some(other) => {
            raw.insert("flags".into(), other);
            RawRecord::new()
        }
        None => RawRecord::new(),
    };

    let mut read = |keys: &[&str]| -> Option<bool> {
        let top = take_first(raw, keys);
        let inner = take_first(&mut nested, keys);
        let value = top.or(inner)?;
        let parsed = parse_flag(&value);
        if parsed.is_none() {
            log::warn!("source '{source}', record '{id}': unreadable flag value {value}, defaulting");
        }
        parsed
    };

    let vegan = read(VEGAN_KEYS);
    let kosher = read(KOSHER_KEYS);

    if !nested.is_empty() {
        raw.insert("flags".into(), Value::Object(nested));
    }

    let mut defaulted = Vec::new();
    if vegan.is_none() {
        defaulted.push("isVegan");
    }
    if kosher.is_none() {
        defaulted.push("isKosher");
    }

    (
        ProductFlags {
            is_vegan: vegan.unwrap_or(true),
            is_kosher: kosher.unwrap_or(true),
        },
        defaulted,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use serde_json::json;

    fn load(sources: &[MemorySource]) -> Result<LoadedCatalog, ReconError> {
        let refs: Vec<&dyn CatalogSource> = sources.iter().map(|s| s as &dyn CatalogSource).collect();
        load_catalog(&refs, &VendorTable::default())
    }

    #[test]
    fn normalizes_field_aliases() {
        let source = MemorySource::from_json(
            "teva.json",
            "teva-deli",
            json!([{
                "productId": "td-001",
                "vendorName": "Teva Deli",
                "name": "Classic Seitan Schnitzel",
                "price": 45,
                "imagePath": "images/td-001.jpg",
                "isVegan": true,
                "category": "schnitzels",
                "imageVerified": true,
                "allImages": ["a.jpg", "a.jpg", "b.jpg"]
            }]),
        );
        let loaded = load(&[source]).unwrap();
        let p = loaded.catalog.get("td-001").unwrap();
        assert_eq!(p.vendor_id, "teva-deli");
        assert_eq!(p.price_value(), Some(45.0));
        assert_eq!(p.image.as_deref(), Some("images/td-001.jpg"));
        assert_eq!(p.category(), Some("schnitzels"));
        assert_eq!(p.all_images, vec!["a.jpg", "b.jpg"]);
        assert!(!p.extra.contains_key("imageVerified"));
        assert!(!p.extra.contains_key("productId"));
        assert_eq!(p.defaulted_flags, vec!["isKosher"]);
        assert_eq!(p.source, "teva.json");
    }

    #[test]
    fn records_without_vendor_take_source_scope() {
        let source = MemorySource::from_json(
            "gahn.json",
            "Gahn Delight",
            json!([{ "id": "gd-001", "name": "Chocolate Tahini Swirl" }]),
        );
        let loaded = load(&[source]).unwrap();
        assert_eq!(loaded.catalog.get("gd-001").unwrap().vendor_id, "gahn-delight");
    }

    #[test]
    fn defaults_tags_and_flags() {
        let source = MemorySource::from_json(
            "vop.json",
            "vop-shop",
            json!([{ "id": "vs-001", "name": "Heritage T-Shirt" }]),
        );
        let loaded = load(&[source]).unwrap();
        let p = loaded.catalog.get("vs-001").unwrap();
        assert!(p.tags.is_empty());
        assert!(p.flags.is_vegan && p.flags.is_kosher);
        assert_eq!(p.defaulted_flags, vec!["isVegan", "isKosher"]);
    }

    #[test]
    fn explicit_false_flag_is_preserved() {
        let source = MemorySource::from_json(
            "vop.json",
            "vop-shop",
            json!([{ "id": "vs-002", "name": "Tote", "flags": { "is_vegan": true, "is_kosher": "false" } }]),
        );
        let loaded = load(&[source]).unwrap();
        let p = loaded.catalog.get("vs-002").unwrap();
        assert!(p.flags.is_vegan);
        assert!(!p.flags.is_kosher);
        assert!(p.defaulted_flags.is_empty());
        assert!(!p.extra.contains_key("flags"));
    }

    #[test]
    fn csv_style_strings_are_parsed() {
        let source = MemorySource::from_json(
            "people.csv",
            "people-store",
            json!([{ "id": "ps-001", "name": "Tamari", "price": " 32.5 ", "tags": "sauce; soy |organic", "is_kosher": "yes" }]),
        );
        let loaded = load(&[source]).unwrap();
        let p = loaded.catalog.get("ps-001").unwrap();
        assert_eq!(p.price_value(), Some(32.5));
        assert_eq!(
            p.tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["organic", "sauce", "soy"]
        );
        assert!(p.flags.is_kosher);
    }

    #[test]
    fn duplicate_id_across_sources_is_fatal() {
        let a = MemorySource::from_json("gahn.json", "gahn-delight", json!([{ "id": "gd-001", "name": "Swirl" }]));
        let b = MemorySource::from_json("legacy.json", "gahn-delight", json!([{ "id": "gd-001", "name": "Other" }]));
        let err = load(&[a, b]).unwrap_err();
        match err {
            ReconError::DuplicateId { id, first_source, second_source } => {
                assert_eq!(id, "gd-001");
                assert_eq!(first_source, "gahn.json");
                assert_eq!(second_source, "legacy.json");
            }
            other => panic!("expected DuplicateId, got {other}"),
        }
    }

    #[test]
    fn unknown_record_vendor_is_fatal() {
        let source = MemorySource::from_json(
            "teva.json",
            "teva-deli",
            json!([{ "id": "x-1", "name": "Mystery", "vendor": "Mystery Foods" }]),
        );
        let err = load(&[source]).unwrap_err();
        assert!(matches!(err, ReconError::UnknownVendor { ref record_id, .. } if record_id == "x-1"));
    }

    #[test]
    fn unknown_source_vendor_is_fatal() {
        let source = MemorySource::from_json("m.json", "mystery", json!([]));
        assert!(matches!(load(&[source]), Err(ReconError::UnknownVendor { .. })));
    }

    #[test]
    fn non_string_id_is_invalid_record() {
        let source = MemorySource::from_json("t.json", "teva-deli", json!([{ "id": ["td-1"] }]));
        assert!(matches!(load(&[source]), Err(ReconError::InvalidRecord { index: 0, .. })));
    }

    struct FailingSource {
        required: bool,
    }

    impl CatalogSource for FailingSource {
        fn label(&self) -> &str {
            "broken.json"
        }
        fn vendor(&self) -> &str {
            "teva-deli"
        }
        fn required(&self) -> bool {
            self.required
        }
        fn load(&self) -> Result<Vec<RawRecord>, ReconError> {
            Err(ReconError::SourceUnreadable {
                source: "broken.json".into(),
                message: "No such file or directory".into(),
            })
        }
    }

    #[test]
    fn optional_source_failure_is_skipped() {
        let broken = FailingSource { required: false };
        let ok = MemorySource::from_json("teva.json", "teva-deli", json!([{ "id": "td-001", "name": "A" }]));
        let sources: Vec<&dyn CatalogSource> = vec![&broken as &dyn CatalogSource, &ok];
        let loaded = load_catalog(&sources, &VendorTable::default()).unwrap();
        assert_eq!(loaded.catalog.len(), 1);
        assert_eq!(loaded.skipped_sources.len(), 1);
        assert_eq!(loaded.skipped_sources[0].source, "broken.json");
    }

    #[test]
    fn required_source_failure_is_fatal() {
        let broken = FailingSource { required: true };
        let sources: Vec<&dyn CatalogSource> = vec![&broken as &dyn CatalogSource];
        let err = load_catalog(&sources, &VendorTable::default()).unwrap_err();
        assert!(matches!(err, ReconError::SourceUnreadable { .. }));
    }
}
