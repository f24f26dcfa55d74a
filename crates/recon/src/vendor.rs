//! Vendor identity: whitelist, display-name aliases, and path keywords.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

/// The six marketplace vendors and how their names show up in the wild.
///
/// Keyword order is part of the behavior: `light` is tried before `gahn`, so
/// `gahn_delight_*` under a root with no vendor detects as garden-of-light.
/// Roots that hold Gahn Delight images declare `vendor = "gahn-delight"`.
const HOUSE_VENDORS: &[(&str, &[&str], &[&str])] = &[
    ("teva-deli", &["Teva Deli"], &["teva", "teva_deli"]),
    ("people-store", &["People Store", "Peoples Store", "People's Store"], &["people", "peoples"]),
    ("garden-of-light", &["Garden of Light"], &["garden", "light"]),
    ("queens-cuisine", &["Queens Cuisine", "Queen's Cuisine"], &["queen"]),
    ("gahn-delight", &["Gahn Delight"], &["gahn"]),
    ("vop-shop", &["VOP Shop", "Village of Peace Shop"], &["vop", "village"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VendorKeyword {
    pub pattern: String,
    pub vendor: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorTable {
    /// Vendors allowed into the published catalog.
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<String>,
    /// Display name (or legacy id) to canonical vendor id.
    #[serde(default = "default_aliases")]
    pub aliases: BTreeMap<String, String>,
    /// Path substring to vendor id. First hit wins, so order matters.
    #[serde(default = "default_keywords")]
    pub keywords: Vec<VendorKeyword>,
}

impl Default for VendorTable {
    fn default() -> Self {
        Self {
            whitelist: default_whitelist(),
            aliases: default_aliases(),
            keywords: default_keywords(),
        }
    }
}

fn default_whitelist() -> Vec<String> {
    HOUSE_VENDORS.iter().map(|(id, _, _)| id.to_string()).collect()
}

fn default_aliases() -> BTreeMap<String, String> {
    HOUSE_VENDORS
        .iter()
        .flat_map(|(id, names, _)| names.iter().map(move |n| (n.to_string(), id.to_string())))
        .collect()
}

fn default_keywords() -> Vec<VendorKeyword> {
    HOUSE_VENDORS
        .iter()
        .flat_map(|(id, _, keywords)| {
            keywords.iter().map(move |k| VendorKeyword {
                pattern: k.to_string(),
                vendor: id.to_string(),
            })
        })
        .collect()
}

impl VendorTable {
    /// Every canonical vendor id this table can resolve to.
    pub fn known_vendors(&self) -> BTreeSet<&str> {
        self.whitelist
            .iter()
            .map(String::as_str)
            .chain(self.aliases.values().map(String::as_str))
            .collect()
    }

    pub fn is_whitelisted(&self, vendor_id: &str) -> bool {
        self.whitelist.iter().any(|v| v == vendor_id)
    }

    /// Resolve a vendor name or id to its canonical id.
    ///
    /// Lookup order: canonical id, exact alias, slug of the name as a
    /// canonical id, slug of the name as an alias. `None` means unknown.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let known = self.known_vendors();
        if known.contains(name) {
            return Some(name.to_string());
        }
        if let Some(target) = self.aliases.get(name) {
            return Some(target.clone());
        }
        let slug = slugify(name);
        if known.contains(slug.as_str()) {
            return Some(slug);
        }
        self.aliases
            .iter()
            .find(|(alias, _)| slugify(alias) == slug)
            .map(|(_, target)| target.clone())
    }

    /// Detect a vendor from an asset path by keyword substring (case-insensitive).
    pub fn detect_from_path(&self, path: &str) -> Option<&str> {
        let lower = path.to_lowercase();
        self.keywords
            .iter()
            .find(|k| !k.pattern.is_empty() && lower.contains(&k.pattern.to_lowercase()))
            .map(|k| k.vendor.as_str())
    }
}

/// `"Queen's Cuisine"` → `"queen-s-cuisine"`: lowercase, every
/// non-alphanumeric run collapsed to one dash, no leading/trailing dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// `"garden-of-light"` → `"Garden Of Light"`, for templated descriptions.
pub fn display_name(vendor_id: &str) -> String {
    vendor_id
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
