//! Catalog validator / cleaner.
//!
//! Runs after the merge. Every record is classified as keep, keep-with-fix,
//! or remove. Checks run in a fixed order and the first removal reason wins,
//! so a record whose name or description is banned is never repaired into
//! passing.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::config::ValidationConfig;
use crate::error::ReconError;
use crate::model::{Catalog, ProductRecord};
use crate::vendor::{display_name, VendorTable};

/// One field changed by the cleaner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFix {
    pub field: &'static str,
    pub before: Value,
    pub after: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Keep,
    KeepWithFix(Vec<FieldFix>),
    Remove(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedProduct {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    pub source: String,
    pub reason: String,
    /// Confidence of the verified image the record had before removal (0 if none).
    pub image_confidence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedProduct {
    pub id: String,
    pub vendor_id: String,
    pub fixes: Vec<FieldFix>,
}

#[derive(Debug, Default)]
pub struct ValidationOutcome {
    /// Surviving records, in catalog order.
    pub kept: Vec<ProductRecord>,
    pub removed: Vec<RemovedProduct>,
    pub fixed: Vec<FixedProduct>,
}

pub struct Validator {
    banned: Vec<(String, Regex)>,
    whitelist: Vec<String>,
    description_template: String,
}

impl Validator {
    pub fn new(config: &ValidationConfig, vendors: &VendorTable) -> Result<Self, ReconError> {
        let banned = config
            .banned_patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (p.clone(), re))
                    .map_err(|e| ReconError::ConfigValidation(format!("banned pattern '{p}': {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            banned,
            whitelist: vendors.whitelist.clone(),
            description_template: config.description_template.clone(),
        })
    }

    /// Classify one record without mutating it.
    pub fn classify(&self, product: &ProductRecord) -> Verdict {
        let description = product.description.as_deref().unwrap_or("");
        for (pattern, re) in &self.banned {
            if re.is_match(&product.name) || re.is_match(description) {
                return Verdict::Remove(format!("Contains invalid pattern: {pattern}"));
            }
        }

        for (field, value) in [
            ("id", &product.id),
            ("name", &product.name),
            ("vendor_id", &product.vendor_id),
        ] {
            if value.trim().is_empty() {
                return Verdict::Remove(format!("Missing required field: {field}"));
            }
        }

        if !self.whitelist.iter().any(|v| v == &product.vendor_id) {
            return Verdict::Remove(format!("Invalid vendor: {}", product.vendor_id));
        }

        match product.price_value() {
            Some(price) if price > 0.0 => {}
            _ => return Verdict::Remove("Invalid price".into()),
        }

        let Some(image) = product.image.as_deref() else {
            return Verdict::Remove("Missing required field: image".into());
        };

        let mut fixes = Vec::new();

        if product.description.is_none() {
            fixes.push(FieldFix {
                field: "description",
                before: Value::Null,
                after: Value::String(self.describe(product)),
            });
        }

        if !is_rooted(image) {
            fixes.push(FieldFix {
                field: "image",
                before: Value::String(image.to_string()),
                after: Value::String(format!("/{image}")),
            });
        }

        for &flag in &product.defaulted_flags {
            fixes.push(FieldFix {
                field: flag,
                before: Value::Null,
                after: Value::Bool(true),
            });
        }

        if fixes.is_empty() {
            Verdict::Keep
        } else {
            Verdict::KeepWithFix(fixes)
        }
    }

    fn describe(&self, product: &ProductRecord) -> String {
        self.description_template
            .replace("{name}", &product.name)
            .replace("{category}", product.category().unwrap_or("product"))
            .replace("{vendor_id}", &product.vendor_id)
            .replace("{vendor}", &display_name(&product.vendor_id))
    }
}

/// Rooted web path or absolute URL.
fn is_rooted(image: &str) -> bool {
    image.starts_with('/') || image.starts_with("http://") || image.starts_with("https://")
}

fn apply_fixes(product: &mut ProductRecord, fixes: &[FieldFix]) {
    for fix in fixes {
        match (fix.field, &fix.after) {
            ("description", Value::String(s)) => product.description = Some(s.clone()),
            ("image", Value::String(s)) => product.image = Some(s.clone()),
            // Flags were defaulted at load; the fix only records it.
            _ => {}
        }
    }
    product.defaulted_flags.clear();
}

/// Validate every record, consuming the catalog.
pub fn validate_catalog(catalog: Catalog, validator: &Validator) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();

    for mut product in catalog.into_products() {
        match validator.classify(&product) {
            Verdict::Keep => outcome.kept.push(product),
            Verdict::KeepWithFix(fixes) => {
                apply_fixes(&mut product, &fixes);
                outcome.fixed.push(FixedProduct {
                    id: product.id.clone(),
                    vendor_id: product.vendor_id.clone(),
                    fixes,
                });
                outcome.kept.push(product);
            }
            Verdict::Remove(reason) => {
                log::debug!("removing '{}' ({}): {reason}", product.id, product.source);
                outcome.removed.push(RemovedProduct {
                    id: product.id,
                    vendor_id: product.vendor_id,
                    name: product.name,
                    source: product.source,
                    reason,
                    image_confidence: product.image_confidence,
                });
            }
        }
    }

    outcome
}
