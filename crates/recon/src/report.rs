use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ExplicitMapping;
use crate::loader::SkippedSource;
use crate::model::{Ambiguity, ConfidenceBand, MatchMethod, MatchResult};
use crate::validate::{FixedProduct, RemovedProduct, ValidationOutcome};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Audit trail of one run. Contains no timestamps: unchanged inputs give a
/// byte-identical report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    /// Every winning asset → product assignment, in scan order.
    pub matches: Vec<MatchEntry>,
    pub ambiguous_matches: Vec<Ambiguity>,
    pub unmatched_images: Vec<UnmatchedImage>,
    pub removed: Vec<RemovedProduct>,
    pub fixed: Vec<FixedProduct>,
    pub vendor_summary: BTreeMap<String, VendorSummary>,
    pub skipped_asset_roots: Vec<String>,
    pub skipped_sources: Vec<SkippedSource>,
    pub stale_explicit_mappings: Vec<ExplicitMapping>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconSummary {
    pub total_assets_scanned: usize,
    pub matched_assets: usize,
    pub unmatched_assets: usize,
    pub confidence_bands: BandCounts,
    pub by_method: BTreeMap<String, usize>,
    pub ambiguous_matches: usize,
    pub total_products: usize,
    pub products_kept: usize,
    pub products_fixed: usize,
    pub products_removed: usize,
    pub products_with_verified_images: usize,
}

/// Matched assets per confidence band: high ≥ 90, medium 70–89, low < 70.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BandCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEntry {
    pub product_id: String,
    pub file_name: String,
    pub path: String,
    pub image: String,
    pub confidence: u8,
    pub band: ConfidenceBand,
    pub method: MatchMethod,
}

impl From<&MatchResult> for MatchEntry {
    fn from(r: &MatchResult) -> Self {
        Self {
            product_id: r.product_id.clone(),
            file_name: r.asset.file_name.clone(),
            path: r.asset.path.clone(),
            image: r.asset.web_path.clone(),
            confidence: r.confidence,
            band: ConfidenceBand::of(r.confidence),
            method: r.method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedImage {
    pub file_name: String,
    pub path: String,
    pub vendor_hint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VendorSummary {
    pub total: usize,
    pub kept: usize,
    pub fixed: usize,
    pub removed: usize,
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Compute summary counts from the matcher and validator outputs.
pub fn compute_summary(
    assets_scanned: usize,
    matches: &[MatchResult],
    ambiguous: usize,
    validation: &ValidationOutcome,
) -> ReconSummary {
    let mut bands = BandCounts::default();
    let mut by_method: BTreeMap<String, usize> = BTreeMap::new();

    for m in matches {
        match ConfidenceBand::of(m.confidence) {
            ConfidenceBand::High => bands.high += 1,
            ConfidenceBand::Medium => bands.medium += 1,
            ConfidenceBand::Low => bands.low += 1,
        }
        *by_method.entry(m.method.to_string()).or_insert(0) += 1;
    }

    ReconSummary {
        total_assets_scanned: assets_scanned,
        matched_assets: matches.len(),
        unmatched_assets: assets_scanned.saturating_sub(matches.len()),
        confidence_bands: bands,
        by_method,
        ambiguous_matches: ambiguous,
        total_products: validation.kept.len() + validation.removed.len(),
        products_kept: validation.kept.len(),
        products_fixed: validation.fixed.len(),
        products_removed: validation.removed.len(),
        products_with_verified_images: validation.kept.iter().filter(|p| p.image_verified).count(),
    }
}

/// Per-vendor totals over the validated catalog.
pub fn vendor_summary(validation: &ValidationOutcome) -> BTreeMap<String, VendorSummary> {
    let mut summary: BTreeMap<String, VendorSummary> = BTreeMap::new();

    for p in &validation.kept {
        let entry = summary.entry(p.vendor_id.clone()).or_default();
        entry.total += 1;
        entry.kept += 1;
    }
    for p in &validation.removed {
        let entry = summary.entry(p.vendor_id.clone()).or_default();
        entry.total += 1;
        entry.removed += 1;
    }
    for f in &validation.fixed {
        summary.entry(f.vendor_id.clone()).or_default().fixed += 1;
    }

    summary
}
