use crate::config::{ExplicitMapping, ReconConfig};
use crate::error::ReconError;
use crate::loader::load_catalog;
use crate::matcher::StrategyChain;
use crate::model::{AssetOutcome, ReconInput, ReconResult};
use crate::report::{compute_summary, vendor_summary, MatchEntry, ReconMeta, ReconReport, UnmatchedImage};
use crate::resolve::merge_matches;
use crate::validate::{validate_catalog, Validator};

/// Run one reconciliation pass: load, match, merge, validate, report.
///
/// Fatal load errors return before any matching happens. Everything else
/// (unmatched assets, removed or repaired records) lands in the report.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    let validator = Validator::new(&config.validation, &config.vendors)?;
    let loaded = load_catalog(&input.sources, &config.vendors)?;
    let mut catalog = loaded.catalog;

    let chain = StrategyChain::new(&catalog, &config.vendors, &config.matching);

    let stale: Vec<ExplicitMapping> = chain.stale_mappings().into_iter().cloned().collect();
    for mapping in &stale {
        log::warn!(
            "explicit mapping '{}' points at unknown product '{}'",
            mapping.pattern,
            mapping.product_id
        );
    }

    // Collect every result first; the merge below is the only writer.
    let mut matches = Vec::new();
    let mut ambiguous_matches = Vec::new();
    let mut unmatched_images = Vec::new();
    for asset in &input.assets {
        match chain.match_asset(asset) {
            AssetOutcome::Matched { result, ambiguity } => {
                matches.push(result);
                ambiguous_matches.extend(ambiguity);
            }
            AssetOutcome::Unmatched => unmatched_images.push(UnmatchedImage {
                file_name: asset.file_name.clone(),
                path: asset.path.clone(),
                vendor_hint: asset.vendor_hint.clone(),
            }),
        }
    }

    merge_matches(&mut catalog, &matches);
    let validation = validate_catalog(catalog, &validator);

    let summary = compute_summary(input.assets.len(), &matches, ambiguous_matches.len(), &validation);
    let vendor_summary = vendor_summary(&validation);

    log::info!(
        "{}: {} asset(s), {} matched, {} unmatched, {} product(s) kept, {} removed",
        config.name,
        summary.total_assets_scanned,
        summary.matched_assets,
        summary.unmatched_assets,
        summary.products_kept,
        summary.products_removed
    );

    Ok(ReconResult {
        report: ReconReport {
            meta: ReconMeta {
                config_name: config.name.clone(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            summary,
            matches: matches.iter().map(MatchEntry::from).collect(),
            ambiguous_matches,
            unmatched_images,
            removed: validation.removed,
            fixed: validation.fixed,
            vendor_summary,
            skipped_asset_roots: input.skipped_asset_roots.clone(),
            skipped_sources: loaded.skipped_sources,
            stale_explicit_mappings: stale,
        },
        catalog: validation.kept,
    })
}
