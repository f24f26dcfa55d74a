use crate::config::{ExplicitMapping, MatchingConfig};
use crate::model::{Ambiguity, AssetOutcome, AssetRecord, Catalog, MatchMethod, MatchResult};
use crate::vendor::VendorTable;

/// Ordered strategy chain over one catalog.
///
/// Each asset runs explicit mapping, then id-in-filename, then vendor-scoped
/// name tokens. The first strategy with any qualifying candidate decides; its
/// first candidate wins and the rest are reported as an [`Ambiguity`].
pub struct StrategyChain<'a> {
    catalog: &'a Catalog,
    vendors: &'a VendorTable,
    config: &'a MatchingConfig,
    /// Name tokens per product, parallel to catalog order.
    tokens: Vec<Vec<String>>,
}

impl<'a> StrategyChain<'a> {
    pub fn new(catalog: &'a Catalog, vendors: &'a VendorTable, config: &'a MatchingConfig) -> Self {
        let tokens = catalog
            .iter()
            .map(|p| name_tokens(&p.name, config.min_token_len))
            .collect();
        Self {
            catalog,
            vendors,
            config,
            tokens,
        }
    }

    /// Curated entries pointing at a product id the catalog does not contain.
    pub fn stale_mappings(&self) -> Vec<&'a ExplicitMapping> {
        self.config
            .explicit
            .iter()
            .filter(|m| !self.catalog.contains(&m.product_id))
            .collect()
    }

    pub fn match_asset(&self, asset: &AssetRecord) -> AssetOutcome {
        for method in MatchMethod::CHAIN {
            let candidates = match method {
                MatchMethod::ExplicitMap => self.explicit_candidates(asset),
                MatchMethod::IdInFilename => self.id_candidates(asset),
                MatchMethod::VendorAndNameTokens => self.token_candidates(asset),
            };

            let Some((chosen, others)) = candidates.split_first() else {
                continue;
            };

            log::trace!(
                "{}: {method} -> {chosen} ({} other candidate(s))",
                asset.path,
                others.len()
            );

            let ambiguity = if others.is_empty() {
                None
            } else {
                Some(Ambiguity {
                    file_name: asset.file_name.clone(),
                    path: asset.path.clone(),
                    method,
                    chosen_product_id: chosen.to_string(),
                    other_product_ids: others.iter().map(|id| id.to_string()).collect(),
                    tie_break: match method {
                        MatchMethod::ExplicitMap => "mapping_order",
                        _ => "catalog_order",
                    },
                })
            };

            return AssetOutcome::Matched {
                result: MatchResult {
                    product_id: chosen.to_string(),
                    asset: asset.clone(),
                    confidence: method.confidence(),
                    method,
                },
                ambiguity,
            };
        }

        log::trace!("{}: unmatched", asset.path);
        AssetOutcome::Unmatched
    }

    /// Mapping entries whose pattern occurs in the file name (or equals its
    /// stem), in table order. Entries for absent products never qualify.
    fn explicit_candidates(&self, asset: &AssetRecord) -> Vec<&'a str> {
        let stem = asset.stem();
        let mut ids: Vec<&'a str> = Vec::new();
        for mapping in self.config.explicit.iter() {
            let hit = asset.file_name.contains(&mapping.pattern) || stem == mapping.pattern;
            if hit
                && self.catalog.contains(&mapping.product_id)
                && !ids.contains(&mapping.product_id.as_str())
            {
                ids.push(&mapping.product_id);
            }
        }
        ids
    }

    fn id_candidates(&self, asset: &AssetRecord) -> Vec<&'a str> {
        let file_name = asset.file_name.to_lowercase();
        self.catalog
            .iter()
            .filter(|p| !p.id.is_empty() && file_name.contains(&p.id.to_lowercase()))
            .map(|p| p.id.as_str())
            .collect()
    }

    fn token_candidates(&self, asset: &AssetRecord) -> Vec<&'a str> {
        let vendor = asset
            .vendor_hint
            .as_deref()
            .and_then(|hint| self.vendors.resolve(hint))
            .or_else(|| self.vendors.detect_from_path(&asset.path).map(str::to_string));

        let Some(vendor) = vendor else {
            log::debug!("{}: no vendor hint, skipping name-token strategy", asset.path);
            return Vec::new();
        };

        let file_name = asset.file_name.to_lowercase();
        let catalog: &'a Catalog = self.catalog;
        catalog
            .iter()
            .zip(&self.tokens)
            .filter(|(p, _)| !p.id.is_empty() && p.vendor_id == vendor)
            .filter(|(_, tokens)| {
                let hits = tokens.iter().filter(|t| file_name.contains(t.as_str())).count();
                hits >= self.config.min_token_matches
            })
            .map(|(p, _)| p.id.as_str())
            .collect()
    }
}

/// Lowercase whitespace tokens of at least `min_len` chars. Repeated words
/// are kept: each occurrence counts toward `min_token_matches`.
pub fn name_tokens(name: &str, min_len: usize) -> Vec<String> {
    name.split_whitespace()
        .map(str::to_lowercase)
        .filter(|token| token.chars().count() >= min_len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductRecord;

    fn catalog() -> Catalog {
        vec![
            ProductRecord::new("td-001", "teva-deli", "Classic Seitan Schnitzel"),
            ProductRecord::new("td-002", "teva-deli", "Spicy Seitan Schnitzel"),
            ProductRecord::new("td-003", "teva-deli", "Tofu Sausage Links"),
            ProductRecord::new("gol-001", "garden-of-light", "Seitan Schnitzel Deluxe"),
            ProductRecord::new("gd-001", "gahn-delight", "Chocolate Tahini Swirl"),
        ]
        .into_iter()
        .collect()
    }

    fn matched(outcome: &AssetOutcome) -> (&MatchResult, Option<&Ambiguity>) {
        match outcome {
            AssetOutcome::Matched { result, ambiguity } => (result, ambiguity.as_ref()),
            AssetOutcome::Unmatched => panic!("expected a match"),
        }
    }

    #[test]
    fn vendor_scoped_token_match() {
        let catalog: Catalog = vec![ProductRecord::new("td-001", "teva-deli", "Classic Seitan Schnitzel")]
            .into_iter()
            .collect();
        let vendors = VendorTable::default();
        let config = MatchingConfig::default();
        let chain = StrategyChain::new(&catalog, &vendors, &config);

        let asset = AssetRecord::new(
            "assets/teva_deli_vegan_seitan_schnitzel_crispy_golden_israeli_comfort_food.jpg",
            None,
        );
        let outcome = chain.match_asset(&asset);
        let (result, ambiguity) = matched(&outcome);
        assert_eq!(result.product_id, "td-001");
        assert_eq!(result.confidence, 70);
        assert_eq!(result.method, MatchMethod::VendorAndNameTokens);
        assert!(ambiguity.is_none());
    }

    #[test]
    fn token_tie_goes_to_first_listed_and_is_reported() {
        let catalog = catalog();
        let vendors = VendorTable::default();
        let config = MatchingConfig::default();
        let chain = StrategyChain::new(&catalog, &vendors, &config);

        let asset = AssetRecord::new("teva/seitan_schnitzel_plate.jpg", None);
        let outcome = chain.match_asset(&asset);
        let (result, ambiguity) = matched(&outcome);
        assert_eq!(result.product_id, "td-001");
        let ambiguity = ambiguity.unwrap();
        assert_eq!(ambiguity.other_product_ids, vec!["td-002"]);
        assert_eq!(ambiguity.tie_break, "catalog_order");
    }

    #[test]
    fn token_candidates_are_scoped_to_vendor() {
        let catalog = catalog();
        let vendors = VendorTable::default();
        let config = MatchingConfig::default();
        let chain = StrategyChain::new(&catalog, &vendors, &config);

        let asset = AssetRecord::new("images/misc/seitan_schnitzel.jpg", Some("garden-of-light"));
        let outcome = chain.match_asset(&asset);
        let (result, ambiguity) = matched(&outcome);
        assert_eq!(result.product_id, "gol-001");
        assert!(ambiguity.is_none());
    }

    #[test]
    fn no_vendor_hint_disqualifies_token_strategy_only() {
        let catalog = catalog();
        let vendors = VendorTable::default();
        let config = MatchingConfig::default();
        let chain = StrategyChain::new(&catalog, &vendors, &config);

        let asset = AssetRecord::new("images/misc/seitan_schnitzel.jpg", None);
        assert_eq!(chain.match_asset(&asset), AssetOutcome::Unmatched);

        let asset = AssetRecord::new("images/misc/TD-003_sausages.jpg", None);
        let outcome = chain.match_asset(&asset);
        let (result, _) = matched(&outcome);
        assert_eq!(result.product_id, "td-003");
        assert_eq!(result.method, MatchMethod::IdInFilename);
        assert_eq!(result.confidence, 85);
    }

    #[test]
    fn explicit_mapping_outranks_id_in_filename() {
        let catalog = catalog();
        let vendors = VendorTable::default();
        let config = MatchingConfig {
            explicit: vec![ExplicitMapping {
                pattern: "hero_shot".into(),
                product_id: "td-002".into(),
            }],
            ..MatchingConfig::default()
        };
        let chain = StrategyChain::new(&catalog, &vendors, &config);

        let asset = AssetRecord::new("teva/td-001_hero_shot.jpg", None);
        let outcome = chain.match_asset(&asset);
        let (result, _) = matched(&outcome);
        assert_eq!(result.product_id, "td-002");
        assert_eq!(result.method, MatchMethod::ExplicitMap);
        assert_eq!(result.confidence, 95);
    }

    #[test]
    fn explicit_mapping_matches_whole_stem() {
        let catalog = catalog();
        let vendors = VendorTable::default();
        let config = MatchingConfig {
            explicit: vec![ExplicitMapping {
                pattern: "1".into(),
                product_id: "gol-001".into(),
            }],
            ..MatchingConfig::default()
        };
        let chain = StrategyChain::new(&catalog, &vendors, &config);

        let outcome = chain.match_asset(&AssetRecord::new("Garden of Light/1.jpg", None));
        assert_eq!(matched(&outcome).0.product_id, "gol-001");
    }

    #[test]
    fn stale_mapping_is_skipped_and_listed() {
        let catalog = catalog();
        let vendors = VendorTable::default();
        let config = MatchingConfig {
            explicit: vec![ExplicitMapping {
                pattern: "swirl".into(),
                product_id: "gd-999".into(),
            }],
            ..MatchingConfig::default()
        };
        let chain = StrategyChain::new(&catalog, &vendors, &config);

        assert_eq!(chain.stale_mappings().len(), 1);
        let outcome = chain.match_asset(&AssetRecord::new("gahn/chocolate_tahini_swirl.jpg", None));
        let (result, _) = matched(&outcome);
        assert_eq!(result.product_id, "gd-001");
        assert_eq!(result.method, MatchMethod::VendorAndNameTokens);
    }

    #[test]
    fn brand_assets_stay_unmatched() {
        let catalog = catalog();
        let vendors = VendorTable::default();
        let config = MatchingConfig::default();
        let chain = StrategyChain::new(&catalog, &vendors, &config);

        let asset = AssetRecord::new("vop/vop_shop_official_logo_master_brand.jpg", None);
        assert_eq!(chain.match_asset(&asset), AssetOutcome::Unmatched);
    }

    #[test]
    fn tokens_keep_repeats_and_drop_short_words() {
        assert_eq!(
            name_tokens("Tofu tofu Links of Joy", 4),
            vec!["tofu".to_string(), "tofu".to_string(), "links".to_string()]
        );
    }

    #[test]
    fn repeated_name_word_counts_twice() {
        let catalog: Catalog = vec![ProductRecord::new("td-010", "teva-deli", "Tofu Tofu Bites")]
            .into_iter()
            .collect();
        let vendors = VendorTable::default();
        let config = MatchingConfig::default();
        let chain = StrategyChain::new(&catalog, &vendors, &config);

        let outcome = chain.match_asset(&AssetRecord::new("teva/tofu_plate.jpg", None));
        let (result, _) = matched(&outcome);
        assert_eq!(result.product_id, "td-010");
        assert_eq!(result.method, MatchMethod::VendorAndNameTokens);
        assert_eq!(result.confidence, 70);
    }
}
