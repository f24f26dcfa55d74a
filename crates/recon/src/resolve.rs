//! Conflict resolver: folds per-asset match results back into the catalog.

use crate::model::{Catalog, MatchResult};

/// Merge match results into the catalog, in discovery order.
///
/// Per product the highest-confidence asset becomes the primary image (an
/// equal confidence never displaces the incumbent). Every matched asset is
/// appended to `all_images` unless a file of that name is already listed.
/// Products with no match keep their original `image` and stay unverified.
///
/// Returns the number of products that received a verified image.
pub fn merge_matches(catalog: &mut Catalog, results: &[MatchResult]) -> usize {
    let mut verified = 0;

    for result in results {
        let Some(product) = catalog.get_mut(&result.product_id) else {
            log::warn!(
                "match for unknown product '{}' ({}) dropped",
                result.product_id,
                result.asset.path
            );
            continue;
        };

        if !product.all_images.contains(&result.asset.file_name) {
            product.all_images.push(result.asset.file_name.clone());
        }

        if !product.image_verified {
            verified += 1;
        } else if result.confidence <= product.image_confidence {
            continue;
        }

        product.image = Some(result.asset.web_path.clone());
        product.image_verified = true;
        product.image_confidence = result.confidence;
        product.image_method = Some(result.method);
    }

    verified
}
