//! Asset scanner: walks vendor image directories.

use std::path::{Path, PathBuf};

use kfar_recon::config::ReconConfig;
use kfar_recon::model::AssetRecord;
use walkdir::WalkDir;

/// One configured asset root, resolved against the config directory.
#[derive(Debug, Clone)]
pub struct ScanRoot {
    /// Path as written in the config. Used in asset paths and the report so
    /// output does not depend on where the config lives.
    pub label: String,
    pub dir: PathBuf,
    /// Canonical vendor id for every asset under this root.
    pub vendor: Option<String>,
    pub url_prefix: String,
}

/// Finite, restartable asset walk. Every call to [`AssetScanner::scan`]
/// re-reads the filesystem.
#[derive(Debug, Clone)]
pub struct AssetScanner {
    roots: Vec<ScanRoot>,
    extensions: Vec<String>,
}

impl AssetScanner {
    pub fn new(roots: Vec<ScanRoot>, extensions: &[String]) -> Self {
        Self {
            roots,
            extensions: extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ReconConfig, base_dir: &Path) -> Self {
        let roots = config
            .assets
            .iter()
            .map(|a| ScanRoot {
                label: a.root.trim_end_matches('/').to_string(),
                dir: base_dir.join(&a.root),
                vendor: a.vendor.as_deref().and_then(|v| config.vendors.resolve(v)),
                url_prefix: a.url_prefix().to_string(),
            })
            .collect();
        Self::new(roots, &config.extensions)
    }

    pub fn roots(&self) -> &[ScanRoot] {
        &self.roots
    }

    /// Roots that do not exist (or are not directories) right now.
    pub fn missing_roots(&self) -> Vec<String> {
        self.roots
            .iter()
            .filter(|r| !r.dir.is_dir())
            .map(|r| r.label.clone())
            .collect()
    }

    /// Lazily walk every root in declaration order, entries sorted by file
    /// name within each directory. Missing roots yield nothing.
    pub fn scan(&self) -> impl Iterator<Item = AssetRecord> + '_ {
        self.roots.iter().flat_map(move |root| self.scan_root(root))
    }

    fn scan_root<'s>(&'s self, root: &'s ScanRoot) -> Box<dyn Iterator<Item = AssetRecord> + 's> {
        if !root.dir.is_dir() {
            log::warn!("asset root '{}' not found, skipping", root.label);
            return Box::new(std::iter::empty());
        }

        let walker = WalkDir::new(&root.dir).sort_by_file_name().into_iter();
        Box::new(walker.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("asset root '{}': {e}", root.label);
                    return None;
                }
            };
            if !entry.file_type().is_file() || !self.accepts(entry.path()) {
                return None;
            }

            let relative = entry.path().strip_prefix(&root.dir).unwrap_or(entry.path());
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            let mut asset = AssetRecord::new(format!("{}/{relative}", root.label), root.vendor.as_deref());
            asset.web_path = format!("{}/{relative}", root.url_prefix);
            Some(asset)
        }))
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| self.extensions.contains(&e))
    }
}
