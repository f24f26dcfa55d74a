//! `kfar run | check | scan`: config-driven catalog reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use kfar_io::{open_sources, write_outputs, AssetScanner};
use kfar_recon::emit::{render_outputs, OutputKind};
use kfar_recon::model::ReconInput;
use kfar_recon::{CatalogSource, ReconConfig, ReconError};
use serde::Serialize;

use crate::exit_codes::{recon_exit_code, EXIT_USAGE};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Match assets to products, validate the catalog, write catalog + report
    #[command(after_help = "\
Examples:
  kfar run kfar.recon.toml
  kfar run kfar.recon.toml --json
  kfar run kfar.recon.toml --dry-run --json")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Print the report JSON to stdout instead of the human summary
        #[arg(long)]
        json: bool,

        /// Run and report without writing any output file
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a recon config without running
    #[command(after_help = "\
Examples:
  kfar check kfar.recon.toml")]
    Check {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },

    /// List the assets the scanner sees, with their vendor hints
    #[command(after_help = "\
Examples:
  kfar scan kfar.recon.toml
  kfar scan kfar.recon.toml --json")]
    Scan {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, json, dry_run } => cmd_run(config, json, dry_run),
        ReconCommands::Check { config } => cmd_check(config),
        ReconCommands::Scan { config, json } => cmd_scan(config, json),
    }
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        let hint = match &err {
            ReconError::DuplicateId { .. } => {
                Some("product ids must be unique across all catalog sources; fix the upstream catalog".to_string())
            }
            ReconError::UnknownVendor { vendor, .. } => {
                Some(format!("map it under [vendors.aliases], e.g. \"{vendor}\" = \"<vendor-id>\""))
            }
            ReconError::SourceUnreadable { .. } => {
                Some("mark the source `required = false` if it may legitimately be absent".to_string())
            }
            _ => None,
        };
        CliError {
            code: recon_exit_code(&err),
            message: err.to_string(),
            hint,
        }
    }
}

/// Read and validate a config. Relative paths inside it resolve against its directory.
fn load_config(config_path: &Path) -> Result<(ReconConfig, PathBuf), CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        recon_err(EXIT_USAGE, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    let config = ReconConfig::from_toml(&config_str)?;
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

fn cmd_run(config_path: PathBuf, json_output: bool, dry_run: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;

    let scanner = AssetScanner::from_config(&config, &base_dir);
    let skipped_asset_roots = scanner.missing_roots();
    let assets = scanner.scan().collect();

    let sources = open_sources(&config.sources, &base_dir);
    let input = ReconInput {
        sources: sources.iter().map(|s| &**s as &dyn CatalogSource).collect(),
        assets,
        skipped_asset_roots,
    };

    let result = kfar_recon::run(&config, &input)?;

    // Render everything before touching disk.
    let rendered = render_outputs(&result, &config.output)?;

    if !dry_run {
        for path in write_outputs(&rendered, &base_dir)? {
            eprintln!("wrote {}", path.display());
        }
    }

    if json_output {
        if let Some(report) = rendered.iter().find(|o| o.kind == OutputKind::Report) {
            print!("{}", report.contents);
        }
    }

    let s = &result.report.summary;
    eprintln!(
        "{}: {} assets scanned, {} matched (high {}, medium {}, low {}), {} unmatched, {} ambiguous",
        config.name,
        s.total_assets_scanned,
        s.matched_assets,
        s.confidence_bands.high,
        s.confidence_bands.medium,
        s.confidence_bands.low,
        s.unmatched_assets,
        s.ambiguous_matches,
    );
    eprintln!(
        "catalog: {} products, {} kept ({} fixed, {} with verified images), {} removed",
        s.total_products, s.products_kept, s.products_fixed, s.products_with_verified_images, s.products_removed,
    );
    if !result.report.skipped_asset_roots.is_empty() {
        eprintln!("skipped asset roots: {}", result.report.skipped_asset_roots.join(", "));
    }
    if dry_run {
        eprintln!("dry run: nothing written");
    }

    Ok(())
}

fn cmd_check(config_path: PathBuf) -> Result<(), CliError> {
    let (config, _) = load_config(&config_path)?;
    eprintln!(
        "ok: {} ({} sources, {} asset roots, {} explicit mappings)",
        config.name,
        config.sources.len(),
        config.assets.len(),
        config.matching.explicit.len(),
    );
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScannedAsset<'a> {
    path: &'a str,
    file_name: &'a str,
    web_path: &'a str,
    vendor_hint: Option<&'a str>,
    detected_vendor: Option<&'a str>,
}

fn cmd_scan(config_path: PathBuf, json_output: bool) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    let scanner = AssetScanner::from_config(&config, &base_dir);
    let assets: Vec<_> = scanner.scan().collect();

    let listed: Vec<ScannedAsset> = assets
        .iter()
        .map(|a| ScannedAsset {
            path: &a.path,
            file_name: &a.file_name,
            web_path: &a.web_path,
            vendor_hint: a.vendor_hint.as_deref(),
            detected_vendor: config.vendors.detect_from_path(&a.path),
        })
        .collect();

    if json_output {
        let json = serde_json::to_string_pretty(&listed)
            .map_err(|e| recon_err(EXIT_USAGE, format!("JSON serialization error: {e}")))?;
        println!("{json}");
    } else {
        for a in &listed {
            let vendor = a.vendor_hint.or(a.detected_vendor).unwrap_or("-");
            println!("{}\t{}", vendor, a.path);
        }
    }

    let missing = scanner.missing_roots();
    eprintln!("{} assets in {} roots", listed.len(), scanner.roots().len() - missing.len());
    if !missing.is_empty() {
        eprintln!("missing roots: {}", missing.join(", "));
    }
    Ok(())
}
