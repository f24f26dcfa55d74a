// End-to-end tests for the kfar binary: exit codes, written files, --json stdout.
//
// Each test builds a throwaway project (config, catalog, image tree) in a
// temp dir and runs the real binary against it.
//
// Run with: cargo test -p kfar-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const CONFIG: &str = r#"
name = "cli-fixture"

[[assets]]
root = "public/teva"
vendor = "teva-deli"

[[assets]]
root = "public/missing"

[[sources]]
vendor = "Teva Deli"
file = "catalogs/teva.json"

[output]
catalog = "out/catalog.json"
report = "out/report.json"
sql = "out/products.sql"
"#;

const TEVA: &str = r#"[
  {"id": "td-001", "name": "Seitan Schnitzel", "price": 45, "description": "Crispy.", "image": "/images/td-001.jpg"},
  {"id": "td-002", "name": "Smoked Hummus", "price": 12, "description": "Smooth.", "image": "/images/td-002.jpg"}
]"#;

fn kfar(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kfar"));
    cmd.current_dir(dir);
    cmd.env_remove("RUST_LOG");
    cmd
}

fn project(config: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("catalogs")).unwrap();
    fs::create_dir_all(root.join("public/teva")).unwrap();
    fs::write(root.join("kfar.recon.toml"), config).unwrap();
    fs::write(root.join("catalogs/teva.json"), TEVA).unwrap();
    fs::write(root.join("public/teva/td-001-front.jpg"), b"jpg").unwrap();
    fs::write(root.join("public/teva/random_logo.png"), b"png").unwrap();
    fs::write(root.join("public/teva/notes.txt"), b"not an image").unwrap();
    dir
}

fn run(dir: &Path, extra: &[&str]) -> Output {
    let mut args = vec!["run", "kfar.recon.toml"];
    args.extend_from_slice(extra);
    kfar(dir).args(&args).output().expect("kfar run")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn read_json(path: &Path) -> serde_json::Value {
    let text = fs::read_to_string(path).unwrap_or_else(|e| panic!("{}: {e}", path.display()));
    serde_json::from_str(&text).unwrap()
}

// ===========================================================================
// kfar run
// ===========================================================================

#[test]
fn run_writes_catalog_and_report() {
    let dir = project(CONFIG);
    let output = run(dir.path(), &[]);
    assert_success(&output);

    let catalog = read_json(&dir.path().join("out/catalog.json"));
    let products = catalog["products"].as_array().expect("products array");
    assert_eq!(products.len(), 2);
    assert_eq!(products[0]["id"], "td-001");
    assert_eq!(products[0]["image"], "/images/products/td-001-front.jpg");
    assert_eq!(products[0]["imageVerified"], true);
    assert_eq!(products[1]["imageVerified"], false);

    let report = read_json(&dir.path().join("out/report.json"));
    assert_eq!(report["summary"]["totalAssetsScanned"], 2);
    assert_eq!(report["summary"]["matchedAssets"], 1);
    assert_eq!(report["summary"]["unmatchedAssets"], 1);
    assert_eq!(report["unmatchedImages"][0]["fileName"], "random_logo.png");

    let sql = fs::read_to_string(dir.path().join("out/products.sql")).unwrap();
    assert!(sql.contains("'td-001'"));
    assert!(sql.contains("ON CONFLICT (id) DO UPDATE SET"));
}

#[test]
fn missing_asset_root_is_reported_not_fatal() {
    let dir = project(CONFIG);
    let output = run(dir.path(), &[]);
    assert_success(&output);

    let report = read_json(&dir.path().join("out/report.json"));
    assert_eq!(report["skippedAssetRoots"], serde_json::json!(["public/missing"]));
}

#[test]
fn rerun_is_byte_identical() {
    let dir = project(CONFIG);
    assert_success(&run(dir.path(), &[]));
    let first: Vec<Vec<u8>> = ["out/catalog.json", "out/report.json", "out/products.sql"]
        .iter()
        .map(|p| fs::read(dir.path().join(p)).unwrap())
        .collect();

    assert_success(&run(dir.path(), &[]));
    let second: Vec<Vec<u8>> = ["out/catalog.json", "out/report.json", "out/products.sql"]
        .iter()
        .map(|p| fs::read(dir.path().join(p)).unwrap())
        .collect();

    assert_eq!(first, second);
}

#[test]
fn dry_run_json_prints_report_and_writes_nothing() {
    let dir = project(CONFIG);
    let output = run(dir.path(), &["--dry-run", "--json"]);
    assert_success(&output);

    assert!(!dir.path().join("out").exists(), "dry run must not create out/");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(stdout.trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\n{stdout}"));
    assert_eq!(report["meta"]["configName"], "cli-fixture");
    assert_eq!(report["summary"]["matchedAssets"], 1);
}

#[test]
fn duplicate_id_exits_4_and_writes_nothing() {
    let config = format!(
        "{CONFIG}\n[[sources]]\nvendor = \"teva-deli\"\nfile = \"catalogs/teva-again.json\"\n"
    );
    let dir = project(&config);
    fs::write(
        dir.path().join("catalogs/teva-again.json"),
        r#"[{"id": "td-002", "name": "Other Hummus", "price": 9, "image": "/x.jpg"}]"#,
    )
    .unwrap();

    let output = run(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate product id 'td-002'"), "stderr: {stderr}");
    assert!(!dir.path().join("out").exists());
}

#[test]
fn unreadable_required_source_exits_6() {
    let dir = project(CONFIG);
    fs::write(dir.path().join("catalogs/teva.json"), "{ not json").unwrap();

    let output = run(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(6));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn missing_config_file_exits_2() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn unknown_source_vendor_exits_5() {
    let dir = project(&CONFIG.replace("vendor = \"Teva Deli\"", "vendor = \"Mystery Foods\""));

    let output = kfar(dir.path()).args(["check", "kfar.recon.toml"]).output().unwrap();
    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown vendor 'Mystery Foods'"), "stderr: {stderr}");

    assert_eq!(run(dir.path(), &[]).status.code(), Some(5));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn colliding_output_paths_exit_3() {
    let dir = project(&CONFIG.replace("sql = \"out/products.sql\"", "sql = \"out/report.json\""));
    let output = run(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(3));
    assert!(!dir.path().join("out").exists());
}

// ===========================================================================
// kfar check / scan
// ===========================================================================

#[test]
fn check_accepts_valid_config() {
    let dir = project(CONFIG);
    let output = kfar(dir.path()).args(["check", "kfar.recon.toml"]).output().unwrap();
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stderr).contains("ok: cli-fixture"));
}

#[test]
fn check_rejects_config_without_sources() {
    let dir = project("name = \"empty\"\n");
    let output = kfar(dir.path()).args(["check", "kfar.recon.toml"]).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("at least one catalog source"));
}

#[test]
fn scan_json_lists_images_only() {
    let dir = project(CONFIG);
    let output = kfar(dir.path()).args(["scan", "kfar.recon.toml", "--json"]).output().unwrap();
    assert_success(&output);

    let listed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let paths: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["public/teva/random_logo.png", "public/teva/td-001-front.jpg"]);
    assert_eq!(listed[0]["vendorHint"], "teva-deli");
}
