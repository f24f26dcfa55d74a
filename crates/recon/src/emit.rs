//! Rendering of run outputs.
//!
//! Everything renders from the validated catalog held in [`ReconResult`], in
//! memory, before a single byte is written. The writer in `kfar-io` then
//! persists all outputs together or none.

use serde::Serialize;
use serde_json::Value;

use crate::config::{OutputConfig, SqlDialect};
use crate::error::ReconError;
use crate::model::{ProductRecord, ReconResult};
use crate::report::ReconSummary;
use crate::vendor::slugify;

/// Which file an output is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Catalog,
    Report,
    TypeScript,
    Sql,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOutput {
    pub kind: OutputKind,
    /// Destination path as configured (relative paths are the caller's concern).
    pub path: String,
    pub contents: String,
}

#[derive(Serialize)]
struct CatalogDocument<'a> {
    products: &'a [ProductRecord],
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ReconError> {
    let mut out = serde_json::to_string_pretty(value).map_err(|e| ReconError::Io(e.to_string()))?;
    out.push('\n');
    Ok(out)
}

pub fn render_catalog_json(products: &[ProductRecord]) -> Result<String, ReconError> {
    to_pretty_json(&CatalogDocument { products })
}

pub fn render_report_json(result: &ReconResult) -> Result<String, ReconError> {
    to_pretty_json(&result.report)
}

/// Typed source module exporting the catalog and the run summary.
pub fn render_typescript(
    products: &[ProductRecord],
    summary: &ReconSummary,
    export_name: &str,
) -> Result<String, ReconError> {
    let products_json = serde_json::to_string_pretty(products).map_err(|e| ReconError::Io(e.to_string()))?;
    let summary_json = serde_json::to_string_pretty(summary).map_err(|e| ReconError::Io(e.to_string()))?;

    let mut out = String::new();
    out.push_str("// Generated by kfar recon. Do not edit by hand.\n\n");
    out.push_str("import { Product } from '@/lib/types';\n\n");
    out.push_str(&format!("export const {export_name}: Product[] = {products_json};\n\n"));
    out.push_str(&format!("export const imageVerificationStats = {summary_json};\n"));
    Ok(out)
}

const SQL_COLUMNS: &[&str] = &[
    "id",
    "vendor_id",
    "name",
    "slug",
    "description",
    "category",
    "price",
    "image_path",
    "image_verified",
    "image_confidence",
];

/// One upsert per product. Re-running the file is safe: existing rows are updated.
pub fn render_sql(products: &[ProductRecord], table: &str, dialect: SqlDialect) -> String {
    let columns = SQL_COLUMNS.join(", ");
    let updates: Vec<String> = SQL_COLUMNS[1..]
        .iter()
        .map(|c| match dialect {
            SqlDialect::Postgres => format!("  {c} = EXCLUDED.{c}"),
            SqlDialect::Mysql => format!("  {c} = VALUES({c})"),
        })
        .collect();
    let conflict = match dialect {
        SqlDialect::Postgres => "ON CONFLICT (id) DO UPDATE SET",
        SqlDialect::Mysql => "ON DUPLICATE KEY UPDATE",
    };

    let mut out = String::new();
    for p in products {
        let values = [
            sql_str(&p.id),
            sql_str(&p.vendor_id),
            sql_str(&p.name),
            sql_str(&slugify(&p.name)),
            sql_opt(p.description.as_deref()),
            sql_str(p.category().unwrap_or("General")),
            p.price.as_ref().map_or_else(|| "NULL".to_string(), |n| n.to_string()),
            sql_opt(p.image.as_deref()),
            if p.image_verified { "TRUE" } else { "FALSE" }.to_string(),
            p.image_confidence.to_string(),
        ];
        out.push_str(&format!(
            "INSERT INTO {table} ({columns})\nVALUES ({})\n{conflict}\n{};\n\n",
            values.join(", "),
            updates.join(",\n")
        ));
    }
    out
}

fn sql_str(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn sql_opt(s: Option<&str>) -> String {
    s.map_or_else(|| "NULL".to_string(), sql_str)
}

/// Render every configured output. Fails before anything touches disk.
pub fn render_outputs(result: &ReconResult, output: &OutputConfig) -> Result<Vec<RenderedOutput>, ReconError> {
    let mut rendered = vec![
        RenderedOutput {
            kind: OutputKind::Catalog,
            path: output.catalog.clone(),
            contents: render_catalog_json(&result.catalog)?,
        },
        RenderedOutput {
            kind: OutputKind::Report,
            path: output.report.clone(),
            contents: render_report_json(result)?,
        },
    ];

    if let Some(ref path) = output.typescript {
        rendered.push(RenderedOutput {
            kind: OutputKind::TypeScript,
            path: path.clone(),
            contents: render_typescript(&result.catalog, &result.report.summary, &output.typescript_export)?,
        });
    }

    if let Some(ref path) = output.sql {
        rendered.push(RenderedOutput {
            kind: OutputKind::Sql,
            path: path.clone(),
            contents: render_sql(&result.catalog, &output.sql_table, output.sql_dialect),
        });
    }

    Ok(rendered)
}

/// Parse a rendered catalog back into its product array. Used by callers that
/// feed a previous run's output into the next one.
pub fn parse_catalog_json(input: &str) -> Result<Vec<Value>, ReconError> {
    let doc: Value = serde_json::from_str(input).map_err(|e| ReconError::Io(e.to_string()))?;
    match doc {
        Value::Object(mut map) => match map.remove("products") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ReconError::Io("catalog has no 'products' array".into())),
        },
        Value::Array(items) => Ok(items),
        _ => Err(ReconError::Io("catalog must be an object or array".into())),
    }
}
