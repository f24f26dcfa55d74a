//! File-backed catalog sources (JSON and CSV).

use std::path::{Path, PathBuf};

use kfar_recon::config::{SourceConfig, SourceFormat};
use kfar_recon::loader::ID_KEYS;
use kfar_recon::model::RawRecord;
use kfar_recon::{CatalogSource, ReconError};
use serde_json::Value;

/// A JSON catalog: either a top-level array of product objects or an object
/// with a `products` array (the shape `kfar run` emits).
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    pub label: String,
    pub path: PathBuf,
    pub vendor: String,
    pub required: bool,
}

impl CatalogSource for JsonFileSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn required(&self) -> bool {
        self.required
    }

    fn load(&self) -> Result<Vec<RawRecord>, ReconError> {
        let unreadable = |message: String| ReconError::SourceUnreadable {
            source: self.label.clone(),
            message,
        };

        let text = std::fs::read_to_string(&self.path).map_err(|e| unreadable(e.to_string()))?;
        let items = kfar_recon::emit::parse_catalog_json(&text).map_err(|e| match e {
            ReconError::Io(msg) => unreadable(msg),
            other => other,
        })?;

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(ReconError::InvalidRecord {
                    source: self.label.clone(),
                    index,
                    message: format!("expected an object, got {other}"),
                }),
            })
            .collect()
    }
}

/// A tabular catalog export. The first row is the header; empty cells are
/// treated as absent fields.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    pub label: String,
    pub path: PathBuf,
    pub vendor: String,
    pub required: bool,
}

impl CatalogSource for CsvFileSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn required(&self) -> bool {
        self.required
    }

    fn load(&self) -> Result<Vec<RawRecord>, ReconError> {
        let unreadable = |message: String| ReconError::SourceUnreadable {
            source: self.label.clone(),
            message,
        };

        let bytes = std::fs::read(&self.path).map_err(|e| unreadable(e.to_string()))?;
        let content = decode_catalog(&self.label, &bytes);
        let delimiter = sniff_delimiter(&content);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| unreadable(e.to_string()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result.map_err(|e| unreadable(e.to_string()))?;
            let mut record = RawRecord::new();
            for (header, field) in headers.iter().zip(row.iter()) {
                if !header.is_empty() && !field.trim().is_empty() {
                    record.insert(header.clone(), Value::String(field.trim().to_string()));
                }
            }
            if !record.is_empty() {
                records.push(record);
            }
        }
        Ok(records)
    }
}

const DELIMITERS: &[u8] = &[b',', b';', b'\t', b'|'];

/// Pick the delimiter from the header row.
///
/// A candidate must split the header into at least two named columns. An
/// id column outranks everything, then the number of following rows whose
/// width matches the header, then the column count. Ties keep the earlier
/// candidate, so plain comma files stay comma.
fn sniff_delimiter(content: &str) -> u8 {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return b',';
    };
    let rows: Vec<&str> = lines.take(8).collect();

    let mut best = (b',', (false, 0usize, 0usize));
    for &delim in DELIMITERS {
        let columns = split_line(header, delim);
        if columns.iter().filter(|c| !c.is_empty()).count() < 2 {
            continue;
        }
        let has_id = columns.iter().any(|c| ID_KEYS.contains(&c.as_str()));
        let agreeing = rows.iter().filter(|r| split_line(r, delim).len() == columns.len()).count();
        let score = (has_id, agreeing, columns.len());
        if score > best.1 {
            best = (delim, score);
        }
    }
    best.0
}

fn split_line(line: &str, delim: u8) -> Vec<String> {
    csv::ReaderBuilder::new()
        .delimiter(delim)
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes())
        .records()
        .next()
        .and_then(Result::ok)
        .map(|r| r.iter().map(|f| f.trim().to_string()).collect())
        .unwrap_or_default()
}

/// Decode a catalog export to text.
///
/// A byte-order mark (UTF-8 or UTF-16, as spreadsheet tools write them) is
/// honored and stripped; otherwise UTF-8, falling back to Windows-1252.
fn decode_catalog(label: &str, bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::debug!("catalog source '{label}' is not UTF-8, decoding as Windows-1252");
            let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

/// Build one adapter per configured source, paths resolved against `base_dir`.
pub fn open_sources(configs: &[SourceConfig], base_dir: &Path) -> Vec<Box<dyn CatalogSource>> {
    configs
        .iter()
        .map(|c| -> Box<dyn CatalogSource> {
            let path = base_dir.join(&c.file);
            match c.format() {
                SourceFormat::Json => Box::new(JsonFileSource {
                    label: c.file.clone(),
                    path,
                    vendor: c.vendor.clone(),
                    required: c.required,
                }),
                SourceFormat::Csv => Box::new(CsvFileSource {
                    label: c.file.clone(),
                    path,
                    vendor: c.vendor.clone(),
                    required: c.required,
                }),
            }
        })
        .collect()
}
