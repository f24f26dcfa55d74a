use std::fmt;

/// Fatal reconciliation errors. Any of these aborts the run before output is written.
///
/// Recoverable outcomes (unmatched assets, removed or repaired products,
/// missing asset directories) are never errors; they land in the report.
#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad pattern, unknown vendor reference, etc.).
    ConfigValidation(String),
    /// The same product id appears twice across catalog sources.
    DuplicateId {
        id: String,
        first_source: String,
        second_source: String,
    },
    /// A vendor name with no whitelist entry, alias, or slug match.
    UnknownVendor {
        source: String,
        record_id: String,
        vendor: String,
    },
    /// A required catalog source could not be read or parsed.
    SourceUnreadable { source: String, message: String },
    /// A catalog record that is not an object, or has an unusable field type.
    InvalidRecord {
        source: String,
        index: usize,
        message: String,
    },
    /// IO error (output staging, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::DuplicateId { id, first_source, second_source } => write!(
                f,
                "duplicate product id '{id}': defined in '{first_source}' and again in '{second_source}'"
            ),
            Self::UnknownVendor { source, record_id, vendor } => {
                if record_id.is_empty() {
                    write!(f, "source '{source}': unknown vendor '{vendor}'")
                } else {
                    write!(f, "source '{source}', record '{record_id}': unknown vendor '{vendor}'")
                }
            }
            Self::SourceUnreadable { source, message } => {
                write!(f, "catalog source '{source}' unreadable: {message}")
            }
            Self::InvalidRecord { source, index, message } => {
                write!(f, "source '{source}', record #{index}: {message}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_id_names_both_sources() {
        let err = ReconError::DuplicateId {
            id: "gd-001".into(),
            first_source: "gahn-delight.json".into(),
            second_source: "legacy.json".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'gd-001'"));
        assert!(msg.contains("gahn-delight.json"));
        assert!(msg.contains("legacy.json"));
    }

    #[test]
    fn unknown_vendor_without_record_id() {
        let err = ReconError::UnknownVendor {
            source: "mystery.json".into(),
            record_id: String::new(),
            vendor: "Mystery Foods".into(),
        };
        assert_eq!(err.to_string(), "source 'mystery.json': unknown vendor 'Mystery Foods'");
    }
}
