//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! A run that finishes is a success, even when assets stay unmatched or
//! products are removed. Non-zero means nothing was written.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 2    | CLI usage error (bad args, unreadable config file)   |
//! | 3    | Invalid config (parse, validation, colliding outputs)|
//! | 4    | Duplicate product id across catalog sources          |
//! | 5    | Unknown vendor (source or record) with no alias      |
//! | 6    | Required catalog source unreadable or malformed      |
//! | 7    | Output could not be written                          |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `recon_exit_code`

use kfar_recon::ReconError;

/// Success - command completed, report and catalog written.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, config file missing.
pub const EXIT_USAGE: u8 = 2;

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Two records share a product id.
pub const EXIT_DUPLICATE_ID: u8 = 4;

/// A vendor name resolved to nothing, on a configured source or a record.
pub const EXIT_UNKNOWN_VENDOR: u8 = 5;

/// A required catalog source could not be read or parsed.
pub const EXIT_SOURCE_UNREADABLE: u8 = 6;

/// Staging or renaming an output file failed.
pub const EXIT_OUTPUT_WRITE: u8 = 7;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::DuplicateId { .. } => EXIT_DUPLICATE_ID,
        ReconError::UnknownVendor { .. } => EXIT_UNKNOWN_VENDOR,
        ReconError::SourceUnreadable { .. } | ReconError::InvalidRecord { .. } => EXIT_SOURCE_UNREADABLE,
        ReconError::Io(_) => EXIT_OUTPUT_WRITE,
    }
}
