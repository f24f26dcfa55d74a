//! `kfar-recon`: catalog reconciliation engine.
//!
//! Pure engine crate: receives catalog sources and scanned assets, returns a
//! validated catalog plus an audit report. No CLI or filesystem dependencies.

pub mod config;
pub mod emit;
pub mod engine;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod model;
pub mod report;
pub mod resolve;
pub mod source;
pub mod validate;
pub mod vendor;

pub use config::ReconConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{AssetRecord, ProductRecord, ReconInput, ReconResult};
pub use source::{CatalogSource, MemorySource};
