// Filesystem side of reconciliation: asset scanning, catalog files, output files

pub mod scanner;
pub mod sources;
pub mod writer;

pub use scanner::{AssetScanner, ScanRoot};
pub use sources::{open_sources, CsvFileSource, JsonFileSource};
pub use writer::write_outputs;
