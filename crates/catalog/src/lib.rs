//! Game-asset catalog engine.
//!
//! This crate scans the catalog directories on disk (level/mod assets,
//! base-data assets, engine executables), classifies files by extension,
//! merges sidecar metadata into catalog records, and maintains the records
//! in a file-backed document store:
//! - Schemaless record collections with insert-or-merge upserts
//! - Asynchronous recursive directory walking with tracked completion
//! - Per-classifier routing of native files and JSON/text sidecars
//! - Scan summaries for observability and cancellation between I/O points

pub mod cancel;
pub mod classifier;
pub mod config;
pub mod error;
pub mod ingest;
pub mod scan;
pub mod store;
pub mod walker;

// Re-export main types
pub use cancel::CancelToken;
pub use classifier::{Classifier, IWADS, PWADS, SOURCEPORTS, SOURCEPORT_CONFIGS};
pub use config::CatalogPaths;
pub use error::{CatalogError, Result};
pub use ingest::{ingest_file, IngestOutcome};
pub use scan::{scan_catalog, scan_root, ScanSummary};
pub use store::{CatalogStore, Record, Upsert};
pub use walker::{walk, FileEntry, WalkStats};
