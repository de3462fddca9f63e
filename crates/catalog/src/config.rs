//! Catalog directory layout.
//!
//! The three scan roots live under a single catalog root, discovered
//! relative to the application's installation location, with the per-user
//! data directory as fallback. A missing root directory is not fatal; the
//! scan skips it and continues.

use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};

/// Root directory of level/mod asset files.
pub const PWADS_DIR: &str = "pwads";
/// Root directory of base-data asset files.
pub const IWADS_DIR: &str = "iwads";
/// Root directory of engine executables and their configs.
pub const SOURCEPORTS_DIR: &str = "sourceports";

const STORE_FILENAME: &str = "catalog.json";

/// The catalog root and the well-known locations beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPaths {
    root: PathBuf,
}

impl CatalogPaths {
    /// A catalog rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Discovers the catalog root next to the running executable, falling
    /// back to a `catalog` directory under the per-user data directory.
    pub fn discover() -> Result<Self> {
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                log::debug!("catalog root discovered at {}", dir.display());
                return Ok(Self::new(dir));
            }
        }
        dirs::data_dir()
            .map(|dir| Self::new(dir.join("catalog")))
            .ok_or_else(|| CatalogError::Store("no data directory available".to_string()))
    }

    /// The catalog root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan root for level/mod assets.
    pub fn pwads(&self) -> PathBuf {
        self.root.join(PWADS_DIR)
    }

    /// Scan root for base-data assets.
    pub fn iwads(&self) -> PathBuf {
        self.root.join(IWADS_DIR)
    }

    /// Scan root for engine executables.
    pub fn sourceports(&self) -> PathBuf {
        self.root.join(SOURCEPORTS_DIR)
    }

    /// Location of the persisted catalog file.
    pub fn store_file(&self) -> PathBuf {
        self.root.join(STORE_FILENAME)
    }
}
