//! Stat catalog loading from disk.
//!
//! The engine only parses in-memory text; this module owns the file IO and
//! the lookup of the default catalog location.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use siege_core::data::StatCatalog;
use siege_core::error::CatalogError;
use thiserror::Error;

/// Catalog shipped with the workspace, compiled into the binary.
pub const BUILTIN_CATALOG: &str = include_str!("../../../assets/data/catalog.ron");

/// Environment variable overriding the catalog location.
pub const CATALOG_ENV: &str = "SIEGE_CATALOG";

/// Errors that can occur while loading a catalog file.
#[derive(Error, Debug)]
pub enum CatalogLoadError {
    /// File does not exist.
    #[error("Catalog file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read catalog file: {0}")]
    ReadError(#[from] std::io::Error),
    /// File parsed but failed validation, or did not parse.
    #[error("Invalid catalog: {0}")]
    Invalid(#[from] CatalogError),
}

/// Load and validate a catalog file.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<Arc<StatCatalog>, CatalogLoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CatalogLoadError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    let catalog = StatCatalog::from_ron_str(&contents)?;
    tracing::debug!(path = %path.display(), entries = catalog.len(), "Catalog loaded");
    Ok(Arc::new(catalog))
}

/// The compiled-in catalog.
pub fn builtin_catalog() -> Result<Arc<StatCatalog>, CatalogLoadError> {
    Ok(Arc::new(StatCatalog::from_ron_str(BUILTIN_CATALOG)?))
}

/// Load `path` if given, else the first default location found, else the
/// compiled-in catalog.
pub fn resolve_catalog(path: Option<&Path>) -> Result<Arc<StatCatalog>, CatalogLoadError> {
    match path.map(Path::to_path_buf).or_else(default_catalog_path) {
        Some(path) => load_catalog(path),
        None => builtin_catalog(),
    }
}

/// Find the catalog file from the environment or standard locations.
pub fn default_catalog_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CATALOG_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    ["assets/data/catalog.ron", "../../assets/data/catalog.ron"]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use siege_core::components::{StructureKind, UnitKind};

    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = builtin_catalog().unwrap();
        for level in 1..=5 {
            let tier = catalog.tier(level).unwrap();
            assert_eq!(tier.max_count(StructureKind::TownHall), 1);
        }
        assert!(catalog.unit_stats(UnitKind::Balloon, 1).unwrap().is_flying);
    }

    #[test]
    fn test_load_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(BUILTIN_CATALOG.as_bytes()).unwrap();
        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(*catalog, *builtin_catalog().unwrap());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_catalog(dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, CatalogLoadError::FileNotFound(_)));
    }

    #[test]
    fn test_invalid_catalog_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "CatalogFile(structures: [StructureEntry(kind: Wall, levels: [StructureStats(hitpoints: 0, footprint: (1, 1))])], units: [])"
        )
        .unwrap();
        let err = load_catalog(file.path()).unwrap_err();
        assert!(matches!(err, CatalogLoadError::Invalid(CatalogError::Invalid { .. })));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not ron at all").unwrap();
        let err = load_catalog(file.path()).unwrap_err();
        assert!(matches!(err, CatalogLoadError::Invalid(CatalogError::Parse(_))));
    }
}
