mod static_catalog;

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::error::{Error, Result};

pub use static_catalog::{CatalogEntry, StaticCatalog};

/// `prices.json` in the user's data directory.
pub fn default_catalog_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "costtree").map(|d| d.data_dir().join("prices.json"))
}

pub fn parse_catalog_json(data: &str) -> serde_json::Result<StaticCatalog> {
    let entries: Vec<CatalogEntry> = serde_json::from_str(data)?;
    Ok(StaticCatalog::new(entries))
}

pub fn load_catalog(path: &Path) -> Result<StaticCatalog> {
    let data = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let catalog = parse_catalog_json(&data).map_err(|e| Error::Catalog {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    tracing::debug!("Loaded {} prices from {}", catalog.len(), path.display());
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_catalog() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"vendorName": "aws", "service": "AmazonEC2", "price": "0.1"}}]"#
        )
        .unwrap();

        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_load_catalog_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("prices.json");
        assert!(matches!(load_catalog(&missing), Err(Error::Io { .. })));

        fs::write(&missing, r#"[{"vendorName": "aws"}]"#).unwrap();
        assert!(matches!(load_catalog(&missing), Err(Error::Catalog { .. })));
    }
}
