//! On-disk cache of reference tables, one CSV file per table.
//!
//! The header row holds the upper-cased column names; every cell is stored
//! as text. A cached table is reloaded instead of being fetched again.

use super::Result;
use crate::core::reference::NciTable;
use crate::error::StorageError;
use crate::utils::error_helpers::convert_io_error;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct NciStore {
    dir: PathBuf,
}

impl NciStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StorageError::Cache {
                name: name.to_string(),
                message: "table name is not a valid file name".to_string(),
            });
        }
        Ok(self.dir.join(format!("{}.csv", name)))
    }

    /// Cached copy of `name`, or `None` when nothing was cached yet.
    pub fn load(&self, name: &str) -> Result<Option<NciTable>> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(None);
        }

        let cache_error = |e: csv::Error| StorageError::Cache {
            name: name.to_string(),
            message: e.to_string(),
        };

        let mut reader = csv::Reader::from_path(&path).map_err(cache_error)?;
        let columns: Vec<String> = reader
            .headers()
            .map_err(cache_error)?
            .iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(cache_error)?;
            rows.push(record.iter().map(String::from).collect());
        }

        log::info!("Loaded reference table '{}' from cache", name);
        Ok(Some(NciTable::new(name, columns, rows)))
    }

    pub fn save(&self, table: &NciTable) -> Result<()> {
        let path = self.path_for(table.name())?;
        fs::create_dir_all(&self.dir).map_err(|e| convert_io_error(e, &self.dir))?;

        let cache_error = |e: csv::Error| StorageError::Cache {
            name: table.name().to_string(),
            message: e.to_string(),
        };

        let mut writer = csv::Writer::from_path(&path).map_err(cache_error)?;
        writer.write_record(table.columns()).map_err(cache_error)?;
        for row in table.rows() {
            writer.write_record(row).map_err(cache_error)?;
        }
        writer.flush().map_err(|e| convert_io_error(e, &path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> NciTable {
        NciTable::new(
            "units",
            vec!["code".to_string(), "label".to_string()],
            vec![
                vec!["kg".to_string(), "Kilogram".to_string()],
                vec!["t".to_string(), "Tonne, metric".to_string()],
            ],
        )
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = NciStore::new(dir.path().join("nci"));

        assert!(store.load("units").unwrap().is_none());
        store.save(&sample()).unwrap();

        let loaded = store.load("units").unwrap().expect("cached table");
        assert_eq!(loaded.columns(), ["CODE", "LABEL"]);
        assert_eq!(loaded.lookup("t", "LABEL"), Some("Tonne, metric"));

        let header = fs::read_to_string(dir.path().join("nci").join("units.csv")).unwrap();
        assert!(header.starts_with("CODE,LABEL"));
    }

    #[test]
    fn test_rejects_path_like_names() {
        let store = NciStore::new("/tmp");
        assert!(store.path_for("../etc").is_err());
        assert!(store.path_for("a/b").is_err());
        assert!(store.path_for("").is_err());
    }

    #[test]
    fn test_corrupt_file_is_cache_error() {
        let dir = tempdir().unwrap();
        let store = NciStore::new(dir.path());
        fs::write(dir.path().join("bad.csv"), "A,B\n1,2,3\n").unwrap();
        assert!(matches!(
            store.load("bad"),
            Err(StorageError::Cache { .. })
        ));
    }
}
