//! Temporary catalog files.

use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use tempfile::TempDir;

/// A scratch directory holding `data/exoplanets.json`. Removed on drop.
pub struct TempCatalog {
    dir: TempDir,
}

impl TempCatalog {
    /// Directory with no catalog file yet.
    pub fn missing() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(dir.path().join("data")).expect("create data dir");
        Self { dir }
    }

    /// Catalog file with the given raw contents (not necessarily valid JSON).
    pub fn with_contents(contents: &str) -> Self {
        let catalog = Self::missing();
        fs::write(catalog.path(), contents).expect("write catalog");
        catalog
    }

    /// A small seeded catalog with one `kepler` record and an empty `custom` list.
    pub fn seeded() -> Self {
        Self::with_contents(
            r#"{
  "kepler": [{"name": "Kepler-10b", "period": 0.837, "radius": 0.0127}],
  "custom": []
}"#,
        )
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("data").join("exoplanets.json")
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn raw(&self) -> Option<String> {
        fs::read_to_string(self.path()).ok()
    }

    /// Parsed contents; panics if the file is not valid JSON.
    pub fn json(&self) -> Value {
        let raw = self.raw().expect("catalog file exists");
        serde_json::from_str(&raw).expect("catalog is valid JSON")
    }

    pub fn custom_len(&self) -> usize {
        self.json()["custom"].as_array().map_or(0, Vec::len)
    }
}
