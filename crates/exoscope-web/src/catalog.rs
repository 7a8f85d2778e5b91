//! On-disk exoplanet catalog (`exoplanets.json`).
//!
//! Reads are lenient: a missing, unreadable or corrupt file is an empty
//! catalog. Appends are serialised by an in-process lock and written to a
//! temp file that is renamed over the original.

use std::path::{Path, PathBuf};

use exoscope_common::entities::{CatalogEntry, ExoplanetCatalog};
use exoscope_common::error::Result;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub struct CatalogStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current catalog contents, empty on any read or parse failure.
    pub async fn load(&self) -> ExoplanetCatalog {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Catalog {:?} does not exist yet, starting empty", self.path);
                return ExoplanetCatalog::new();
            }
            Err(e) => {
                warn!("Could not read catalog {:?}: {}; treating as empty", self.path, e);
                return ExoplanetCatalog::new();
            }
        };

        match ExoplanetCatalog::from_json_str(&text) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Catalog {:?} is not a valid catalog: {}; treating as empty", self.path, e);
                ExoplanetCatalog::new()
            }
        }
    }

    /// Read-modify-write append. Returns the dataset's new length.
    pub async fn append(&self, dataset: &str, entry: &CatalogEntry) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut catalog = self.load().await;
        catalog.append(dataset, entry)?;
        self.write(&catalog).await?;

        let len = catalog.len_of(dataset);
        info!("Appended '{}' to catalog dataset '{}' ({} records)", entry.name, dataset, len);
        Ok(len)
    }

    async fn write(&self, catalog: &ExoplanetCatalog) -> Result<()> {
        let json = catalog.to_json_pretty()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, json.as_bytes()).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "catalog.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
