//! Shared application state for the web server.

use std::sync::Arc;

use exoscope_lightcurve::{BlsSearch, TransitSearch};
use tracing::info;

use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::render::Templates;

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub config: Config,
    pub catalog: CatalogStore,
    pub templates: Templates,
    /// `None` when period search is disabled; uploads are then only acknowledged.
    pub search: Option<Arc<dyn TransitSearch>>,
}

impl AppState {
    /// Build state from config, wiring up a BLS search when analysis is enabled.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let search: Option<Arc<dyn TransitSearch>> = if config.analysis.enabled {
            let bls = BlsSearch::new(config.analysis.bls.clone(), config.analysis.flatten.clone())?;
            Some(Arc::new(bls))
        } else {
            info!("Period search disabled; uploads will not be analysed");
            None
        };
        Ok(Self::with_search(config, search))
    }

    /// Build state with an explicit search implementation.
    pub fn with_search(config: Config, search: Option<Arc<dyn TransitSearch>>) -> Self {
        Self {
            catalog: CatalogStore::new(config.catalog.path.clone()),
            templates: Templates::new(config.server.templates_dir.clone()),
            search,
            config,
        }
    }
}

pub type SharedState = Arc<AppState>;
