//! exoscope-common — Shared types and errors used across all Exoscope crates.

pub mod error;
pub mod entities;

// Re-export commonly used types
pub use entities::{AnalysisResult, CatalogEntry, ExoplanetCatalog};
pub use error::{ExoscopeError, Result};
