//! exoscope-web — Web front end for Exoscope
//! Provides:
//!   - Transit-parameter form and placeholder classifier
//!   - Light-curve upload with BLS period search
//!   - Catalog explorer backed by `exoplanets.json`

pub mod config;
pub mod catalog;
pub mod error;
pub mod render;
pub mod router;
pub mod handlers;
pub mod state;
