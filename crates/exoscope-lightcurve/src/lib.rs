//! exoscope-lightcurve — Light-curve parsing, detrending and transit search.
//!
//! Provides:
//!   - `LightCurve` construction from uploaded CSV (`time`, `flux` columns)
//!   - Savitzky–Golay `flatten` with iterative sigma clipping
//!   - Box least squares (BLS) periodogram
//!   - `TransitSearch` trait and its BLS implementation

pub mod lightcurve;
pub mod flatten;
pub mod bls;
pub mod search;

pub use lightcurve::{has_time_flux_columns, LightCurve};
pub use flatten::FlattenConfig;
pub use bls::{BlsConfig, BlsPeriodogram};
pub use search::{BlsSearch, TransitSearch, TransitSignal};
