//! Trait for transit period search.
//!
//! The web layer holds an optional `Arc<dyn TransitSearch>`; when absent,
//! uploads are acknowledged but not analysed.

use exoscope_common::error::Result;
use serde::Serialize;
use tracing::info;

use crate::bls::BlsConfig;
use crate::flatten::FlattenConfig;
use crate::lightcurve::LightCurve;

/// Strongest periodic dip found in a light curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitSignal {
    /// Period at maximum power (days).
    pub period: f64,
    pub power: f64,
    pub depth: f64,
    pub duration: f64,
    pub transit_time: f64,
    /// Samples that survived cleaning and flattening.
    pub samples: usize,
}

/// Finds the dominant transit signal in a light curve.
///
/// Implementations are CPU-bound and called from a blocking context.
pub trait TransitSearch: Send + Sync {
    fn search(&self, lc: &LightCurve) -> Result<TransitSignal>;

    /// Short label for logs and the health endpoint.
    fn name(&self) -> &'static str;
}

/// Flatten, then run a BLS periodogram and report its peak.
#[derive(Debug, Clone, Default)]
pub struct BlsSearch {
    pub bls: BlsConfig,
    pub flatten: FlattenConfig,
}

impl BlsSearch {
    pub fn new(bls: BlsConfig, flatten: FlattenConfig) -> Result<Self> {
        bls.validate()?;
        flatten.validate()?;
        Ok(Self { bls, flatten })
    }
}

impl TransitSearch for BlsSearch {
    fn search(&self, lc: &LightCurve) -> Result<TransitSignal> {
        let flat = lc.flatten(&self.flatten)?;
        let pg = flat.to_periodogram(&self.bls)?;
        let idx = pg.max_index();

        let signal = TransitSignal {
            period: pg.period[idx],
            power: pg.power[idx],
            depth: pg.depth[idx],
            duration: pg.duration,
            transit_time: pg.transit_time[idx],
            samples: flat.len(),
        };
        info!(
            "BLS peak: period={:.4} d power={:.3e} depth={:.3e} over {} samples ({} trial periods)",
            signal.period, signal.power, signal.depth, signal.samples, pg.period.len()
        );
        Ok(signal)
    }

    fn name(&self) -> &'static str {
        "bls"
    }
}
