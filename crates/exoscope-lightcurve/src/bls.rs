//! Box least squares (BLS) periodogram.
//!
//! For every trial period the light curve is phase-folded into bins of width
//! `duration / oversample`; a window of `oversample` consecutive bins is slid
//! across the phase to find the box-shaped dip that maximises the
//! log-likelihood objective (unit uncertainties):
//!
//! ```text
//! depth = mean_out - mean_in
//! power = 0.5 * depth^2 * n_in * n_out / (n_in + n_out)
//! ```
//!
//! Only dips (positive depth) contribute. The number of trial periods follows
//! from a frequency step of `frequency_factor * duration / baseline^2`; the
//! periods themselves are log-spaced.

use exoscope_common::error::{ExoscopeError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lightcurve::LightCurve;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlsConfig {
    /// Shortest trial period (days).
    #[serde(default = "default_minimum_period")]
    pub minimum_period: f64,
    /// Longest trial period (days).
    #[serde(default = "default_maximum_period")]
    pub maximum_period: f64,
    /// Box width (days).
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default = "default_frequency_factor")]
    pub frequency_factor: f64,
    /// Upper bound on the number of trial periods.
    #[serde(default = "default_max_periods")]
    pub max_periods: usize,
    /// Phase bins per box width.
    #[serde(default = "default_oversample")]
    pub oversample: usize,
}

fn default_minimum_period() -> f64 { 0.2 }
fn default_maximum_period() -> f64 { 30.0 }
fn default_duration() -> f64 { 0.25 }
fn default_frequency_factor() -> f64 { 10.0 }
fn default_max_periods() -> usize { 100_000 }
fn default_oversample() -> usize { 10 }

impl Default for BlsConfig {
    fn default() -> Self {
        Self {
            minimum_period: default_minimum_period(),
            maximum_period: default_maximum_period(),
            duration: default_duration(),
            frequency_factor: default_frequency_factor(),
            max_periods: default_max_periods(),
            oversample: default_oversample(),
        }
    }
}

impl BlsConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.minimum_period > 0.0) {
            return Err(ExoscopeError::Config(format!(
                "minimum_period must be positive, got {}",
                self.minimum_period
            )));
        }
        if !(self.maximum_period > self.minimum_period) {
            return Err(ExoscopeError::Config(format!(
                "maximum_period ({}) must exceed minimum_period ({})",
                self.maximum_period, self.minimum_period
            )));
        }
        if !(self.duration > 0.0) || !(self.frequency_factor > 0.0) {
            return Err(ExoscopeError::Config(
                "duration and frequency_factor must be positive".to_string(),
            ));
        }
        if self.max_periods < 2 || self.oversample == 0 {
            return Err(ExoscopeError::Config(
                "max_periods must be at least 2 and oversample at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Periodogram over the trial periods, in ascending period order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlsPeriodogram {
    pub period: Vec<f64>,
    pub power: Vec<f64>,
    /// Best-fit depth at each period (0 where no dip was found).
    pub depth: Vec<f64>,
    /// Mid-transit time of the best box at each period.
    pub transit_time: Vec<f64>,
    pub duration: f64,
}

impl BlsPeriodogram {
    /// Index of the first maximum of `power`.
    pub fn max_index(&self) -> usize {
        self.power
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, &p)| {
                if p > best.1 { (i, p) } else { best }
            })
            .0
    }

    pub fn period_at_max_power(&self) -> f64 {
        self.period[self.max_index()]
    }

    pub fn power_at_max_power(&self) -> f64 {
        self.power[self.max_index()]
    }

    pub fn depth_at_max_power(&self) -> f64 {
        self.depth[self.max_index()]
    }

    pub fn transit_time_at_max_power(&self) -> f64 {
        self.transit_time[self.max_index()]
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PeriodStat {
    power: f64,
    depth: f64,
    transit_time: f64,
}

impl LightCurve {
    /// Compute a BLS periodogram over `cfg`'s period range.
    pub fn to_periodogram(&self, cfg: &BlsConfig) -> Result<BlsPeriodogram> {
        cfg.validate()?;
        self.ensure_min_samples()?;

        let baseline = self.baseline();
        if !(baseline > 0.0) {
            return Err(ExoscopeError::InvalidLightCurve(
                "time baseline is zero; cannot search for periods".to_string(),
            ));
        }

        let periods = period_grid(baseline, cfg)?;
        debug!(
            "BLS search over {} periods in [{}, {}] days, baseline {:.3} days",
            periods.len(), cfg.minimum_period, cfg.maximum_period, baseline
        );

        let t0 = self.time()[0];
        let rel_time: Vec<f64> = self.time().iter().map(|t| t - t0).collect();
        let mean = self.flux().iter().sum::<f64>() / self.len() as f64;
        let centered: Vec<f64> = self.flux().iter().map(|f| f - mean).collect();

        let stats = evaluate_all(&periods, &rel_time, &centered, cfg);

        Ok(BlsPeriodogram {
            power: stats.iter().map(|s| s.power).collect(),
            depth: stats.iter().map(|s| s.depth).collect(),
            transit_time: stats.iter().map(|s| t0 + s.transit_time).collect(),
            period: periods,
            duration: cfg.duration,
        })
    }
}

#[cfg(feature = "parallel")]
fn evaluate_all(periods: &[f64], time: &[f64], flux: &[f64], cfg: &BlsConfig) -> Vec<PeriodStat> {
    use rayon::prelude::*;
    periods
        .par_iter()
        .map(|&p| search_period(time, flux, p, cfg.duration, cfg.oversample))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn evaluate_all(periods: &[f64], time: &[f64], flux: &[f64], cfg: &BlsConfig) -> Vec<PeriodStat> {
    periods
        .iter()
        .map(|&p| search_period(time, flux, p, cfg.duration, cfg.oversample))
        .collect()
}

/// Trial periods, log-spaced between the configured bounds.
///
/// The count comes from the frequency resolution needed to keep a transit of
/// `duration` in phase across the whole baseline. A grid larger than
/// `max_periods` is an error rather than a coarser grid.
pub fn period_grid(baseline: f64, cfg: &BlsConfig) -> Result<Vec<f64>> {
    let df = cfg.frequency_factor * cfg.duration / (baseline * baseline);
    let required = (1.0 / cfg.minimum_period - 1.0 / cfg.maximum_period) / df;
    if !(required <= cfg.max_periods as f64) {
        return Err(ExoscopeError::InvalidLightCurve(format!(
            "period grid needs {:.0} trial periods for a {:.1} day baseline, above the limit of {}; \
             raise frequency_factor or max_periods",
            required, baseline, cfg.max_periods
        )));
    }

    let npoints = (required as usize).max(2);
    let ln_min = cfg.minimum_period.ln();
    let step = (cfg.maximum_period.ln() - ln_min) / (npoints - 1) as f64;
    let mut grid: Vec<f64> = (0..npoints)
        .map(|k| (ln_min + k as f64 * step).exp())
        .collect();
    grid[0] = cfg.minimum_period;
    grid[npoints - 1] = cfg.maximum_period;
    Ok(grid)
}

/// Best box for one period. `time` is relative to the first sample and `flux` mean-centred.
fn search_period(time: &[f64], flux: &[f64], period: f64, duration: f64, oversample: usize) -> PeriodStat {
    if period <= duration {
        return PeriodStat::default();
    }

    let bin_width = duration / oversample as f64;
    let nbins = (period / bin_width).ceil() as usize;
    let mut counts = vec![0usize; nbins];
    let mut sums = vec![0.0f64; nbins];
    for (t, y) in time.iter().zip(flux) {
        let phase = t.rem_euclid(period);
        let bin = ((phase / bin_width) as usize).min(nbins - 1);
        counts[bin] += 1;
        sums[bin] += y;
    }

    let total_n = time.len();
    let total_y: f64 = sums.iter().sum();
    let mut n_in: usize = counts[..oversample].iter().sum();
    let mut y_in: f64 = sums[..oversample].iter().sum();
    let mut best = PeriodStat::default();

    for start in 0..nbins {
        if start > 0 {
            let leaving = start - 1;
            let entering = (start + oversample - 1) % nbins;
            n_in = n_in - counts[leaving] + counts[entering];
            y_in = y_in - sums[leaving] + sums[entering];
        }

        let n_out = total_n - n_in;
        if n_in == 0 || n_out == 0 {
            continue;
        }
        let depth = (total_y - y_in) / n_out as f64 - y_in / n_in as f64;
        if depth <= 0.0 {
            continue;
        }
        let ivar = (n_in * n_out) as f64 / total_n as f64;
        let power = 0.5 * depth * depth * ivar;
        if power > best.power {
            let mid = (start as f64 + oversample as f64 / 2.0) * bin_width;
            best = PeriodStat {
                power,
                depth,
                transit_time: mid.rem_euclid(period),
            };
        }
    }
    best
}
