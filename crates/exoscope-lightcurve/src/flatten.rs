//! Detrending via a Savitzky–Golay trend with iterative sigma clipping.
//!
//! The trend is fitted per contiguous segment (gaps larger than
//! `break_tolerance` times the median cadence start a new segment), then the
//! flux is divided by it so a flat star sits at 1.0.

use std::ops::Range;

use exoscope_common::error::{ExoscopeError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lightcurve::{median, LightCurve};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlattenConfig {
    /// Samples per smoothing window. Must be odd.
    #[serde(default = "default_window_length")]
    pub window_length: usize,
    #[serde(default = "default_polyorder")]
    pub polyorder: usize,
    /// Residuals further than `sigma` standard deviations are excluded from the next fit.
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    #[serde(default = "default_niters")]
    pub niters: usize,
    /// Gap size, in median cadences, that splits the series into segments.
    #[serde(default = "default_break_tolerance")]
    pub break_tolerance: f64,
}

fn default_window_length() -> usize { 101 }
fn default_polyorder() -> usize { 2 }
fn default_sigma() -> f64 { 3.0 }
fn default_niters() -> usize { 3 }
fn default_break_tolerance() -> f64 { 5.0 }

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            window_length: default_window_length(),
            polyorder: default_polyorder(),
            sigma: default_sigma(),
            niters: default_niters(),
            break_tolerance: default_break_tolerance(),
        }
    }
}

impl FlattenConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_length < 3 || self.window_length % 2 == 0 {
            return Err(ExoscopeError::Config(format!(
                "flatten window_length must be odd and >= 3, got {}",
                self.window_length
            )));
        }
        if self.polyorder >= self.window_length {
            return Err(ExoscopeError::Config(format!(
                "flatten polyorder ({}) must be less than window_length ({})",
                self.polyorder, self.window_length
            )));
        }
        if !(self.sigma > 0.0) || self.niters == 0 {
            return Err(ExoscopeError::Config(
                "flatten sigma must be positive and niters at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl LightCurve {
    /// Remove long-term trends, returning `flux / trend`.
    pub fn flatten(&self, cfg: &FlattenConfig) -> Result<LightCurve> {
        cfg.validate()?;
        self.ensure_min_samples()?;

        let trend = fit_trend(self.time(), self.flux(), cfg);
        let flux = self
            .flux()
            .iter()
            .zip(&trend)
            .map(|(f, t)| f / t)
            .collect();

        let flat = self.with_flux(flux).remove_nans();
        flat.ensure_min_samples()?;
        Ok(flat)
    }
}

/// Trend for the whole series, fitted independently on each segment.
pub fn fit_trend(time: &[f64], flux: &[f64], cfg: &FlattenConfig) -> Vec<f64> {
    let mut trend = vec![0.0; flux.len()];
    let segments = segments(time, cfg.break_tolerance);
    debug!("Flattening {} samples in {} segment(s)", flux.len(), segments.len());

    for range in segments {
        let seg = segment_trend(&time[range.clone()], &flux[range.clone()], cfg);
        trend[range].copy_from_slice(&seg);
    }
    trend
}

/// Split at gaps wider than `tolerance` median cadences.
fn segments(time: &[f64], tolerance: f64) -> Vec<Range<usize>> {
    let n = time.len();
    if n < 2 {
        return vec![0..n];
    }
    let diffs: Vec<f64> = time.windows(2).map(|w| w[1] - w[0]).collect();
    let cadence = median(&diffs).unwrap_or(0.0);
    if cadence <= 0.0 {
        return vec![0..n];
    }

    let mut out = Vec::new();
    let mut start = 0;
    for (i, gap) in diffs.iter().enumerate() {
        if *gap > tolerance * cadence {
            out.push(start..i + 1);
            start = i + 1;
        }
    }
    out.push(start..n);
    out
}

fn segment_trend(time: &[f64], flux: &[f64], cfg: &FlattenConfig) -> Vec<f64> {
    let n = flux.len();
    let mut trend = vec![median(flux).unwrap_or(1.0); n];
    let mut mask = vec![true; n];
    // Residuals below this are rounding noise, not outliers.
    let abs_flux: Vec<f64> = flux.iter().map(|f| f.abs()).collect();
    let floor = median(&abs_flux).unwrap_or(0.0) * 1e-9;

    for _ in 0..cfg.niters {
        let kept: Vec<usize> = (0..n).filter(|&i| mask[i]).collect();
        let window = effective_window(cfg.window_length, kept.len());
        if window <= cfg.polyorder {
            // Too few points for a polynomial; the median trend stands.
            break;
        }

        let ys: Vec<f64> = kept.iter().map(|&i| flux[i]).collect();
        let xs: Vec<f64> = kept.iter().map(|&i| time[i]).collect();
        let smoothed = savgol_filter(&ys, window, cfg.polyorder);
        trend = time.iter().map(|&t| interp(t, &xs, &smoothed)).collect();

        let residuals: Vec<f64> = flux.iter().zip(&trend).map(|(f, t)| f - t).collect();
        let clipped = sigma_clip(&residuals, cfg.sigma, floor);

        let mut changed = false;
        for (m, c) in mask.iter_mut().zip(clipped) {
            if *m && c {
                *m = false;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    trend
}

/// Largest odd window not exceeding `len`.
fn effective_window(requested: usize, len: usize) -> usize {
    if requested <= len {
        requested
    } else if len % 2 == 0 {
        len.saturating_sub(1)
    } else {
        len
    }
}

/// Savitzky–Golay smoothing. Edge samples are evaluated from the polynomial
/// fitted to the first/last full window. Requires `y.len() >= window`.
pub fn savgol_filter(y: &[f64], window: usize, polyorder: usize) -> Vec<f64> {
    let n = y.len();
    let half = window / 2;
    let weights: Vec<Vec<f64>> = (0..window)
        .map(|pos| savgol_weights(window, polyorder, pos))
        .collect();

    (0..n)
        .map(|i| {
            let (start, pos) = if i < half {
                (0, i)
            } else if i + half >= n {
                (n - window, i + window - n)
            } else {
                (i - half, half)
            };
            weights[pos]
                .iter()
                .zip(&y[start..start + window])
                .map(|(w, v)| w * v)
                .sum()
        })
        .collect()
}

/// Weights that evaluate the least-squares polynomial of a window at `pos`.
fn savgol_weights(window: usize, polyorder: usize, pos: usize) -> Vec<f64> {
    let half = (window / 2).max(1) as f64;
    let center = (window / 2) as f64;
    let xs: Vec<f64> = (0..window).map(|j| (j as f64 - center) / half).collect();
    let x_eval = (pos as f64 - center) / half;
    let terms = polyorder + 1;

    let mut normal = vec![vec![0.0; terms]; terms];
    for x in &xs {
        let row = powers(*x, terms);
        for a in 0..terms {
            for b in 0..terms {
                normal[a][b] += row[a] * row[b];
            }
        }
    }

    match solve(normal, powers(x_eval, terms)) {
        Some(z) => xs
            .iter()
            .map(|x| powers(*x, terms).iter().zip(&z).map(|(p, c)| p * c).sum())
            .collect(),
        None => vec![1.0 / window as f64; window],
    }
}

fn powers(x: f64, terms: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(terms);
    let mut acc = 1.0;
    for _ in 0..terms {
        out.push(acc);
        acc *= x;
    }
    out
}

/// Gaussian elimination with partial pivoting. `None` when singular.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Some(x)
}

/// Linear interpolation over sorted `xs`, clamped to the end values.
fn interp(t: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let last = xs.len() - 1;
    if t <= xs[0] {
        return ys[0];
    }
    if t >= xs[last] {
        return ys[last];
    }
    let j = xs.partition_point(|x| *x <= t);
    let i = j - 1;
    let span = xs[j] - xs[i];
    if span <= 0.0 {
        return ys[i];
    }
    ys[i] + (ys[j] - ys[i]) * (t - xs[i]) / span
}

/// Iterative median/std clipping. Returns `true` for clipped entries.
/// Deviations at or below `floor` are never clipped.
fn sigma_clip(values: &[f64], sigma: f64, floor: f64) -> Vec<bool> {
    let mut clipped: Vec<bool> = values.iter().map(|v| !v.is_finite()).collect();

    for _ in 0..5 {
        let kept: Vec<f64> = values
            .iter()
            .zip(&clipped)
            .filter(|(_, c)| !**c)
            .map(|(v, _)| *v)
            .collect();
        let Some(center) = median(&kept) else { break };
        let mean = kept.iter().sum::<f64>() / kept.len() as f64;
        let std = (kept.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / kept.len() as f64).sqrt();
        if std == 0.0 {
            break;
        }

        let mut changed = false;
        for (v, c) in values.iter().zip(clipped.iter_mut()) {
            if !*c && (v - center).abs() > (sigma * std).max(floor) {
                *c = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_time(n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * step).collect()
    }

    #[test]
    fn test_savgol_weights_sum_to_one() {
        for pos in 0..11 {
            let w = savgol_weights(11, 2, pos);
            let total: f64 = w.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "pos {pos}: sum {total}");
        }
    }

    #[test]
    fn test_savgol_reproduces_quadratic() {
        let y: Vec<f64> = (0..40).map(|i| {
            let x = i as f64;
            3.0 + 0.5 * x - 0.02 * x * x
        }).collect();
        let smoothed = savgol_filter(&y, 11, 2);
        for (a, b) in y.iter().zip(&smoothed) {
            assert!((a - b).abs() < 1e-8);
        }
    }

    #[test]
    fn test_flatten_removes_polynomial_trend() {
        let time = uniform_time(500, 0.02);
        let flux: Vec<f64> = time.iter().map(|t| 1000.0 * (1.0 + 0.01 * t + 0.001 * t * t)).collect();
        let lc = LightCurve::new(time, flux).unwrap();

        let flat = lc.flatten(&FlattenConfig::default()).unwrap();
        assert_eq!(flat.len(), 500);
        for f in flat.flux() {
            assert!((f - 1.0).abs() < 1e-6, "flattened value {f}");
        }
    }

    #[test]
    fn test_flatten_keeps_short_transit() {
        let time = uniform_time(600, 0.02);
        let flux: Vec<f64> = time
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let base = 1.0 + 0.005 * t;
                if (300..312).contains(&i) { base * 0.99 } else { base }
            })
            .collect();
        let lc = LightCurve::new(time, flux).unwrap();

        let flat = lc.flatten(&FlattenConfig::default()).unwrap();
        let min = flat.flux().iter().copied().fold(f64::INFINITY, f64::min);
        assert!(min < 0.995, "transit was flattened away, min = {min}");
    }

    #[test]
    fn test_short_series_shrinks_window() {
        let time = uniform_time(10, 0.1);
        let flux = vec![2.0; 10];
        let lc = LightCurve::new(time, flux).unwrap();
        let flat = lc.flatten(&FlattenConfig::default()).unwrap();
        assert_eq!(flat.len(), 10);
        assert!(flat.flux().iter().all(|f| (f - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_segments_split_on_gap() {
        let mut time = uniform_time(10, 0.1);
        time.extend((0..10).map(|i| 50.0 + i as f64 * 0.1));
        let segs = segments(&time, 5.0);
        assert_eq!(segs, vec![0..10, 10..20]);
    }

    #[test]
    fn test_sigma_clip_flags_outlier() {
        let mut values = vec![0.0, 0.1, -0.1, 0.05, -0.05, 0.02, -0.02, 0.0, 0.01, -0.01];
        values.push(10.0);
        let clipped = sigma_clip(&values, 3.0, 0.0);
        assert!(clipped[10]);
        assert!(!clipped[0]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let even = FlattenConfig { window_length: 100, ..FlattenConfig::default() };
        assert!(even.validate().is_err());
        let high_order = FlattenConfig { window_length: 5, polyorder: 5, ..FlattenConfig::default() };
        assert!(high_order.validate().is_err());
    }

    #[test]
    fn test_interp_clamps_and_interpolates() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 10.0, 20.0];
        assert_eq!(interp(-1.0, &xs, &ys), 0.0);
        assert_eq!(interp(5.0, &xs, &ys), 20.0);
        assert!((interp(1.5, &xs, &ys) - 15.0).abs() < 1e-12);
    }
}
