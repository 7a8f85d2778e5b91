//! Synthetic light curves with an injected box-shaped transit.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Parameters for a periodic box transit on a flat (or linearly trending) star.
#[derive(Debug, Clone)]
pub struct SyntheticTransit {
    pub period: f64,
    /// Fractional dimming during transit.
    pub depth: f64,
    pub duration: f64,
    /// Mid-time of the first transit.
    pub epoch: f64,
    pub cadence: f64,
    pub baseline: f64,
    /// Standard deviation of the Gaussian noise.
    pub noise: f64,
    /// Linear flux slope per day.
    pub slope: f64,
    pub seed: u64,
}

impl Default for SyntheticTransit {
    fn default() -> Self {
        Self {
            period: 3.0,
            depth: 0.01,
            duration: 0.2,
            epoch: 1.0,
            cadence: 0.02,
            baseline: 27.0,
            noise: 1e-3,
            slope: 0.0,
            seed: 42,
        }
    }
}

impl SyntheticTransit {
    pub fn generate(&self) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let n = (self.baseline / self.cadence) as usize;
        let mut time = Vec::with_capacity(n);
        let mut flux = Vec::with_capacity(n);

        for i in 0..n {
            let t = i as f64 * self.cadence;
            let phase = (t - self.epoch + self.period / 2.0).rem_euclid(self.period) - self.period / 2.0;
            let in_transit = phase.abs() < self.duration / 2.0;
            let base = 1.0 + self.slope * t;
            let signal = if in_transit { base * (1.0 - self.depth) } else { base };
            time.push(t);
            flux.push(signal + self.noise * gaussian(&mut rng));
        }
        (time, flux)
    }

    /// Render as a `time,flux` CSV with a header row.
    pub fn to_csv(&self) -> String {
        let (time, flux) = self.generate();
        let mut out = String::from("time,flux\n");
        for (t, f) in time.iter().zip(&flux) {
            out.push_str(&format!("{t},{f}\n"));
        }
        out
    }
}

/// Standard normal sample via Box–Muller.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
