//! Time-series container and CSV loading.

use csv::{ReaderBuilder, StringRecord, Trim};
use exoscope_common::error::{ExoscopeError, Result};
use tracing::debug;

/// Column holding observation timestamps (days).
pub const TIME_COLUMN: &str = "time";
/// Column holding measured brightness.
pub const FLUX_COLUMN: &str = "flux";

/// Minimum number of usable samples for any analysis.
pub const MIN_SAMPLES: usize = 3;

/// Brightness measurements over time. `time` and `flux` always have equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct LightCurve {
    time: Vec<f64>,
    flux: Vec<f64>,
}

impl LightCurve {
    pub fn new(time: Vec<f64>, flux: Vec<f64>) -> Result<Self> {
        if time.len() != flux.len() {
            return Err(ExoscopeError::InvalidLightCurve(format!(
                "time has {} values but flux has {}",
                time.len(),
                flux.len()
            )));
        }
        Ok(Self { time, flux })
    }

    /// Parse a CSV upload with a header row containing `time` and `flux`.
    ///
    /// Blank or non-finite cells drop the row; any other unparseable cell is an error.
    /// The result is sorted by time and must keep at least [`MIN_SAMPLES`] rows.
    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv_reader(bytes);
        let headers = reader.headers()?.clone();
        let (time_idx, flux_idx) = column_indices(&headers).ok_or_else(|| {
            ExoscopeError::InvalidLightCurve(format!(
                "missing required columns '{}' and '{}'",
                TIME_COLUMN, FLUX_COLUMN
            ))
        })?;

        let mut time = Vec::new();
        let mut flux = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            // Line 1 is the header.
            let line = row + 2;
            let t = parse_cell(record.get(time_idx), line, TIME_COLUMN)?;
            let f = parse_cell(record.get(flux_idx), line, FLUX_COLUMN)?;
            time.push(t);
            flux.push(f);
        }

        let mut lc = Self::new(time, flux)?.remove_nans();
        lc.sort_by_time();
        debug!("Parsed light curve with {} usable samples", lc.len());
        lc.ensure_min_samples()?;
        Ok(lc)
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Drop every sample whose time or flux is not finite.
    pub fn remove_nans(self) -> Self {
        let (time, flux) = self
            .time
            .into_iter()
            .zip(self.flux)
            .filter(|(t, f)| t.is_finite() && f.is_finite())
            .unzip();
        Self { time, flux }
    }

    /// Stable sort of samples by time.
    pub fn sort_by_time(&mut self) {
        if self.time.windows(2).all(|w| w[0] <= w[1]) {
            return;
        }
        let mut pairs: Vec<(f64, f64)> = self.time.iter().copied().zip(self.flux.iter().copied()).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (time, flux): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        self.time = time;
        self.flux = flux;
    }

    /// Divide flux by its median. A zero or undefined median leaves flux unchanged.
    pub fn normalize(&self) -> Self {
        let scale = median(&self.flux).filter(|m| *m != 0.0 && m.is_finite());
        let flux = match scale {
            Some(m) => self.flux.iter().map(|f| f / m).collect(),
            None => self.flux.clone(),
        };
        Self { time: self.time.clone(), flux }
    }

    /// Span between first and last timestamp.
    pub fn baseline(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    pub fn ensure_min_samples(&self) -> Result<()> {
        if self.len() < MIN_SAMPLES {
            return Err(ExoscopeError::InvalidLightCurve(format!(
                "not enough samples: {} usable, need at least {}",
                self.len(),
                MIN_SAMPLES
            )));
        }
        Ok(())
    }

    pub(crate) fn with_flux(&self, flux: Vec<f64>) -> Self {
        Self { time: self.time.clone(), flux }
    }
}

/// True when the CSV header names both `time` and `flux`.
///
/// Empty input counts as "no columns" rather than an error.
pub fn has_time_flux_columns(bytes: &[u8]) -> Result<bool> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(false);
    }
    let mut reader = csv_reader(bytes);
    let headers = reader.headers()?;
    Ok(column_indices(headers).is_some())
}

/// Median of the finite values, or `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .flexible(true)
        .from_reader(bytes)
}

fn column_indices(headers: &StringRecord) -> Option<(usize, usize)> {
    let time = headers.iter().position(|h| h == TIME_COLUMN)?;
    let flux = headers.iter().position(|h| h == FLUX_COLUMN)?;
    Some((time, flux))
}

fn parse_cell(cell: Option<&str>, line: usize, column: &str) -> Result<f64> {
    match cell {
        None | Some("") => Ok(f64::NAN),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "nan" | "na" | "null" | "none" => Ok(f64::NAN),
            _ => raw.parse::<f64>().map_err(|e| {
                ExoscopeError::InvalidLightCurve(format!(
                    "line {line}: could not parse {column} value '{raw}': {e}"
                ))
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic_csv() {
        let csv = b"time,flux\n0.0,1.0\n0.5,0.99\n1.0,1.01\n";
        let lc = LightCurve::from_csv(csv).unwrap();
        assert_eq!(lc.time(), &[0.0, 0.5, 1.0]);
        assert_eq!(lc.flux(), &[1.0, 0.99, 1.01]);
    }

    #[test]
    fn test_extra_columns_and_reordering() {
        let csv = b"flux_err,flux,time\n0.1,1.0,2.0\n0.1,0.9,1.0\n0.1,1.1,3.0\n";
        let lc = LightCurve::from_csv(csv).unwrap();
        // Sorted by time
        assert_eq!(lc.time(), &[1.0, 2.0, 3.0]);
        assert_eq!(lc.flux(), &[0.9, 1.0, 1.1]);
    }

    #[test]
    fn test_blank_and_nan_rows_dropped() {
        let csv = b"time,flux\n0,1\n1,\n2,nan\n3,1\n4,1\n";
        let lc = LightCurve::from_csv(csv).unwrap();
        assert_eq!(lc.len(), 3);
        assert_eq!(lc.time(), &[0.0, 3.0, 4.0]);
    }

    #[test]
    fn test_non_numeric_cell_is_error() {
        let csv = b"time,flux\n0,1\n1,bright\n2,1\n";
        let err = LightCurve::from_csv(csv).unwrap_err().to_string();
        assert!(err.contains("line 3"), "unexpected error: {err}");
    }

    #[test]
    fn test_too_few_samples() {
        let csv = b"time,flux\n0,1\n1,1\n";
        assert!(LightCurve::from_csv(csv).is_err());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(LightCurve::new(vec![0.0, 1.0], vec![1.0]).is_err());
    }

    #[test]
    fn test_column_detection() {
        assert!(has_time_flux_columns(b"time,flux\n1,2\n").unwrap());
        assert!(has_time_flux_columns(b" time , flux \n").unwrap());
        assert!(!has_time_flux_columns(b"time,brightness\n1,2\n").unwrap());
        assert!(!has_time_flux_columns(b"").unwrap());
        assert!(!has_time_flux_columns(b"TIME,FLUX\n").unwrap());
    }

    #[test]
    fn test_normalize_by_median() {
        let lc = LightCurve::new(vec![0.0, 1.0, 2.0], vec![100.0, 200.0, 300.0]).unwrap();
        assert_eq!(lc.normalize().flux(), &[0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&[f64::NAN]), None);
    }
}
