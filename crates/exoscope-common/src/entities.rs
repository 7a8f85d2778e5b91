/// Core data types shared by the analysis pipeline and the web layer.
/// The catalog mirrors the on-disk `exoplanets.json` layout.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ExoscopeError, Result};

// ---------------------------------------------------------------------------
// Analysis result
// ---------------------------------------------------------------------------

/// Outcome of one light-curve upload. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    /// Period at maximum BLS power, in days.
    pub best_period: f64,
    /// Planet-to-star radius ratio, approximated as sqrt(power).
    pub planet_radius: f64,
}

impl AnalysisResult {
    /// Derive the result from the BLS peak. Non-positive power maps to a zero radius.
    pub fn from_peak(filename: impl Into<String>, best_period: f64, power: f64) -> Self {
        let planet_radius = if power > 0.0 { power.sqrt() } else { 0.0 };
        Self {
            filename: filename.into(),
            best_period,
            planet_radius,
        }
    }

    /// Catalog record for this result, named after the file stem.
    pub fn to_catalog_entry(&self) -> CatalogEntry {
        CatalogEntry {
            name: file_stem(&self.filename).to_string(),
            period: self.best_period,
            radius: self.planet_radius,
        }
    }
}

/// Base file name without its last extension. Client-side directories are
/// dropped; dotfiles like `.hidden` stay intact.
pub fn file_stem(filename: &str) -> &str {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rfind('.') {
        Some(0) | None => base,
        Some(idx) => &base[..idx],
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub period: f64,
    pub radius: f64,
}

/// Dataset name → ordered list of planet records.
///
/// Backed by a raw JSON object so datasets and fields this crate does not
/// know about survive a read-modify-write cycle untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExoplanetCatalog {
    datasets: Map<String, Value>,
}

impl ExoplanetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse catalog JSON. The top level must be an object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(datasets) => Ok(Self { datasets }),
            other => Err(ExoscopeError::Other(anyhow::anyhow!(
                "catalog root must be a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Serialize with two-space indentation.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.datasets)?)
    }

    /// Append a record to `dataset`, creating the dataset if needed.
    pub fn append(&mut self, dataset: &str, entry: &CatalogEntry) -> Result<()> {
        let record = serde_json::to_value(entry)?;
        let slot = self
            .datasets
            .entry(dataset.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));

        if !slot.is_array() {
            warn!(
                "Catalog dataset '{}' is a JSON {}, replacing it with an array",
                dataset,
                json_kind(slot)
            );
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(records) = slot {
            records.push(record);
        }
        Ok(())
    }

    /// Number of raw records stored under `dataset`.
    pub fn len_of(&self, dataset: &str) -> usize {
        self.datasets
            .get(dataset)
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Records under `dataset` that parse as [`CatalogEntry`]; malformed ones are skipped.
    pub fn entries(&self, dataset: &str) -> Vec<CatalogEntry> {
        self.datasets
            .get(dataset)
            .and_then(Value::as_array)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|r| serde_json::from_value(r.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
