//! Light-curve upload and transit search.
//!
//! Flow: read the `lightcurve` field → check for `time`/`flux` columns →
//! flatten + BLS on the blocking pool → append the peak to the catalog.
//! Analysis failures are reported in the page message, never as HTTP errors.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    response::Html,
};
use exoscope_common::entities::AnalysisResult;
use exoscope_lightcurve::{has_time_flux_columns, LightCurve, TransitSearch, TransitSignal};
use minijinja::context;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::WebResult;
use crate::state::{AppState, SharedState};

/// Multipart field carrying the CSV.
pub const UPLOAD_FIELD: &str = "lightcurve";
pub const NO_FILE_MESSAGE: &str = "No file uploaded or empty filename.";

#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// What the result page shows.
#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub message: String,
    pub analysis: Option<AnalysisResult>,
    /// Candidate dip extraction is not implemented; always empty.
    pub dips: Vec<f64>,
}

impl UploadOutcome {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            analysis: None,
            dips: Vec::new(),
        }
    }
}

pub async fn upload(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> WebResult<Html<String>> {
    let outcome = match multipart {
        Ok(multipart) => match read_upload(multipart).await {
            Ok(Some(file)) => process_upload(&state, file).await,
            Ok(None) => UploadOutcome::message(NO_FILE_MESSAGE),
            Err(e) => UploadOutcome::message(error_message(&e)),
        },
        Err(e) => {
            warn!("Upload was not multipart: {}", e);
            UploadOutcome::message(NO_FILE_MESSAGE)
        }
    };

    let html = state.templates.render(
        "upload_result.html",
        context! {
            message => outcome.message,
            analysis => outcome.analysis,
            dips => outcome.dips,
        },
    )?;
    Ok(Html(html))
}

/// First `lightcurve` field with a non-empty filename, if any.
pub async fn read_upload(mut multipart: Multipart) -> anyhow::Result<Option<UploadedFile>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Ok(None);
        }
        let bytes = field.bytes().await?.to_vec();
        return Ok(Some(UploadedFile { filename, bytes }));
    }
    Ok(None)
}

/// Analyse one upload and record the result.
pub async fn process_upload(state: &AppState, file: UploadedFile) -> UploadOutcome {
    info!("Received light curve '{}' ({} bytes)", file.filename, file.bytes.len());

    let columns_ok = match has_time_flux_columns(&file.bytes) {
        Ok(ok) => ok,
        Err(e) => return UploadOutcome::message(error_message(&anyhow::Error::new(e))),
    };
    let search = match (&state.search, columns_ok) {
        (Some(search), true) => search.clone(),
        _ => return UploadOutcome::message(unable_message(&file, state.config.analysis.preview_bytes)),
    };

    let UploadedFile { filename, bytes } = file;
    let signal = match run_search(search, bytes).await {
        Ok(signal) => signal,
        Err(e) => {
            warn!("Analysis of '{}' failed: {}", filename, e);
            return UploadOutcome::message(error_message(&e));
        }
    };

    let analysis = AnalysisResult::from_peak(filename, signal.period, signal.power);
    let dataset = &state.config.catalog.dataset;
    if let Err(e) = state.catalog.append(dataset, &analysis.to_catalog_entry()).await {
        warn!("Could not write catalog {:?}: {}", state.catalog.path(), e);
    }

    UploadOutcome {
        message: format!(
            "Analysis complete: period={:.3} days, estimated radius={:.3} (R_star units)",
            analysis.best_period, analysis.planet_radius
        ),
        analysis: Some(analysis),
        dips: Vec::new(),
    }
}

/// Parse and search on the blocking pool; panics come back as errors.
async fn run_search(search: Arc<dyn TransitSearch>, bytes: Vec<u8>) -> anyhow::Result<TransitSignal> {
    let joined = tokio::task::spawn_blocking(move || {
        let lc = LightCurve::from_csv(&bytes)?;
        search.search(&lc)
    })
    .await;

    match joined {
        Ok(result) => Ok(result?),
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(anyhow::anyhow!("analysis panicked: {reason}"))
        }
        Err(e) => Err(anyhow::anyhow!("analysis task failed: {e}")),
    }
}

fn unable_message(file: &UploadedFile, preview_bytes: usize) -> String {
    let shown = file.bytes.len().min(preview_bytes);
    format!(
        "Received file: {} (showing first {} bytes). Unable to analyze because the period search \
         is not available or file format is incorrect.",
        file.filename, shown
    )
}

/// Error text followed by the full cause chain (and backtrace when enabled).
fn error_message(e: &anyhow::Error) -> String {
    format!("Error processing file: {e}\n{e:?}")
}
