//! Placeholder classifier — echoes the inputs with zero probabilities.

use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    Form,
};
use minijinja::context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WebResult;
use crate::state::SharedState;

pub const PREDICTED_CLASS: &str = "Pending integration";
pub const CLASS_LABELS: [&str; 3] = ["Confirmed exoplanet", "Planet candidate", "False positive"];

/// Raw form values; each is parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct PredictForm {
    pub orbital_period: Option<String>,
    pub transit_duration: Option<String>,
    pub planet_radius: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub name: &'static str,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbability {
    pub label: &'static str,
    pub value: f64,
}

impl PredictForm {
    pub fn features(&self) -> Vec<Feature> {
        vec![
            Feature { name: "orbital_period", value: parse_or_zero(self.orbital_period.as_deref()) },
            Feature { name: "transit_duration", value: parse_or_zero(self.transit_duration.as_deref()) },
            Feature { name: "planet_radius", value: parse_or_zero(self.planet_radius.as_deref()) },
        ]
    }
}

/// Missing, malformed or non-finite input becomes 0.0.
pub fn parse_or_zero(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// No model is wired in yet, so every class gets zero probability.
pub fn placeholder_probabilities(_features: &[Feature]) -> Vec<ClassProbability> {
    CLASS_LABELS
        .iter()
        .map(|&label| ClassProbability { label, value: 0.0 })
        .collect()
}

pub async fn predict(
    State(state): State<SharedState>,
    form: Result<Form<PredictForm>, FormRejection>,
) -> WebResult<Html<String>> {
    let form = match form {
        Ok(Form(form)) => form,
        Err(e) => {
            debug!("Unreadable prediction form ({}), using defaults", e);
            PredictForm::default()
        }
    };

    let features = form.features();
    let probabilities = placeholder_probabilities(&features);
    // No model, so no per-feature contributions to explain.
    let contributions: Vec<Feature> = Vec::new();

    let html = state.templates.render(
        "result.html",
        context! {
            predicted_class => PREDICTED_CLASS,
            probabilities => probabilities,
            contributions => contributions,
            features => features,
        },
    )?;
    Ok(Html(html))
}
