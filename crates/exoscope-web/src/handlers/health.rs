//! Liveness probe.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::SharedState;

pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "period_search": state.search.is_some(),
        "search": state.search.as_ref().map(|s| s.name()),
    }))
}
