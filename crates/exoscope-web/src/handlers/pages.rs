//! Static pages: home form and dataset explorer.

use axum::{extract::State, response::Html};
use minijinja::context;

use crate::error::WebResult;
use crate::state::SharedState;

pub async fn index(State(state): State<SharedState>) -> WebResult<Html<String>> {
    Ok(Html(state.templates.render("index.html", context! {})?))
}

pub async fn explore(State(state): State<SharedState>) -> WebResult<Html<String>> {
    Ok(Html(state.templates.render("explore.html", context! {})?))
}
