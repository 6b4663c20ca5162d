//! Dashboard page served at `/`.

use askama::Template;
use axum::extract::State;
use axum::response::Html;

use crate::api::error::ApiError;
use crate::api::state::AppState;

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate<'a> {
    pub version: &'a str,
    /// Accepted upload extension, without the dot.
    pub extension: &'a str,
    pub upload_field: &'a str,
}

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let page = DashboardTemplate {
        version: env!("CARGO_PKG_VERSION"),
        extension: &state.config.uploads.extension,
        upload_field: crate::api::UPLOAD_FIELD,
    };
    Ok(Html(page.render()?))
}
