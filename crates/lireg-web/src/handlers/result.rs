use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};

use lireg_core::{PipelineError, PipelineEvent, ReportJson};

use crate::models::{ErrorJson, ResultQuery};
use crate::state::AppState;

/// Error message for any failure before the identifiers are processed.
pub const FATAL_ERROR: &str = "Failed to parse PDF";

pub async fn result(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResultQuery>,
) -> Response {
    let Some(date) = query.date.filter(|d| !d.trim().is_empty()) else {
        return missing_date();
    };

    match state.pipeline.run(&date, &log_progress).await {
        Ok(result) => {
            let summary = result.summary();
            info!(
                %date,
                total = result.total_mc_numbers,
                resolved = summary.resolved,
                lookup_failed = summary.lookup_failed,
                scrape_failed = summary.scrape_failed,
                "register processed"
            );
            Json(ReportJson::from(&result)).into_response()
        }
        Err(PipelineError::MissingDate) => missing_date(),
        Err(e) => {
            warn!(%date, error = %e, "register could not be processed");
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorJson::new(FATAL_ERROR).with_details(e.to_string())),
            )
                .into_response()
        }
    }
}

fn missing_date() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorJson::new(PipelineError::MissingDate.to_string())),
    )
        .into_response()
}

fn log_progress(event: PipelineEvent) {
    debug!(?event, "pipeline progress");
}
