//! HTTP handlers for triggering and fetching reports.
//!
//! Both endpoints translate every outcome into a documented response
//! shape; nothing panics past the handler boundary.

use crate::jobs::PollOutcome;
use crate::runner::ReportService;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

/// Builds the application router over a [`ReportService`] handle.
pub fn router(service: ReportService) -> Router {
    Router::new()
        .route("/trigger_report", get(trigger_report))
        .route("/get_report/:report_id", get(get_report))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
}

/// `GET /trigger_report` — starts a build, returns the job id immediately.
async fn trigger_report(State(service): State<ReportService>) -> Json<serde_json::Value> {
    let report_id = service.submit();
    Json(json!({ "report_id": report_id }))
}

/// `GET /get_report/{report_id}` — running status, failure, or the CSV
/// attachment.
async fn get_report(
    State(service): State<ReportService>,
    Path(report_id): Path<String>,
) -> Response {
    // Ids that were never issued and strings that are not ids at all get
    // the same answer.
    let Ok(report_id) = report_id.parse::<Uuid>() else {
        return not_found();
    };

    match service.poll(report_id) {
        PollOutcome::NotFound => not_found(),
        PollOutcome::Running => Json(json!({
            "status": "Running",
            "message": "Report is still being generated",
        }))
        .into_response(),
        PollOutcome::Failed(cause) => failed(&cause),
        PollOutcome::Ready(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv".to_owned()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{report_id}.csv\""),
                    ),
                ],
                bytes,
            )
                .into_response(),
            Err(io_error) => {
                // Completed but the artifact vanished: a late failure,
                // never a silent re-trigger.
                error!(job.id = %report_id, %io_error, "Report artifact missing at retrieval time");
                failed("report file not found")
            }
        },
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Report not found" })),
    )
        .into_response()
}

fn failed(cause: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "Failed", "error": cause })),
    )
        .into_response()
}
