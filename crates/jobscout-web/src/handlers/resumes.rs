use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jobscout_core::{MAX_JOBS_PER_SITE, ScrapeRequest, ScrapeStatus};

use super::{error_response, queue_error, store_error};
use crate::models::{RescrapeParams, ResumeJson, SubmittedJson};
use crate::state::AppState;
use crate::upload;

/// `POST /resumes`: save the upload, register it and queue its first scrape.
pub async fn create(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let upload = match upload::parse_multipart(multipart).await {
        Ok(upload) => upload,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let path = match upload::save(&state.config.upload_dir, &upload).await {
        Ok(path) => path,
        Err(e) => {
            tracing::error!(error = %e, "failed to save upload");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save file");
        }
    };

    let doc = match state.store.create_resume(&path) {
        Ok(doc) => doc,
        Err(e) => return store_error(&e),
    };
    tracing::info!(resume_id = doc.id, file = %upload.filename, "resume uploaded");

    let location = upload
        .location
        .unwrap_or_else(|| state.config.location.clone());
    submit(&state, doc.id, location, state.config.jobs_per_site).await
}

/// `GET /resumes/{id}`
pub async fn get_resume(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match state.store.get_resume(id) {
        Ok(doc) => Json(ResumeJson::from(&doc)).into_response(),
        Err(e) => store_error(&e),
    }
}

/// `POST /resumes/{id}/rescrape`: claim the resume for a new run. Any run
/// still in flight loses its claim and stops at its next write.
pub async fn rescrape(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<RescrapeParams>,
) -> Response {
    let location = params
        .location
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| state.config.location.clone());
    let jobs_per_site = params.jobs_per_site.unwrap_or(state.config.jobs_per_site);
    if !(1..=MAX_JOBS_PER_SITE).contains(&jobs_per_site) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("jobs_per_site must be between 1 and {MAX_JOBS_PER_SITE}"),
        );
    }
    submit(&state, id, location, jobs_per_site).await
}

async fn submit(state: &AppState, resume_id: i64, location: String, jobs_per_site: usize) -> Response {
    let request = ScrapeRequest {
        resume_id,
        location,
        jobs_per_site,
    };
    match state.queue.submit(request).await {
        Ok(run_id) => (
            StatusCode::ACCEPTED,
            Json(SubmittedJson {
                id: resume_id,
                run_id,
                status: ScrapeStatus::Pending,
            }),
        )
            .into_response(),
        Err(e) => queue_error(&e),
    }
}
