use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use jobscout_core::Platform;
use jobscout_store::JobFilter;

use super::{error_response, store_error};
use crate::models::{JobJson, JobsJson, JobsQuery};
use crate::state::AppState;

/// `GET /jobs`: active listings, newest first.
pub async fn list(State(state): State<Arc<AppState>>, Query(query): Query<JobsQuery>) -> Response {
    let platform = match query.platform.as_deref().filter(|p| !p.is_empty()) {
        Some(name) => match name.parse::<Platform>() {
            Ok(platform) => Some(platform),
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
        },
        None => None,
    };

    let filter = JobFilter {
        resume_id: query.resume_id,
        platform,
        location: query.location,
        search: query.search,
        active_only: !query.include_inactive,
        limit: query.limit,
    };

    match state.store.list_jobs(&filter) {
        Ok(jobs) => Json(JobsJson {
            count: jobs.len(),
            jobs: jobs.iter().map(JobJson::from).collect(),
        })
        .into_response(),
        Err(e) => store_error(&e),
    }
}
