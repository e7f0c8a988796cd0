use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::job::{RelaxationParams, RunEntry};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartJobRequest {
    pub steps: Option<usize>,
    pub size: Option<usize>,
    pub step_delay_ms: Option<u64>,
    pub start_at_step: Option<usize>,
    pub end_at_step: Option<usize>,
}

impl StartJobRequest {
    fn into_params(self, state: &AppState) -> RelaxationParams {
        let defaults = &state.config.jobs;
        RelaxationParams {
            steps: self.steps.unwrap_or(defaults.default_steps),
            size: self.size.unwrap_or(64),
            step_delay_ms: self
                .step_delay_ms
                .unwrap_or(defaults.step_delay.as_millis() as u64),
            start_at_step: self.start_at_step,
            end_at_step: self.end_at_step,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InterruptResponse {
    pub interrupted: usize,
}

#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = StartJobRequest,
    responses(
        (status = 201, description = "Run started", body = RunEntry),
        (status = 400, description = "Validation error", body = ErrorResponse)
    ),
    tag = "jobs"
)]
pub async fn start_job(
    State(state): State<AppState>,
    Json(request): Json<StartJobRequest>,
) -> ApiResult<impl IntoResponse> {
    let params = request.into_params(&state);
    let entry = state.jobs.start(params)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    responses(
        (status = 200, description = "All runs, oldest first", body = Vec<RunEntry>)
    ),
    tag = "jobs"
)]
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<RunEntry>> {
    Json(state.jobs.list())
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(("id" = String, Path, description = "Run id")),
    responses(
        (status = 200, description = "Run status", body = RunEntry),
        (status = 404, description = "Run not found", body = ErrorResponse)
    ),
    tag = "jobs"
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RunEntry>> {
    Ok(Json(state.jobs.get(&id)?))
}

#[utoipa::path(
    delete,
    path = "/api/jobs/{id}",
    params(("id" = String, Path, description = "Run id")),
    responses(
        (status = 200, description = "Finished run removed", body = RunEntry),
        (status = 404, description = "Run not found", body = ErrorResponse),
        (status = 409, description = "Run still active", body = ErrorResponse)
    ),
    tag = "jobs"
)]
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RunEntry>> {
    Ok(Json(state.jobs.remove(&id)?))
}

#[utoipa::path(
    post,
    path = "/api/jobs/{id}/interrupt",
    params(("id" = String, Path, description = "Run id")),
    responses(
        (status = 200, description = "Interrupt requested", body = RunEntry),
        (status = 404, description = "Run not found", body = ErrorResponse)
    ),
    tag = "jobs"
)]
pub async fn interrupt_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RunEntry>> {
    Ok(Json(state.jobs.interrupt(&id)?))
}

#[utoipa::path(
    post,
    path = "/api/interrupt",
    responses(
        (status = 200, description = "Interrupt requested for all active runs", body = InterruptResponse)
    ),
    tag = "jobs"
)]
pub async fn interrupt_all(State(state): State<AppState>) -> Json<InterruptResponse> {
    Json(InterruptResponse {
        interrupted: state.jobs.interrupt_all(),
    })
}
