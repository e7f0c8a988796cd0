use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::jobs::{InterruptResponse, StartJobRequest};
use super::api::signal::{SignalRequest, SignalResponse, SignalStatus};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::signal::set_signal,
        super::api::signal::get_signal,
        super::api::jobs::start_job,
        super::api::jobs::list_jobs,
        super::api::jobs::get_job,
        super::api::jobs::delete_job,
        super::api::jobs::interrupt_job,
        super::api::jobs::interrupt_all,
    ),
    components(
        schemas(
            SignalRequest,
            SignalResponse,
            SignalStatus,
            StartJobRequest,
            InterruptResponse,
            ErrorResponse,
            crate::signal::Command,
            crate::gate::RunState,
            crate::job::RunEntry,
            crate::job::RelaxationResult,
        )
    ),
    info(
        title = "Freeze-Frame Control API",
        description = "Pause, resume and interrupt step-based job runs",
        version = "0.1.0"
    ),
    tags(
        (name = "signal", description = "Global pause/resume command"),
        (name = "jobs", description = "Job runs and interrupts")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_control_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| *p == "/api/pause_signal"));
        assert!(paths.iter().any(|p| *p == "/api/jobs/{id}/interrupt"));
        assert!(paths.iter().any(|p| *p == "/api/interrupt"));
    }
}
