use axum::{routing::get, routing::post, Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use super::api::jobs as job_handlers;
use super::api::signal as signal_handlers;
use super::api_doc::ApiDoc;
use super::config::Config;
use super::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Control signal
        .route(
            "/api/pause_signal",
            post(signal_handlers::set_signal).get(signal_handlers::get_signal),
        )
        // Job runs
        .route(
            "/api/jobs",
            post(job_handlers::start_job).get(job_handlers::list_jobs),
        )
        .route(
            "/api/jobs/{id}",
            get(job_handlers::get_job).delete(job_handlers::delete_job),
        )
        .route(
            "/api/jobs/{id}/interrupt",
            post(job_handlers::interrupt_job),
        )
        .route("/api/interrupt", post(job_handlers::interrupt_all))
        // OpenAPI
        .route(
            "/api-doc/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let state = AppState::new(config);
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
