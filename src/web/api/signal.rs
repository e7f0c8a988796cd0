use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::signal::Command;
use crate::web::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SignalRequest {
    /// `PAUSE` or `PROCEED`; anything else is treated as `PROCEED`.
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignalResponse {
    pub status: String,
    pub command: Command,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignalStatus {
    pub command: Command,
}

#[utoipa::path(
    post,
    path = "/api/pause_signal",
    request_body = SignalRequest,
    responses(
        (status = 200, description = "Signal applied", body = SignalResponse),
        (status = 400, description = "Malformed request body"),
        (status = 422, description = "Request body does not match the schema")
    ),
    tag = "signal"
)]
pub async fn set_signal(
    State(state): State<AppState>,
    Json(request): Json<SignalRequest>,
) -> Json<SignalResponse> {
    let command = request
        .command
        .as_deref()
        .map_or(Command::Proceed, Command::from_signal);

    state.signals.set_command(command);
    log::info!("Signal received: {}", command);

    Json(SignalResponse {
        status: "success".to_string(),
        command,
    })
}

#[utoipa::path(
    get,
    path = "/api/pause_signal",
    responses(
        (status = 200, description = "Current command", body = SignalStatus)
    ),
    tag = "signal"
)]
pub async fn get_signal(State(state): State<AppState>) -> Json<SignalStatus> {
    Json(SignalStatus {
        command: state.signals.command(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::Config;

    fn request(command: Option<&str>) -> Json<SignalRequest> {
        Json(SignalRequest {
            command: command.map(String::from),
        })
    }

    #[tokio::test]
    async fn pause_and_resume() {
        let state = AppState::new(Config::default());

        let Json(response) = set_signal(State(state.clone()), request(Some("PAUSE"))).await;
        assert_eq!(response.status, "success");
        assert_eq!(response.command, Command::Pause);
        assert_eq!(state.signals.command(), Command::Pause);

        set_signal(State(state.clone()), request(Some("PROCEED"))).await;
        let Json(status) = get_signal(State(state)).await;
        assert_eq!(status.command, Command::Proceed);
    }

    #[tokio::test]
    async fn malformed_command_resumes() {
        let state = AppState::new(Config::default());
        state.signals.set_command(Command::Pause);

        let Json(response) = set_signal(State(state.clone()), request(Some("HALT"))).await;
        assert_eq!(response.command, Command::Proceed);
        assert_eq!(state.signals.command(), Command::Proceed);

        state.signals.set_command(Command::Pause);
        set_signal(State(state.clone()), request(None)).await;
        assert_eq!(state.signals.command(), Command::Proceed);

        let Json(response) = set_signal(State(state.clone()), request(Some("pause"))).await;
        assert_eq!(response.command, Command::Proceed);
        assert_eq!(state.signals.command(), Command::Proceed);
    }
}
