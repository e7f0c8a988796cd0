use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Desired execution state for every running job in the process.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum_macros::Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    #[default]
    Proceed,
    Pause,
}

impl Command {
    /// Parses an inbound signal value. Only the exact string `PAUSE` pauses;
    /// anything else falls back to `Proceed` so a malformed request can never
    /// strand a job in a pause.
    pub fn from_signal(value: &str) -> Self {
        match value {
            "PAUSE" => Command::Pause,
            "PROCEED" => Command::Proceed,
            other => {
                log::warn!("Unrecognized command {:?}, treating as PROCEED", other);
                Command::Proceed
            }
        }
    }
}
