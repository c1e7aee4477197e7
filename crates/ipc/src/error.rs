use thiserror::Error;

/// Failures at the JSON boundary between the core and its host.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`{field}` = {value} is outside [0, 1]")]
    OutOfRange { field: &'static str, value: f32 },
}
