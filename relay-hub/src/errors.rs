use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    #[error("Invalid timer: {0}")]
    InvalidTimer(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Device request error: {0}")]
    Device(#[from] reqwest::Error),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
