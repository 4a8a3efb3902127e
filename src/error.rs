use thiserror::Error;

use crate::aws::{InvalidS3Uri, ServiceError};
use crate::waiter::WaitError;

#[derive(Debug, Error)]
pub enum JobwatchError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Gave up waiting for {name}: still {status} after {attempts} polls")]
    WaitTimeout {
        name: String,
        status: String,
        attempts: u32,
    },

    #[error("{name} ended {status}: {}", .reason.as_deref().unwrap_or("no reason reported"))]
    RemoteFailure {
        name: String,
        status: String,
        reason: Option<String>,
    },

    #[error("Human loop {0} completed without an output location")]
    MissingOutput(String),

    #[error("Analysis stopped after starting human loops {}: {source}", .started.join(", "))]
    AnalysisInterrupted {
        started: Vec<String>,
        source: Box<JobwatchError>,
    },

    #[error("Malformed review output: {0}")]
    ReviewOutput(String),

    #[error("AWS error: {0}")]
    Service(#[from] ServiceError),

    #[error(transparent)]
    S3Uri(#[from] InvalidS3Uri),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl JobwatchError {
    /// Attach the job name to a waiter failure.
    pub fn from_wait(name: &str, err: WaitError<ServiceError>) -> Self {
        match err {
            WaitError::Timeout {
                attempts,
                last_status,
            } => JobwatchError::WaitTimeout {
                name: name.to_string(),
                status: last_status.unwrap_or_else(|| "unobserved".to_string()),
                attempts,
            },
            WaitError::Source(e) => JobwatchError::Service(e),
        }
    }
}
