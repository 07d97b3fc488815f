//! Generation backend trait and job types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("API key not set: environment variable {0} is empty or missing")]
    MissingApiKey(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown job state: {0}")]
    UnknownState(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Opaque job handle issued by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Accepted and not finished (pending, queued, or running).
    Submitted,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    /// Map a service state name such as `JOB_STATE_RUNNING` or
    /// `BATCH_STATE_SUCCEEDED`.
    pub fn from_api_name(name: &str) -> Option<JobState> {
        let bare = name
            .strip_prefix("JOB_STATE_")
            .or_else(|| name.strip_prefix("BATCH_STATE_"))
            .unwrap_or(name);
        match bare {
            "PENDING" | "RUNNING" | "QUEUED" | "UNSPECIFIED" => Some(JobState::Submitted),
            "SUCCEEDED" => Some(JobState::Succeeded),
            "FAILED" | "EXPIRED" => Some(JobState::Failed),
            "CANCELLED" => Some(JobState::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Submitted)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Submitted => "submitted",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One entry of a finished job's output, in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputItem {
    /// Decoded image bytes, if the service produced an image for this prompt.
    pub image: Option<Vec<u8>>,
    pub mime_type: Option<String>,
}

impl OutputItem {
    pub fn image(bytes: Vec<u8>, mime_type: &str) -> Self {
        Self {
            image: Some(bytes),
            mime_type: Some(mime_type.to_string()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobStatus {
    pub state: JobState,
    /// Output items; only populated once the job has succeeded.
    pub items: Vec<OutputItem>,
    /// Service-provided error message for failed jobs.
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            items: Vec::new(),
            error: None,
        }
    }
}

/// A batch image generation service.
pub trait GenerationBackend {
    /// Submit prompts as one job. Output item `i` answers `prompts[i]`.
    fn submit(&self, model: &str, prompts: &[String]) -> Result<JobId, GenerationError>;

    /// Current state of a job.
    fn status(&self, job: &JobId) -> Result<JobStatus, GenerationError>;
}
