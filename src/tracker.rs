//! Job submission and completion tracking.
//!
//! Reads the prompt file, submits it as one job, and polls the job on a
//! fixed interval until it reaches a terminal state. There is no backoff and
//! no retry: a failed status request ends the wait, and the recorded job can
//! be collected again later.
//!
//! [`collect`] finishes the round trip for a [`BatchRecord`]: it fetches the
//! job's output and distributes it over the targets recorded at submission.

use crate::batch::BatchRecord;
use crate::distribute::{self, DistributeError, DistributionReport};
use crate::generation::{GenerationBackend, GenerationError, JobId, JobState, OutputItem};
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum TrackError {
    #[error("Job submission failed: {0}")]
    JobSubmissionFailed(String),
    #[error("Job {job} failed: {message}")]
    JobFailed { job: JobId, message: String },
    #[error("Job {0} was cancelled")]
    JobCancelled(JobId),
    #[error("Status check failed: {0}")]
    Status(#[from] GenerationError),
    #[error(transparent)]
    Distribute(#[from] DistributeError),
}

/// Outcome of a single status check.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Pending,
    Done(Vec<OutputItem>),
}

/// Prompts from a prompt file, one per line.
pub fn read_prompts(prompt_file: &Path) -> Result<Vec<String>, TrackError> {
    let content = fs::read_to_string(prompt_file).map_err(|e| {
        TrackError::JobSubmissionFailed(format!("{}: {}", prompt_file.display(), e))
    })?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Submit the prompt file as one job.
pub fn submit(
    backend: &impl GenerationBackend,
    prompt_file: &Path,
    model: &str,
) -> Result<JobId, TrackError> {
    let prompts = read_prompts(prompt_file)?;
    if prompts.is_empty() {
        return Err(TrackError::JobSubmissionFailed(format!(
            "{} contains no prompts",
            prompt_file.display()
        )));
    }
    let job = backend
        .submit(model, &prompts)
        .map_err(|e| TrackError::JobSubmissionFailed(e.to_string()))?;
    info!(%job, prompts = prompts.len(), model, "submitted batch job");
    Ok(job)
}

/// Query the job once.
pub fn check(backend: &impl GenerationBackend, job: &JobId) -> Result<Progress, TrackError> {
    let status = backend.status(job)?;
    debug!(%job, state = %status.state, "job status");
    match status.state {
        JobState::Submitted => Ok(Progress::Pending),
        JobState::Succeeded => Ok(Progress::Done(status.items)),
        JobState::Failed => Err(TrackError::JobFailed {
            job: job.clone(),
            message: status.error.unwrap_or_else(|| "no details".to_string()),
        }),
        JobState::Cancelled => Err(TrackError::JobCancelled(job.clone())),
    }
}

/// Poll every `interval` until the job finishes, returning its output items.
pub fn wait(
    backend: &impl GenerationBackend,
    job: &JobId,
    interval: Duration,
) -> Result<Vec<OutputItem>, TrackError> {
    loop {
        match check(backend, job)? {
            Progress::Done(items) => {
                info!(%job, items = items.len(), "job finished");
                return Ok(items);
            }
            Progress::Pending => {
                info!(%job, "job still running, next check in {}s", interval.as_secs());
                thread::sleep(interval);
            }
        }
    }
}

/// Result of collecting a recorded job.
#[derive(Debug, Clone, PartialEq)]
pub enum Collected {
    /// Still running; nothing was written.
    Pending,
    Distributed(DistributionReport),
}

/// Fetch the output of `record.job` and write it to the recorded panels.
///
/// With an `interval` the job is polled until it finishes; without one it
/// is checked once.
pub fn collect(
    backend: &impl GenerationBackend,
    record: &BatchRecord,
    interval: Option<Duration>,
) -> Result<Collected, TrackError> {
    let items = match interval {
        Some(interval) => wait(backend, &record.job, interval)?,
        None => match check(backend, &record.job)? {
            Progress::Done(items) => items,
            Progress::Pending => return Ok(Collected::Pending),
        },
    };
    let report = distribute::distribute(&items, &record.targets)?;
    Ok(Collected::Distributed(report))
}
