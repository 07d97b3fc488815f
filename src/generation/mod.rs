//! Image generation services.
//!
//! The pipeline only needs two capabilities from a generation service:
//! submit a list of prompts as one batch job, and ask for the job's state.
//! [`GenerationBackend`] captures exactly that, so the tracker and the CLI
//! never see transport details. [`gemini::GeminiBackend`] is the production
//! implementation.

pub mod backend;
pub mod gemini;

pub use backend::{GenerationBackend, GenerationError, JobId, JobState, JobStatus, OutputItem};
