use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PollError;

/// Lifecycle states of a remote generation job.
///
/// Each job flows through: SUBMITTED → RUNNING → one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Submitted,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Succeeded | JobState::Failed | JobState::TimedOut | JobState::Cancelled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Submitted => write!(f, "SUBMITTED"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Succeeded => write!(f, "SUCCEEDED"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::TimedOut => write!(f, "TIMED_OUT"),
            JobState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Why a job ended without a usable result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Failure {
    /// The provider reported the task as failed.
    Provider(String),
    /// The provider reported success but returned no output locations.
    EmptyResult,
    /// The attempt budget ran out.
    Timeout,
    Cancelled,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Provider(msg) => write!(f, "provider failure: {msg}"),
            Failure::EmptyResult => write!(f, "provider reported success with no result"),
            Failure::Timeout => write!(f, "attempts exhausted"),
            Failure::Cancelled => write!(f, "cancelled by caller"),
        }
    }
}

/// Polling budget for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before each status poll, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of status polls before the job times out.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_attempts: 60,
        }
    }
}

impl PollConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Upper bound on time spent sleeping between polls. Saturates.
    pub fn max_wait(&self) -> Duration {
        self.poll_interval()
            .checked_mul(self.max_attempts)
            .unwrap_or(Duration::MAX)
    }
}

/// One remote job tracked until it reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub state: JobState,
    pub state_history: Vec<JobState>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub result: Option<Vec<String>>,
    pub failure: Option<Failure>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(job_id: String, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            state: JobState::Submitted,
            state_history: Vec::new(),
            attempts: 0,
            max_attempts,
            result: None,
            failure: None,
            submitted_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn failure_reason(&self) -> Option<String> {
        self.failure.as_ref().map(Failure::to_string)
    }

    /// Convert a terminal job into the caller-facing result.
    pub fn into_result(self) -> Result<Vec<String>, PollError> {
        let job_id = self.job_id;
        match (self.state, self.result, self.failure) {
            (JobState::Succeeded, Some(urls), _) => Ok(urls),
            (_, _, Some(Failure::EmptyResult)) => Err(PollError::EmptyResult { job_id }),
            (_, _, Some(Failure::Provider(message))) => Err(PollError::JobFailed { job_id, message }),
            (_, _, Some(Failure::Cancelled)) => Err(PollError::Cancelled { job_id }),
            (_, _, Some(Failure::Timeout)) => Err(PollError::JobTimeout {
                job_id,
                attempts: self.attempts,
            }),
            (state, _, None) => Err(PollError::JobFailed {
                job_id,
                message: format!("job stopped in non-terminal state {state}"),
            }),
        }
    }
}

/// Structured summary produced once a job is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub job_id: String,
    pub state: JobState,
    pub state_transitions: Vec<JobState>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub result: Vec<String>,
    pub failure_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl JobReport {
    pub fn from_job(job: &Job) -> Self {
        let mut transitions = job.state_history.clone();
        transitions.push(job.state);

        Self {
            job_id: job.job_id.clone(),
            state: job.state,
            state_transitions: transitions,
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            result: job.result.clone().unwrap_or_default(),
            failure_reason: job.failure_reason(),
            submitted_at: job.submitted_at,
            completed_at: job.updated_at,
            duration_ms: (job.updated_at - job.submitted_at).num_milliseconds(),
        }
    }
}
