use chrono::Utc;

use super::job::{Failure, Job, JobState};
use crate::dashscope::{TaskOutput, TaskStatus};

/// Something the poll loop observed about a job.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    /// The provider still reports the job as queued or running.
    InProgress,
    Succeeded(Vec<String>),
    Failed(String),
    /// The status call itself failed; the attempt is consumed.
    Unreachable(String),
    /// The caller asked to stop waiting between polls.
    Cancelled,
    /// The caller asked to stop while a status call was in flight. The
    /// abandoned call still counts as an attempt.
    CancelledInFlight,
}

impl PollEvent {
    pub fn from_output(output: &TaskOutput) -> Self {
        match output.task_status {
            TaskStatus::Pending | TaskStatus::Running => PollEvent::InProgress,
            TaskStatus::Succeeded => PollEvent::Succeeded(output.result_urls()),
            TaskStatus::Failed | TaskStatus::Canceled | TaskStatus::Unknown => {
                PollEvent::Failed(output.failure_message())
            }
        }
    }

    fn is_poll(&self) -> bool {
        !matches!(self, PollEvent::Cancelled)
    }
}

/// The result of applying an event to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Keep polling.
    Continue,
    /// The job reached (or already was in) this terminal state.
    Terminal(JobState),
}

/// Drives a [`Job`] through its lifecycle.
pub struct JobStateMachine;

impl JobStateMachine {
    /// Move a freshly submitted job into `Running`.
    ///
    /// A zero attempt budget times the job out without any poll.
    pub fn start(job: &mut Job) -> Transition {
        if job.state != JobState::Submitted {
            return Self::current(job);
        }
        if job.max_attempts == 0 {
            Self::enter(job, JobState::TimedOut, Some(Failure::Timeout));
            return Transition::Terminal(JobState::TimedOut);
        }
        Self::enter(job, JobState::Running, None);
        Transition::Continue
    }

    /// Apply one observation to the job.
    ///
    /// - Every observation except `Cancelled` counts as one attempt.
    /// - `Cancelled` and `CancelledInFlight` both end in `Cancelled`.
    /// - `Succeeded` with URLs ends in `Succeeded`; with none it ends in
    ///   `Failed` (empty result).
    /// - `Failed` ends in `Failed` immediately.
    /// - `InProgress` and `Unreachable` continue until the budget runs out,
    ///   then end in `TimedOut`.
    /// - Terminal jobs are never changed.
    pub fn next(job: &mut Job, event: PollEvent) -> Transition {
        if job.is_terminal() {
            return Self::current(job);
        }
        if job.state == JobState::Submitted {
            Self::start(job);
            if job.is_terminal() {
                return Self::current(job);
            }
        }

        if event.is_poll() {
            job.attempts += 1;
        }
        job.updated_at = Utc::now();

        match event {
            PollEvent::Succeeded(urls) if !urls.is_empty() => {
                job.result = Some(urls);
                Self::enter(job, JobState::Succeeded, None);
            }
            PollEvent::Succeeded(_) => {
                Self::enter(job, JobState::Failed, Some(Failure::EmptyResult));
            }
            PollEvent::Failed(message) => {
                Self::enter(job, JobState::Failed, Some(Failure::Provider(message)));
            }
            PollEvent::Cancelled | PollEvent::CancelledInFlight => {
                Self::enter(job, JobState::Cancelled, Some(Failure::Cancelled));
            }
            PollEvent::InProgress | PollEvent::Unreachable(_) => {
                if job.attempts >= job.max_attempts {
                    Self::enter(job, JobState::TimedOut, Some(Failure::Timeout));
                }
            }
        }

        Self::current(job)
    }

    fn current(job: &Job) -> Transition {
        if job.is_terminal() {
            Transition::Terminal(job.state)
        } else {
            Transition::Continue
        }
    }

    fn enter(job: &mut Job, state: JobState, failure: Option<Failure>) {
        job.state_history.push(job.state);
        job.state = state;
        job.failure = failure;
        job.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_job(max_attempts: u32) -> Job {
        let mut job = Job::new("task-1".into(), max_attempts);
        JobStateMachine::start(&mut job);
        job
    }

    #[test]
    fn start_moves_to_running() {
        let mut job = Job::new("task-1".into(), 3);
        assert_eq!(JobStateMachine::start(&mut job), Transition::Continue);
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.state_history, vec![JobState::Submitted]);
    }

    #[test]
    fn zero_budget_times_out_without_polling() {
        let mut job = Job::new("task-1".into(), 0);
        assert_eq!(
            JobStateMachine::start(&mut job),
            Transition::Terminal(JobState::TimedOut)
        );
        assert_eq!(job.attempts, 0);
        assert_eq!(job.failure, Some(Failure::Timeout));
    }

    #[test]
    fn success_sets_result() {
        let mut job = running_job(3);
        let t = JobStateMachine::next(&mut job, PollEvent::Succeeded(vec!["u1".into()]));
        assert_eq!(t, Transition::Terminal(JobState::Succeeded));
        assert_eq!(job.result, Some(vec!["u1".to_string()]));
        assert_eq!(job.attempts, 1);
        assert!(job.failure.is_none());
    }

    #[test]
    fn empty_success_is_failure_without_result() {
        let mut job = running_job(3);
        let t = JobStateMachine::next(&mut job, PollEvent::Succeeded(vec![]));
        assert_eq!(t, Transition::Terminal(JobState::Failed));
        assert!(job.result.is_none());
        assert_eq!(job.failure, Some(Failure::EmptyResult));
    }

    #[test]
    fn provider_failure_is_immediate() {
        let mut job = running_job(10);
        let t = JobStateMachine::next(&mut job, PollEvent::Failed("quota".into()));
        assert_eq!(t, Transition::Terminal(JobState::Failed));
        assert_eq!(job.attempts, 1);
        assert_eq!(job.failure, Some(Failure::Provider("quota".into())));
    }

    #[test]
    fn in_progress_times_out_at_budget() {
        let mut job = running_job(3);
        assert_eq!(
            JobStateMachine::next(&mut job, PollEvent::InProgress),
            Transition::Continue
        );
        assert_eq!(
            JobStateMachine::next(&mut job, PollEvent::Unreachable("reset".into())),
            Transition::Continue
        );
        assert_eq!(
            JobStateMachine::next(&mut job, PollEvent::InProgress),
            Transition::Terminal(JobState::TimedOut)
        );
        assert_eq!(job.attempts, 3);
    }

    #[test]
    fn cancellation_does_not_consume_an_attempt() {
        let mut job = running_job(3);
        JobStateMachine::next(&mut job, PollEvent::InProgress);
        let t = JobStateMachine::next(&mut job, PollEvent::Cancelled);
        assert_eq!(t, Transition::Terminal(JobState::Cancelled));
        assert_eq!(job.attempts, 1);
    }

    #[test]
    fn cancellation_in_flight_counts_the_abandoned_poll() {
        let mut job = running_job(3);
        let t = JobStateMachine::next(&mut job, PollEvent::CancelledInFlight);
        assert_eq!(t, Transition::Terminal(JobState::Cancelled));
        assert_eq!(job.attempts, 1);
        assert_eq!(job.failure, Some(Failure::Cancelled));
    }

    #[test]
    fn terminal_state_is_sticky() {
        let mut job = running_job(3);
        JobStateMachine::next(&mut job, PollEvent::Failed("boom".into()));
        let history = job.state_history.clone();

        let t = JobStateMachine::next(&mut job, PollEvent::Succeeded(vec!["late".into()]));
        assert_eq!(t, Transition::Terminal(JobState::Failed));
        assert_eq!(job.attempts, 1);
        assert!(job.result.is_none());
        assert_eq!(job.state_history, history);
    }

    #[test]
    fn next_on_submitted_job_starts_it() {
        let mut job = Job::new("task-1".into(), 2);
        JobStateMachine::next(&mut job, PollEvent::InProgress);
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.attempts, 1);
    }

    #[test]
    fn event_from_output() {
        let output: TaskOutput = serde_json::from_str(
            r#"{"task_status": "SUCCEEDED", "results": [{"url": "https://a"}]}"#,
        )
        .unwrap();
        assert_eq!(
            PollEvent::from_output(&output),
            PollEvent::Succeeded(vec!["https://a".into()])
        );

        let output: TaskOutput =
            serde_json::from_str(r#"{"task_status": "RUNNING"}"#).unwrap();
        assert_eq!(PollEvent::from_output(&output), PollEvent::InProgress);

        let output: TaskOutput =
            serde_json::from_str(r#"{"task_status": "CANCELED", "message": "user"}"#).unwrap();
        assert_eq!(PollEvent::from_output(&output), PollEvent::Failed("user".into()));
    }
}
