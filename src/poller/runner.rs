//! Turns a provider's "submit now, poll later" API into one awaitable call.

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::job::{Job, PollConfig};
use super::state::{JobStateMachine, PollEvent, Transition};
use crate::dashscope::{ImageSynthesisRequest, TaskProvider};
use crate::error::PollError;

pub struct JobPoller<P> {
    provider: P,
}

impl<P: TaskProvider> JobPoller<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Submit a generation request and return the provider's job id.
    pub async fn submit(&self, req: &ImageSynthesisRequest) -> Result<String, PollError> {
        let job_id = self.provider.submit_task(req).await?;
        info!(job_id = %job_id, model = %req.model, "generation job submitted");
        Ok(job_id)
    }

    /// Poll `job_id` until it reaches a terminal state and return its output URLs.
    pub async fn await_completion(
        &self,
        job_id: &str,
        config: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PollError> {
        self.track(job_id, config, cancel).await.into_result()
    }

    /// Run the poll loop and return the terminal [`Job`] with its full history.
    ///
    /// Each call owns its own job and attempt counter. A status call that is
    /// abandoned because of cancellation still counts as an attempt.
    pub async fn track(&self, job_id: &str, config: &PollConfig, cancel: &CancellationToken) -> Job {
        let mut job = Job::new(job_id.to_string(), config.max_attempts);
        let interval = config.poll_interval();

        let mut transition = JobStateMachine::start(&mut job);
        while transition == Transition::Continue {
            let slept = tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                _ = sleep(interval) => true,
            };
            let event = if !slept {
                PollEvent::Cancelled
            } else {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => PollEvent::CancelledInFlight,
                    event = self.poll_once(job_id) => event,
                }
            };

            if let PollEvent::Unreachable(reason) = &event {
                warn!(
                    job_id,
                    attempt = job.attempts + 1,
                    max_attempts = job.max_attempts,
                    "status poll failed: {reason}"
                );
            }
            transition = JobStateMachine::next(&mut job, event);
        }

        info!(
            job_id,
            state = %job.state,
            attempts = job.attempts,
            failure = ?job.failure_reason(),
            "generation job finished"
        );
        job
    }

    /// Submit `req` and poll it to completion, returning the terminal job.
    ///
    /// Only a failed submission is an `Err`; every other outcome is recorded
    /// on the returned job.
    pub async fn run(
        &self,
        req: &ImageSynthesisRequest,
        config: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<Job, PollError> {
        if cancel.is_cancelled() {
            return Err(PollError::CancelledBeforeSubmission);
        }
        let job_id = self.submit(req).await?;
        Ok(self.track(&job_id, config, cancel).await)
    }

    pub async fn generate_and_retrieve(
        &self,
        req: &ImageSynthesisRequest,
        config: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, PollError> {
        self.run(req, config, cancel).await?.into_result()
    }

    async fn poll_once(&self, job_id: &str) -> PollEvent {
        match self.provider.fetch_task(job_id).await {
            Ok(output) => {
                debug!(job_id, status = %output.task_status, "polled job status");
                PollEvent::from_output(&output)
            }
            Err(e) => PollEvent::Unreachable(e.to_string()),
        }
    }
}
