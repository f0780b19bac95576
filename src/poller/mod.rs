mod job;
mod runner;
mod state;

pub use job::{Failure, Job, JobReport, JobState, PollConfig};
pub use runner::JobPoller;
pub use state::{JobStateMachine, PollEvent, Transition};
