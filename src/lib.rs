//! Async job polling and access-token lifecycle for third-party content APIs.
//!
//! Two pieces:
//!
//! - [`poller::JobPoller`] turns DashScope's "submit now, poll later" image
//!   synthesis API into one awaitable call with a bounded attempt budget and
//!   caller-driven cancellation.
//! - [`wechat::TokenCache`] hands out a WeChat official-account access token,
//!   refreshing it before it expires.

pub mod config;
pub mod dashscope;
pub mod error;
pub mod poller;
pub mod wechat;

pub use config::InkpotConfig;
pub use error::{CredentialError, InkpotError, PollError};
pub use poller::{Job, JobPoller, JobReport, JobState, PollConfig};
pub use wechat::TokenCache;
