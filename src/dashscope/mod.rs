pub mod client;
pub mod error;
pub mod types;

pub use client::{DashScopeClient, TaskProvider};
pub use error::DashScopeError;
pub use types::{ImageSynthesisRequest, TaskOutput, TaskStatus};
