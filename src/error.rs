use thiserror::Error;

use crate::dashscope::DashScopeError;

#[derive(Debug, Error)]
pub enum InkpotError {
    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Terminal failures of an image-generation job.
#[derive(Debug, Error)]
pub enum PollError {
    /// The submit call failed or its response carried no task id.
    #[error("submission failed: {message}")]
    Submission {
        message: String,
        /// Raw provider response body, when one was received.
        raw: Option<String>,
    },

    #[error("job {job_id} succeeded without any result")]
    EmptyResult { job_id: String },

    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("job {job_id} did not finish after {attempts} polls")]
    JobTimeout { job_id: String, attempts: u32 },

    #[error("job {job_id} was cancelled")]
    Cancelled { job_id: String },

    /// The caller cancelled before anything was sent to the provider.
    #[error("cancelled before submission")]
    CancelledBeforeSubmission,
}

impl PollError {
    /// Whether a caller may reasonably substitute a placeholder result.
    ///
    /// Submission and cancellation are excluded: the first is usually a
    /// configuration problem and the second was requested by the caller.
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            PollError::EmptyResult { .. } | PollError::JobFailed { .. } | PollError::JobTimeout { .. }
        )
    }
}

impl From<DashScopeError> for PollError {
    fn from(err: DashScopeError) -> Self {
        PollError::Submission {
            raw: err.raw_body().map(str::to_string),
            message: err.to_string(),
        }
    }
}

/// Failures acquiring an access token.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("token endpoint returned status {status}: {body}")]
    Endpoint { status: u16, body: String },

    /// The endpoint answered 200 with an error envelope (`errcode`/`errmsg`).
    #[error("token endpoint rejected the request ({code}): {message}")]
    Provider { code: i64, message: String },

    #[error("token response is missing `{field}`: {raw}")]
    MissingField { field: &'static str, raw: String },

    #[error("token response has non-positive expires_in ({expires_in})")]
    InvalidExpiry { expires_in: i64 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_error_display() {
        let err = PollError::JobTimeout {
            job_id: "t-1".into(),
            attempts: 60,
        };
        assert_eq!(err.to_string(), "job t-1 did not finish after 60 polls");

        let err = PollError::JobFailed {
            job_id: "t-2".into(),
            message: "InvalidParameter: bad size".into(),
        };
        assert_eq!(err.to_string(), "job t-2 failed: InvalidParameter: bad size");
    }

    #[test]
    fn cancellation_before_submission_has_no_job_id() {
        assert_eq!(
            PollError::CancelledBeforeSubmission.to_string(),
            "cancelled before submission"
        );
    }

    #[test]
    fn dashscope_error_becomes_submission_with_raw_body() {
        let err: PollError = DashScopeError::ApiError {
            status: 500,
            body: "upstream down".into(),
        }
        .into();
        match err {
            PollError::Submission { message, raw } => {
                assert!(message.contains("500"));
                assert_eq!(raw.as_deref(), Some("upstream down"));
            }
            other => panic!("expected Submission, got {other:?}"),
        }
    }

    #[test]
    fn fallback_only_for_job_outcomes() {
        assert!(PollError::EmptyResult { job_id: "a".into() }.allows_fallback());
        assert!(
            PollError::JobTimeout {
                job_id: "a".into(),
                attempts: 1
            }
            .allows_fallback()
        );
        assert!(!PollError::Cancelled { job_id: "a".into() }.allows_fallback());
        assert!(!PollError::CancelledBeforeSubmission.allows_fallback());
        assert!(
            !PollError::Submission {
                message: "x".into(),
                raw: None
            }
            .allows_fallback()
        );
    }

    #[test]
    fn credential_error_display() {
        let err = CredentialError::Provider {
            code: 40013,
            message: "invalid appid".into(),
        };
        assert_eq!(
            err.to_string(),
            "token endpoint rejected the request (40013): invalid appid"
        );
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PollError>();
        assert_send_sync::<CredentialError>();
        assert_send_sync::<InkpotError>();
    }
}
