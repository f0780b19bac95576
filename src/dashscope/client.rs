use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::error::DashScopeError;
use super::types::{ImageSynthesisRequest, SubmitResponse, TaskOutput, TaskResponse};

const SUBMIT_URL: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text2image/image-synthesis";
const STATUS_URL_BASE: &str = "https://dashscope.aliyuncs.com/api/v1/tasks";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A provider of "submit now, poll later" tasks.
///
/// The poller only depends on this trait, so tests can script provider
/// responses without a network.
pub trait TaskProvider {
    /// Submit a task and return the provider-issued task id.
    fn submit_task(
        &self,
        req: &ImageSynthesisRequest,
    ) -> impl Future<Output = Result<String, DashScopeError>> + Send;

    /// Fetch the current status of a task.
    fn fetch_task(
        &self,
        task_id: &str,
    ) -> impl Future<Output = Result<TaskOutput, DashScopeError>> + Send;
}

pub struct DashScopeClient {
    api_key: String,
    client: Client,
    submit_url: String,
    status_url_base: String,
    request_timeout: Duration,
}

impl DashScopeClient {
    pub fn new(api_key: String) -> Self {
        Self::with_urls(api_key, SUBMIT_URL.to_string(), STATUS_URL_BASE.to_string())
    }

    /// Create a client pointing at custom endpoints (useful for testing).
    pub fn with_urls(api_key: String, submit_url: String, status_url_base: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self {
            api_key,
            client,
            submit_url,
            status_url_base: status_url_base.trim_end_matches('/').to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Per-request timeout applied to every submit and status call.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub async fn submit(&self, req: &ImageSynthesisRequest) -> Result<String, DashScopeError> {
        let response = self
            .client
            .post(&self.submit_url)
            .bearer_auth(&self.api_key)
            .header("X-DashScope-Async", "enable")
            .header("content-type", "application/json")
            .timeout(self.request_timeout)
            .json(req)
            .send()
            .await?;

        let raw = read_success_body(response).await?;
        let body: SubmitResponse =
            serde_json::from_str(&raw).map_err(|e| DashScopeError::Decode {
                message: e.to_string(),
                raw: raw.clone(),
            })?;

        let task_id = body
            .output
            .and_then(|o| o.task_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DashScopeError::MissingField {
                field: "output.task_id",
                raw: raw.clone(),
            })?;

        debug!(task_id = %task_id, request_id = ?body.request_id, "task submitted");
        Ok(task_id)
    }

    pub async fn task_status(&self, task_id: &str) -> Result<TaskOutput, DashScopeError> {
        let url = format!("{}/{}", self.status_url_base, task_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let raw = read_success_body(response).await?;
        let body: TaskResponse = serde_json::from_str(&raw).map_err(|e| DashScopeError::Decode {
            message: e.to_string(),
            raw,
        })?;
        Ok(body.output)
    }
}

impl TaskProvider for DashScopeClient {
    async fn submit_task(&self, req: &ImageSynthesisRequest) -> Result<String, DashScopeError> {
        self.submit(req).await
    }

    async fn fetch_task(&self, task_id: &str) -> Result<TaskOutput, DashScopeError> {
        self.task_status(task_id).await
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String, DashScopeError> {
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(DashScopeError::ApiError {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.text().await?)
}
