use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use super::types::{AccessTokenResponse, IssuedToken};
use crate::error::CredentialError;

const TOKEN_URL: &str = "https://api.weixin.qq.com/cgi-bin/token";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can mint a new access token.
pub trait TokenSource {
    fn fetch_token(&self) -> impl Future<Output = Result<IssuedToken, CredentialError>> + Send;
}

/// Fetches official-account access tokens with the `client_credential` grant.
pub struct WeChatTokenClient {
    app_id: String,
    app_secret: String,
    token_url: String,
    client: Client,
    request_timeout: Duration,
}

impl WeChatTokenClient {
    pub fn new(app_id: String, app_secret: String) -> Self {
        Self::with_token_url(app_id, app_secret, TOKEN_URL.to_string())
    }

    /// Create a client pointing at a custom token URL (useful for testing).
    pub fn with_token_url(app_id: String, app_secret: String, token_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build HTTP client");
        Self {
            app_id,
            app_secret,
            token_url,
            client,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub async fn request_token(&self) -> Result<IssuedToken, CredentialError> {
        let response = self
            .client
            .get(&self.token_url)
            .query(&[
                ("grant_type", "client_credential"),
                ("appid", self.app_id.as_str()),
                ("secret", self.app_secret.as_str()),
            ])
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(CredentialError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        let body: AccessTokenResponse =
            serde_json::from_str(&raw).map_err(|_| CredentialError::MissingField {
                field: "access_token",
                raw: raw.clone(),
            })?;

        if let Some((code, message)) = body.error() {
            return Err(CredentialError::Provider {
                code,
                message: message.to_string(),
            });
        }

        let token = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CredentialError::MissingField {
                field: "access_token",
                raw: raw.clone(),
            })?;
        let expires_in_secs = body.expires_in.ok_or_else(|| CredentialError::MissingField {
            field: "expires_in",
            raw: raw.clone(),
        })?;

        Ok(IssuedToken {
            token,
            expires_in_secs,
        })
    }
}

impl TokenSource for WeChatTokenClient {
    async fn fetch_token(&self) -> Result<IssuedToken, CredentialError> {
        self.request_token().await
    }
}
