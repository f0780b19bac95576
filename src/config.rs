//! Configuração do inkpot carregada a partir de `inkpot.toml`.
//!
//! A struct [`InkpotConfig`] agrupa as seções `[dashscope]` e `[wechat]`.
//! Valores ausentes no arquivo usam defaults sensíveis, e as variáveis de
//! ambiente `DASHSCOPE_API_KEY`, `WECHAT_APP_ID` e `WECHAT_APP_SECRET` têm
//! precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

use crate::error::InkpotError;
use crate::poller::PollConfig;

const CONFIG_FILE: &str = "inkpot.toml";

/// Configuração de nível superior carregada de `inkpot.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InkpotConfig {
    #[serde(default)]
    pub dashscope: DashScopeConfig,
    #[serde(default)]
    pub wechat: WeChatConfig,
}

/// Parâmetros do provedor de geração de imagens.
#[derive(Debug, Clone, Deserialize)]
pub struct DashScopeConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_submit_url")]
    pub submit_url: String,

    /// Base da URL de status; o id da tarefa é anexado como `/{task_id}`.
    #[serde(default = "default_status_url_base")]
    pub status_url_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_size")]
    pub size: String,

    #[serde(default = "default_n")]
    pub n: u32,

    /// Intervalo entre consultas de status, em milissegundos.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Número máximo de consultas antes de desistir.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Timeout de cada chamada HTTP individual, em segundos.
    #[serde(default = "default_dashscope_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Parâmetros da conta oficial do WeChat.
#[derive(Debug, Clone, Deserialize)]
pub struct WeChatConfig {
    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub app_secret: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Margem antes da expiração em que o token é renovado, em segundos.
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: i64,

    #[serde(default = "default_wechat_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_submit_url() -> String {
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text2image/image-synthesis".to_string()
}

fn default_status_url_base() -> String {
    "https://dashscope.aliyuncs.com/api/v1/tasks".to_string()
}

fn default_model() -> String {
    "wanx-v1".to_string()
}

fn default_size() -> String {
    "1024*1024".to_string()
}

fn default_n() -> u32 {
    1
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    60
}

fn default_dashscope_timeout_secs() -> u64 {
    15
}

fn default_token_url() -> String {
    "https://api.weixin.qq.com/cgi-bin/token".to_string()
}

// WeChat tokens live 7200s; renew five minutes early.
fn default_refresh_margin_secs() -> i64 {
    300
}

// A margin longer than a day would refresh on every call.
const MAX_REFRESH_MARGIN_SECS: i64 = 86_400;

fn default_wechat_timeout_secs() -> u64 {
    10
}

impl Default for DashScopeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            submit_url: default_submit_url(),
            status_url_base: default_status_url_base(),
            model: default_model(),
            size: default_size(),
            n: default_n(),
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_dashscope_timeout_secs(),
        }
    }
}

impl Default for WeChatConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            token_url: default_token_url(),
            refresh_margin_secs: default_refresh_margin_secs(),
            request_timeout_secs: default_wechat_timeout_secs(),
        }
    }
}

impl DashScopeConfig {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            poll_interval_ms: self.poll_interval_ms,
            max_attempts: self.max_attempts,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn require_api_key(&self) -> Result<&str, InkpotError> {
        if self.api_key.is_empty() {
            return Err(InkpotError::Config(
                "DashScope API key is not set (DASHSCOPE_API_KEY or [dashscope].api_key)".into(),
            ));
        }
        Ok(&self.api_key)
    }
}

impl WeChatConfig {
    pub fn refresh_margin(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.refresh_margin_secs).unwrap_or(TimeDelta::MAX)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn require_credentials(&self) -> Result<(&str, &str), InkpotError> {
        if self.app_id.is_empty() || self.app_secret.is_empty() {
            return Err(InkpotError::Config(
                "WeChat app id/secret are not set (WECHAT_APP_ID, WECHAT_APP_SECRET)".into(),
            ));
        }
        Ok((&self.app_id, &self.app_secret))
    }
}

impl InkpotConfig {
    /// Carrega a configuração de `inkpot.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self, InkpotError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, InkpotError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<InkpotConfig>(&contents)?
        } else {
            Self::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    // Variáveis de ambiente têm precedência sobre o arquivo para os segredos.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        if let Some(key) = non_empty("DASHSCOPE_API_KEY") {
            self.dashscope.api_key = key;
        }
        if let Some(id) = non_empty("WECHAT_APP_ID") {
            self.wechat.app_id = id;
        }
        if let Some(secret) = non_empty("WECHAT_APP_SECRET") {
            self.wechat.app_secret = secret;
        }
    }

    fn validate(&self) -> Result<(), InkpotError> {
        if !(0..=MAX_REFRESH_MARGIN_SECS).contains(&self.wechat.refresh_margin_secs) {
            return Err(InkpotError::Config(format!(
                "wechat.refresh_margin_secs must be between 0 and {MAX_REFRESH_MARGIN_SECS}"
            )));
        }
        if self.dashscope.n == 0 {
            return Err(InkpotError::Config("dashscope.n must be at least 1".into()));
        }
        Ok(())
    }
}
