//! Tipos de dados para as requisições e respostas da API de tarefas assíncronas
//! da DashScope (síntese de imagens).
//!
//! O envio segue o formato `{ model, input, parameters }` e a consulta de status
//! devolve `{ output: { task_status, results, message } }`.

use serde::{Deserialize, Serialize};

/// Corpo da requisição de síntese de imagem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSynthesisRequest {
    /// Identificador do modelo (ex.: "wanx-v1").
    pub model: String,
    pub input: ImageInput,
    pub parameters: ImageParameters,
}

impl ImageSynthesisRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: ImageInput {
                prompt: prompt.into(),
                negative_prompt: None,
            },
            parameters: ImageParameters::default(),
        }
    }
}

/// Texto de entrada do modelo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInput {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

/// Parâmetros de geração.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageParameters {
    /// Dimensões no formato da DashScope, ex.: "1024*1024".
    pub size: String,
    /// Quantidade de imagens a gerar.
    pub n: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ImageParameters {
    fn default() -> Self {
        Self {
            size: "1024*1024".to_string(),
            n: 1,
            seed: None,
        }
    }
}

/// Resposta do endpoint de envio.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub output: Option<SubmitOutput>,
    #[serde(default)]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitOutput {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_status: Option<TaskStatus>,
}

/// Resposta do endpoint de consulta `GET /tasks/{task_id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskResponse {
    pub output: TaskOutput,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Estado de uma tarefa conforme relatado pela DashScope.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskOutput {
    #[serde(default)]
    pub task_id: Option<String>,
    pub task_status: TaskStatus,
    #[serde(default)]
    pub results: Vec<TaskResult>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl TaskOutput {
    /// URLs das imagens geradas, na ordem devolvida, ignorando entradas sem URL.
    pub fn result_urls(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|r| r.url.as_deref())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Mensagem de falha mais informativa disponível.
    pub fn failure_message(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => format!("task reported {}", self.task_status),
        }
    }
}

/// Um item de resultado. Sub-tarefas que falharam vêm sem `url`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    /// Also covers statuses this client does not recognise.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "PENDING"),
            TaskStatus::Running => write!(f, "RUNNING"),
            TaskStatus::Succeeded => write!(f, "SUCCEEDED"),
            TaskStatus::Failed => write!(f, "FAILED"),
            TaskStatus::Canceled => write!(f, "CANCELED"),
            TaskStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_provider_shape() {
        let mut req = ImageSynthesisRequest::new("wanx-v1", "a red lantern");
        req.parameters.seed = Some(42);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["model"], "wanx-v1");
        assert_eq!(value["input"]["prompt"], "a red lantern");
        assert!(value["input"].get("negative_prompt").is_none());
        assert_eq!(value["parameters"]["size"], "1024*1024");
        assert_eq!(value["parameters"]["n"], 1);
        assert_eq!(value["parameters"]["seed"], 42);
    }

    #[test]
    fn seed_is_omitted_when_unset() {
        let req = ImageSynthesisRequest::new("wanx-v1", "x");
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("seed"));
    }

    #[test]
    fn submit_response_deserialize_from_api_format() {
        let json = r#"{
            "output": {"task_status": "PENDING", "task_id": "0385dc79-5ff8-4d82-bcb6-5e6a9e1e8d2b"},
            "request_id": "4909100c-7b5a-9f92-bfe5-5b0d0e1f2b3a"
        }"#;
        let resp: SubmitResponse = serde_json::from_str(json).unwrap();
        let output = resp.output.unwrap();
        assert_eq!(
            output.task_id.as_deref(),
            Some("0385dc79-5ff8-4d82-bcb6-5e6a9e1e8d2b")
        );
        assert_eq!(output.task_status, Some(TaskStatus::Pending));
    }

    #[test]
    fn task_output_collects_urls_in_order() {
        let json = r#"{
            "output": {
                "task_id": "t-1",
                "task_status": "SUCCEEDED",
                "results": [
                    {"url": "https://img/1.png"},
                    {"code": "DataInspectionFailed", "message": "blocked"},
                    {"url": "https://img/2.png"}
                ]
            }
        }"#;
        let resp: TaskResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.output.task_status, TaskStatus::Succeeded);
        assert_eq!(
            resp.output.result_urls(),
            vec!["https://img/1.png", "https://img/2.png"]
        );
    }

    #[test]
    fn unrecognised_status_maps_to_unknown() {
        let json = r#"{"task_status": "SUSPENDED"}"#;
        let output: TaskOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.task_status, TaskStatus::Unknown);
        assert!(output.results.is_empty());
    }

    #[test]
    fn failure_message_prefers_code_and_message() {
        let output: TaskOutput = serde_json::from_str(
            r#"{"task_status": "FAILED", "code": "InvalidParameter", "message": "size not supported"}"#,
        )
        .unwrap();
        assert_eq!(output.failure_message(), "InvalidParameter: size not supported");

        let bare: TaskOutput = serde_json::from_str(r#"{"task_status": "FAILED"}"#).unwrap();
        assert_eq!(bare.failure_message(), "task reported FAILED");
    }
}
