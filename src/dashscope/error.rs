//! Tipos de erro para o cliente da API DashScope.
//!
//! Define [`DashScopeError`] com variantes para erros HTTP, corpos de resposta
//! incompletos e falhas de rede. O corpo bruto da resposta é preservado sempre
//! que disponível, para diagnóstico.

use thiserror::Error;

/// Erros que podem ocorrer ao falar com os endpoints de tarefas da DashScope.
#[derive(Debug, Error)]
pub enum DashScopeError {
    /// A API respondeu com status HTTP fora da faixa 2xx.
    /// `body` guarda o corpo bruto devolvido pelo servidor.
    #[error("API error (status {status}): {body}")]
    ApiError { status: u16, body: String },

    /// A resposta veio com sucesso, mas sem o campo esperado.
    #[error("response is missing `{field}`: {raw}")]
    MissingField { field: &'static str, raw: String },

    /// O corpo da resposta não é JSON válido para o formato esperado.
    #[error("failed to decode response: {message}")]
    Decode { message: String, raw: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl DashScopeError {
    /// Corpo bruto da resposta, quando o erro veio de uma resposta HTTP.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            DashScopeError::ApiError { body, .. } => Some(body),
            DashScopeError::MissingField { raw, .. } | DashScopeError::Decode { raw, .. } => {
                Some(raw)
            }
            DashScopeError::NetworkError(_) => None,
        }
    }
}
