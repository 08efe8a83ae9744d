use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::http::DynHttpTransport;
use crate::provider::DynChatStream;
use crate::provider::mistral::MistralChatStream;
use crate::provider::ollama::OllamaChatStream;
use crate::provider::openai_compat::OpenAiCompatChatStream;
use crate::provider::{ollama, openai_compat};

/// 后端类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Mistral,
    OpenAiCompat,
    Ollama,
}

/// 后端配置 描述一个可调用后端
///
/// 模型名留空时在 [`build_chat_stream`] 里一次性解析 不做进程级缓存
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// API Key 本地后端可留空
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// 根据配置构建后端 模型名与凭证在此处一次性解析并随构造传递
pub async fn build_chat_stream(
    config: &BackendConfig,
    transport: DynHttpTransport,
) -> Result<DynChatStream, LLMError> {
    let backend: DynChatStream = match config.kind {
        BackendKind::Mistral => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| LLMError::InvalidConfig {
                    field: "api_key".to_string(),
                    reason: "mistral backend requires an API key".to_string(),
                })?;
            let mut backend = MistralChatStream::new(transport, api_key);
            if let Some(base_url) = &config.base_url {
                backend = backend.with_base_url(base_url.clone());
            }
            if let Some(model) = &config.model {
                backend = backend.with_model(model.clone());
            }
            if let Some(temperature) = config.temperature {
                backend = backend.with_temperature(temperature);
            }
            Arc::new(backend)
        }
        BackendKind::OpenAiCompat => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| openai_compat::DEFAULT_BASE_URL.to_string());
            let mut backend = match &config.model {
                Some(model) => {
                    OpenAiCompatChatStream::new(transport, base_url, model.clone())
                }
                None => OpenAiCompatChatStream::autoselect(transport, base_url).await?,
            };
            if let Some(api_key) = &config.api_key {
                backend = backend.with_api_key(api_key.clone());
            }
            if let Some(temperature) = config.temperature {
                backend = backend.with_temperature(temperature);
            }
            Arc::new(backend)
        }
        BackendKind::Ollama => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| ollama::DEFAULT_BASE_URL.to_string());
            let mut backend = match &config.model {
                Some(model) => {
                    OllamaChatStream::new(transport, model.clone()).with_base_url(base_url)
                }
                None => OllamaChatStream::autoselect(transport, base_url).await,
            };
            if let Some(temperature) = config.temperature {
                backend = backend.with_temperature(temperature);
            }
            Arc::new(backend)
        }
    };

    Ok(backend)
}
