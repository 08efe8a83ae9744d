use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, post_json_stream_with_headers};
use crate::stream::{DeltaDecoder, collect_body_text};
use crate::types::ChatMessage;

use super::error::parse_api_error;
use super::models::list_model_ids;
use super::request::build_chat_body;
use super::{ChatStream, DeltaStream};

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const PLACEHOLDER_API_KEY: &str = "ollama";
const DEFAULT_TEMPERATURE: f32 = 1.0;
const FALLBACK_MODEL: &str = "llama3.2";

/// 本地模型运行器后端 走 Ollama 的 OpenAI 兼容接口
pub struct OllamaChatStream {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) temperature: f32,
}

impl OllamaChatStream {
    /// 使用显式模型名构建后端
    pub fn new(transport: DynHttpTransport, model: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Resolves the model from whatever the local runner has pulled.
    ///
    /// Unlike a dedicated inference server, a model runner routinely hosts
    /// several models, and which one is "first" is still a reasonable default
    /// for a development setup. When the runner is unreachable or reports
    /// nothing, construction falls back to a common default instead of
    /// failing, so a voice session can come up before the runner does. The
    /// lookup happens once, here, and the result is stored on the backend.
    pub async fn autoselect(transport: DynHttpTransport, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let headers = HashMap::from([(
            "Authorization".to_string(),
            format!("Bearer {PLACEHOLDER_API_KEY}"),
        )]);
        let model = match list_model_ids(transport.as_ref(), &base_url, headers, "ollama").await {
            Ok(ids) => match ids.into_iter().next() {
                Some(first) => first,
                None => {
                    warn!("runner reports no models, falling back to {FALLBACK_MODEL}");
                    FALLBACK_MODEL.to_string()
                }
            },
            Err(err) => {
                warn!(error = %err, "model listing failed, falling back to {FALLBACK_MODEL}");
                FALLBACK_MODEL.to_string()
            }
        };

        Self {
            transport,
            base_url,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            model,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// 自定义 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 覆盖采样温度
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// 当前生效的模型名
    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/chat/completions")
        } else {
            format!("{base}/v1/chat/completions")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        headers
    }
}

#[async_trait]
impl ChatStream for OllamaChatStream {
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<DeltaStream, LLMError> {
        let body = build_chat_body(messages, &self.model, self.temperature);
        let response = post_json_stream_with_headers(
            self.transport.as_ref(),
            self.endpoint(),
            self.build_headers(),
            &body,
        )
        .await?;

        if !(200..300).contains(&response.status) {
            let text = collect_body_text(response.body, self.name()).await?;
            return Err(parse_api_error(
                self.name(),
                response.status,
                &response.headers,
                &text,
            ));
        }
        Ok(Box::pin(DeltaDecoder::new(response.body, self.name())))
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}
