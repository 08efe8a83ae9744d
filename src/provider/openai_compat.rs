use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, post_json_stream_with_headers};
use crate::stream::{DeltaDecoder, collect_body_text};
use crate::types::ChatMessage;

use super::error::parse_api_error;
use super::models::list_model_ids;
use super::request::build_chat_body;
use super::{ChatStream, DeltaStream};

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const PLACEHOLDER_API_KEY: &str = "EMPTY";
const DEFAULT_TEMPERATURE: f32 = 1.0;

/// 本地 OpenAI 协议兼容服务器后端（vLLM 等）
///
/// 这类服务器通常不校验 API Key 这里默认填充占位值
pub struct OpenAiCompatChatStream {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) temperature: f32,
}

impl OpenAiCompatChatStream {
    /// 使用显式模型名构建后端
    pub fn new(
        transport: DynHttpTransport,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Resolves the model by asking the server which models it serves.
    ///
    /// Local inference servers usually expose exactly one model; when they do,
    /// naming it in configuration is redundant, so this constructor lists the
    /// server's models and uses the single entry. Zero or multiple entries are
    /// configuration errors: the caller must name a model explicitly. The
    /// lookup happens once, here, and the result is stored on the backend.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when the server reports zero or
    /// more than one model, or forwards the listing failure.
    pub async fn autoselect(
        transport: DynHttpTransport,
        base_url: impl Into<String>,
    ) -> Result<Self, LLMError> {
        let base_url = base_url.into();
        let headers = HashMap::from([(
            "Authorization".to_string(),
            format!("Bearer {PLACEHOLDER_API_KEY}"),
        )]);
        let ids = list_model_ids(transport.as_ref(), &base_url, headers, "openai_compat").await?;
        match ids.as_slice() {
            [only] => Ok(Self::new(transport, base_url, only.clone())),
            [] => Err(LLMError::InvalidConfig {
                field: "model".to_string(),
                reason: "server reports no models".to_string(),
            }),
            many => Err(LLMError::InvalidConfig {
                field: "model".to_string(),
                reason: format!(
                    "server reports {} models; specify one explicitly",
                    many.len()
                ),
            }),
        }
    }

    /// 覆盖占位 API Key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
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
impl ChatStream for OpenAiCompatChatStream {
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
        "openai_compat"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use futures_util::stream;

    use crate::http::{HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};

    use super::*;

    /// Transport that serves a fixed model list.
    struct ModelListTransport {
        body: &'static str,
    }

    #[async_trait]
    impl HttpTransport for ModelListTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
            assert!(request.url.ends_with("/v1/models"));
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: self.body.as_bytes().to_vec(),
            })
        }

        async fn send_stream(&self, _request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
            Ok(HttpStreamResponse {
                status: 200,
                headers: HashMap::new(),
                body: Box::pin(stream::empty()),
            })
        }
    }

    #[tokio::test]
    async fn autoselect_uses_the_single_served_model() {
        let transport: DynHttpTransport = Arc::new(ModelListTransport {
            body: r#"{"data":[{"id":"qwen2.5-7b-instruct"}]}"#,
        });
        let backend = OpenAiCompatChatStream::autoselect(transport, "http://localhost:8000")
            .await
            .expect("single model should be selected");
        assert_eq!(backend.model(), "qwen2.5-7b-instruct");
    }

    #[tokio::test]
    async fn autoselect_rejects_multiple_models() {
        let transport: DynHttpTransport = Arc::new(ModelListTransport {
            body: r#"{"data":[{"id":"a"},{"id":"b"}]}"#,
        });
        let err = match OpenAiCompatChatStream::autoselect(transport, "http://localhost:8000").await
        {
            Ok(_) => panic!("two models should be rejected"),
            Err(e) => e,
        };
        match err {
            LLMError::InvalidConfig { field, reason } => {
                assert_eq!(field, "model");
                assert!(reason.contains("2 models"), "reason: {reason}");
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn autoselect_rejects_empty_model_list() {
        let transport: DynHttpTransport = Arc::new(ModelListTransport {
            body: r#"{"data":[]}"#,
        });
        let err = match OpenAiCompatChatStream::autoselect(transport, "http://localhost:8000").await
        {
            Ok(_) => panic!("empty list should be rejected"),
            Err(e) => e,
        };
        assert!(matches!(err, LLMError::InvalidConfig { .. }));
    }

    #[test]
    fn endpoint_respects_versioned_base_url() {
        let transport: DynHttpTransport = Arc::new(ModelListTransport { body: "{}" });
        let backend =
            OpenAiCompatChatStream::new(transport, "http://localhost:8000/v1", "some-model");
        assert_eq!(
            backend.endpoint(),
            "http://localhost:8000/v1/chat/completions"
        );
    }
}
