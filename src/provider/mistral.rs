use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, post_json_stream_with_headers};
use crate::stream::{DeltaDecoder, collect_body_text};
use crate::types::ChatMessage;

use super::error::parse_api_error;
use super::request::build_chat_body;
use super::{ChatStream, DeltaStream};

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";
const DEFAULT_MODEL: &str = "mistral-large-latest";
const DEFAULT_TEMPERATURE: f32 = 1.0;

/// 托管推理 API 后端
pub struct MistralChatStream {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) model: String,
    pub(crate) temperature: f32,
}

impl MistralChatStream {
    /// 创建带默认 base_url 与默认模型的后端
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// 自定义 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 覆盖默认模型
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// 覆盖采样温度
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
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
impl ChatStream for MistralChatStream {
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
        "mistral"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use futures_util::stream;

    use crate::http::{HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};

    use super::*;

    #[test]
    fn endpoint_appends_version_segment_once() {
        let transport: DynHttpTransport = Arc::new(NullTransport);
        let backend = MistralChatStream::new(Arc::clone(&transport), "key");
        assert_eq!(
            backend.endpoint(),
            "https://api.mistral.ai/v1/chat/completions"
        );

        let backend = MistralChatStream::new(transport, "key")
            .with_base_url("https://gateway.example.com/v1/");
        assert_eq!(
            backend.endpoint(),
            "https://gateway.example.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn error_status_is_mapped_before_streaming() {
        let transport: DynHttpTransport = Arc::new(ErrorTransport);
        let backend = MistralChatStream::new(transport, "bad-key");
        let err = match backend.chat_completion(&[]).await {
            Ok(_) => panic!("401 should fail"),
            Err(e) => e,
        };
        assert!(matches!(err, LLMError::Auth { .. }));
    }

    struct NullTransport;

    #[async_trait]
    impl HttpTransport for NullTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, LLMError> {
            panic!("send should not be called");
        }

        async fn send_stream(&self, _request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
            panic!("send_stream should not be called");
        }
    }

    struct ErrorTransport;

    #[async_trait]
    impl HttpTransport for ErrorTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, LLMError> {
            panic!("send should not be called");
        }

        async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
            assert_eq!(
                request.headers.get("Authorization"),
                Some(&"Bearer bad-key".to_string())
            );
            let body = stream::once(async {
                Ok(br#"{"error":{"message":"invalid api key"}}"#.to_vec())
            });
            Ok(HttpStreamResponse {
                status: 401,
                headers: std::collections::HashMap::new(),
                body: Box::pin(body),
            })
        }
    }
}
