use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::LLMError;
use crate::types::ChatMessage;

pub mod mistral;
pub mod ollama;
pub mod openai_compat;

pub(crate) mod error;
pub(crate) mod models;
pub(crate) mod request;

/// 文本增量流别名
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, LLMError>> + Send>>;

/// 统一的聊天后端 Trait 所有后端实现该接口即可接入
#[async_trait]
pub trait ChatStream: Send + Sync {
    /// 以流式方式返回文本增量
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<DeltaStream, LLMError>;

    /// 后端名称
    fn name(&self) -> &'static str;
}

/// 线程安全后端句柄
pub type DynChatStream = Arc<dyn ChatStream>;
