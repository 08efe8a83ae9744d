//! 多后端流式 LLM 适配库 将文本增量按词重新分块供语音合成使用

pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod rechunk;
pub mod stream;
pub mod types;

pub use config::{BackendConfig, BackendKind, build_chat_stream};
pub use error::LLMError;
pub use provider::{ChatStream, DeltaStream, DynChatStream};
pub use rechunk::{WordRechunker, WordStream, rechunk_to_words, stream_words};
pub use types::*;
