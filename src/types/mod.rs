//! Shared data structures modeling chat conversations.
//!
//! These types normalize the `{role, content}` message records consumed by
//! every backend so the rest of the crate can stay agnostic of individual API
//! differences.

use serde::{Deserialize, Serialize};

/// Chat role string compatible with provider-specific semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(pub String);

impl Role {
    pub fn system() -> Self {
        Self("system".to_string())
    }

    pub fn user() -> Self {
        Self("user".to_string())
    }

    pub fn assistant() -> Self {
        Self("assistant".to_string())
    }
}

/// One turn of the conversation history sent to a backend.
///
/// # Examples
///
/// ```
/// # use sotto_llm::types::{ChatMessage, Role};
/// let msg = ChatMessage {
///     role: Role::user(),
///     content: "Hello there!".to_string(),
/// };
/// assert_eq!(msg.role.0, "user");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role associated with this message.
    pub role: Role,
    /// Plain UTF-8 text content.
    pub content: String,
}

/// Trims message content and drops messages that become empty.
///
/// Conversation histories captured from a live voice session frequently
/// contain blank turns (aborted utterances, placeholder entries). Backends
/// reject or mishandle empty content, so this helper filters them out before
/// a request is built. It is deliberately not part of the word rechunker.
pub fn preprocess_messages(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter_map(|message| {
            let content = message.content.trim();
            if content.is_empty() {
                None
            } else {
                Some(ChatMessage {
                    role: message.role.clone(),
                    content: content.to_string(),
                })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preprocess_drops_empty_and_trims() {
        let messages = vec![
            ChatMessage {
                role: Role::system(),
                content: "  You are a helpful assistant.  ".to_string(),
            },
            ChatMessage {
                role: Role::user(),
                content: "   ".to_string(),
            },
            ChatMessage {
                role: Role::user(),
                content: "Hi!".to_string(),
            },
        ];

        let cleaned = preprocess_messages(&messages);
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[0].content, "You are a helpful assistant.");
        assert_eq!(cleaned[1].content, "Hi!");
    }

    #[test]
    fn preprocess_keeps_order_and_roles() {
        let messages = vec![
            ChatMessage {
                role: Role::user(),
                content: "first".to_string(),
            },
            ChatMessage {
                role: Role::assistant(),
                content: "second".to_string(),
            },
        ];

        let cleaned = preprocess_messages(&messages);
        assert_eq!(cleaned[0].role, Role::user());
        assert_eq!(cleaned[1].role, Role::assistant());
    }
}
