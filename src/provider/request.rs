use serde_json::{Map, Value, json};

use crate::types::ChatMessage;

/// Builds the chat-completions request body shared by every backend.
///
/// The three supported backends all accept the same JSON shape; only the
/// endpoint, credentials, and model differ, and those are supplied by the
/// caller.
pub(crate) fn build_chat_body(messages: &[ChatMessage], model: &str, temperature: f32) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert(
        "messages".to_string(),
        Value::Array(
            messages
                .iter()
                .map(|message| {
                    json!({
                        "role": message.role.0,
                        "content": message.content,
                    })
                })
                .collect(),
        ),
    );
    body.insert("temperature".to_string(), Value::from(temperature));
    body.insert("stream".to_string(), Value::Bool(true));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn body_carries_model_messages_and_stream_flag() {
        let messages = vec![
            ChatMessage {
                role: Role::system(),
                content: "You are terse.".to_string(),
            },
            ChatMessage {
                role: Role::user(),
                content: "Hello".to_string(),
            },
        ];

        let body = build_chat_body(&messages, "mistral-large-latest", 1.0);

        assert_eq!(body["model"], json!("mistral-large-latest"));
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["temperature"], json!(1.0));
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["messages"][0]["role"], json!("system"));
        assert_eq!(body["messages"][1]["content"], json!("Hello"));
    }

    #[test]
    fn body_accepts_empty_history() {
        let body = build_chat_body(&[], "llama3.2", 0.7);
        assert_eq!(body["messages"], json!([]));
    }
}
