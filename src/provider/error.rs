use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LLMError, extract_model_identifier};

/// Maps a non-2xx backend response to an [`LLMError`].
///
/// All supported backends report failures with the OpenAI error envelope
/// (`{"error": {"message", "code"}}`); some local servers return a bare
/// `{"message": ...}` object instead. Both forms are accepted, and anything
/// else falls through to a raw status/body error.
pub(crate) fn parse_api_error(
    provider: &'static str,
    status: u16,
    headers: &HashMap<String, String>,
    body: &str,
) -> LLMError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
        message: Option<String>,
    }
    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        code: Option<Value>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        let message = match (parsed.error, parsed.message) {
            (Some(error), _) => {
                let mut message = error.message.unwrap_or_else(|| "unknown error".to_string());
                if let Some(code) = error.code {
                    message = format!("{message} ({code})");
                }
                Some(message)
            }
            (None, Some(message)) => Some(message),
            (None, None) => None,
        };
        if let Some(message) = message {
            return match status {
                401 | 403 => LLMError::Auth { message },
                429 => LLMError::RateLimit {
                    message,
                    retry_after: retry_after_from_headers(headers),
                },
                400 => LLMError::Validation { message },
                404 => LLMError::ModelNotFound {
                    model: extract_model_identifier(&message),
                    message,
                },
                _ => LLMError::Provider { provider, message },
            };
        }
    }
    LLMError::Provider {
        provider,
        message: format!("status {status}: {body}"),
    }
}

/// Extracts the `Retry-After` header (in seconds) if present.
///
/// HTTP-date values are ignored because the supported backends only use the
/// numeric form.
fn retry_after_from_headers(headers: &HashMap<String, String>) -> Option<Duration> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_headers() -> HashMap<String, String> {
        HashMap::new()
    }

    #[test]
    fn maps_status_codes_to_variants() {
        let body = r#"{"error":{"message":"bad key"}}"#;
        assert!(matches!(
            parse_api_error("mistral", 401, &no_headers(), body),
            LLMError::Auth { .. }
        ));
        assert!(matches!(
            parse_api_error("mistral", 400, &no_headers(), body),
            LLMError::Validation { .. }
        ));
        assert!(matches!(
            parse_api_error("mistral", 500, &no_headers(), body),
            LLMError::Provider {
                provider: "mistral",
                ..
            }
        ));
    }

    #[test]
    fn rate_limit_honors_retry_after_header() {
        let headers = HashMap::from([("Retry-After".to_string(), "30".to_string())]);
        let err = parse_api_error(
            "mistral",
            429,
            &headers,
            r#"{"error":{"message":"slow down"}}"#,
        );
        match err {
            LLMError::RateLimit {
                retry_after,
                message,
            } => {
                assert_eq!(retry_after, Some(Duration::from_secs(30)));
                assert_eq!(message, "slow down");
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn missing_model_is_extracted_from_message() {
        let body = r#"{"error":{"message":"model `tiny-llm` does not exist","code":"model_not_found"}}"#;
        let err = parse_api_error("openai_compat", 404, &no_headers(), body);
        match err {
            LLMError::ModelNotFound { model, .. } => {
                assert_eq!(model.as_deref(), Some("tiny-llm"));
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn bare_message_envelope_is_accepted() {
        let err = parse_api_error(
            "ollama",
            403,
            &no_headers(),
            r#"{"message":"forbidden"}"#,
        );
        match err {
            LLMError::Auth { message } => assert_eq!(message, "forbidden"),
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn unparsable_body_falls_back_to_raw_status() {
        let err = parse_api_error("ollama", 502, &no_headers(), "<html>bad gateway</html>");
        match err {
            LLMError::Provider { provider, message } => {
                assert_eq!(provider, "ollama");
                assert!(message.contains("status 502"), "message: {message}");
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }
}
