use std::collections::HashMap;

use serde::Deserialize;

use crate::error::LLMError;
use crate::http::{HttpTransport, get_with_headers};

use super::error::parse_api_error;

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Lists the model identifiers a local server exposes under `/v1/models`.
///
/// Used once at construction time to resolve the effective model name when
/// the configuration leaves it unset.
pub(crate) async fn list_model_ids(
    transport: &dyn HttpTransport,
    base_url: &str,
    headers: HashMap<String, String>,
    provider: &'static str,
) -> Result<Vec<String>, LLMError> {
    let base = base_url.trim_end_matches('/');
    let url = if base.ends_with("/v1") {
        format!("{base}/models")
    } else {
        format!("{base}/v1/models")
    };
    let response = get_with_headers(transport, url, headers).await?;

    let status = response.status;
    let response_headers = response.headers.clone();
    let text = response.into_string()?;
    if !(200..300).contains(&status) {
        return Err(parse_api_error(provider, status, &response_headers, &text));
    }

    let list: ModelList = serde_json::from_str(&text).map_err(|err| LLMError::Provider {
        provider,
        message: format!("failed to parse model list: {err}"),
    })?;
    Ok(list.data.into_iter().map(|entry| entry.id).collect())
}
