//! Status checking and body decoding for REST responses

use actionarc_domain::{ActionArcError, Result};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::errors::InfraError;

const MAX_ERROR_BODY: usize = 200;

/// Passes success responses through and turns everything else into a
/// domain error.
///
/// 401/403 become [`ActionArcError::Auth`]; any other failure becomes
/// [`ActionArcError::Api`] carrying the status and the provider's own
/// message when the body has the usual `{"error": {"message": ..}}` shape.
pub async fn ensure_success(response: Response, provider: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = error_message(&body);
    warn!(provider, status = status.as_u16(), detail = %detail, "provider request failed");

    let message = format!("{provider}: {detail}");
    match status.as_u16() {
        401 | 403 => Err(ActionArcError::Auth(message)),
        code => Err(ActionArcError::Api { status: code, message }),
    }
}

/// [`ensure_success`] followed by a JSON decode of the body.
pub async fn read_json<T: DeserializeOwned>(response: Response, provider: &str) -> Result<T> {
    let response = ensure_success(response, provider).await?;
    response.json::<T>().await.map_err(|e| InfraError::from(e).into())
}

fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let structured = parsed.as_ref().and_then(|v| {
        let error = v.get("error")?;
        error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .or_else(|| v.get("error_description").and_then(Value::as_str))
            .map(str::to_string)
    });

    structured.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "empty response body".to_string()
        } else {
            trimmed.chars().take(MAX_ERROR_BODY).collect()
        }
    })
}
