pub mod error;
pub mod ids;
pub mod keyset;
pub mod pagination;

pub use error::{GatewayError, GatewayResult};

use reqwest::Response;
use serde::de::DeserializeOwned;

/// Turns a non-2xx response into an API error carrying the operation name.
pub(crate) async fn check_status(
    operation: &'static str,
    response: Response,
) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Api {
        operation,
        status: status.as_u16(),
        body: truncate(&body, 512),
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> GatewayResult<T> {
    let text = response
        .text()
        .await
        .map_err(|err| GatewayError::from_transport(operation, &err))?;
    if text.trim().is_empty() {
        return serde_json::from_str("null").map_err(|err| GatewayError::InvalidResponse {
            operation,
            detail: err.to_string(),
        });
    }
    serde_json::from_str(&text).map_err(|err| GatewayError::InvalidResponse {
        operation,
        detail: err.to_string(),
    })
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
