use serde_json::Value;
use url::Url;

use crate::gateway::keyset::KeySetFetcher;
use crate::gateway::{GatewayError, GatewayResult};

const KEY_LOCATION: &str = "public_jwk_url";
const INLINE_KEY: &str = "public_jwk";
const CONFIG_POINTERS: [&str; 2] = ["/tool_configuration/settings", "/tool_configuration"];

/// Is `url` served from this machine?
pub fn is_loopback_url(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]"))
}

/// Pointer to the object holding `public_jwk_url`, and the url itself.
pub fn key_location(lti_key: &Value) -> Option<(&'static str, String)> {
    CONFIG_POINTERS.iter().find_map(|pointer| {
        lti_key
            .pointer(pointer)
            .and_then(|config| config.get(KEY_LOCATION))
            .and_then(Value::as_str)
            .map(|url| (*pointer, url.to_string()))
    })
}

/// Replaces the key location with the first key of the fetched set.
pub async fn inline_public_jwk(
    lti_key: &mut Value,
    fetcher: &dyn KeySetFetcher,
) -> GatewayResult<()> {
    let Some((pointer, url)) = key_location(lti_key) else {
        return Ok(());
    };
    let key_set = fetcher.fetch_key_set(&url).await?;
    let first = key_set
        .get("keys")
        .and_then(Value::as_array)
        .and_then(|keys| keys.first())
        .cloned()
        .ok_or_else(|| GatewayError::InvalidResponse {
            operation: "fetching the public key set",
            detail: format!("no keys found at {url}"),
        })?;
    if let Some(config) = lti_key.pointer_mut(pointer).and_then(Value::as_object_mut) {
        config.remove(KEY_LOCATION);
        config.insert(INLINE_KEY.to_string(), first);
    }
    Ok(())
}
