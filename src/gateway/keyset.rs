use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::gateway::{GatewayError, GatewayResult, check_status, read_json};

/// Source of JSON Web Key sets referenced by `public_jwk_url`.
#[async_trait]
pub trait KeySetFetcher: Send + Sync {
    async fn fetch_key_set(&self, url: &str) -> GatewayResult<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpKeySetFetcher {
    client: Client,
}

impl HttpKeySetFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KeySetFetcher for HttpKeySetFetcher {
    async fn fetch_key_set(&self, url: &str) -> GatewayResult<Value> {
        const OPERATION: &str = "fetching the public key set";
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| GatewayError::from_transport(OPERATION, &err))?;
        let response = check_status(OPERATION, response).await?;
        read_json(OPERATION, response).await
    }
}
