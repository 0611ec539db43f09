use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::canvas::{CanvasApi, DeveloperKey, ExternalTool, LtiKeyResponse, ROOT_ACCOUNT_ID};
use crate::gateway::pagination::{next_link, normalize_next_link};
use crate::gateway::{GatewayError, GatewayResult, check_status, read_json};

/// Asks Canvas to encode ids as strings; developer key ids exceed 2^53.
const STRING_IDS: &str = "application/json+canvas-string-ids";
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct CanvasClient {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl CanvasClient {
    pub fn new(client: Client, base_url: &str, token: &str) -> GatewayResult<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| {
            GatewayError::Transport {
                operation: "configuring the Canvas client",
                detail: err.to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static(STRING_IDS));
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.headers(self.headers.clone())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> GatewayResult<T> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|err| GatewayError::from_transport(operation, &err))?;
        let response = check_status(operation, response).await?;
        read_json(operation, response).await
    }

    /// Follows `rel="next"` links until the last page.
    async fn paginate<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        first: String,
    ) -> GatewayResult<Vec<T>> {
        let mut items = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(first);
        while let Some(url) = next.take() {
            if !seen.insert(url.clone()) {
                tracing::warn!(event = "pagination_loop", url = %url, "next link repeats, stopping");
                break;
            }
            let response = self
                .authorized(self.client.get(&url))
                .send()
                .await
                .map_err(|err| GatewayError::from_transport(operation, &err))?;
            let response = check_status(operation, response).await?;
            next = next_link(response.headers()).map(|link| normalize_next_link(&link));
            let page: Vec<T> = read_json(operation, response).await?;
            tracing::debug!(event = "page_fetched", operation, count = page.len());
            items.extend(page);
        }
        Ok(items)
    }
}

#[async_trait]
impl CanvasApi for CanvasClient {
    async fn get_dev_keys(&self) -> GatewayResult<Vec<DeveloperKey>> {
        let url = self.url(&format!(
            "/api/v1/accounts/{ROOT_ACCOUNT_ID}/developer_keys?per_page={PAGE_SIZE}"
        ));
        self.paginate("getting developer keys", url).await
    }

    async fn delete_developer_key(&self, id: &str) -> GatewayResult<()> {
        let url = self.url(&format!("/api/v1/developer_keys/{id}"));
        let _: Value = self
            .send_json("removing developer key", self.client.delete(url))
            .await?;
        Ok(())
    }

    async fn create_lti_developer_key(&self, body: &Value) -> GatewayResult<LtiKeyResponse> {
        let url = self.url(&format!(
            "/api/lti/accounts/{ROOT_ACCOUNT_ID}/developer_keys/tool_configuration"
        ));
        self.send_json("creating the LTI developer key", self.client.post(url).json(body))
            .await
    }

    async fn create_api_developer_key(&self, body: &Value) -> GatewayResult<DeveloperKey> {
        let url = self.url(&format!("/api/v1/accounts/{ROOT_ACCOUNT_ID}/developer_keys"));
        self.send_json("creating the API developer key", self.client.post(url).json(body))
            .await
    }

    async fn update_lti_developer_key(&self, id: &str, body: &Value) -> GatewayResult<Value> {
        let url = self.url(&format!("/api/lti/developer_keys/{id}/tool_configuration"));
        self.send_json("updating the LTI developer key", self.client.put(url).json(body))
            .await
    }

    async fn update_api_developer_key(&self, id: &str, body: &Value) -> GatewayResult<Value> {
        let url = self.url(&format!("/api/v1/developer_keys/{id}"));
        self.send_json("updating the API developer key", self.client.put(url).json(body))
            .await
    }

    async fn enable_developer_key(&self, id: &str) -> GatewayResult<()> {
        let url = self.url(&format!(
            "/api/v1/accounts/{ROOT_ACCOUNT_ID}/developer_keys/{id}/developer_key_account_bindings"
        ));
        let body = json!({
            "developer_key_account_binding": { "workflow_state": "on" }
        });
        let _: Value = self
            .send_json("enabling the developer key", self.client.post(url).json(&body))
            .await?;
        Ok(())
    }

    async fn get_lti_tools(&self, account_id: &str) -> GatewayResult<Vec<ExternalTool>> {
        let url = self.url(&format!(
            "/api/v1/accounts/{account_id}/external_tools?per_page={PAGE_SIZE}"
        ));
        self.paginate("getting external tools", url).await
    }

    async fn add_lti_tool_to_subaccount(
        &self,
        developer_key_id: &str,
        account_id: &str,
    ) -> GatewayResult<Value> {
        let url = self.url(&format!("/api/v1/accounts/{account_id}/external_tools"));
        let body = json!({ "client_id": developer_key_id });
        self.send_json("adding the LTI tool to the subaccount", self.client.post(url).json(&body))
            .await
    }

    async fn get_lti_tool_configuration(&self, id: &str) -> GatewayResult<Value> {
        let url = self.url(&format!("/api/lti/developer_keys/{id}/tool_configuration"));
        self.send_json("getting the LTI tool configuration", self.client.get(url))
            .await
    }
}
