use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::gateway::{GatewayError, GatewayResult, check_status, read_json};
use crate::tool_support::{Registration, ToolSupportApi};

const ADMIN_PATH: &str = "/admin/tools/";

#[derive(Debug, Clone)]
pub struct ToolSupportClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl ToolSupportClient {
    pub fn new(client: Client, base_url: &str, username: &str, password: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}{ADMIN_PATH}{suffix}", self.base_url)
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> GatewayResult<Response> {
        request
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|err| GatewayError::from_transport(operation, &err))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> GatewayResult<T> {
        let response = self.send(operation, request).await?;
        let response = check_conflict(operation, response).await?;
        read_json(operation, response).await
    }
}

async fn check_conflict(operation: &'static str, response: Response) -> GatewayResult<Response> {
    if response.status() == StatusCode::CONFLICT {
        return Err(GatewayError::Conflict { operation });
    }
    check_status(operation, response).await
}

#[async_trait]
impl ToolSupportApi for ToolSupportClient {
    async fn create_lti_tool_registration(&self, body: &Value) -> GatewayResult<Registration> {
        self.send_json(
            "creating the LTI tool registration",
            self.client.post(self.url("")).json(body),
        )
        .await
    }

    async fn get_lti_tool_registration_by_registration_id(
        &self,
        registration_id: &str,
    ) -> GatewayResult<Option<Registration>> {
        const OPERATION: &str = "getting the LTI tool registration";
        let url = self.url(&format!("ltiRegistrationId:{registration_id}"));
        let response = self.send(OPERATION, self.client.get(url)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_conflict(OPERATION, response).await?;
        read_json(OPERATION, response).await
    }

    async fn update_lti_tool_registration(&self, id: &str, body: &Value) -> GatewayResult<Value> {
        self.send_json(
            "updating the LTI tool registration",
            self.client.put(self.url(id)).json(body),
        )
        .await
    }

    async fn delete_lti_tool_registration(&self, id: &str) -> GatewayResult<()> {
        let _: Value = self
            .send_json(
                "deleting the LTI tool registration",
                self.client.delete(self.url(id)),
            )
            .await?;
        Ok(())
    }

    async fn list_lti_tool_registrations(&self) -> GatewayResult<Vec<Registration>> {
        self.send_json(
            "listing the LTI tool registrations",
            self.client.get(self.url("")),
        )
        .await
    }
}
