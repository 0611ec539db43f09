pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::gateway::GatewayResult;
use crate::gateway::ids::{de_opt_string_id, de_string_id, matches_developer_key};

pub use client::CanvasClient;

/// Canvas account that owns every developer key this tool manages.
pub const ROOT_ACCOUNT_ID: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperKey {
    #[serde(deserialize_with = "de_string_id")]
    pub id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of the LTI tool configuration endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtiKeyResponse {
    pub developer_key: DeveloperKey,
    #[serde(default)]
    pub tool_configuration: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalTool {
    #[serde(deserialize_with = "de_string_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_string_id")]
    pub developer_key_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Finds the external tool bound to `developer_key_id`, accepting the
/// truncated id form the external tools API reports.
pub fn find_tool_for_key<'a>(tools: &'a [ExternalTool], developer_key_id: &str) -> Option<&'a ExternalTool> {
    tools.iter().find(|tool| {
        tool.developer_key_id
            .as_deref()
            .is_some_and(|candidate| matches_developer_key(developer_key_id, candidate))
    })
}

#[async_trait]
pub trait CanvasApi: Send + Sync {
    async fn get_dev_keys(&self) -> GatewayResult<Vec<DeveloperKey>>;
    async fn delete_developer_key(&self, id: &str) -> GatewayResult<()>;
    async fn create_lti_developer_key(&self, body: &Value) -> GatewayResult<LtiKeyResponse>;
    async fn create_api_developer_key(&self, body: &Value) -> GatewayResult<DeveloperKey>;
    async fn update_lti_developer_key(&self, id: &str, body: &Value) -> GatewayResult<Value>;
    async fn update_api_developer_key(&self, id: &str, body: &Value) -> GatewayResult<Value>;
    async fn enable_developer_key(&self, id: &str) -> GatewayResult<()>;
    async fn get_lti_tools(&self, account_id: &str) -> GatewayResult<Vec<ExternalTool>>;
    async fn add_lti_tool_to_subaccount(
        &self,
        developer_key_id: &str,
        account_id: &str,
    ) -> GatewayResult<Value>;
    async fn get_lti_tool_configuration(&self, id: &str) -> GatewayResult<Value>;
}
