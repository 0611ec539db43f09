pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::gateway::GatewayResult;
use crate::gateway::ids::{de_opt_string_id, de_string_id};

pub use client::ToolSupportClient;

/// One entry of the tool-support registration catalog.
///
/// Fields this tool does not interpret are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(deserialize_with = "de_string_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lti_registration_id: Option<String>,
    #[serde(default)]
    pub lti: Option<KeyDescriptor>,
    #[serde(default)]
    pub proxy: Option<KeyDescriptor>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reference from a registration to a Canvas developer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDescriptor {
    #[serde(default, deserialize_with = "de_opt_string_id")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Registration {
    pub fn lti_client_id(&self) -> Option<&str> {
        self.lti.as_ref().and_then(|lti| lti.client_id.as_deref())
    }

    pub fn proxy_client_id(&self) -> Option<&str> {
        self.proxy.as_ref().and_then(|proxy| proxy.client_id.as_deref())
    }

    /// Name shown to operators; falls back to the catalog id.
    pub fn display_id(&self) -> &str {
        self.lti_registration_id.as_deref().unwrap_or(&self.id)
    }
}

#[async_trait]
pub trait ToolSupportApi: Send + Sync {
    async fn create_lti_tool_registration(&self, body: &Value) -> GatewayResult<Registration>;
    /// `None` when no registration has this registration id.
    async fn get_lti_tool_registration_by_registration_id(
        &self,
        registration_id: &str,
    ) -> GatewayResult<Option<Registration>>;
    async fn update_lti_tool_registration(&self, id: &str, body: &Value) -> GatewayResult<Value>;
    async fn delete_lti_tool_registration(&self, id: &str) -> GatewayResult<()>;
    async fn list_lti_tool_registrations(&self) -> GatewayResult<Vec<Registration>>;
}
