use serde_json::{Map, Value, json};

use crate::canvas::DeveloperKey;
use crate::orchestrator::{ProvisionError, ProvisionResult, Provisioner, WorkflowReport};
use crate::tool_support::Registration;

/// Canvas fields that belong to one key instance, not to its definition.
const INSTANCE_FIELDS: [&str; 13] = [
    "id",
    "api_key",
    "created_at",
    "updated_at",
    "last_used_at",
    "access_token_count",
    "account_name",
    "workflow_state",
    "developer_key_account_binding",
    "is_lti_key",
    "lti_registration",
    "user_id",
    "user_name",
];

#[derive(Debug, Clone)]
pub struct Export {
    pub document: Value,
    pub report: WorkflowReport,
}

impl Provisioner {
    /// Rebuilds a template from what is live in tool-support and Canvas.
    pub async fn export(&self) -> ProvisionResult<Export> {
        let registration_id = self.registration_id()?;
        let mut report = WorkflowReport::new("export");

        let registration = self
            .require_registration(&mut report, &registration_id)
            .await?;
        let lti_id = registration
            .lti_client_id()
            .map(str::to_string)
            .ok_or_else(|| ProvisionError::NoLtiKey(registration_id.clone()))?;
        let keys = report
            .fatal("list developer keys", self.canvas.get_dev_keys())
            .await?;

        let lti_key = find_key(&keys, &lti_id).ok_or_else(|| ProvisionError::KeyMissing {
            role: "LTI",
            id: lti_id.clone(),
        })?;
        let tool_configuration = report
            .fatal(
                "get LTI tool configuration",
                self.canvas.get_lti_tool_configuration(&lti_id),
            )
            .await?;
        let tool_configuration = match tool_configuration {
            Value::Object(mut wrapper) if wrapper.contains_key("tool_configuration") => wrapper
                .remove("tool_configuration")
                .unwrap_or(Value::Null),
            other => other,
        };

        let mut document = Map::new();
        document.insert(
            "config".to_string(),
            json!({ "lti_registration_id": registration_id }),
        );
        document.insert(
            "ltiKey".to_string(),
            json!({
                "developer_key": key_definition(lti_key),
                "tool_configuration": tool_configuration,
            }),
        );

        if let Some(proxy_id) = registration.proxy_client_id() {
            match find_key(&keys, proxy_id) {
                Some(api_key) => {
                    document.insert(
                        "apiKey".to_string(),
                        json!({ "developer_key": key_definition(api_key) }),
                    );
                }
                None => report.warn(format!(
                    "API developer key {proxy_id} not found in Canvas; apiKey omitted"
                )),
            }
        }

        let tool_reg =
            registration_template(&registration).map_err(|source| ProvisionError::Export {
                registration_id: registration_id.clone(),
                source,
            })?;
        document.insert("toolReg".to_string(), tool_reg);
        Ok(Export {
            document: Value::Object(document),
            report,
        })
    }
}

fn find_key<'a>(keys: &'a [DeveloperKey], id: &str) -> Option<&'a DeveloperKey> {
    keys.iter().find(|key| key.id == id)
}

fn key_definition(key: &DeveloperKey) -> Value {
    let mut definition = key.extra.clone();
    if let Some(name) = &key.name {
        definition.insert("name".to_string(), Value::String(name.clone()));
    }
    for field in INSTANCE_FIELDS {
        definition.remove(field);
    }
    Value::Object(definition)
}

/// The registration with ids and secrets turned back into placeholders.
fn registration_template(registration: &Registration) -> serde_json::Result<Value> {
    let mut template = registration.clone();
    template.lti_registration_id = Some("$LTI_REGISTRATION_ID".to_string());
    if let Some(lti) = template.lti.as_mut() {
        lti.client_id = Some("$LTI_DEV_ID".to_string());
        lti.client_secret = Some("$LTI_DEV_KEY".to_string());
    }
    if let Some(proxy) = template.proxy.as_mut() {
        proxy.client_id = Some("$API_DEV_ID".to_string());
        proxy.client_secret = Some("$API_DEV_KEY".to_string());
    }
    let mut value = serde_json::to_value(&template)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("id");
    }
    Ok(value)
}
