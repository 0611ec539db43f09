#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use lti_provisioner::canvas::{CanvasApi, DeveloperKey, ExternalTool, LtiKeyResponse};
use lti_provisioner::config::ConfigStore;
use lti_provisioner::gateway::keyset::KeySetFetcher;
use lti_provisioner::gateway::{GatewayError, GatewayResult};
use lti_provisioner::orchestrator::Provisioner;
use lti_provisioner::template::Template;
use lti_provisioner::tool_support::{Registration, ToolSupportApi};
use lti_provisioner::values::ValueSpace;

fn api_failure(operation: &'static str) -> GatewayError {
    GatewayError::Api {
        operation,
        status: 500,
        body: "injected failure".to_string(),
    }
}

#[derive(Default)]
pub struct FakeCanvas {
    pub calls: Mutex<Vec<String>>,
    pub bodies: Mutex<Vec<(String, Value)>>,
    pub keys: Mutex<Vec<DeveloperKey>>,
    pub tools: Mutex<Vec<ExternalTool>>,
    pub failing_deletes: Mutex<HashSet<String>>,
    pub failing_updates: Mutex<HashSet<String>>,
    /// New keys come back without an `api_key`.
    pub omit_secrets: AtomicBool,
    next_id: AtomicU64,
}

impl FakeCanvas {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn body(&self, call: &str) -> Option<Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == call)
            .map(|(_, body)| body.clone())
    }

    pub fn add_key(&self, id: &str) {
        self.keys.lock().unwrap().push(
            serde_json::from_value(json!({ "id": id, "api_key": "secret", "name": "key" })).unwrap(),
        );
    }

    pub fn add_tool(&self, id: &str, developer_key_id: &str) {
        self.tools.lock().unwrap().push(
            serde_json::from_value(json!({ "id": id, "developer_key_id": developer_key_id }))
                .unwrap(),
        );
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn record_body(&self, call: &str, body: &Value) {
        self.bodies
            .lock()
            .unwrap()
            .push((call.to_string(), body.clone()));
    }

    fn new_key(&self, prefix: &str) -> DeveloperKey {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut key = json!({ "id": format!("17000000000{n:04}") });
        if !self.omit_secrets.load(Ordering::SeqCst) {
            key["api_key"] = json!(format!("{prefix}-secret-{n}"));
        }
        let key: DeveloperKey = serde_json::from_value(key).unwrap();
        self.keys.lock().unwrap().push(key.clone());
        key
    }
}

#[async_trait]
impl CanvasApi for FakeCanvas {
    async fn get_dev_keys(&self) -> GatewayResult<Vec<DeveloperKey>> {
        self.record("get_dev_keys".to_string());
        Ok(self.keys.lock().unwrap().clone())
    }

    async fn delete_developer_key(&self, id: &str) -> GatewayResult<()> {
        self.record(format!("delete_key:{id}"));
        if self.failing_deletes.lock().unwrap().contains(id) {
            return Err(api_failure("removing developer key"));
        }
        self.keys.lock().unwrap().retain(|key| key.id != id);
        Ok(())
    }

    async fn create_lti_developer_key(&self, body: &Value) -> GatewayResult<LtiKeyResponse> {
        self.record("create_lti_key".to_string());
        self.record_body("create_lti_key", body);
        Ok(LtiKeyResponse {
            developer_key: self.new_key("lti"),
            tool_configuration: None,
        })
    }

    async fn create_api_developer_key(&self, body: &Value) -> GatewayResult<DeveloperKey> {
        self.record("create_api_key".to_string());
        self.record_body("create_api_key", body);
        Ok(self.new_key("api"))
    }

    async fn update_lti_developer_key(&self, id: &str, body: &Value) -> GatewayResult<Value> {
        self.record(format!("update_lti_key:{id}"));
        self.record_body("update_lti_key", body);
        if self.failing_updates.lock().unwrap().contains(id) {
            return Err(api_failure("updating the LTI developer key"));
        }
        Ok(json!({ "developer_key": { "id": id, "api_key": "lti-rotated" } }))
    }

    async fn update_api_developer_key(&self, id: &str, body: &Value) -> GatewayResult<Value> {
        self.record(format!("update_api_key:{id}"));
        self.record_body("update_api_key", body);
        Ok(json!({ "id": id, "api_key": "api-rotated" }))
    }

    async fn enable_developer_key(&self, id: &str) -> GatewayResult<()> {
        self.record(format!("enable_key:{id}"));
        Ok(())
    }

    async fn get_lti_tools(&self, account_id: &str) -> GatewayResult<Vec<ExternalTool>> {
        self.record(format!("get_tools:{account_id}"));
        Ok(self.tools.lock().unwrap().clone())
    }

    async fn add_lti_tool_to_subaccount(
        &self,
        developer_key_id: &str,
        account_id: &str,
    ) -> GatewayResult<Value> {
        self.record(format!("add_tool:{developer_key_id}:{account_id}"));
        Ok(json!({ "id": "tool-1" }))
    }

    async fn get_lti_tool_configuration(&self, id: &str) -> GatewayResult<Value> {
        self.record(format!("get_tool_configuration:{id}"));
        Ok(json!({ "tool_configuration": { "settings": { "title": "Exported" } } }))
    }
}

#[derive(Default)]
pub struct FakeToolSupport {
    pub calls: Mutex<Vec<String>>,
    pub bodies: Mutex<Vec<(String, Value)>>,
    pub registrations: Mutex<Vec<Registration>>,
}

impl FakeToolSupport {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn body(&self, call: &str) -> Option<Value> {
        self.bodies
            .lock()
            .unwrap()
            .iter()
            .find(|(name, _)| name == call)
            .map(|(_, body)| body.clone())
    }

    pub fn add_registration(&self, registration: Value) {
        self.registrations
            .lock()
            .unwrap()
            .push(serde_json::from_value(registration).unwrap());
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ToolSupportApi for FakeToolSupport {
    async fn create_lti_tool_registration(&self, body: &Value) -> GatewayResult<Registration> {
        self.record("create_registration".to_string());
        self.bodies
            .lock()
            .unwrap()
            .push(("create_registration".to_string(), body.clone()));
        let mut stored = body.clone();
        stored["id"] = json!("ts-1");
        let registration: Registration = serde_json::from_value(stored).unwrap();
        self.registrations.lock().unwrap().push(registration.clone());
        Ok(registration)
    }

    async fn get_lti_tool_registration_by_registration_id(
        &self,
        registration_id: &str,
    ) -> GatewayResult<Option<Registration>> {
        self.record(format!("get_registration:{registration_id}"));
        Ok(self
            .registrations
            .lock()
            .unwrap()
            .iter()
            .find(|registration| {
                registration.lti_registration_id.as_deref() == Some(registration_id)
            })
            .cloned())
    }

    async fn update_lti_tool_registration(&self, id: &str, body: &Value) -> GatewayResult<Value> {
        self.record(format!("update_registration:{id}"));
        self.bodies
            .lock()
            .unwrap()
            .push(("update_registration".to_string(), body.clone()));
        Ok(body.clone())
    }

    async fn delete_lti_tool_registration(&self, id: &str) -> GatewayResult<()> {
        self.record(format!("delete_registration:{id}"));
        self.registrations
            .lock()
            .unwrap()
            .retain(|registration| registration.id != id);
        Ok(())
    }

    async fn list_lti_tool_registrations(&self) -> GatewayResult<Vec<Registration>> {
        self.record("list_registrations".to_string());
        Ok(self.registrations.lock().unwrap().clone())
    }
}

pub struct StaticKeySet(pub Value);

#[async_trait]
impl KeySetFetcher for StaticKeySet {
    async fn fetch_key_set(&self, _url: &str) -> GatewayResult<Value> {
        Ok(self.0.clone())
    }
}

pub struct Harness {
    pub canvas: Arc<FakeCanvas>,
    pub tool_support: Arc<FakeToolSupport>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            canvas: Arc::new(FakeCanvas::default()),
            tool_support: Arc::new(FakeToolSupport::default()),
        }
    }

    pub fn provisioner(&self, persisted: Value, template: Option<&str>) -> Provisioner {
        let template = template.map(|text| Template::parse(text).unwrap());
        let values = ValueSpace::new(ConfigStore::from_value(persisted))
            .with_defaults(template.as_ref().and_then(Template::config));
        Provisioner::new(
            self.canvas.clone(),
            self.tool_support.clone(),
            Arc::new(StaticKeySet(json!({ "keys": [{ "kid": "local-key", "kty": "RSA" }] }))),
            values,
        )
        .with_template(template)
    }
}

/// Persisted config with every connection key and the given account.
pub fn persisted(registration_id: &str, account: &str) -> Value {
    json!({
        "setup": {
            "canvas_url": "https://canvas.test.example.edu",
            "tool_support_url": "https://tool-support.example.edu"
        },
        "secrets": {
            "canvas_token": "token",
            "tool_support_username": "admin",
            "tool_support_password": "password"
        },
        "lti_registration_id": registration_id,
        "lti_account_id": account
    })
}

pub const LTI_ONLY_TEMPLATE: &str = r#"{
    "config": { "lti_tool_title": "Quiz Tool" },
    "ltiKey": {
        "developer_key": { "name": "$LTI_TOOL_TITLE", "redirect_uris": "${TOOL_SUPPORT_URL}/lti/login" },
        "tool_configuration": {
            "settings": {
                "title": "$LTI_TOOL_TITLE",
                "public_jwk_url": "$TOOL_SUPPORT_URL/.well-known/jwks.json"
            }
        }
    },
    "toolReg": {
        "ltiRegistrationId": "$LTI_REGISTRATION_ID",
        "issuer": "$CANVAS_ISSUER_URI",
        "lti": { "clientId": "$LTI_DEV_ID", "clientSecret": "$LTI_DEV_KEY" }
    }
}"#;

pub const LTI_AND_API_TEMPLATE: &str = r#"{
    "config": { "lti_tool_title": "Quiz Tool" },
    "ltiKey": { "developer_key": { "name": "$LTI_TOOL_TITLE" } },
    "apiKey": { "developer_key": { "name": "$LTI_TOOL_TITLE API", "scopes": [] } },
    "toolReg": {
        "ltiRegistrationId": "$LTI_REGISTRATION_ID",
        "lti": { "clientId": "$LTI_DEV_ID", "clientSecret": "$LTI_DEV_KEY" },
        "proxy": { "clientId": "$API_DEV_ID", "clientSecret": "$API_DEV_KEY" }
    }
}"#;

pub const PROXY_WITHOUT_API_TEMPLATE: &str = r#"{
    "config": { "lti_tool_title": "Quiz Tool" },
    "ltiKey": { "developer_key": { "name": "$LTI_TOOL_TITLE" } },
    "toolReg": {
        "ltiRegistrationId": "$LTI_REGISTRATION_ID",
        "lti": { "clientId": "$LTI_DEV_ID", "clientSecret": "$LTI_DEV_KEY" },
        "proxy": { "clientId": "$API_DEV_ID", "clientSecret": "$API_DEV_KEY" }
    }
}"#;

pub const API_WITHOUT_PROXY_TEMPLATE: &str = r#"{
    "config": { "lti_tool_title": "Quiz Tool" },
    "ltiKey": { "developer_key": { "name": "$LTI_TOOL_TITLE" } },
    "apiKey": { "developer_key": { "name": "$LTI_TOOL_TITLE API" } },
    "toolReg": {
        "ltiRegistrationId": "$LTI_REGISTRATION_ID",
        "lti": { "clientId": "$LTI_DEV_ID", "clientSecret": "$LTI_DEV_KEY" }
    }
}"#;
