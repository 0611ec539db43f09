use serde_json::Value;

use crate::orchestrator::{ProvisionResult, Provisioner, WorkflowReport};
use crate::tool_support::Registration;
use crate::values::{GeneratedValues, keys};

/// What happens to the API (proxy) developer key during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeyAction {
    UpdateExisting,
    /// Created keys still need their account binding enabled.
    CreateNew,
    DeleteOrphan,
    Nothing,
}

pub fn reconcile_api_key(template_has_api_key: bool, registration_has_proxy: bool) -> ApiKeyAction {
    match (template_has_api_key, registration_has_proxy) {
        (true, true) => ApiKeyAction::UpdateExisting,
        (true, false) => ApiKeyAction::CreateNew,
        (false, true) => ApiKeyAction::DeleteOrphan,
        (false, false) => ApiKeyAction::Nothing,
    }
}

impl Provisioner {
    /// Pushes the template onto an existing registration and its keys.
    pub async fn update(&self) -> ProvisionResult<WorkflowReport> {
        let template = self.require_template("update")?;
        self.check_connection()?;
        let registration_id = self.registration_id()?;
        let account = self.target_account()?;
        let mut resolved = template.resolve(&self.values)?;
        let mut report = WorkflowReport::new("update");

        let existing = self
            .require_registration(&mut report, &registration_id)
            .await?;

        let lti_id = existing.lti_client_id().map(str::to_string);
        let action = reconcile_api_key(resolved.api_key.is_some(), existing.proxy.is_some());
        let mut produced = Vec::new();
        if lti_id.is_some() {
            produced.extend([keys::LTI_DEV_ID, keys::LTI_DEV_KEY]);
        }
        let produces_api_key = match action {
            ApiKeyAction::CreateNew => true,
            ApiKeyAction::UpdateExisting => existing.proxy_client_id().is_some(),
            ApiKeyAction::DeleteOrphan | ApiKeyAction::Nothing => false,
        };
        if produces_api_key {
            produced.extend([keys::API_DEV_ID, keys::API_DEV_KEY]);
        }
        Self::ensure_generated(template, "update", &produced)?;

        self.inline_key_if_local(&mut report, &mut resolved.lti_key)
            .await?;

        let mut generated = GeneratedValues::default();
        match &lti_id {
            Some(id) => {
                let response = report
                    .best_effort(
                        "update LTI developer key",
                        self.canvas.update_lti_developer_key(id, &resolved.lti_key),
                    )
                    .await;
                generated.lti_dev_id = Some(id.clone());
                generated.lti_dev_key = response
                    .as_ref()
                    .and_then(|response| secret_from(response, "/developer_key/api_key"))
                    .or_else(|| existing_secret(&existing, KeyRole::Lti));
            }
            None => {
                report.skip("update LTI developer key", "registration has no LTI key");
                report.warn(format!(
                    "Registration '{registration_id}' has no LTI developer key to update"
                ));
            }
        }

        tracing::info!(event = "api_key_reconcile", action = ?action, "reconciling API developer key");
        let mut created_api_id = None;
        match (action, &resolved.api_key, existing.proxy_client_id()) {
            (ApiKeyAction::UpdateExisting, Some(body), Some(id)) => {
                let response = report
                    .fatal(
                        "update API developer key",
                        self.canvas.update_api_developer_key(id, body),
                    )
                    .await?;
                generated.api_dev_id = Some(id.to_string());
                generated.api_dev_key = secret_from(&response, "/api_key")
                    .or_else(|| existing_secret(&existing, KeyRole::Proxy));
            }
            (ApiKeyAction::CreateNew, Some(body), _) => {
                let key = report
                    .fatal(
                        "create API developer key",
                        self.canvas.create_api_developer_key(body),
                    )
                    .await?;
                tracing::info!(event = "developer_key_created", kind = "api", id = %key.id, "API developer key created");
                generated.api_dev_id = Some(key.id.clone());
                generated.api_dev_key = key.api_key.clone();
                created_api_id = Some(key.id);
            }
            (ApiKeyAction::DeleteOrphan, _, Some(id)) => {
                report
                    .best_effort(
                        "delete orphaned API developer key",
                        self.canvas.delete_developer_key(id),
                    )
                    .await;
            }
            (ApiKeyAction::Nothing, _, _) => {
                report.skip("reconcile API developer key", "no API key in template or registration");
            }
            _ => {
                report.skip("reconcile API developer key", "registration proxy has no client id");
                report.warn(format!(
                    "Registration '{registration_id}' has a proxy section without a client id"
                ));
            }
        }

        let values = self.values.clone().with_generated(generated);
        let tool_reg = template.resolve_tool_reg(&values)?;
        report
            .fatal(
                "update tool registration",
                self.tool_support
                    .update_lti_tool_registration(&existing.id, &tool_reg),
            )
            .await?;

        // Existing API keys keep their binding; only new ones are enabled.
        if let Some(api_id) = &created_api_id {
            report
                .fatal(
                    "enable API developer key",
                    self.canvas.enable_developer_key(api_id),
                )
                .await?;
        }

        if let Some(lti_id) = &lti_id {
            self.attach_external_tool(&mut report, lti_id, account.as_deref(), true)
                .await?;
        }
        Ok(report)
    }
}

#[derive(Debug, Clone, Copy)]
enum KeyRole {
    Lti,
    Proxy,
}

fn existing_secret(registration: &Registration, role: KeyRole) -> Option<String> {
    let descriptor = match role {
        KeyRole::Lti => registration.lti.as_ref(),
        KeyRole::Proxy => registration.proxy.as_ref(),
    };
    descriptor.and_then(|key| key.client_secret.clone())
}

fn secret_from(response: &Value, pointer: &str) -> Option<String> {
    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}
