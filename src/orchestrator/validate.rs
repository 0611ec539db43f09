use crate::canvas::{DeveloperKey, find_tool_for_key};
use crate::orchestrator::{ProvisionResult, Provisioner, WorkflowReport};

impl Provisioner {
    /// Read-only consistency check between tool-support and Canvas.
    ///
    /// Every missing piece becomes a warning on the returned report.
    pub async fn validate(&self) -> ProvisionResult<WorkflowReport> {
        let registration_id = self.registration_id()?;
        let account = self.target_account()?;
        let mut report = WorkflowReport::new("validate");

        let registration = self
            .require_registration(&mut report, &registration_id)
            .await?;
        let keys = report
            .fatal("list developer keys", self.canvas.get_dev_keys())
            .await?;

        if let Some(lti_id) = registration.lti_client_id() {
            if !key_exists(&keys, lti_id) {
                report.warn(format!("LTI developer key {lti_id} not found in Canvas"));
            }
            match &account {
                Some(account_id) => {
                    let tools = report
                        .fatal("list external tools", self.canvas.get_lti_tools(account_id))
                        .await?;
                    if find_tool_for_key(&tools, lti_id).is_none() {
                        report.warn(format!(
                            "LTI developer key {lti_id} is not installed in account {account_id}"
                        ));
                    }
                }
                None => report.skip("list external tools", "target sub-account is none"),
            }
        }

        if let Some(proxy_id) = registration.proxy_client_id() {
            if !key_exists(&keys, proxy_id) {
                report.warn(format!("API developer key {proxy_id} not found in Canvas"));
            }
        }

        if report.warnings.is_empty() {
            tracing::info!(event = "validation_passed", registration_id = %registration_id, "registration is consistent");
        }
        Ok(report)
    }
}

fn key_exists(keys: &[DeveloperKey], id: &str) -> bool {
    keys.iter().any(|key| key.id.trim() == id.trim())
}
