pub mod create;
pub mod delete;
pub mod error;
pub mod export;
pub mod jwk;
pub mod lookup;
pub mod step;
pub mod update;
pub mod validate;

use std::sync::Arc;

use serde_json::Value;

use crate::canvas::{CanvasApi, find_tool_for_key};
use crate::gateway::keyset::KeySetFetcher;
use crate::template::Template;
use crate::tool_support::{Registration, ToolSupportApi};
use crate::values::{ValueSpace, keys};

pub use error::{ProvisionError, ProvisionResult};
pub use export::Export;
pub use step::{StepPolicy, StepRecord, StepStatus, WorkflowReport};
pub use update::{ApiKeyAction, reconcile_api_key};

/// Drives Canvas and tool-support through each workflow, one call at a time.
#[derive(Clone)]
pub struct Provisioner {
    canvas: Arc<dyn CanvasApi>,
    tool_support: Arc<dyn ToolSupportApi>,
    key_sets: Arc<dyn KeySetFetcher>,
    values: ValueSpace,
    template: Option<Template>,
}

impl Provisioner {
    pub fn new(
        canvas: Arc<dyn CanvasApi>,
        tool_support: Arc<dyn ToolSupportApi>,
        key_sets: Arc<dyn KeySetFetcher>,
        values: ValueSpace,
    ) -> Self {
        Self {
            canvas,
            tool_support,
            key_sets,
            values,
            template: None,
        }
    }

    pub fn with_template(mut self, template: Option<Template>) -> Self {
        self.template = template;
        self
    }

    pub fn values(&self) -> &ValueSpace {
        &self.values
    }

    fn require_template(&self, workflow: &'static str) -> ProvisionResult<&Template> {
        self.template
            .as_ref()
            .ok_or(ProvisionError::TemplateRequired(workflow))
    }

    /// Fails when `toolReg` names a generated value the workflow will not
    /// produce, before anything is created.
    fn ensure_generated(
        template: &Template,
        workflow: &'static str,
        produced: &[&str],
    ) -> ProvisionResult<()> {
        let keys: Vec<String> = template
            .tool_reg_generated_references()
            .into_iter()
            .filter(|key| !produced.contains(&key.as_str()))
            .collect();
        if keys.is_empty() {
            return Ok(());
        }
        Err(ProvisionError::NotGenerated { workflow, keys })
    }

    fn check_connection(&self) -> ProvisionResult<()> {
        for key in keys::CONNECTION_KEYS {
            self.values.check_defined(key)?;
        }
        Ok(())
    }

    fn registration_id(&self) -> ProvisionResult<String> {
        Ok(self.values.check_defined(keys::LTI_REGISTRATION_ID)?)
    }

    /// Sub-account to attach the tool to; `None` when configured as `none`.
    fn target_account(&self) -> ProvisionResult<Option<String>> {
        let account = self.values.check_defined(keys::LTI_ACCOUNT_ID)?;
        if account.trim().eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        Ok(Some(account))
    }

    async fn find_registration(
        &self,
        report: &mut WorkflowReport,
        registration_id: &str,
    ) -> ProvisionResult<Option<Registration>> {
        report
            .fatal(
                "look up registration",
                self.tool_support
                    .get_lti_tool_registration_by_registration_id(registration_id),
            )
            .await
    }

    async fn require_registration(
        &self,
        report: &mut WorkflowReport,
        registration_id: &str,
    ) -> ProvisionResult<Registration> {
        let registration = self.find_registration(report, registration_id).await?;
        let registration =
            registration.ok_or_else(|| ProvisionError::NotFound(registration_id.to_string()))?;
        tracing::info!(
            event = "registration_found",
            registration_id = %registration_id,
            id = %registration.id,
            "registration found"
        );
        Ok(registration)
    }

    /// A tool-support server on this machine may not reach a key set served
    /// from this machine, so the key is embedded instead.
    async fn inline_key_if_local(
        &self,
        report: &mut WorkflowReport,
        lti_key: &mut Value,
    ) -> ProvisionResult<()> {
        const STEP: &str = "inline public key";
        let local = self
            .values
            .lookup_value(keys::TOOL_SUPPORT_URL)
            .is_some_and(|url| jwk::is_loopback_url(&url));
        if !local {
            return Ok(());
        }
        if jwk::key_location(lti_key).is_none() {
            report.skip(STEP, "LTI key has no public_jwk_url");
            return Ok(());
        }
        report
            .fatal(STEP, jwk::inline_public_jwk(lti_key, self.key_sets.as_ref()))
            .await
    }

    /// Adds the LTI key as an external tool unless one already matches it.
    async fn attach_external_tool(
        &self,
        report: &mut WorkflowReport,
        developer_key_id: &str,
        account: Option<&str>,
        check_existing: bool,
    ) -> ProvisionResult<()> {
        const STEP: &str = "add external tool";
        let Some(account_id) = account else {
            report.skip(STEP, "target sub-account is none");
            return Ok(());
        };
        if check_existing {
            let tools = report
                .fatal("list external tools", self.canvas.get_lti_tools(account_id))
                .await?;
            if let Some(tool) = find_tool_for_key(&tools, developer_key_id) {
                report.skip(STEP, format!("already attached as external tool {}", tool.id));
                return Ok(());
            }
        }
        report
            .fatal(
                STEP,
                self.canvas
                    .add_lti_tool_to_subaccount(developer_key_id, account_id),
            )
            .await?;
        tracing::info!(
            event = "external_tool_added",
            developer_key_id = %developer_key_id,
            account_id = %account_id,
            "LTI tool added to sub-account"
        );
        Ok(())
    }
}
