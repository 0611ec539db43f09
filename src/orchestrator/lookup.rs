use crate::canvas::{ExternalTool, find_tool_for_key};
use crate::orchestrator::{ProvisionError, ProvisionResult, Provisioner, WorkflowReport};
use crate::tool_support::Registration;

impl Provisioner {
    /// Finds the external tool installed for the registration's LTI key.
    pub async fn lookup_lti(&self) -> ProvisionResult<ExternalTool> {
        let registration_id = self.registration_id()?;
        let account_id = self.target_account()?.ok_or(ProvisionError::NoAccount)?;
        let mut report = WorkflowReport::new("lookup-lti");

        let registration = self
            .require_registration(&mut report, &registration_id)
            .await?;
        let lti_id = registration
            .lti_client_id()
            .ok_or_else(|| ProvisionError::NoLtiKey(registration_id.clone()))?;
        let tools = report
            .fatal("list external tools", self.canvas.get_lti_tools(&account_id))
            .await?;
        find_tool_for_key(&tools, lti_id)
            .cloned()
            .ok_or_else(|| ProvisionError::ToolNotFound {
                developer_key_id: lti_id.to_string(),
                account_id,
            })
    }

    pub async fn list(&self) -> ProvisionResult<Vec<Registration>> {
        let mut report = WorkflowReport::new("list");
        report
            .fatal(
                "list registrations",
                self.tool_support.list_lti_tool_registrations(),
            )
            .await
    }
}
