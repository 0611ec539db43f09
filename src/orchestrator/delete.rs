use crate::orchestrator::{ProvisionError, ProvisionResult, Provisioner, WorkflowReport};
use crate::tool_support::Registration;

impl Provisioner {
    /// Removes both developer keys and the registration.
    ///
    /// Developer key deletion is best effort; the registration is always
    /// attempted and its failure is fatal. `confirm` is asked once the
    /// registration has been found.
    pub async fn delete<F>(&self, confirm: F) -> ProvisionResult<WorkflowReport>
    where
        F: FnOnce(&Registration) -> bool,
    {
        let registration_id = self.registration_id()?;
        let mut report = WorkflowReport::new("delete");

        let registration = self
            .require_registration(&mut report, &registration_id)
            .await?;

        if !confirm(&registration) {
            return Err(ProvisionError::Cancelled(registration_id));
        }

        if let Some(id) = registration.lti_client_id() {
            report
                .best_effort(
                    "delete LTI developer key",
                    self.canvas.delete_developer_key(id),
                )
                .await;
        } else {
            report.skip("delete LTI developer key", "registration has no LTI key");
        }

        if let Some(id) = registration.proxy_client_id() {
            report
                .best_effort(
                    "delete API developer key",
                    self.canvas.delete_developer_key(id),
                )
                .await;
        } else {
            report.skip("delete API developer key", "registration has no proxy key");
        }

        report
            .fatal(
                "delete tool registration",
                self.tool_support
                    .delete_lti_tool_registration(&registration.id),
            )
            .await?;
        tracing::info!(event = "registration_deleted", id = %registration.id, "LTI registration deleted");
        Ok(report)
    }
}
