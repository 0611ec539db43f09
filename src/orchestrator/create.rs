use crate::orchestrator::{ProvisionError, ProvisionResult, Provisioner, WorkflowReport};
use crate::values::{GeneratedValues, keys};

impl Provisioner {
    /// Creates both developer keys, the tool-support registration, and the
    /// sub-account binding. Nothing is rolled back on failure; the error
    /// names the steps that already completed.
    pub async fn create(&self) -> ProvisionResult<WorkflowReport> {
        let template = self.require_template("create")?;
        self.check_connection()?;
        let registration_id = self.registration_id()?;
        let account = self.target_account()?;
        let mut resolved = template.resolve(&self.values)?;
        let creates_api_key = resolved.api_key.is_some() && resolved.tool_reg_has_proxy();
        let mut produced = vec![keys::LTI_DEV_ID, keys::LTI_DEV_KEY];
        if creates_api_key {
            produced.extend([keys::API_DEV_ID, keys::API_DEV_KEY]);
        }
        Self::ensure_generated(template, "create", &produced)?;
        let mut report = WorkflowReport::new("create");

        if self
            .find_registration(&mut report, &registration_id)
            .await?
            .is_some()
        {
            return Err(ProvisionError::AlreadyExists(registration_id));
        }

        self.inline_key_if_local(&mut report, &mut resolved.lti_key)
            .await?;

        let lti = report
            .fatal(
                "create LTI developer key",
                self.canvas.create_lti_developer_key(&resolved.lti_key),
            )
            .await?;
        let lti_id = lti.developer_key.id.clone();
        tracing::info!(event = "developer_key_created", kind = "lti", id = %lti_id, "LTI developer key created");
        let mut generated = GeneratedValues {
            lti_dev_id: Some(lti_id.clone()),
            lti_dev_key: lti.developer_key.api_key.clone(),
            ..GeneratedValues::default()
        };

        let mut api_id = None;
        match (&resolved.api_key, resolved.tool_reg_has_proxy()) {
            (Some(body), true) => {
                let key = report
                    .fatal(
                        "create API developer key",
                        self.canvas.create_api_developer_key(body),
                    )
                    .await?;
                tracing::info!(event = "developer_key_created", kind = "api", id = %key.id, "API developer key created");
                generated.api_dev_id = Some(key.id.clone());
                generated.api_dev_key = key.api_key.clone();
                api_id = Some(key.id);
            }
            (Some(_), false) => {
                report.skip("create API developer key", "toolReg has no proxy section");
                report.warn(
                    "Template defines apiKey but toolReg has no proxy; API developer key not created",
                );
            }
            (None, _) => report.skip("create API developer key", "template has no apiKey"),
        }

        let values = self.values.clone().with_generated(generated);
        let tool_reg = template.resolve_tool_reg(&values)?;
        let created = report
            .fatal(
                "create tool registration",
                self.tool_support.create_lti_tool_registration(&tool_reg),
            )
            .await?;
        tracing::info!(event = "registration_created", id = %created.id, "LTI tool registration created");

        report
            .fatal(
                "enable LTI developer key",
                self.canvas.enable_developer_key(&lti_id),
            )
            .await?;
        if let Some(api_id) = &api_id {
            report
                .fatal(
                    "enable API developer key",
                    self.canvas.enable_developer_key(api_id),
                )
                .await?;
        }

        self.attach_external_tool(&mut report, &lti_id, account.as_deref(), false)
            .await?;
        Ok(report)
    }
}
