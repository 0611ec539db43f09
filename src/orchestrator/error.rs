use crate::gateway::GatewayError;
use crate::template::TemplateError;
use crate::values::ValueError;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Values(#[from] ValueError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("A template file is required for {0}")]
    TemplateRequired(&'static str),
    #[error("Registration '{0}' already exists in tool-support; nothing was changed")]
    AlreadyExists(String),
    #[error("Registration '{0}' does not exist in tool-support; nothing was changed")]
    NotFound(String),
    #[error(
        "toolReg references {} but this {workflow} does not produce them; nothing was changed",
        .keys.join(", ")
    )]
    NotGenerated {
        workflow: &'static str,
        keys: Vec<String>,
    },
    #[error("Export of registration '{registration_id}' failed: {source}")]
    Export {
        registration_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Registration '{0}' has no LTI developer key")]
    NoLtiKey(String),
    #[error("{role} developer key {id} no longer exists in Canvas")]
    KeyMissing { role: &'static str, id: String },
    #[error("No external tool for developer key {developer_key_id} in account {account_id}")]
    ToolNotFound {
        developer_key_id: String,
        account_id: String,
    },
    #[error("No target sub-account configured (lti_account_id is 'none')")]
    NoAccount,
    #[error("Deletion of '{0}' cancelled")]
    Cancelled(String),
    #[error("Step '{step}' failed (completed: {}): {source}", completed_list(.completed))]
    Step {
        step: &'static str,
        completed: Vec<&'static str>,
        #[source]
        source: GatewayError,
    },
}

fn completed_list(completed: &[&'static str]) -> String {
    if completed.is_empty() {
        "none".to_string()
    } else {
        completed.join(", ")
    }
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;
