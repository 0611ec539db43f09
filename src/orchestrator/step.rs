use std::future::Future;

use crate::gateway::GatewayResult;
use crate::orchestrator::error::{ProvisionError, ProvisionResult};

/// What a failed step does to the rest of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Abort the workflow.
    Fatal,
    /// Log and carry on with the next step.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Done,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: &'static str,
    pub status: StepStatus,
}

/// Outcome of every step a workflow ran, plus warnings for the operator.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    pub workflow: &'static str,
    pub steps: Vec<StepRecord>,
    pub warnings: Vec<String>,
}

impl WorkflowReport {
    pub fn new(workflow: &'static str) -> Self {
        Self {
            workflow,
            steps: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Runs one step under `policy`; `Ok(None)` means a best-effort step failed.
    pub async fn run<T, F>(
        &mut self,
        name: &'static str,
        policy: StepPolicy,
        step: F,
    ) -> ProvisionResult<Option<T>>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        match policy {
            StepPolicy::Fatal => self.fatal(name, step).await.map(Some),
            StepPolicy::BestEffort => Ok(self.best_effort(name, step).await),
        }
    }

    pub async fn fatal<T, F>(&mut self, name: &'static str, step: F) -> ProvisionResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        let result = self.attempt(name, step).await;
        result.map_err(|err| {
            tracing::error!(
                event = "step_failed",
                workflow = self.workflow,
                step = name,
                error = %err,
                "step failed, aborting"
            );
            ProvisionError::Step {
                step: name,
                completed: self.completed(),
                source: err,
            }
        })
    }

    pub async fn best_effort<T, F>(&mut self, name: &'static str, step: F) -> Option<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        match self.attempt(name, step).await {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(
                    event = "step_failed",
                    workflow = self.workflow,
                    step = name,
                    error = %err,
                    "step failed, continuing"
                );
                self.warnings.push(format!("{name}: {err}"));
                None
            }
        }
    }

    async fn attempt<T, F>(&mut self, name: &'static str, step: F) -> GatewayResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        let result = step.await;
        let status = match &result {
            Ok(_) => {
                tracing::info!(event = "step_done", workflow = self.workflow, step = name);
                StepStatus::Done
            }
            Err(err) => StepStatus::Failed(err.to_string()),
        };
        self.steps.push(StepRecord { name, status });
        result
    }

    pub fn skip(&mut self, name: &'static str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(event = "step_skipped", workflow = self.workflow, step = name, reason = %reason);
        self.steps.push(StepRecord {
            name,
            status: StepStatus::Skipped(reason),
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(event = "workflow_warning", workflow = self.workflow, "{message}");
        self.warnings.push(message);
    }

    pub fn completed(&self) -> Vec<&'static str> {
        self.steps
            .iter()
            .filter(|record| record.status == StepStatus::Done)
            .map(|record| record.name)
            .collect()
    }

    pub fn status_of(&self, name: &str) -> Option<&StepStatus> {
        self.steps
            .iter()
            .rev()
            .find(|record| record.name == name)
            .map(|record| &record.status)
    }
}

#[cfg(test)]
mod tests {
    use super::{StepPolicy, StepStatus, WorkflowReport};
    use crate::gateway::GatewayError;
    use crate::orchestrator::error::ProvisionError;

    fn failure() -> GatewayError {
        GatewayError::Api {
            operation: "testing",
            status: 500,
            body: "boom".to_string(),
        }
    }

    #[tokio::test]
    async fn best_effort_failure_continues() {
        let mut report = WorkflowReport::new("test");
        let value: Option<u8> = report
            .best_effort("flaky", async { Err(failure()) })
            .await;
        assert!(value.is_none());
        let next = report.fatal("next", async { Ok(1u8) }).await.unwrap();
        assert_eq!(next, 1);
        assert!(matches!(report.status_of("flaky"), Some(StepStatus::Failed(_))));
        assert_eq!(report.completed(), vec!["next"]);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn fatal_failure_aborts_with_completed_steps() {
        let mut report = WorkflowReport::new("test");
        report.fatal("first", async { Ok(()) }).await.unwrap();
        let err = report
            .run::<(), _>("second", StepPolicy::Fatal, async { Err(failure()) })
            .await
            .unwrap_err();
        match err {
            ProvisionError::Step { step, completed, .. } => {
                assert_eq!(step, "second");
                assert_eq!(completed, vec!["first"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
