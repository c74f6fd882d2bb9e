use crate::utils::errors::ProvisionError;
use crate::workflow::context::{Artifact, Context};
use crate::workflow::step::Step;

/// A cleanup failure recorded during rollback or teardown. Reported next to
/// the primary error, never instead of it.
#[derive(Debug)]
pub struct UndoFailure {
    pub step: String,
    pub error: ProvisionError,
}

#[derive(Debug, Default)]
pub struct WorkflowResult {
    /// Names of steps whose apply succeeded, in execution order
    pub completed: Vec<String>,
    /// Name of the step whose apply failed, if any
    pub failed_step: Option<String>,
    /// Artifact extracted from the Context on full success
    pub final_artifact: Option<Artifact>,
    /// The original apply error; undo errors never overwrite it
    pub error: Option<ProvisionError>,
    pub undo_failures: Vec<UndoFailure>,
}

impl WorkflowResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs an ordered list of steps, tracking which succeeded. On the first
/// apply failure, forward progress stops and the completed steps are undone
/// last-applied-first. No retries happen at this layer; a step failure is
/// terminal for the run.
pub struct Coordinator {
    rollback_on_failure: bool,
    final_artifact: Option<String>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            rollback_on_failure: true,
            final_artifact: None,
        }
    }

    /// Disable reverse-order undo on failure, leaving partial state in place
    pub fn with_rollback(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }

    /// Name of the Context artifact to hand back on full success
    pub fn with_final_artifact(mut self, name: impl Into<String>) -> Self {
        self.final_artifact = Some(name.into());
        self
    }

    pub async fn run(&self, steps: &[Box<dyn Step>]) -> WorkflowResult {
        let mut ctx = Context::new();
        let mut completed = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            tracing::info!("Applying step {}/{}: {}", index + 1, steps.len(), step.name());
            match step.apply(&mut ctx).await {
                Ok(()) => completed.push(step.name().to_string()),
                Err(error) => {
                    tracing::error!("Step '{}' failed: {error}", step.name());
                    let undo_failures = if self.rollback_on_failure {
                        self.rollback(&steps[..index], &mut ctx).await
                    } else {
                        tracing::warn!("Rollback disabled, leaving partial setup in place");
                        Vec::new()
                    };

                    return WorkflowResult {
                        completed,
                        failed_step: Some(step.name().to_string()),
                        final_artifact: None,
                        error: Some(error),
                        undo_failures,
                    };
                }
            }
        }

        let final_artifact = self
            .final_artifact
            .as_deref()
            .and_then(|name| ctx.take(name));

        WorkflowResult {
            completed,
            failed_step: None,
            final_artifact,
            error: None,
            undo_failures: Vec::new(),
        }
    }

    /// Undo every given step in reverse order against a fresh Context. This
    /// is the explicit cleanup path for setups completed in an earlier run.
    pub async fn teardown(&self, steps: &[Box<dyn Step>]) -> Vec<UndoFailure> {
        let mut ctx = Context::new();
        self.rollback(steps, &mut ctx).await
    }

    /// Undo completed steps last-applied-first, collecting failures instead
    /// of propagating them
    async fn rollback(&self, completed: &[Box<dyn Step>], ctx: &mut Context) -> Vec<UndoFailure> {
        let mut failures = Vec::new();

        for step in completed.iter().rev() {
            tracing::info!("Rolling back step: {}", step.name());
            if let Err(error) = step.undo(ctx).await {
                tracing::warn!("Rollback of '{}' failed: {error}", step.name());
                failures.push(UndoFailure {
                    step: step.name().to_string(),
                    error,
                });
            }
        }

        failures
    }
}
