//! Plan application
//!
//! Steps run strictly in plan order, one statement at a time. The warning
//! gate is checked once before the first step. A failing step stops the run;
//! steps that already succeeded are not undone since MySQL commits DDL
//! implicitly.

use serde::Serialize;

use dbmorph_core::{ExecutionFailure, MorphError, Result, StatementExecutor};

use super::planner::{MigrationPlan, MigrationStep};

/// Outcome of a fully applied plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// Number of statements executed
    pub executed: usize,
    /// Blocking warnings that were overridden with force
    pub overridden_warnings: usize,
}

/// Applies a plan through an executor
///
/// Fails with [`MorphError::Validation`] before running anything when the
/// plan has blocking warnings and `force` is false, and with
/// [`MorphError::Execution`] at the first statement that fails.
pub async fn apply_plan(
    executor: &dyn StatementExecutor,
    plan: &MigrationPlan,
    force: bool,
) -> Result<ExecutionReport> {
    apply_plan_with_progress(executor, plan, force, |_, _| {}).await
}

/// Like [`apply_plan`], calling `on_step` after each successful step with its
/// zero-based index
#[tracing::instrument(skip_all, fields(steps = plan.len(), backend = executor.backend_name(), force = force))]
pub async fn apply_plan_with_progress<F>(
    executor: &dyn StatementExecutor,
    plan: &MigrationPlan,
    force: bool,
    mut on_step: F,
) -> Result<ExecutionReport>
where
    F: FnMut(usize, &MigrationStep) + Send,
{
    let blocking = plan.blocking_warnings();
    if !blocking.is_empty() {
        if !force {
            tracing::info!(
                blocking = blocking.len(),
                "plan blocked by warnings, nothing executed"
            );
            return Err(MorphError::Validation { blocking });
        }
        for warning in &blocking {
            tracing::warn!(entity = %warning.entity, "overriding blocking warning: {}", warning);
        }
    }

    for (index, step) in plan.steps().iter().enumerate() {
        tracing::debug!(step = index + 1, stage = %step.stage, "{}", step.description);

        if let Err(err) = executor.execute(&step.statement).await {
            let detail = match err {
                MorphError::Query(detail) | MorphError::Connection(detail) => detail,
                other => other.to_string(),
            };
            tracing::error!(
                step = index + 1,
                completed = index,
                error = %detail,
                "migration step failed"
            );
            return Err(MorphError::Execution(ExecutionFailure {
                step_index: index,
                completed: index,
                statement: step.statement.clone(),
                detail,
            }));
        }

        on_step(index, step);
    }

    tracing::info!(executed = plan.len(), "migration applied");

    Ok(ExecutionReport {
        executed: plan.len(),
        overridden_warnings: blocking.len(),
    })
}
