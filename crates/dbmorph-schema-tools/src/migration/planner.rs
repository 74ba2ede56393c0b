//! Migration planner
//!
//! Linearizes a set of edits into an ordered list of steps. Each step lands
//! in one of the fourteen [`Stage`]s and renders exactly one statement.

use serde::Serialize;

use dbmorph_core::{EntityKind, Warning, is_blocked};

use super::render::StatementRenderer;
use super::stage::{Stage, StepAction, placement};
use crate::compare::Edit;

/// Configuration for statement rendering and script output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Whether DROP statements use IF EXISTS where MySQL allows it
    pub use_if_exists: bool,
    /// Whether scripts carry step descriptions and warnings as comments
    pub include_comments: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            use_if_exists: true,
            include_comments: true,
        }
    }
}

impl MigrationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_if_exists(mut self, use_if_exists: bool) -> Self {
        self.use_if_exists = use_if_exists;
        self
    }

    pub fn with_comments(mut self, include_comments: bool) -> Self {
        self.include_comments = include_comments;
        self
    }
}

/// One executable statement of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStep {
    pub stage: Stage,
    pub action: StepAction,
    pub statement: String,
    pub description: String,
    /// The edit this step was derived from
    pub edit: Edit,
    pub warnings: Vec<Warning>,
}

impl MigrationStep {
    /// Whether the statement is a routine or trigger body that needs a
    /// custom delimiter when written to a script
    pub fn needs_delimiter(&self) -> bool {
        self.action == StepAction::Create
            && matches!(
                self.edit.entity().kind(),
                EntityKind::Routine | EntityKind::Trigger
            )
            && self.statement.contains(';')
    }
}

/// An ordered list of steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    steps: Vec<MigrationStep>,
}

impl MigrationPlan {
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// All warnings in stage order, then step order
    pub fn warnings(&self) -> Vec<Warning> {
        self.steps
            .iter()
            .flat_map(|s| s.warnings.iter().cloned())
            .collect()
    }

    pub fn blocking_warnings(&self) -> Vec<Warning> {
        self.steps
            .iter()
            .flat_map(|s| s.warnings.iter())
            .filter(|w| w.is_blocking())
            .cloned()
            .collect()
    }

    pub fn is_blocked(&self, force: bool) -> bool {
        is_blocked(&self.warnings(), force)
    }

    /// The statements in execution order
    pub fn statements(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.statement.as_str()).collect()
    }

    /// Renders a reviewable SQL script
    pub fn to_script(&self, config: &MigrationConfig) -> String {
        let mut out = String::new();

        if config.include_comments {
            let warnings = self.warnings();
            let blocking = warnings.iter().filter(|w| w.is_blocking()).count();
            out.push_str("-- dbmorph migration script\n");
            if self.is_empty() {
                out.push_str("-- no changes\n");
                return out;
            }
            out.push_str(&format!(
                "-- {} step(s), {} warning(s), {} blocking\n",
                self.len(),
                warnings.len(),
                blocking
            ));
        }

        for step in &self.steps {
            if !out.is_empty() {
                out.push('\n');
            }
            if config.include_comments {
                out.push_str(&format!("-- [{}] {}\n", step.stage, step.description));
                for warning in &step.warnings {
                    out.push_str(&format!("-- WARNING {}\n", warning));
                }
            }
            if step.needs_delimiter() {
                out.push_str("DELIMITER $$\n");
                out.push_str(&step.statement);
                out.push_str("$$\nDELIMITER ;\n");
            } else {
                out.push_str(&step.statement);
                out.push_str(";\n");
            }
        }

        out
    }
}

/// Sort key within the total stage order
fn step_key(step: &MigrationStep) -> (Stage, &str, &str, StepAction) {
    let entity = step.edit.entity();
    (step.stage, entity.owner_table(), entity.name(), step.action)
}

/// Turns edits into an ordered [`MigrationPlan`]
#[derive(Debug, Clone, Default)]
pub struct MigrationPlanner {
    config: MigrationConfig,
}

impl MigrationPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MigrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Plans the given edits
    ///
    /// Steps are ordered by stage, then owning table, then entity name, then
    /// drop before create. Ties keep the input order.
    #[tracing::instrument(skip_all, fields(edits = edits.len()))]
    pub fn plan(&self, edits: &[Edit]) -> MigrationPlan {
        let renderer = StatementRenderer::new(&self.config);
        let mut steps = Vec::new();

        for edit in edits {
            for (position, &(stage, action)) in placement(edit.kind(), edit.entity().kind())
                .iter()
                .enumerate()
            {
                let Some(statement) = renderer.render(edit, action) else {
                    tracing::warn!(entity = %edit.entity(), ?action, "edit has no state to render");
                    continue;
                };
                // Warnings ride on the first step of an edit so they are reported once
                let warnings = if position == 0 {
                    edit.warnings().to_vec()
                } else {
                    Vec::new()
                };
                steps.push(MigrationStep {
                    stage,
                    action,
                    statement,
                    description: edit.description(),
                    edit: edit.clone(),
                    warnings,
                });
            }
        }

        steps.sort_by(|a, b| step_key(a).cmp(&step_key(b)));

        for (i, step) in steps.iter().enumerate() {
            tracing::debug!(step = i + 1, stage = %step.stage, "{}", step.description);
        }

        let plan = MigrationPlan { steps };
        tracing::info!(
            steps = plan.len(),
            warnings = plan.warnings().len(),
            blocking = plan.blocking_warnings().len(),
            "migration plan built"
        );
        plan
    }
}

/// Plans edits with the default configuration
pub fn plan(edits: &[Edit]) -> MigrationPlan {
    MigrationPlanner::new().plan(edits)
}

/// All warnings of a plan in execution order
pub fn warnings(plan: &MigrationPlan) -> Vec<Warning> {
    plan.warnings()
}

/// The plan's statements in execution order
pub fn render(plan: &MigrationPlan) -> Vec<String> {
    plan.statements().into_iter().map(str::to_string).collect()
}
