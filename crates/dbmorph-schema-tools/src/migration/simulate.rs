//! Dry run of a plan against an in-memory schema

use std::collections::BTreeMap;

use dbmorph_core::{EntityRef, MorphError, Result, Schema, Table};

use super::planner::{MigrationPlan, MigrationStep};
use super::stage::StepAction;
use crate::compare::EntityState;
use crate::validate::check_schema;

/// Applies a plan to a copy of `destination` and returns the result
///
/// Fails with a comparison input error when a step drops or alters
/// something that does not exist, or creates something that already does.
/// The resulting schema must pass the input consistency checks.
pub fn simulate(destination: &Schema, plan: &MigrationPlan) -> Result<Schema> {
    simulate_with(destination, plan, true)
}

/// Like [`simulate`], matching identifiers the way the comparison that
/// produced the plan did
#[tracing::instrument(
    skip_all,
    fields(database = %destination.database_name, steps = plan.len(), case_sensitive)
)]
pub fn simulate_with(
    destination: &Schema,
    plan: &MigrationPlan,
    case_sensitive: bool,
) -> Result<Schema> {
    let mut simulation = Simulation {
        schema: destination.clone(),
        case_sensitive,
    };
    for step in plan.steps() {
        simulation.apply_step(step)?;
    }
    check_schema(&simulation.schema, case_sensitive)?;
    tracing::debug!(
        entities = simulation.schema.entity_count(),
        "simulation complete"
    );
    Ok(simulation.schema)
}

fn missing(entity: &EntityRef) -> MorphError {
    MorphError::input(entity.clone(), "does not exist")
}

fn duplicate(entity: &EntityRef) -> MorphError {
    MorphError::input(entity.clone(), "already exists")
}

struct Simulation {
    schema: Schema,
    case_sensitive: bool,
}

impl Simulation {
    fn same_names(case_sensitive: bool, a: &str, b: &str) -> bool {
        if case_sensitive {
            a == b
        } else {
            a.to_lowercase() == b.to_lowercase()
        }
    }

    /// The key under which `name` is stored in `map`
    fn key<V>(&self, map: &BTreeMap<String, V>, name: &str) -> Option<String> {
        if map.contains_key(name) {
            return Some(name.to_string());
        }
        map.keys()
            .find(|key| Simulation::same_names(self.case_sensitive, key, name))
            .cloned()
    }

    fn table_mut(&mut self, entity: &EntityRef) -> Result<&mut Table> {
        let owner = entity.owner_table();
        let missing_table = || MorphError::input(EntityRef::table(owner), "does not exist");
        let key = self.key(&self.schema.tables, owner).ok_or_else(missing_table)?;
        self.schema.tables.get_mut(&key).ok_or_else(missing_table)
    }

    fn apply_step(&mut self, step: &MigrationStep) -> Result<()> {
        let edit = &step.edit;
        let entity = edit.entity();
        let state = match step.action {
            StepAction::Drop => edit.before(),
            StepAction::Alter | StepAction::Create => edit.after(),
        };
        let Some(state) = state else {
            return Err(MorphError::input(entity.clone(), "edit carries no state"));
        };

        match step.action {
            StepAction::Drop => self.drop_entity(entity, state),
            StepAction::Create => self.create_entity(entity, state),
            StepAction::Alter => self.alter_entity(entity, state),
        }
    }

    fn drop_entity(&mut self, entity: &EntityRef, state: &EntityState) -> Result<()> {
        let case_sensitive = self.case_sensitive;
        let same = move |a: &str, b: &str| Simulation::same_names(case_sensitive, a, b);

        match state {
            EntityState::Table(table) => {
                let key = self
                    .key(&self.schema.tables, &table.name)
                    .ok_or_else(|| missing(entity))?;
                let removed = self.schema.tables.remove(&key).ok_or_else(|| missing(entity))?;
                // MySQL drops a table's triggers with it
                self.schema.triggers.retain(|_, t| !same(&t.table, &removed.name));
            }
            EntityState::TableOptions(_) => return Err(missing(entity)),
            EntityState::Column(column) => {
                let table = self.table_mut(entity)?;
                let position = table
                    .columns
                    .iter()
                    .position(|c| same(&c.name, &column.name))
                    .ok_or_else(|| missing(entity))?;
                table.columns.remove(position);
            }
            EntityState::PrimaryKey(_) => {
                let table = self.table_mut(entity)?;
                if !table.has_primary_key() {
                    return Err(missing(entity));
                }
                table.primary_key.clear();
            }
            EntityState::Index(index) => {
                let table = self.table_mut(entity)?;
                let position = table
                    .indexes
                    .iter()
                    .position(|i| same(&i.name, &index.name))
                    .ok_or_else(|| missing(entity))?;
                table.indexes.remove(position);
            }
            EntityState::ForeignKey(fk) => {
                let table = self.table_mut(entity)?;
                let position = table
                    .foreign_keys
                    .iter()
                    .position(|f| same(&f.name, &fk.name))
                    .ok_or_else(|| missing(entity))?;
                table.foreign_keys.remove(position);
            }
            EntityState::View(view) => {
                let key = self
                    .key(&self.schema.views, &view.name)
                    .ok_or_else(|| missing(entity))?;
                self.schema.views.remove(&key);
            }
            EntityState::Routine(routine) => {
                let key = self
                    .key(&self.schema.procedures, &routine.name)
                    .ok_or_else(|| missing(entity))?;
                self.schema.procedures.remove(&key);
            }
            EntityState::Trigger(trigger) => {
                let key = self
                    .key(&self.schema.triggers, &trigger.name)
                    .ok_or_else(|| missing(entity))?;
                self.schema.triggers.remove(&key);
            }
        }
        Ok(())
    }

    fn create_entity(&mut self, entity: &EntityRef, state: &EntityState) -> Result<()> {
        let case_sensitive = self.case_sensitive;
        let same = move |a: &str, b: &str| Simulation::same_names(case_sensitive, a, b);

        match state {
            EntityState::Table(table) => {
                if self.key(&self.schema.tables, &table.name).is_some() {
                    return Err(duplicate(entity));
                }
                self.schema.tables.insert(table.name.clone(), table.clone());
            }
            EntityState::TableOptions(_) => return self.alter_entity(entity, state),
            EntityState::Column(column) => {
                let table = self.table_mut(entity)?;
                if table.columns.iter().any(|c| same(&c.name, &column.name)) {
                    return Err(duplicate(entity));
                }
                table.columns.push(column.clone());
            }
            EntityState::PrimaryKey(columns) => {
                let table = self.table_mut(entity)?;
                if table.has_primary_key() {
                    return Err(duplicate(entity));
                }
                table.primary_key = columns.clone();
            }
            EntityState::Index(index) => {
                let table = self.table_mut(entity)?;
                if table.indexes.iter().any(|i| same(&i.name, &index.name)) {
                    return Err(duplicate(entity));
                }
                table.indexes.push(index.clone());
            }
            EntityState::ForeignKey(fk) => {
                let table = self.table_mut(entity)?;
                if table.foreign_keys.iter().any(|f| same(&f.name, &fk.name)) {
                    return Err(duplicate(entity));
                }
                table.foreign_keys.push(fk.clone());
            }
            EntityState::View(view) => {
                if self.key(&self.schema.views, &view.name).is_some() {
                    return Err(duplicate(entity));
                }
                self.schema.views.insert(view.name.clone(), view.clone());
            }
            EntityState::Routine(routine) => {
                if self.key(&self.schema.procedures, &routine.name).is_some() {
                    return Err(duplicate(entity));
                }
                self.schema
                    .procedures
                    .insert(routine.name.clone(), routine.clone());
            }
            EntityState::Trigger(trigger) => {
                if self.key(&self.schema.triggers, &trigger.name).is_some() {
                    return Err(duplicate(entity));
                }
                if self.key(&self.schema.tables, &trigger.table).is_none() {
                    return Err(MorphError::input(
                        EntityRef::table(&trigger.table),
                        "does not exist",
                    ));
                }
                self.schema
                    .triggers
                    .insert(trigger.name.clone(), trigger.clone());
            }
        }
        Ok(())
    }

    fn alter_entity(&mut self, entity: &EntityRef, state: &EntityState) -> Result<()> {
        let case_sensitive = self.case_sensitive;

        match state {
            EntityState::Column(column) => {
                let table = self.table_mut(entity)?;
                let slot = table
                    .columns
                    .iter_mut()
                    .find(|c| Simulation::same_names(case_sensitive, &c.name, &column.name))
                    .ok_or_else(|| missing(entity))?;
                *slot = column.clone();
            }
            EntityState::TableOptions(options) => {
                let table = self.table_mut(entity)?;
                table.engine = options.engine.clone();
                table.charset = options.charset.clone();
                table.collation = options.collation.clone();
                table.comment = options.comment.clone();
            }
            other => return self.create_entity(entity, other),
        }
        Ok(())
    }
}
