//! Migration stages
//!
//! Every step runs in one of fourteen fixed stages. Drops come before creates,
//! and within each half the order follows dependencies: triggers and views
//! depend on tables, foreign keys on referenced tables and columns, indexes
//! on the columns they cover.

use std::fmt;

use serde::Serialize;

use dbmorph_core::EntityKind;

use crate::compare::EditKind;

/// Execution stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    DropTriggers = 1,
    DropViews = 2,
    DropForeignKeys = 3,
    DropIndexes = 4,
    DropColumns = 5,
    DropTables = 6,
    CreateTables = 7,
    AddColumns = 8,
    ModifyColumns = 9,
    CreateIndexes = 10,
    CreateForeignKeys = 11,
    CreateViews = 12,
    CreateProcedures = 13,
    CreateTriggers = 14,
}

impl Stage {
    pub const ALL: [Stage; 14] = [
        Stage::DropTriggers,
        Stage::DropViews,
        Stage::DropForeignKeys,
        Stage::DropIndexes,
        Stage::DropColumns,
        Stage::DropTables,
        Stage::CreateTables,
        Stage::AddColumns,
        Stage::ModifyColumns,
        Stage::CreateIndexes,
        Stage::CreateForeignKeys,
        Stage::CreateViews,
        Stage::CreateProcedures,
        Stage::CreateTriggers,
    ];

    /// One-based position in execution order
    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::DropTriggers => "DROP_TRIGGERS",
            Stage::DropViews => "DROP_VIEWS",
            Stage::DropForeignKeys => "DROP_FOREIGN_KEYS",
            Stage::DropIndexes => "DROP_INDEXES",
            Stage::DropColumns => "DROP_COLUMNS",
            Stage::DropTables => "DROP_TABLES",
            Stage::CreateTables => "CREATE_TABLES",
            Stage::AddColumns => "ADD_COLUMNS",
            Stage::ModifyColumns => "MODIFY_COLUMNS",
            Stage::CreateIndexes => "CREATE_INDEXES",
            Stage::CreateForeignKeys => "CREATE_FOREIGN_KEYS",
            Stage::CreateViews => "CREATE_VIEWS",
            Stage::CreateProcedures => "CREATE_PROCEDURES",
            Stage::CreateTriggers => "CREATE_TRIGGERS",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a step does to its entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Drop,
    Alter,
    Create,
}

/// Stages an edit occupies, in execution order
///
/// Most edits map to a single step. A MODIFY of an entity that cannot be
/// altered in place becomes a drop step and a create step.
pub fn placement(kind: EditKind, entity: EntityKind) -> &'static [(Stage, StepAction)] {
    use EditKind::*;
    use EntityKind as E;
    use StepAction::*;

    match (kind, entity) {
        (Remove, E::Trigger) => &[(Stage::DropTriggers, Drop)],
        (Add, E::Trigger) => &[(Stage::CreateTriggers, Create)],
        (Modify, E::Trigger) => &[(Stage::DropTriggers, Drop), (Stage::CreateTriggers, Create)],

        (Remove, E::View) => &[(Stage::DropViews, Drop)],
        (Add, E::View) => &[(Stage::CreateViews, Create)],
        (Modify, E::View) => &[(Stage::DropViews, Drop), (Stage::CreateViews, Create)],

        (Remove, E::ForeignKey) => &[(Stage::DropForeignKeys, Drop)],
        (Add, E::ForeignKey) => &[(Stage::CreateForeignKeys, Create)],
        (Modify, E::ForeignKey) => &[
            (Stage::DropForeignKeys, Drop),
            (Stage::CreateForeignKeys, Create),
        ],

        (Remove, E::Index) => &[(Stage::DropIndexes, Drop)],
        (Add, E::Index) => &[(Stage::CreateIndexes, Create)],
        (Modify, E::Index) => &[(Stage::DropIndexes, Drop), (Stage::CreateIndexes, Create)],

        (Remove, E::PrimaryKey) => &[(Stage::DropIndexes, Drop)],
        (Add, E::PrimaryKey) => &[(Stage::CreateIndexes, Create)],
        (Modify, E::PrimaryKey) => &[(Stage::DropIndexes, Drop), (Stage::CreateIndexes, Create)],

        (Remove, E::Column) => &[(Stage::DropColumns, Drop)],
        (Add, E::Column) => &[(Stage::AddColumns, Create)],
        (Modify, E::Column) => &[(Stage::ModifyColumns, Alter)],

        (Remove, E::Table) => &[(Stage::DropTables, Drop)],
        (Add, E::Table) => &[(Stage::CreateTables, Create)],
        (Modify, E::Table) => &[(Stage::ModifyColumns, Alter)],

        (Remove, E::Routine) => &[(Stage::CreateProcedures, Drop)],
        (Add, E::Routine) => &[(Stage::CreateProcedures, Create)],
        (Modify, E::Routine) => &[
            (Stage::CreateProcedures, Drop),
            (Stage::CreateProcedures, Create),
        ],
    }
}
