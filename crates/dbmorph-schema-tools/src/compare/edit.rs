//! Edit data structures
//!
//! An [`Edit`] is one typed difference between two schemas for one entity.
//! The constructors are the only way to build one, so an ADD never carries a
//! before-state, a REMOVE never carries an after-state, and a MODIFY always
//! carries both.

use serde::Serialize;

use dbmorph_core::{
    Column, EntityKind, EntityRef, ForeignKey, Index, StoredRoutine, Table, TableOptions, Trigger,
    View, Warning,
};

/// The kind of change an edit makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditKind {
    Add,
    Remove,
    Modify,
}

impl EditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditKind::Add => "ADD",
            EditKind::Remove => "REMOVE",
            EditKind::Modify => "MODIFY",
        }
    }
}

/// The state of an entity on one side of an edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "entity_type", content = "value", rename_all = "snake_case")]
pub enum EntityState {
    /// A whole table; foreign keys travel in their own edits
    Table(Table),
    /// The options of a table that exists on both sides
    TableOptions(TableOptions),
    Column(Column),
    /// Primary key column list
    PrimaryKey(Vec<String>),
    Index(Index),
    ForeignKey(ForeignKey),
    View(View),
    Routine(StoredRoutine),
    Trigger(Trigger),
}

impl EntityState {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityState::Table(_) | EntityState::TableOptions(_) => EntityKind::Table,
            EntityState::Column(_) => EntityKind::Column,
            EntityState::PrimaryKey(_) => EntityKind::PrimaryKey,
            EntityState::Index(_) => EntityKind::Index,
            EntityState::ForeignKey(_) => EntityKind::ForeignKey,
            EntityState::View(_) => EntityKind::View,
            EntityState::Routine(_) => EntityKind::Routine,
            EntityState::Trigger(_) => EntityKind::Trigger,
        }
    }
}

/// A single typed difference for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edit {
    kind: EditKind,
    entity: EntityRef,
    before: Option<EntityState>,
    after: Option<EntityState>,
    warnings: Vec<Warning>,
    destructive: bool,
}

impl Edit {
    /// An entity present only in the source
    pub fn add(entity: EntityRef, after: EntityState) -> Self {
        debug_assert_eq!(entity.kind(), after.kind());
        Self {
            kind: EditKind::Add,
            entity,
            before: None,
            after: Some(after),
            warnings: Vec::new(),
            destructive: false,
        }
    }

    /// A removal required to express a change, e.g. dropping an index before
    /// recreating it with new attributes
    pub fn remove(entity: EntityRef, before: EntityState) -> Self {
        debug_assert_eq!(entity.kind(), before.kind());
        Self {
            kind: EditKind::Remove,
            entity,
            before: Some(before),
            after: None,
            warnings: Vec::new(),
            destructive: false,
        }
    }

    /// A removal of an entity present only in the destination
    pub fn remove_extra(entity: EntityRef, before: EntityState) -> Self {
        Self {
            destructive: true,
            ..Self::remove(entity, before)
        }
    }

    /// An in-place change
    pub fn modify(entity: EntityRef, before: EntityState, after: EntityState) -> Self {
        debug_assert_eq!(entity.kind(), before.kind());
        debug_assert_eq!(entity.kind(), after.kind());
        Self {
            kind: EditKind::Modify,
            entity,
            before: Some(before),
            after: Some(after),
            warnings: Vec::new(),
            destructive: false,
        }
    }

    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = Warning>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub(crate) fn push_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn kind(&self) -> EditKind {
        self.kind
    }

    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    pub fn before(&self) -> Option<&EntityState> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&EntityState> {
        self.after.as_ref()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// True for removals of entities that exist only in the destination
    pub fn is_destructive(&self) -> bool {
        self.destructive
    }

    pub fn has_blocking_warnings(&self) -> bool {
        self.warnings.iter().any(Warning::is_blocking)
    }

    /// Human readable summary, e.g. "Add column `users`.`email`"
    pub fn description(&self) -> String {
        let verb = match self.kind {
            EditKind::Add => "Add",
            EditKind::Remove => "Drop",
            EditKind::Modify => "Modify",
        };
        match (&self.kind, &self.after) {
            (EditKind::Modify, Some(EntityState::TableOptions(_))) => {
                format!("Update options of {}", self.entity)
            }
            _ => format!("{} {}", verb, self.entity),
        }
    }
}

/// Counts edits per kind, for summaries
pub fn count_by_kind(edits: &[Edit]) -> (usize, usize, usize) {
    edits.iter().fold((0, 0, 0), |(add, remove, modify), e| match e.kind() {
        EditKind::Add => (add + 1, remove, modify),
        EditKind::Remove => (add, remove + 1, modify),
        EditKind::Modify => (add, remove, modify + 1),
    })
}
