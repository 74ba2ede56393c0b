//! Warnings and the entity references they point at

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::RoutineKind;

/// The entity kinds an edit or warning can concern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Table,
    Column,
    PrimaryKey,
    Index,
    ForeignKey,
    View,
    Routine,
    Trigger,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Table => "table",
            EntityKind::Column => "column",
            EntityKind::PrimaryKey => "primary key",
            EntityKind::Index => "index",
            EntityKind::ForeignKey => "foreign key",
            EntityKind::View => "view",
            EntityKind::Routine => "routine",
            EntityKind::Trigger => "trigger",
        }
    }
}

/// Identity of a schema entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRef {
    Table { name: String },
    Column { table: String, name: String },
    PrimaryKey { table: String },
    Index { table: String, name: String },
    ForeignKey { table: String, name: String },
    View { name: String },
    Routine { routine_kind: RoutineKind, name: String },
    Trigger { table: String, name: String },
}

impl EntityRef {
    pub fn table(name: impl Into<String>) -> Self {
        EntityRef::Table { name: name.into() }
    }

    pub fn column(table: impl Into<String>, name: impl Into<String>) -> Self {
        EntityRef::Column {
            table: table.into(),
            name: name.into(),
        }
    }

    pub fn primary_key(table: impl Into<String>) -> Self {
        EntityRef::PrimaryKey {
            table: table.into(),
        }
    }

    pub fn index(table: impl Into<String>, name: impl Into<String>) -> Self {
        EntityRef::Index {
            table: table.into(),
            name: name.into(),
        }
    }

    pub fn foreign_key(table: impl Into<String>, name: impl Into<String>) -> Self {
        EntityRef::ForeignKey {
            table: table.into(),
            name: name.into(),
        }
    }

    pub fn view(name: impl Into<String>) -> Self {
        EntityRef::View { name: name.into() }
    }

    pub fn routine(routine_kind: RoutineKind, name: impl Into<String>) -> Self {
        EntityRef::Routine {
            routine_kind,
            name: name.into(),
        }
    }

    pub fn trigger(table: impl Into<String>, name: impl Into<String>) -> Self {
        EntityRef::Trigger {
            table: table.into(),
            name: name.into(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Table { .. } => EntityKind::Table,
            EntityRef::Column { .. } => EntityKind::Column,
            EntityRef::PrimaryKey { .. } => EntityKind::PrimaryKey,
            EntityRef::Index { .. } => EntityKind::Index,
            EntityRef::ForeignKey { .. } => EntityKind::ForeignKey,
            EntityRef::View { .. } => EntityKind::View,
            EntityRef::Routine { .. } => EntityKind::Routine,
            EntityRef::Trigger { .. } => EntityKind::Trigger,
        }
    }

    /// Name of the table that owns the entity, empty for views and routines
    pub fn owner_table(&self) -> &str {
        match self {
            EntityRef::Table { name } => name,
            EntityRef::Column { table, .. }
            | EntityRef::PrimaryKey { table }
            | EntityRef::Index { table, .. }
            | EntityRef::ForeignKey { table, .. }
            | EntityRef::Trigger { table, .. } => table,
            EntityRef::View { .. } | EntityRef::Routine { .. } => "",
        }
    }

    /// Name of the entity itself; the primary key is always `PRIMARY`
    pub fn name(&self) -> &str {
        match self {
            EntityRef::Table { name }
            | EntityRef::Column { name, .. }
            | EntityRef::Index { name, .. }
            | EntityRef::ForeignKey { name, .. }
            | EntityRef::View { name }
            | EntityRef::Routine { name, .. }
            | EntityRef::Trigger { name, .. } => name,
            EntityRef::PrimaryKey { .. } => "PRIMARY",
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Table { name } => write!(f, "table `{}`", name),
            EntityRef::Column { table, name } => write!(f, "column `{}`.`{}`", table, name),
            EntityRef::PrimaryKey { table } => write!(f, "primary key of `{}`", table),
            EntityRef::Index { table, name } => write!(f, "index `{}` on `{}`", name, table),
            EntityRef::ForeignKey { table, name } => {
                write!(f, "foreign key `{}` on `{}`", name, table)
            }
            EntityRef::View { name } => write!(f, "view `{}`", name),
            EntityRef::Routine { routine_kind, name } => {
                write!(f, "{} `{}`", routine_kind.as_sql().to_lowercase(), name)
            }
            EntityRef::Trigger { table, name } => write!(f, "trigger `{}` on `{}`", name, table),
        }
    }
}

/// How a warning affects execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Prevents execution unless forced
    Blocking,
    /// Reported only
    Informational,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Blocking => "BLOCKING",
            Severity::Informational => "INFORMATIONAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of hazard a warning describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCategory {
    MissingDefault,
    SizeReduction,
    TypeNarrowing,
    NullabilityTightened,
    DestructiveRemoval,
    MissingPrimaryKey,
}

impl WarningCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCategory::MissingDefault => "MISSING_DEFAULT",
            WarningCategory::SizeReduction => "SIZE_REDUCTION",
            WarningCategory::TypeNarrowing => "TYPE_NARROWING",
            WarningCategory::NullabilityTightened => "NULLABILITY_TIGHTENED",
            WarningCategory::DestructiveRemoval => "DESTRUCTIVE_REMOVAL",
            WarningCategory::MissingPrimaryKey => "MISSING_PRIMARY_KEY",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            WarningCategory::MissingPrimaryKey => Severity::Informational,
            WarningCategory::MissingDefault
            | WarningCategory::SizeReduction
            | WarningCategory::TypeNarrowing
            | WarningCategory::NullabilityTightened
            | WarningCategory::DestructiveRemoval => Severity::Blocking,
        }
    }
}

impl fmt::Display for WarningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A potential hazard attached to an edit or a schema
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Warning {
    pub category: WarningCategory,
    pub severity: Severity,
    pub message: String,
    pub entity: EntityRef,
}

impl Warning {
    /// Creates a warning with the category's severity
    pub fn new(category: WarningCategory, entity: EntityRef, message: impl Into<String>) -> Self {
        Self {
            category,
            severity: category.severity(),
            message: message.into(),
            entity,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.category, self.message)
    }
}

/// Returns true when execution must not start
///
/// Any blocking warning blocks unless `force` is set.
pub fn is_blocked(warnings: &[Warning], force: bool) -> bool {
    !force && warnings.iter().any(Warning::is_blocking)
}
