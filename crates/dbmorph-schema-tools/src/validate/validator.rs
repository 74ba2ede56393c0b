//! Warning rules
//!
//! The validator never sees row counts. Unless the caller supplies evidence
//! that a table is empty, every destination table is treated as holding data,
//! so NOT NULL additions and nullability tightening always warn.

use dbmorph_core::{Column, EntityKind, EntityRef, Schema, Warning, WarningCategory};

use super::types::{TypeChangeRisk, assess_type_change};
use crate::compare::{Edit, EditKind, EntityState};

/// Whether a destination table may contain rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableOccupancy {
    /// No evidence either way; assume rows exist
    #[default]
    AssumedNonEmpty,
    /// The caller proved the table has no rows
    KnownEmpty,
}

impl TableOccupancy {
    pub fn may_have_rows(&self) -> bool {
        matches!(self, TableOccupancy::AssumedNonEmpty)
    }
}

/// Returns true for columns whose values the server computes
fn is_server_populated(column: &Column) -> bool {
    let extra = column.extra.to_ascii_uppercase();
    column.is_auto_increment()
        || extra.contains("VIRTUAL GENERATED")
        || extra.contains("STORED GENERATED")
}

fn needs_default(column: &Column) -> bool {
    !column.is_nullable && column.default.is_none() && !is_server_populated(column)
}

/// Warnings for adding `column` to an existing table
pub fn column_added_warnings(table: &str, column: &Column, occupancy: TableOccupancy) -> Vec<Warning> {
    let mut warnings = Vec::new();
    if needs_default(column) && occupancy.may_have_rows() {
        warnings.push(Warning::new(
            WarningCategory::MissingDefault,
            EntityRef::column(table, &column.name),
            format!(
                "Adding NOT NULL column `{}`.`{}` without a default fails if the table contains rows",
                table, column.name
            ),
        ));
    }
    warnings
}

/// Warnings for changing a column from `before` to `after`
pub fn column_modified_warnings(
    table: &str,
    before: &Column,
    after: &Column,
    occupancy: TableOccupancy,
) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let entity = EntityRef::column(table, &after.name);

    match assess_type_change(&before.data_type, &after.data_type) {
        Some(TypeChangeRisk::SizeReduction(detail)) => warnings.push(Warning::new(
            WarningCategory::SizeReduction,
            entity.clone(),
            format!(
                "Changing `{}`.`{}` from {} to {} may truncate data: {}",
                table, after.name, before.data_type, after.data_type, detail
            ),
        )),
        Some(TypeChangeRisk::Narrowing(detail)) => warnings.push(Warning::new(
            WarningCategory::TypeNarrowing,
            entity.clone(),
            format!(
                "Changing `{}`.`{}` from {} to {} may lose data: {}",
                table, after.name, before.data_type, after.data_type, detail
            ),
        )),
        None => {}
    }

    if before.is_nullable && !after.is_nullable && occupancy.may_have_rows() {
        warnings.push(Warning::new(
            WarningCategory::NullabilityTightened,
            entity,
            format!(
                "Changing `{}`.`{}` from NULL to NOT NULL fails if NULL values exist",
                table, after.name
            ),
        ));
    }

    warnings
}

/// Warning for removing an entity that only the destination has
pub fn destructive_removal_warning(entity: &EntityRef) -> Warning {
    let consequence = match entity.kind() {
        EntityKind::Table => " and all of its rows",
        EntityKind::Column => " and its data",
        _ => "",
    };
    Warning::new(
        WarningCategory::DestructiveRemoval,
        entity.clone(),
        format!("Dropping {}{} cannot be undone", entity, consequence),
    )
}

pub fn missing_primary_key_warning(table: &str) -> Warning {
    Warning::new(
        WarningCategory::MissingPrimaryKey,
        EntityRef::table(table),
        format!("Table `{}` has no primary key", table),
    )
}

/// Derives the warnings for a single edit
///
/// Covers column additions and changes and destructive removals. The
/// once-per-table primary key warning is attached by the comparator.
pub fn warnings_for(edit: &Edit, occupancy: TableOccupancy) -> Vec<Warning> {
    let table = edit.entity().owner_table();
    match (edit.kind(), edit.before(), edit.after()) {
        (EditKind::Add, _, Some(EntityState::Column(column))) => {
            column_added_warnings(table, column, occupancy)
        }
        (EditKind::Modify, Some(EntityState::Column(before)), Some(EntityState::Column(after))) => {
            column_modified_warnings(table, before, after, occupancy)
        }
        (EditKind::Remove, _, _) if edit.is_destructive() => {
            vec![destructive_removal_warning(edit.entity())]
        }
        _ => Vec::new(),
    }
}

/// Warnings about a single schema, independent of any comparison
///
/// Reports tables without a primary key and NOT NULL columns without a
/// default, which would fail to be added to a populated copy of the table.
pub fn structural_warnings(schema: &Schema) -> Vec<Warning> {
    let mut warnings = Vec::new();
    for table in schema.tables.values() {
        for column in table.columns.iter().filter(|c| needs_default(c)) {
            warnings.push(Warning::new(
                WarningCategory::MissingDefault,
                EntityRef::column(&table.name, &column.name),
                format!(
                    "Column `{}`.`{}` is NOT NULL without a default; adding it to a populated table fails",
                    table.name, column.name
                ),
            ));
        }
        if !table.has_primary_key() {
            warnings.push(missing_primary_key_warning(&table.name));
        }
    }
    warnings
}
