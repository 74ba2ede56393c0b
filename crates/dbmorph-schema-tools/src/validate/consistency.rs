//! Input consistency checks
//!
//! A snapshot that contradicts itself cannot be diffed meaningfully. These
//! checks reject it before comparison, naming the first offending entity.

use std::collections::HashSet;

use dbmorph_core::{EntityRef, MorphError, Result, Schema, Table};

fn fold(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}

fn has_column(table: &Table, column: &str, case_sensitive: bool) -> bool {
    table.columns.iter().any(|c| {
        if case_sensitive {
            c.name == column
        } else {
            c.name.eq_ignore_ascii_case(column)
        }
    })
}

fn find_table<'a>(schema: &'a Schema, name: &str, case_sensitive: bool) -> Option<&'a Table> {
    if case_sensitive {
        schema.tables.get(name)
    } else {
        schema
            .tables
            .values()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// Checks that a schema is internally consistent
///
/// Fails with [`MorphError::ComparisonInput`] on the first problem found.
pub fn check_schema(schema: &Schema, case_sensitive: bool) -> Result<()> {
    for (key, table) in &schema.tables {
        if *key != table.name {
            return Err(MorphError::input(
                EntityRef::table(key),
                format!("keyed as `{}` but named `{}`", key, table.name),
            ));
        }
        check_table(schema, table, case_sensitive)?;
    }

    for (key, view) in &schema.views {
        if *key != view.name {
            return Err(MorphError::input(
                EntityRef::view(key),
                format!("keyed as `{}` but named `{}`", key, view.name),
            ));
        }
    }

    for (key, routine) in &schema.procedures {
        if *key != routine.name {
            return Err(MorphError::input(
                EntityRef::routine(routine.kind, key),
                format!("keyed as `{}` but named `{}`", key, routine.name),
            ));
        }
    }

    for (key, trigger) in &schema.triggers {
        let entity = EntityRef::trigger(&trigger.table, key);
        if *key != trigger.name {
            return Err(MorphError::input(
                entity,
                format!("keyed as `{}` but named `{}`", key, trigger.name),
            ));
        }
        if find_table(schema, &trigger.table, case_sensitive).is_none() {
            return Err(MorphError::input(
                entity,
                format!("attached to non-existent table `{}`", trigger.table),
            ));
        }
    }

    Ok(())
}

fn check_table(schema: &Schema, table: &Table, case_sensitive: bool) -> Result<()> {
    let mut seen = HashSet::new();
    for column in &table.columns {
        let entity = EntityRef::column(&table.name, &column.name);
        if column.data_type.trim().is_empty() {
            return Err(MorphError::input(entity, "has an empty data type"));
        }
        // MySQL column names never differ by case alone
        if !seen.insert(column.name.to_lowercase()) {
            return Err(MorphError::input(entity, "is declared more than once"));
        }
    }

    for column in &table.primary_key {
        if !has_column(table, column, case_sensitive) {
            return Err(MorphError::input(
                EntityRef::primary_key(&table.name),
                format!("names unknown column `{}`", column),
            ));
        }
    }

    let mut index_names = HashSet::new();
    for index in &table.indexes {
        let entity = EntityRef::index(&table.name, &index.name);
        if !index_names.insert(fold(&index.name, case_sensitive)) {
            return Err(MorphError::input(entity, "is declared more than once"));
        }
        if index.columns.is_empty() {
            return Err(MorphError::input(entity, "has no columns"));
        }
        // Functional parts reference columns inside an expression, which MySQL checks
        if let Some(column) = index
            .column_names()
            .find(|c| !has_column(table, c, case_sensitive))
        {
            return Err(MorphError::input(
                entity,
                format!("names unknown column `{}`", column),
            ));
        }
    }

    let mut fk_names = HashSet::new();
    for fk in &table.foreign_keys {
        let entity = EntityRef::foreign_key(&table.name, &fk.name);
        if !fk_names.insert(fold(&fk.name, case_sensitive)) {
            return Err(MorphError::input(entity, "is declared more than once"));
        }
        if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
            return Err(MorphError::input(
                entity,
                format!(
                    "has {} local column(s) but {} referenced column(s)",
                    fk.columns.len(),
                    fk.referenced_columns.len()
                ),
            ));
        }
        if let Some(column) = fk
            .columns
            .iter()
            .find(|c| !has_column(table, c, case_sensitive))
        {
            return Err(MorphError::input(
                entity,
                format!("names unknown column `{}`", column),
            ));
        }
        let Some(referenced) = find_table(schema, &fk.referenced_table, case_sensitive) else {
            return Err(MorphError::input(
                entity,
                format!("references non-existent table `{}`", fk.referenced_table),
            ));
        };
        if let Some(column) = fk
            .referenced_columns
            .iter()
            .find(|c| !has_column(referenced, c, case_sensitive))
        {
            return Err(MorphError::input(
                entity,
                format!(
                    "references unknown column `{}`.`{}`",
                    fk.referenced_table, column
                ),
            ));
        }
    }

    Ok(())
}
