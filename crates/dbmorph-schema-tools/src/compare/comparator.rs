//! Schema comparator implementation
//!
//! Compares a source schema (the desired state) with a destination schema
//! (the current state) and produces the edits that turn the destination into
//! the source.

use std::collections::{BTreeSet, HashMap};

use dbmorph_core::{
    Column, EntityRef, ForeignKey, Index, IndexPart, Result, Schema, StoredRoutine, Table,
    TableOptions, Trigger, View,
};

use super::edit::{Edit, EntityState, count_by_kind};
use crate::validate::{TableOccupancy, check_schema, missing_primary_key_warning, warnings_for};

/// Options for schema comparison
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Whether to compare tables (and everything inside them)
    pub include_tables: bool,
    /// Whether to compare views
    pub include_views: bool,
    /// Whether to compare stored procedures and functions
    pub include_procedures: bool,
    /// Whether to compare triggers
    pub include_triggers: bool,
    /// Whether to remove entities that exist only in the destination
    pub destructive: bool,
    /// Whether identifiers differing only in case are different entities
    pub case_sensitive: bool,
    /// Destination tables known to hold no rows
    pub empty_tables: BTreeSet<String>,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            include_tables: true,
            include_views: true,
            include_procedures: true,
            include_triggers: true,
            destructive: false,
            case_sensitive: true,
            empty_tables: BTreeSet::new(),
        }
    }
}

impl CompareOptions {
    /// Creates options comparing every entity kind, non-destructively
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes entities that exist only in the destination
    pub fn destructive(mut self) -> Self {
        self.destructive = true;
        self
    }

    pub fn without_tables(mut self) -> Self {
        self.include_tables = false;
        self
    }

    pub fn without_views(mut self) -> Self {
        self.include_views = false;
        self
    }

    pub fn without_procedures(mut self) -> Self {
        self.include_procedures = false;
        self
    }

    pub fn without_triggers(mut self) -> Self {
        self.include_triggers = false;
        self
    }

    /// Makes comparison case insensitive
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Records that a destination table holds no rows
    pub fn with_empty_table(mut self, table: impl Into<String>) -> Self {
        self.empty_tables.insert(table.into());
        self
    }
}

/// Schema comparator producing typed edits
#[derive(Debug)]
pub struct SchemaComparator {
    options: CompareOptions,
}

impl Default for SchemaComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaComparator {
    /// Creates a new schema comparator with default options
    pub fn new() -> Self {
        Self {
            options: CompareOptions::default(),
        }
    }

    /// Creates a new schema comparator with the given options
    pub fn with_options(options: CompareOptions) -> Self {
        Self { options }
    }

    /// Returns the current options
    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// Normalizes a name for comparison based on case sensitivity setting
    fn normalize_name(&self, name: &str) -> String {
        if self.options.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    fn names_equal(&self, a: &str, b: &str) -> bool {
        self.normalize_name(a) == self.normalize_name(b)
    }

    fn name_lists_equal(&self, a: &[String], b: &[String]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.names_equal(x, y))
    }

    fn occupancy(&self, table: &str) -> TableOccupancy {
        let normalized = self.normalize_name(table);
        if self
            .options
            .empty_tables
            .iter()
            .any(|t| self.normalize_name(t) == normalized)
        {
            TableOccupancy::KnownEmpty
        } else {
            TableOccupancy::AssumedNonEmpty
        }
    }

    /// Annotates an edit with the validator's warnings
    fn annotate(&self, edit: Edit) -> Edit {
        let occupancy = self.occupancy(edit.entity().owner_table());
        let warnings = warnings_for(&edit, occupancy);
        edit.with_warnings(warnings)
    }

    /// Compares `source` (desired) against `destination` (current)
    ///
    /// Both schemas are checked for internal consistency first. The returned
    /// edits are unordered; the planner assigns execution order.
    #[tracing::instrument(
        skip_all,
        fields(source = %source.database_name, destination = %destination.database_name)
    )]
    pub fn compare(&self, source: &Schema, destination: &Schema) -> Result<Vec<Edit>> {
        check_schema(source, self.options.case_sensitive)?;
        check_schema(destination, self.options.case_sensitive)?;

        let mut edits = Vec::new();

        if self.options.include_tables {
            self.compare_tables(source, destination, &mut edits);
        }
        if self.options.include_views {
            self.compare_views(source, destination, &mut edits);
        }
        if self.options.include_procedures {
            self.compare_routines(source, destination, &mut edits);
        }
        if self.options.include_triggers {
            self.compare_triggers(source, destination, &mut edits);
        }

        let (added, removed, modified) = count_by_kind(&edits);
        tracing::info!(
            added,
            removed,
            modified,
            destructive = self.options.destructive,
            "schema comparison complete"
        );
        Ok(edits)
    }

    fn compare_tables(&self, source: &Schema, destination: &Schema, edits: &mut Vec<Edit>) {
        let source_map: HashMap<String, &Table> = source
            .tables
            .values()
            .map(|t| (self.normalize_name(&t.name), t))
            .collect();
        let target_map: HashMap<String, &Table> = destination
            .tables
            .values()
            .map(|t| (self.normalize_name(&t.name), t))
            .collect();

        for table in source.tables.values() {
            let normalized = self.normalize_name(&table.name);
            match target_map.get(&normalized) {
                None => self.add_table(table, edits),
                Some(target) => self.compare_table(table, target, edits),
            }
        }

        if self.options.destructive {
            for table in destination.tables.values() {
                if !source_map.contains_key(&self.normalize_name(&table.name)) {
                    self.remove_table(table, edits);
                }
            }
        }
    }

    /// A created table is one edit; its foreign keys are separate edits so
    /// they can be created once every referenced table exists
    fn add_table(&self, table: &Table, edits: &mut Vec<Edit>) {
        let mut body = table.clone();
        body.foreign_keys.clear();

        let mut edit = Edit::add(EntityRef::table(&table.name), EntityState::Table(body));
        if !table.has_primary_key() {
            edit.push_warning(missing_primary_key_warning(&table.name));
        }
        edits.push(edit);

        for fk in &table.foreign_keys {
            edits.push(Edit::add(
                EntityRef::foreign_key(&table.name, &fk.name),
                EntityState::ForeignKey(fk.clone()),
            ));
        }
    }

    /// A dropped table is one edit; its foreign keys are dropped first so no
    /// other dropped table is still referenced when its turn comes
    fn remove_table(&self, table: &Table, edits: &mut Vec<Edit>) {
        for fk in &table.foreign_keys {
            edits.push(Edit::remove(
                EntityRef::foreign_key(&table.name, &fk.name),
                EntityState::ForeignKey(fk.clone()),
            ));
        }

        let mut body = table.clone();
        body.foreign_keys.clear();
        edits.push(self.annotate(Edit::remove_extra(
            EntityRef::table(&table.name),
            EntityState::Table(body),
        )));
    }

    /// Edits on an existing table name it with the destination's spelling
    fn compare_table(&self, source: &Table, target: &Table, edits: &mut Vec<Edit>) {
        let first = edits.len();

        self.compare_columns(source, target, edits);
        self.compare_primary_keys(source, target, edits);
        self.compare_indexes(source, target, edits);
        self.compare_foreign_keys(source, target, edits);
        self.compare_table_options(source, target, edits);

        // The table keeps the destination's key when extras are preserved
        let keeps_key =
            source.has_primary_key() || (target.has_primary_key() && !self.options.destructive);
        if edits.len() > first && !keeps_key {
            edits[first].push_warning(missing_primary_key_warning(&target.name));
        }
    }

    fn compare_columns(&self, source: &Table, target: &Table, edits: &mut Vec<Edit>) {
        let source_map: HashMap<String, &Column> = source
            .columns
            .iter()
            .map(|c| (self.normalize_name(&c.name), c))
            .collect();
        let target_map: HashMap<String, &Column> = target
            .columns
            .iter()
            .map(|c| (self.normalize_name(&c.name), c))
            .collect();

        for col in &source.columns {
            let normalized = self.normalize_name(&col.name);
            if !target_map.contains_key(&normalized) {
                edits.push(self.annotate(Edit::add(
                    EntityRef::column(&target.name, &col.name),
                    EntityState::Column(col.clone()),
                )));
            } else if let Some(target_col) = target_map.get(&normalized)
                && !self.columns_equal(col, target_col)
            {
                edits.push(self.annotate(Edit::modify(
                    EntityRef::column(&target.name, &target_col.name),
                    EntityState::Column((*target_col).clone()),
                    EntityState::Column(col.clone()),
                )));
            }
        }

        if self.options.destructive {
            for col in &target.columns {
                if !source_map.contains_key(&self.normalize_name(&col.name)) {
                    edits.push(self.annotate(Edit::remove_extra(
                        EntityRef::column(&target.name, &col.name),
                        EntityState::Column(col.clone()),
                    )));
                }
            }
        }
    }

    fn columns_equal(&self, a: &Column, b: &Column) -> bool {
        a.data_type.trim().eq_ignore_ascii_case(b.data_type.trim())
            && a.is_nullable == b.is_nullable
            && a.default == b.default
            && a.effective_extra().eq_ignore_ascii_case(&b.effective_extra())
            && a.character_set == b.character_set
            && a.collation == b.collation
            && a.comment == b.comment
    }

    fn compare_primary_keys(&self, source: &Table, target: &Table, edits: &mut Vec<Edit>) {
        if self.name_lists_equal(&source.primary_key, &target.primary_key) {
            return;
        }

        let entity = EntityRef::primary_key(&target.name);
        match (source.has_primary_key(), target.has_primary_key()) {
            (true, true) => {
                edits.push(Edit::remove(
                    entity.clone(),
                    EntityState::PrimaryKey(target.primary_key.clone()),
                ));
                edits.push(Edit::add(
                    entity,
                    EntityState::PrimaryKey(source.primary_key.clone()),
                ));
            }
            (true, false) => edits.push(Edit::add(
                entity,
                EntityState::PrimaryKey(source.primary_key.clone()),
            )),
            (false, true) if self.options.destructive => {
                edits.push(self.annotate(Edit::remove_extra(
                    entity,
                    EntityState::PrimaryKey(target.primary_key.clone()),
                )));
            }
            (false, _) => {}
        }
    }

    fn compare_indexes(&self, source: &Table, target: &Table, edits: &mut Vec<Edit>) {
        let source_map: HashMap<String, &Index> = source
            .indexes
            .iter()
            .map(|i| (self.normalize_name(&i.name), i))
            .collect();
        let target_map: HashMap<String, &Index> = target
            .indexes
            .iter()
            .map(|i| (self.normalize_name(&i.name), i))
            .collect();

        for idx in &source.indexes {
            let normalized = self.normalize_name(&idx.name);
            let entity = EntityRef::index(&target.name, &idx.name);
            if !target_map.contains_key(&normalized) {
                edits.push(Edit::add(entity, EntityState::Index(idx.clone())));
            } else if let Some(target_idx) = target_map.get(&normalized)
                && !self.indexes_equal(idx, target_idx)
            {
                edits.push(Edit::remove(
                    EntityRef::index(&target.name, &target_idx.name),
                    EntityState::Index((*target_idx).clone()),
                ));
                edits.push(Edit::add(entity, EntityState::Index(idx.clone())));
            }
        }

        if self.options.destructive {
            for idx in &target.indexes {
                if !source_map.contains_key(&self.normalize_name(&idx.name)) {
                    edits.push(self.annotate(Edit::remove_extra(
                        EntityRef::index(&target.name, &idx.name),
                        EntityState::Index(idx.clone()),
                    )));
                }
            }
        }
    }

    fn indexes_equal(&self, a: &Index, b: &Index) -> bool {
        a.columns.len() == b.columns.len()
            && a.columns.iter().zip(&b.columns).all(|pair| match pair {
                (IndexPart::Column(x), IndexPart::Column(y)) => self.names_equal(x, y),
                (
                    IndexPart::Expression { expression: x },
                    IndexPart::Expression { expression: y },
                ) => x.trim() == y.trim(),
                _ => false,
            })
            && a.is_unique == b.is_unique
            && a.index_type.eq_ignore_ascii_case(&b.index_type)
    }

    fn compare_foreign_keys(&self, source: &Table, target: &Table, edits: &mut Vec<Edit>) {
        let source_map: HashMap<String, &ForeignKey> = source
            .foreign_keys
            .iter()
            .map(|fk| (self.normalize_name(&fk.name), fk))
            .collect();
        let target_map: HashMap<String, &ForeignKey> = target
            .foreign_keys
            .iter()
            .map(|fk| (self.normalize_name(&fk.name), fk))
            .collect();

        for fk in &source.foreign_keys {
            let normalized = self.normalize_name(&fk.name);
            let entity = EntityRef::foreign_key(&target.name, &fk.name);
            if !target_map.contains_key(&normalized) {
                edits.push(Edit::add(entity, EntityState::ForeignKey(fk.clone())));
            } else if let Some(target_fk) = target_map.get(&normalized)
                && !self.foreign_keys_equal(fk, target_fk)
            {
                edits.push(Edit::remove(
                    EntityRef::foreign_key(&target.name, &target_fk.name),
                    EntityState::ForeignKey((*target_fk).clone()),
                ));
                edits.push(Edit::add(entity, EntityState::ForeignKey(fk.clone())));
            }
        }

        if self.options.destructive {
            for fk in &target.foreign_keys {
                if !source_map.contains_key(&self.normalize_name(&fk.name)) {
                    edits.push(self.annotate(Edit::remove_extra(
                        EntityRef::foreign_key(&target.name, &fk.name),
                        EntityState::ForeignKey(fk.clone()),
                    )));
                }
            }
        }
    }

    fn foreign_keys_equal(&self, a: &ForeignKey, b: &ForeignKey) -> bool {
        self.name_lists_equal(&a.columns, &b.columns)
            && self.names_equal(&a.referenced_table, &b.referenced_table)
            && self.name_lists_equal(&a.referenced_columns, &b.referenced_columns)
            && a.on_delete == b.on_delete
            && a.on_update == b.on_update
    }

    /// Charset and collation left unspecified in the source are not compared
    fn compare_table_options(&self, source: &Table, target: &Table, edits: &mut Vec<Edit>) {
        let engine_differs = !source.engine.eq_ignore_ascii_case(&target.engine);
        let charset_differs = source.charset.is_some() && source.charset != target.charset;
        let collation_differs = source.collation.is_some() && source.collation != target.collation;
        let comment_differs = source.comment != target.comment;

        if engine_differs || charset_differs || collation_differs || comment_differs {
            let after = TableOptions {
                engine: source.engine.clone(),
                charset: source.charset.clone().or_else(|| target.charset.clone()),
                collation: source
                    .collation
                    .clone()
                    .or_else(|| target.collation.clone()),
                comment: source.comment.clone(),
            };
            edits.push(Edit::modify(
                EntityRef::table(&target.name),
                EntityState::TableOptions(target.options()),
                EntityState::TableOptions(after),
            ));
        }
    }

    fn compare_views(&self, source: &Schema, destination: &Schema, edits: &mut Vec<Edit>) {
        let source_map: HashMap<String, &View> = source
            .views
            .values()
            .map(|v| (self.normalize_name(&v.name), v))
            .collect();
        let target_map: HashMap<String, &View> = destination
            .views
            .values()
            .map(|v| (self.normalize_name(&v.name), v))
            .collect();

        for view in source.views.values() {
            let normalized = self.normalize_name(&view.name);
            if !target_map.contains_key(&normalized) {
                edits.push(Edit::add(
                    EntityRef::view(&view.name),
                    EntityState::View(view.clone()),
                ));
            } else if let Some(target_view) = target_map.get(&normalized)
                && !views_equal(view, target_view)
            {
                edits.push(Edit::remove(
                    EntityRef::view(&target_view.name),
                    EntityState::View((*target_view).clone()),
                ));
                edits.push(Edit::add(
                    EntityRef::view(&view.name),
                    EntityState::View(view.clone()),
                ));
            }
        }

        if self.options.destructive {
            for view in destination.views.values() {
                if !source_map.contains_key(&self.normalize_name(&view.name)) {
                    edits.push(self.annotate(Edit::remove_extra(
                        EntityRef::view(&view.name),
                        EntityState::View(view.clone()),
                    )));
                }
            }
        }
    }

    fn compare_routines(&self, source: &Schema, destination: &Schema, edits: &mut Vec<Edit>) {
        let source_map: HashMap<String, &StoredRoutine> = source
            .procedures
            .values()
            .map(|r| (self.normalize_name(&r.name), r))
            .collect();
        let target_map: HashMap<String, &StoredRoutine> = destination
            .procedures
            .values()
            .map(|r| (self.normalize_name(&r.name), r))
            .collect();

        for routine in source.procedures.values() {
            let normalized = self.normalize_name(&routine.name);
            let entity = EntityRef::routine(routine.kind, &routine.name);
            if !target_map.contains_key(&normalized) {
                edits.push(Edit::add(entity, EntityState::Routine(routine.clone())));
            } else if let Some(target_routine) = target_map.get(&normalized)
                && !routines_equal(routine, target_routine)
            {
                edits.push(Edit::remove(
                    EntityRef::routine(target_routine.kind, &target_routine.name),
                    EntityState::Routine((*target_routine).clone()),
                ));
                edits.push(Edit::add(entity, EntityState::Routine(routine.clone())));
            }
        }

        if self.options.destructive {
            for routine in destination.procedures.values() {
                if !source_map.contains_key(&self.normalize_name(&routine.name)) {
                    edits.push(self.annotate(Edit::remove_extra(
                        EntityRef::routine(routine.kind, &routine.name),
                        EntityState::Routine(routine.clone()),
                    )));
                }
            }
        }
    }

    fn compare_triggers(&self, source: &Schema, destination: &Schema, edits: &mut Vec<Edit>) {
        let source_map: HashMap<String, &Trigger> = source
            .triggers
            .values()
            .map(|t| (self.normalize_name(&t.name), t))
            .collect();
        let target_map: HashMap<String, &Trigger> = destination
            .triggers
            .values()
            .map(|t| (self.normalize_name(&t.name), t))
            .collect();

        for trigger in source.triggers.values() {
            let normalized = self.normalize_name(&trigger.name);
            let entity = EntityRef::trigger(&trigger.table, &trigger.name);
            if !target_map.contains_key(&normalized) {
                edits.push(Edit::add(entity, EntityState::Trigger(trigger.clone())));
            } else if let Some(target_trigger) = target_map.get(&normalized)
                && !self.triggers_equal(trigger, target_trigger)
            {
                edits.push(Edit::remove(
                    EntityRef::trigger(&target_trigger.table, &target_trigger.name),
                    EntityState::Trigger((*target_trigger).clone()),
                ));
                edits.push(Edit::add(entity, EntityState::Trigger(trigger.clone())));
            }
        }

        if self.options.destructive {
            for trigger in destination.triggers.values() {
                if !source_map.contains_key(&self.normalize_name(&trigger.name)) {
                    edits.push(self.annotate(Edit::remove_extra(
                        EntityRef::trigger(&trigger.table, &trigger.name),
                        EntityState::Trigger(trigger.clone()),
                    )));
                }
            }
        }
    }

    fn triggers_equal(&self, a: &Trigger, b: &Trigger) -> bool {
        self.names_equal(&a.table, &b.table)
            && a.timing == b.timing
            && a.event == b.event
            && a.definition.trim() == b.definition.trim()
    }
}

fn views_equal(a: &View, b: &View) -> bool {
    a.definition.trim() == b.definition.trim()
        && a.check_option.eq_ignore_ascii_case(&b.check_option)
        && a.security_type.eq_ignore_ascii_case(&b.security_type)
}

fn routines_equal(a: &StoredRoutine, b: &StoredRoutine) -> bool {
    a.kind == b.kind
        && a.definition.trim() == b.definition.trim()
        && a.parameters.trim() == b.parameters.trim()
        && match (&a.returns, &b.returns) {
            (Some(x), Some(y)) => x.trim().eq_ignore_ascii_case(y.trim()),
            (None, None) => true,
            _ => false,
        }
}

/// Compares `source` (desired) against `destination` (current)
pub fn compare(source: &Schema, destination: &Schema, options: &CompareOptions) -> Result<Vec<Edit>> {
    SchemaComparator::with_options(options.clone()).compare(source, destination)
}

