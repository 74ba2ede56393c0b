//! Schema model types
//!
//! Value types describing a MySQL schema snapshot. A [`Schema`] is fully
//! built before it is compared and is never mutated afterwards; the `with_*`
//! methods consume and return the value so snapshots can be assembled in a
//! single expression.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

fn default_engine() -> String {
    "InnoDB".to_string()
}

fn default_index_type() -> String {
    "BTREE".to_string()
}

fn default_check_option() -> String {
    "NONE".to_string()
}

fn default_security_type() -> String {
    "DEFINER".to_string()
}

/// A table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Raw type text including length/precision, e.g. `VARCHAR(255)`
    pub data_type: String,
    pub is_nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    /// Extra attributes reported by the server, e.g. `auto_increment`
    #[serde(default)]
    pub extra: String,
    #[serde(default)]
    pub character_set: Option<String>,
    #[serde(default)]
    pub collation: Option<String>,
    #[serde(default)]
    pub comment: String,
}

impl Column {
    /// Creates a nullable column without default
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
            extra: String::new(),
            character_set: None,
            collation: None,
            comment: String::new(),
        }
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    pub fn nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = extra.into();
        self
    }

    /// Marks the column as `auto_increment`
    pub fn auto_increment(self) -> Self {
        self.with_extra("auto_increment")
    }

    pub fn with_character_set(mut self, charset: impl Into<String>) -> Self {
        self.character_set = Some(charset.into());
        self
    }

    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Returns true if the server assigns values to this column itself
    pub fn is_auto_increment(&self) -> bool {
        self.extra.to_ascii_lowercase().contains("auto_increment")
    }

    /// Returns `extra` without the `DEFAULT_GENERATED` marker MySQL 8 adds to
    /// expression defaults
    pub fn effective_extra(&self) -> String {
        self.extra
            .split_whitespace()
            .filter(|token| !token.eq_ignore_ascii_case("DEFAULT_GENERATED"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One key part of an index
///
/// Plain column parts serialize as a bare string, functional parts as
/// `{"expression": "..."}` holding the expression without its parentheses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexPart {
    Column(String),
    Expression { expression: String },
}

impl IndexPart {
    pub fn column(name: impl Into<String>) -> Self {
        IndexPart::Column(name.into())
    }

    pub fn expression(expression: impl Into<String>) -> Self {
        IndexPart::Expression {
            expression: expression.into(),
        }
    }

    /// The column name, or `None` for a functional part
    pub fn column_name(&self) -> Option<&str> {
        match self {
            IndexPart::Column(name) => Some(name),
            IndexPart::Expression { .. } => None,
        }
    }
}

impl From<&str> for IndexPart {
    fn from(name: &str) -> Self {
        IndexPart::Column(name.to_string())
    }
}

impl From<String> for IndexPart {
    fn from(name: String) -> Self {
        IndexPart::Column(name)
    }
}

impl fmt::Display for IndexPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexPart::Column(name) => write!(f, "{}", name),
            IndexPart::Expression { expression } => write!(f, "({})", expression),
        }
    }
}

/// A secondary index (the primary key is modelled on [`Table`])
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<IndexPart>,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default = "default_index_type")]
    pub index_type: String,
}

impl Index {
    pub fn new<S: Into<IndexPart>>(name: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            is_unique: false,
            index_type: default_index_type(),
        }
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn with_type(mut self, index_type: impl Into<String>) -> Self {
        self.index_type = index_type.into();
        self
    }

    /// Names of the plain columns this index covers
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(IndexPart::column_name)
    }
}

/// Referential action of a foreign key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    #[default]
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "NO ACTION")]
    NoAction,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
}

impl ForeignKeyAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyAction::Restrict => "RESTRICT",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
        }
    }
}

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for ForeignKeyAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RESTRICT" => Ok(ForeignKeyAction::Restrict),
            "CASCADE" => Ok(ForeignKeyAction::Cascade),
            "SET NULL" => Ok(ForeignKeyAction::SetNull),
            "NO ACTION" => Ok(ForeignKeyAction::NoAction),
            "SET DEFAULT" => Ok(ForeignKeyAction::SetDefault),
            other => Err(format!("unknown foreign key action '{}'", other)),
        }
    }
}

/// A foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: ForeignKeyAction,
    #[serde(default)]
    pub on_update: ForeignKeyAction,
}

impl ForeignKey {
    pub fn new<S: Into<String>, R: Into<String>>(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = S>,
        referenced_table: impl Into<String>,
        referenced_columns: impl IntoIterator<Item = R>,
    ) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            referenced_table: referenced_table.into(),
            referenced_columns: referenced_columns.into_iter().map(Into::into).collect(),
            on_delete: ForeignKeyAction::default(),
            on_update: ForeignKeyAction::default(),
        }
    }

    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        self.on_delete = action;
        self
    }

    pub fn on_update(mut self, action: ForeignKeyAction) -> Self {
        self.on_update = action;
        self
    }
}

/// Table-level options that can change without rebuilding the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    pub engine: String,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub comment: String,
}

/// A base table with its columns, keys and indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub collation: Option<String>,
    #[serde(default)]
    pub comment: String,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            engine: default_engine(),
            charset: None,
            collation: None,
            comment: String::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn with_collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.name == name)
    }

    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }

    pub fn options(&self) -> TableOptions {
        TableOptions {
            engine: self.engine.clone(),
            charset: self.charset.clone(),
            collation: self.collation.clone(),
            comment: self.comment.clone(),
        }
    }

    /// Replaces the table options with the given ones
    pub fn with_options(mut self, options: TableOptions) -> Self {
        self.engine = options.engine;
        self.charset = options.charset;
        self.collation = options.collation;
        self.comment = options.comment;
        self
    }
}

/// A view definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    pub name: String,
    /// The SELECT text of the view
    pub definition: String,
    #[serde(default = "default_check_option")]
    pub check_option: String,
    #[serde(default = "default_security_type")]
    pub security_type: String,
}

impl View {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            check_option: default_check_option(),
            security_type: default_security_type(),
        }
    }

    pub fn with_check_option(mut self, check_option: impl Into<String>) -> Self {
        self.check_option = check_option.into();
        self
    }

    pub fn with_security_type(mut self, security_type: impl Into<String>) -> Self {
        self.security_type = security_type.into();
        self
    }
}

/// Whether a stored routine is a procedure or a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoutineKind {
    #[serde(rename = "PROCEDURE")]
    Procedure,
    #[serde(rename = "FUNCTION")]
    Function,
}

impl RoutineKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
        }
    }
}

impl fmt::Display for RoutineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for RoutineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PROCEDURE" => Ok(RoutineKind::Procedure),
            "FUNCTION" => Ok(RoutineKind::Function),
            other => Err(format!("unknown routine type '{}'", other)),
        }
    }
}

/// A stored procedure or function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRoutine {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: RoutineKind,
    /// Either the routine body or the complete `CREATE ...` statement
    pub definition: String,
    #[serde(default)]
    pub parameters: String,
    #[serde(default)]
    pub returns: Option<String>,
}

impl StoredRoutine {
    pub fn procedure(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: RoutineKind::Procedure,
            definition: definition.into(),
            parameters: String::new(),
            returns: None,
        }
    }

    pub fn function(
        name: impl Into<String>,
        definition: impl Into<String>,
        returns: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RoutineKind::Function,
            definition: definition.into(),
            parameters: String::new(),
            returns: Some(returns.into()),
        }
    }

    pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = parameters.into();
        self
    }
}

/// Trigger timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerTiming {
    #[serde(rename = "BEFORE")]
    Before,
    #[serde(rename = "AFTER")]
    After,
}

impl TriggerTiming {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerTiming::Before => "BEFORE",
            TriggerTiming::After => "AFTER",
        }
    }
}

impl FromStr for TriggerTiming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BEFORE" => Ok(TriggerTiming::Before),
            "AFTER" => Ok(TriggerTiming::After),
            other => Err(format!("unknown trigger timing '{}'", other)),
        }
    }
}

/// Trigger event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEvent {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

impl TriggerEvent {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TriggerEvent::Insert => "INSERT",
            TriggerEvent::Update => "UPDATE",
            TriggerEvent::Delete => "DELETE",
        }
    }
}

impl FromStr for TriggerEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Ok(TriggerEvent::Insert),
            "UPDATE" => Ok(TriggerEvent::Update),
            "DELETE" => Ok(TriggerEvent::Delete),
            other => Err(format!("unknown trigger event '{}'", other)),
        }
    }
}

/// A row trigger attached to a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub name: String,
    pub table: String,
    pub timing: TriggerTiming,
    pub event: TriggerEvent,
    /// The trigger body (the statement executed per row)
    pub definition: String,
}

impl Trigger {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        timing: TriggerTiming,
        event: TriggerEvent,
        definition: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            timing,
            event,
            definition: definition.into(),
        }
    }
}

/// A complete schema snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub tables: BTreeMap<String, Table>,
    #[serde(default)]
    pub views: BTreeMap<String, View>,
    #[serde(default)]
    pub procedures: BTreeMap<String, StoredRoutine>,
    #[serde(default)]
    pub triggers: BTreeMap<String, Trigger>,
}

impl Schema {
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            ..Default::default()
        }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.views.insert(view.name.clone(), view);
        self
    }

    pub fn with_routine(mut self, routine: StoredRoutine) -> Self {
        self.procedures.insert(routine.name.clone(), routine);
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.insert(trigger.name.clone(), trigger);
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    pub fn routine(&self, name: &str) -> Option<&StoredRoutine> {
        self.procedures.get(name)
    }

    pub fn trigger(&self, name: &str) -> Option<&Trigger> {
        self.triggers.get(name)
    }

    /// Returns true if the schema holds no entities at all
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.views.is_empty()
            && self.procedures.is_empty()
            && self.triggers.is_empty()
    }

    /// Total number of top-level entities
    pub fn entity_count(&self) -> usize {
        self.tables.len() + self.views.len() + self.procedures.len() + self.triggers.len()
    }
}
