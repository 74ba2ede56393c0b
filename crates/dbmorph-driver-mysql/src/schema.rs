//! MySQL schema extraction
//!
//! Builds a [`Schema`] snapshot from `SHOW` statements and `information_schema`
//! queries against the connected database.

use mysql_async::{Row, Value};

use dbmorph_core::{
    Column, ForeignKey, ForeignKeyAction, Index, IndexPart, MorphError, Result, RoutineKind,
    Schema, StoredRoutine, Table, Trigger, TriggerEvent, TriggerTiming, View,
};

use crate::MySqlConnection;


/// Which entity kinds to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub include_tables: bool,
    pub include_views: bool,
    pub include_procedures: bool,
    pub include_triggers: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_tables: true,
            include_views: true,
            include_procedures: true,
            include_triggers: true,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
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
}

/// Character set named by a collation, e.g. `utf8mb4` for `utf8mb4_0900_ai_ci`
pub fn charset_from_collation(collation: &str) -> Option<&str> {
    collation
        .split_once('_')
        .map(|(charset, _)| charset)
        .filter(|charset| !charset.is_empty())
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `SHOW INDEX` may report a functional key part with its outer parentheses
fn strip_parens(expression: &str) -> &str {
    let trimmed = expression.trim();
    trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .filter(|inner| balanced(inner))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn balanced(text: &str) -> bool {
    let mut depth = 0i32;
    for c in text.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Reads a column by name as text; NULL reads as `None`
fn field(row: &Row, name: &str) -> Option<String> {
    let index = row
        .columns_ref()
        .iter()
        .position(|column| column.name_str().eq_ignore_ascii_case(name))?;
    match row.as_ref(index)? {
        Value::NULL => None,
        Value::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::Int(v) => Some(v.to_string()),
        Value::UInt(v) => Some(v.to_string()),
        other => Some(other.as_sql(true)),
    }
}

fn required(row: &Row, name: &str) -> Result<String> {
    field(row, name).ok_or_else(|| MorphError::Query(format!("missing value for column {}", name)))
}

fn parse_field<T>(row: &Row, name: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    required(row, name)?.parse::<T>().map_err(MorphError::Query)
}

impl MySqlConnection {
    /// Extracts the complete schema of the connected database
    #[tracing::instrument(skip_all, fields(database = %self.database()))]
    pub async fn extract_schema(&self, options: &ExtractOptions) -> Result<Schema> {
        let mut schema = Schema::new(self.database());

        if options.include_tables {
            for table in self.extract_tables().await? {
                schema.tables.insert(table.name.clone(), table);
            }
        }
        if options.include_views {
            for view in self.extract_views().await? {
                schema.views.insert(view.name.clone(), view);
            }
        }
        if options.include_procedures {
            for routine in self.extract_routines().await? {
                schema.procedures.insert(routine.name.clone(), routine);
            }
        }
        if options.include_triggers {
            for trigger in self.extract_triggers().await? {
                schema.triggers.insert(trigger.name.clone(), trigger);
            }
        }

        tracing::info!(
            tables = schema.tables.len(),
            views = schema.views.len(),
            routines = schema.procedures.len(),
            triggers = schema.triggers.len(),
            "schema extracted"
        );
        Ok(schema)
    }

    async fn extract_tables(&self) -> Result<Vec<Table>> {
        let rows = self.query_rows("SHOW TABLE STATUS").await?;
        let mut tables = Vec::new();

        for row in &rows {
            // Views show up with a NULL engine
            let Some(engine) = field(row, "Engine") else {
                continue;
            };
            let name = required(row, "Name")?;

            let mut table = Table::new(&name).with_engine(engine);
            if let Some(collation) = field(row, "Collation") {
                if let Some(charset) = charset_from_collation(&collation) {
                    table = table.with_charset(charset);
                }
                table = table.with_collation(collation);
            }
            table.comment = field(row, "Comment").unwrap_or_default();
            table.columns = self.extract_columns(&name).await?;
            table.primary_key = self.extract_primary_key(&name).await?;
            table.indexes = self.extract_indexes(&name).await?;
            table.foreign_keys = self.extract_foreign_keys(&name).await?;

            tracing::debug!(
                table = %name,
                columns = table.columns.len(),
                indexes = table.indexes.len(),
                foreign_keys = table.foreign_keys.len(),
                "table extracted"
            );
            tables.push(table);
        }

        Ok(tables)
    }

    async fn extract_columns(&self, table: &str) -> Result<Vec<Column>> {
        let query = format!("SHOW FULL COLUMNS FROM {}", quote_identifier(table));
        let rows = self.query_rows(&query).await?;

        rows.iter()
            .map(|row| {
                let mut column = Column::new(required(row, "Field")?, required(row, "Type")?)
                    .nullable(field(row, "Null").as_deref() == Some("YES"));
                column.default = field(row, "Default");
                column.extra = field(row, "Extra").unwrap_or_default();
                column.comment = field(row, "Comment").unwrap_or_default();
                if let Some(collation) = field(row, "Collation") {
                    column.character_set = charset_from_collation(&collation).map(str::to_string);
                    column.collation = Some(collation);
                }
                Ok(column)
            })
            .collect()
    }

    async fn extract_primary_key(&self, table: &str) -> Result<Vec<String>> {
        let query = format!(
            "SELECT COLUMN_NAME
             FROM information_schema.KEY_COLUMN_USAGE
             WHERE TABLE_SCHEMA = '{}' AND TABLE_NAME = '{}' AND CONSTRAINT_NAME = 'PRIMARY'
             ORDER BY ORDINAL_POSITION",
            escape_literal(self.database()),
            escape_literal(table)
        );
        let rows = self.query_rows(&query).await?;
        rows.iter().map(|row| required(row, "COLUMN_NAME")).collect()
    }

    async fn extract_indexes(&self, table: &str) -> Result<Vec<Index>> {
        let query = format!("SHOW INDEX FROM {}", quote_identifier(table));
        let rows = self.query_rows(&query).await?;
        let mut indexes: Vec<Index> = Vec::new();

        for row in &rows {
            let name = required(row, "Key_name")?;
            if name == "PRIMARY" {
                continue;
            }

            // Functional key parts have no column name
            let part = match field(row, "Column_name") {
                Some(column) => IndexPart::Column(column),
                None => IndexPart::expression(strip_parens(&required(row, "Expression")?)),
            };

            match indexes.iter_mut().find(|index| index.name == name) {
                Some(index) => index.columns.push(part),
                None => {
                    let mut index = Index::new(name, [part]);
                    index.is_unique = field(row, "Non_unique").as_deref() == Some("0");
                    if let Some(index_type) = field(row, "Index_type") {
                        index = index.with_type(index_type);
                    }
                    indexes.push(index);
                }
            }
        }

        Ok(indexes)
    }

    async fn extract_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let query = format!(
            "SELECT kcu.CONSTRAINT_NAME, kcu.COLUMN_NAME, kcu.REFERENCED_TABLE_NAME,
                    kcu.REFERENCED_COLUMN_NAME, rc.UPDATE_RULE, rc.DELETE_RULE
             FROM information_schema.KEY_COLUMN_USAGE kcu
             JOIN information_schema.REFERENTIAL_CONSTRAINTS rc
               ON kcu.CONSTRAINT_NAME = rc.CONSTRAINT_NAME
              AND kcu.TABLE_SCHEMA = rc.CONSTRAINT_SCHEMA
              AND kcu.TABLE_NAME = rc.TABLE_NAME
             WHERE kcu.TABLE_SCHEMA = '{}' AND kcu.TABLE_NAME = '{}'
               AND kcu.REFERENCED_TABLE_NAME IS NOT NULL
             ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION",
            escape_literal(self.database()),
            escape_literal(table)
        );
        let rows = self.query_rows(&query).await?;
        let mut foreign_keys: Vec<ForeignKey> = Vec::new();

        for row in &rows {
            let name = required(row, "CONSTRAINT_NAME")?;
            let column = required(row, "COLUMN_NAME")?;
            let referenced_column = required(row, "REFERENCED_COLUMN_NAME")?;

            if let Some(fk) = foreign_keys.iter_mut().find(|fk| fk.name == name) {
                fk.columns.push(column);
                fk.referenced_columns.push(referenced_column);
                continue;
            }

            let on_update: ForeignKeyAction = parse_field(row, "UPDATE_RULE")?;
            let on_delete: ForeignKeyAction = parse_field(row, "DELETE_RULE")?;
            foreign_keys.push(
                ForeignKey::new(
                    name,
                    [column],
                    required(row, "REFERENCED_TABLE_NAME")?,
                    [referenced_column],
                )
                .on_update(on_update)
                .on_delete(on_delete),
            );
        }

        Ok(foreign_keys)
    }

    async fn extract_views(&self) -> Result<Vec<View>> {
        let query = format!(
            "SELECT TABLE_NAME, VIEW_DEFINITION, CHECK_OPTION, SECURITY_TYPE
             FROM information_schema.VIEWS
             WHERE TABLE_SCHEMA = '{}'
             ORDER BY TABLE_NAME",
            escape_literal(self.database())
        );
        let rows = self.query_rows(&query).await?;

        rows.iter()
            .map(|row| {
                let mut view = View::new(
                    required(row, "TABLE_NAME")?,
                    field(row, "VIEW_DEFINITION").unwrap_or_default(),
                )
                .with_check_option(field(row, "CHECK_OPTION").unwrap_or_else(|| "NONE".into()));
                if let Some(security_type) = field(row, "SECURITY_TYPE") {
                    view = view.with_security_type(security_type);
                }
                Ok(view)
            })
            .collect()
    }

    async fn extract_routines(&self) -> Result<Vec<StoredRoutine>> {
        let query = format!(
            "SELECT ROUTINE_NAME, ROUTINE_TYPE, DTD_IDENTIFIER
             FROM information_schema.ROUTINES
             WHERE ROUTINE_SCHEMA = '{}'
             ORDER BY ROUTINE_NAME",
            escape_literal(self.database())
        );
        let rows = self.query_rows(&query).await?;
        let mut routines = Vec::new();

        for row in &rows {
            let name = required(row, "ROUTINE_NAME")?;
            let kind: RoutineKind = parse_field(row, "ROUTINE_TYPE")?;

            let show = format!("SHOW CREATE {} {}", kind.as_sql(), quote_identifier(&name));
            let definition = match self.query_rows(&show).await {
                Ok(result) => result.first().and_then(|r| {
                    let column = match kind {
                        RoutineKind::Procedure => "Create Procedure",
                        RoutineKind::Function => "Create Function",
                    };
                    field(r, column)
                }),
                Err(e) => {
                    tracing::warn!(routine = %name, error = %e, "cannot read routine definition");
                    None
                }
            };
            // NULL when the account lacks privileges on the routine
            let Some(definition) = definition else {
                tracing::warn!(routine = %name, "routine definition unavailable, skipping");
                continue;
            };

            let routine = match kind {
                RoutineKind::Procedure => StoredRoutine::procedure(name, definition),
                RoutineKind::Function => StoredRoutine::function(
                    name,
                    definition,
                    field(row, "DTD_IDENTIFIER").unwrap_or_default(),
                ),
            };
            routines.push(routine);
        }

        Ok(routines)
    }

    async fn extract_triggers(&self) -> Result<Vec<Trigger>> {
        let query = format!(
            "SELECT TRIGGER_NAME, EVENT_OBJECT_TABLE, ACTION_TIMING, EVENT_MANIPULATION,
                    ACTION_STATEMENT
             FROM information_schema.TRIGGERS
             WHERE TRIGGER_SCHEMA = '{}'
             ORDER BY TRIGGER_NAME",
            escape_literal(self.database())
        );
        let rows = self.query_rows(&query).await?;

        rows.iter()
            .map(|row| {
                let timing: TriggerTiming = parse_field(row, "ACTION_TIMING")?;
                let event: TriggerEvent = parse_field(row, "EVENT_MANIPULATION")?;
                Ok(Trigger::new(
                    required(row, "TRIGGER_NAME")?,
                    required(row, "EVENT_OBJECT_TABLE")?,
                    timing,
                    event,
                    required(row, "ACTION_STATEMENT")?,
                ))
            })
            .collect()
    }
}
