//! MySQL statement rendering
//!
//! Each step renders to exactly one statement, without a trailing `;`.

use std::sync::LazyLock;

use regex::Regex;

use dbmorph_core::{
    Column, ForeignKey, Index, IndexPart, StoredRoutine, Table, TableOptions, Trigger, View,
};

use super::planner::MigrationConfig;
use super::stage::StepAction;
use crate::compare::{Edit, EntityState};

/// Defaults that MySQL accepts without quoting
static LITERAL_DEFAULT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(NULL|TRUE|FALSE|[-+]?\d+(\.\d+)?([eE][-+]?\d+)?|CURRENT_TIMESTAMP(\(\d*\))?|NOW\(\d*\)|LOCALTIME(STAMP)?(\(\d*\))?|CURRENT_DATE(\(\))?|CURRENT_TIME(\(\d*\))?|b'[01]*'|x'[0-9a-f]*')$",
    )
    .expect("valid regex")
});

/// Quotes an identifier with backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes a string literal
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

fn quote_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats a column default for a DDL statement
///
/// Keywords, numbers and already quoted or parenthesised values are emitted
/// as-is. Expression defaults reported by MySQL 8 are wrapped in parentheses,
/// anything else is quoted as a string.
pub fn format_default(column: &Column) -> Option<String> {
    let value = column.default.as_deref()?;
    let trimmed = value.trim();

    let already_literal = LITERAL_DEFAULT_REGEX.is_match(trimmed)
        || trimmed.starts_with('(')
        || (trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\''));

    Some(if already_literal {
        trimmed.to_string()
    } else if column.extra.to_ascii_uppercase().contains("DEFAULT_GENERATED") {
        format!("({})", trimmed)
    } else {
        quote_string(value)
    })
}

/// Column extra attributes that are valid in a column definition
fn renderable_extra(column: &Column) -> String {
    let tokens: Vec<String> = column
        .effective_extra()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let mut kept = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let is_generated_marker = matches!(tokens[i].to_ascii_uppercase().as_str(), "VIRTUAL" | "STORED")
            && tokens
                .get(i + 1)
                .is_some_and(|next| next.eq_ignore_ascii_case("GENERATED"));
        if is_generated_marker {
            i += 2;
            continue;
        }
        kept.push(tokens[i].clone());
        i += 1;
    }
    kept.join(" ")
}

/// Renders a full column definition
pub fn column_definition(column: &Column) -> String {
    let mut def = format!("{} {}", quote_identifier(&column.name), column.data_type);

    if let Some(charset) = &column.character_set {
        def.push_str(&format!(" CHARACTER SET {}", charset));
    }
    if let Some(collation) = &column.collation {
        def.push_str(&format!(" COLLATE {}", collation));
    }

    def.push_str(if column.is_nullable { " NULL" } else { " NOT NULL" });

    if let Some(default) = format_default(column) {
        def.push_str(&format!(" DEFAULT {}", default));
    }

    let extra = renderable_extra(column);
    if !extra.is_empty() {
        def.push(' ');
        def.push_str(&extra);
    }

    if !column.comment.is_empty() {
        def.push_str(&format!(" COMMENT {}", quote_string(&column.comment)));
    }

    def
}

fn key_part(part: &IndexPart) -> String {
    match part {
        IndexPart::Column(name) => quote_identifier(name),
        IndexPart::Expression { expression } => format!("({})", expression.trim()),
    }
}

/// Renders an index clause usable inside CREATE TABLE and after ADD
pub fn index_clause(index: &Index) -> String {
    let index_type = index.index_type.to_ascii_uppercase();
    let (prefix, using) = match index_type.as_str() {
        "FULLTEXT" => ("FULLTEXT ", None),
        "SPATIAL" => ("SPATIAL ", None),
        _ if index.is_unique => ("UNIQUE ", Some(index_type.as_str())),
        _ => ("", Some(index_type.as_str())),
    };

    let mut clause = format!(
        "{}INDEX {} ({})",
        prefix,
        quote_identifier(&index.name),
        index
            .columns
            .iter()
            .map(key_part)
            .collect::<Vec<_>>()
            .join(", ")
    );
    if let Some(using) = using.filter(|u| !u.is_empty()) {
        clause.push_str(&format!(" USING {}", using));
    }
    clause
}

fn foreign_key_clause(fk: &ForeignKey) -> String {
    format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
        quote_identifier(&fk.name),
        quote_list(&fk.columns),
        quote_identifier(&fk.referenced_table),
        quote_list(&fk.referenced_columns),
        fk.on_delete.as_sql(),
        fk.on_update.as_sql()
    )
}

fn strip_terminator(text: &str) -> &str {
    text.trim().trim_end_matches(';').trim_end()
}

/// Renders statements for migration steps
#[derive(Debug)]
pub struct StatementRenderer<'a> {
    config: &'a MigrationConfig,
}

impl<'a> StatementRenderer<'a> {
    pub fn new(config: &'a MigrationConfig) -> Self {
        Self { config }
    }

    fn if_exists(&self) -> &'static str {
        if self.config.use_if_exists {
            "IF EXISTS "
        } else {
            ""
        }
    }

    /// Renders the statement performing `action` for `edit`
    ///
    /// Returns `None` when the edit has no state for the action, which the
    /// edit constructors rule out.
    pub fn render(&self, edit: &Edit, action: StepAction) -> Option<String> {
        let table = edit.entity().owner_table();
        match action {
            StepAction::Drop => edit.before().map(|state| self.render_drop(table, state)),
            StepAction::Create => edit.after().map(|state| self.render_create(table, state)),
            StepAction::Alter => edit
                .after()
                .map(|after| self.render_alter(table, edit.before(), after)),
        }
    }

    fn render_drop(&self, table: &str, state: &EntityState) -> String {
        let table = quote_identifier(table);
        match state {
            EntityState::Table(t) => {
                format!("DROP TABLE {}{}", self.if_exists(), quote_identifier(&t.name))
            }
            EntityState::TableOptions(_) => format!("ALTER TABLE {}", table),
            EntityState::Column(c) => {
                format!("ALTER TABLE {} DROP COLUMN {}", table, quote_identifier(&c.name))
            }
            EntityState::PrimaryKey(_) => format!("ALTER TABLE {} DROP PRIMARY KEY", table),
            EntityState::Index(i) => {
                format!("ALTER TABLE {} DROP INDEX {}", table, quote_identifier(&i.name))
            }
            EntityState::ForeignKey(fk) => format!(
                "ALTER TABLE {} DROP FOREIGN KEY {}",
                table,
                quote_identifier(&fk.name)
            ),
            EntityState::View(v) => {
                format!("DROP VIEW {}{}", self.if_exists(), quote_identifier(&v.name))
            }
            EntityState::Routine(r) => format!(
                "DROP {} {}{}",
                r.kind.as_sql(),
                self.if_exists(),
                quote_identifier(&r.name)
            ),
            EntityState::Trigger(t) => {
                format!("DROP TRIGGER {}{}", self.if_exists(), quote_identifier(&t.name))
            }
        }
    }

    fn render_create(&self, table: &str, state: &EntityState) -> String {
        let quoted = quote_identifier(table);
        match state {
            EntityState::Table(t) => self.create_table(t),
            EntityState::TableOptions(options) => self.alter_options(table, None, options),
            EntityState::Column(c) => {
                format!("ALTER TABLE {} ADD COLUMN {}", quoted, column_definition(c))
            }
            EntityState::PrimaryKey(columns) => {
                format!("ALTER TABLE {} ADD PRIMARY KEY ({})", quoted, quote_list(columns))
            }
            EntityState::Index(i) => format!("ALTER TABLE {} ADD {}", quoted, index_clause(i)),
            EntityState::ForeignKey(fk) => {
                format!("ALTER TABLE {} ADD {}", quoted, foreign_key_clause(fk))
            }
            EntityState::View(v) => self.create_view(v),
            EntityState::Routine(r) => self.create_routine(r),
            EntityState::Trigger(t) => self.create_trigger(t),
        }
    }

    fn render_alter(&self, table: &str, before: Option<&EntityState>, after: &EntityState) -> String {
        match (before, after) {
            (_, EntityState::Column(c)) => format!(
                "ALTER TABLE {} MODIFY COLUMN {}",
                quote_identifier(table),
                column_definition(c)
            ),
            (Some(EntityState::TableOptions(before)), EntityState::TableOptions(after)) => {
                self.alter_options(table, Some(before), after)
            }
            (_, other) => self.render_create(table, other),
        }
    }

    fn create_table(&self, table: &Table) -> String {
        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("  {}", column_definition(c)))
            .collect();

        if table.has_primary_key() {
            lines.push(format!("  PRIMARY KEY ({})", quote_list(&table.primary_key)));
        }
        for index in &table.indexes {
            lines.push(format!("  {}", index_clause(index)));
        }

        let mut sql = format!(
            "CREATE TABLE {} (\n{}\n) ENGINE={}",
            quote_identifier(&table.name),
            lines.join(",\n"),
            table.engine
        );
        if let Some(charset) = &table.charset {
            sql.push_str(&format!(" DEFAULT CHARSET={}", charset));
        }
        if let Some(collation) = &table.collation {
            sql.push_str(&format!(" COLLATE={}", collation));
        }
        if !table.comment.is_empty() {
            sql.push_str(&format!(" COMMENT={}", quote_string(&table.comment)));
        }
        sql
    }

    /// Only options that differ from `before` are emitted
    fn alter_options(&self, table: &str, before: Option<&TableOptions>, after: &TableOptions) -> String {
        let mut clauses = Vec::new();

        if before.is_none_or(|b| !b.engine.eq_ignore_ascii_case(&after.engine)) {
            clauses.push(format!("ENGINE={}", after.engine));
        }
        if let Some(charset) = &after.charset
            && before.is_none_or(|b| b.charset.as_ref() != Some(charset))
        {
            clauses.push(format!("DEFAULT CHARSET={}", charset));
        }
        if let Some(collation) = &after.collation
            && before.is_none_or(|b| b.collation.as_ref() != Some(collation))
        {
            clauses.push(format!("COLLATE={}", collation));
        }
        if before.is_none_or(|b| b.comment != after.comment) {
            clauses.push(format!("COMMENT={}", quote_string(&after.comment)));
        }
        if clauses.is_empty() {
            clauses.push(format!("ENGINE={}", after.engine));
        }

        format!("ALTER TABLE {} {}", quote_identifier(table), clauses.join(" "))
    }

    fn create_view(&self, view: &View) -> String {
        let mut sql = format!(
            "CREATE SQL SECURITY {} VIEW {} AS {}",
            view.security_type.to_ascii_uppercase(),
            quote_identifier(&view.name),
            strip_terminator(&view.definition)
        );
        let check = view.check_option.to_ascii_uppercase();
        if !check.is_empty() && check != "NONE" {
            sql.push_str(&format!(" WITH {} CHECK OPTION", check));
        }
        sql
    }

    /// Complete `CREATE` statements are used verbatim
    fn create_routine(&self, routine: &StoredRoutine) -> String {
        let definition = strip_terminator(&routine.definition);
        let is_complete = definition
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("CREATE"));
        if is_complete {
            return definition.to_string();
        }

        let mut sql = format!(
            "CREATE {} {}({})",
            routine.kind.as_sql(),
            quote_identifier(&routine.name),
            routine.parameters.trim()
        );
        if let Some(returns) = &routine.returns {
            sql.push_str(&format!(" RETURNS {}", returns.trim()));
        }
        sql.push(' ');
        sql.push_str(definition);
        sql
    }

    fn create_trigger(&self, trigger: &Trigger) -> String {
        format!(
            "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW {}",
            quote_identifier(&trigger.name),
            trigger.timing.as_sql(),
            trigger.event.as_sql(),
            quote_identifier(&trigger.table),
            strip_terminator(&trigger.definition)
        )
    }
}
