//! Tests for schema comparison functionality

use dbmorph_core::{
    Column, EntityKind, EntityRef, ErrorKind, ForeignKey, ForeignKeyAction, Index, IndexPart,
    Schema, StoredRoutine, Table, Trigger, TriggerEvent, TriggerTiming, View, WarningCategory,
};

use super::comparator::{CompareOptions, SchemaComparator, compare};
use super::edit::{Edit, EditKind, EntityState, count_by_kind};

fn users_table() -> Table {
    Table::new("users")
        .with_column(Column::new("id", "int").not_null().auto_increment())
        .with_column(Column::new("email", "varchar(255)").not_null())
        .with_column(Column::new("name", "varchar(100)"))
        .with_primary_key(["id"])
        .with_index(Index::new("idx_name", ["name"]))
        .with_charset("utf8mb4")
}

fn orders_table() -> Table {
    Table::new("orders")
        .with_column(Column::new("id", "int").not_null().auto_increment())
        .with_column(Column::new("user_id", "int").not_null())
        .with_column(Column::new("total", "decimal(10,2)").not_null().with_default("0.00"))
        .with_primary_key(["id"])
        .with_index(Index::new("idx_user", ["user_id"]))
        .with_foreign_key(ForeignKey::new("fk1", ["user_id"], "users", ["id"]))
}

fn base_schema() -> Schema {
    Schema::new("shop")
        .with_table(users_table())
        .with_table(orders_table())
        .with_view(View::new("v_users", "SELECT id, email FROM users"))
        .with_routine(StoredRoutine::procedure(
            "cleanup",
            "BEGIN DELETE FROM orders WHERE total = 0; END",
        ))
        .with_trigger(Trigger::new(
            "trg_users_email",
            "users",
            TriggerTiming::Before,
            TriggerEvent::Insert,
            "SET NEW.email = LOWER(NEW.email)",
        ))
}

fn replace_table(schema: Schema, table: Table) -> Schema {
    schema.with_table(table)
}

fn summary(edits: &[Edit]) -> Vec<(EditKind, EntityRef)> {
    edits
        .iter()
        .map(|e| (e.kind(), e.entity().clone()))
        .collect()
}

fn categories(edit: &Edit) -> Vec<WarningCategory> {
    edit.warnings().iter().map(|w| w.category).collect()
}

#[cfg(test)]
mod identity_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identical_schemas_produce_no_edits() {
        let schema = base_schema();
        let edits = SchemaComparator::new().compare(&schema, &schema).unwrap();
        assert!(edits.is_empty());

        let destructive = compare(&schema, &schema, &CompareOptions::new().destructive()).unwrap();
        assert!(destructive.is_empty());
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let mut reordered = users_table();
        reordered.columns.reverse();
        let source = replace_table(base_schema(), reordered);

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert!(edits.is_empty());
    }

    #[test]
    fn test_default_generated_marker_is_ignored() {
        let created = Column::new("created_at", "timestamp")
            .with_default("CURRENT_TIMESTAMP")
            .with_extra("DEFAULT_GENERATED");
        let source = replace_table(base_schema(), users_table().with_column(created.clone()));
        let destination = replace_table(
            base_schema(),
            users_table().with_column(created.with_extra("")),
        );

        let edits = compare(&source, &destination, &CompareOptions::new()).unwrap();
        assert!(edits.is_empty());
    }

    #[test]
    fn test_case_insensitive_names() {
        let mut renamed = users_table();
        renamed.name = "USERS".to_string();
        renamed.columns[1].name = "EMAIL".to_string();
        let mut source = base_schema();
        source.tables.remove("users");
        source.triggers.clear();
        source = source.with_table(renamed);
        let mut destination = base_schema();
        destination.triggers.clear();

        let insensitive = CompareOptions::new().case_insensitive();
        assert!(compare(&source, &destination, &insensitive).unwrap().is_empty());

        let sensitive = compare(&source, &destination, &CompareOptions::new()).unwrap_err();
        assert_eq!(sensitive.kind(), ErrorKind::ComparisonInput);
    }

    #[test]
    fn test_case_insensitive_edits_use_destination_spelling() {
        let mut renamed = users_table().with_column(Column::new("bio", "text"));
        renamed.name = "Users".to_string();
        renamed.columns[2] = Column::new("NAME", "varchar(200)");
        let mut source = base_schema();
        source.tables.remove("users");
        source = source.with_table(renamed);

        let edits = compare(
            &source,
            &base_schema(),
            &CompareOptions::new().case_insensitive(),
        )
        .unwrap();
        assert_eq!(
            summary(&edits),
            vec![
                (EditKind::Modify, EntityRef::column("users", "name")),
                (EditKind::Add, EntityRef::column("users", "bio")),
            ]
        );
    }
}

#[cfg(test)]
mod table_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_added_table_is_one_edit_plus_foreign_keys() {
        let source = base_schema();
        let mut destination = base_schema();
        destination.tables.remove("orders");

        let edits = compare(&source, &destination, &CompareOptions::new()).unwrap();
        assert_eq!(
            summary(&edits),
            vec![
                (EditKind::Add, EntityRef::table("orders")),
                (EditKind::Add, EntityRef::foreign_key("orders", "fk1")),
            ]
        );

        let Some(EntityState::Table(body)) = edits[0].after() else {
            panic!("expected a table state");
        };
        assert!(body.foreign_keys.is_empty());
        assert_eq!(body.columns.len(), 3);
        assert!(edits[0].warnings().is_empty());
    }

    #[test]
    fn test_added_table_without_primary_key_is_flagged() {
        let log = Table::new("log").with_column(Column::new("line", "text"));
        let source = base_schema().with_table(log);

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(categories(&edits[0]), vec![WarningCategory::MissingPrimaryKey]);
        assert!(!edits[0].has_blocking_warnings());
    }

    #[test]
    fn test_extra_table_kept_without_destructive() {
        let source = base_schema();
        let destination = base_schema().with_table(
            Table::new("legacy").with_column(Column::new("id", "int")),
        );

        let edits = compare(&source, &destination, &CompareOptions::new()).unwrap();
        assert!(edits.is_empty());
    }

    #[test]
    fn test_extra_table_dropped_with_destructive() {
        let mut source = base_schema();
        source.tables.remove("orders");
        source.procedures.clear();
        let destination = base_schema();

        let edits = compare(&source, &destination, &CompareOptions::new().destructive()).unwrap();
        assert_eq!(
            summary(&edits),
            vec![
                (EditKind::Remove, EntityRef::foreign_key("orders", "fk1")),
                (EditKind::Remove, EntityRef::table("orders")),
                (
                    EditKind::Remove,
                    EntityRef::routine(dbmorph_core::RoutineKind::Procedure, "cleanup")
                ),
            ]
        );

        assert!(!edits[0].is_destructive());
        assert!(edits[0].warnings().is_empty());
        assert!(edits[1].is_destructive());
        assert_eq!(categories(&edits[1]), vec![WarningCategory::DestructiveRemoval]);
    }

    #[test]
    fn test_table_options_change_is_a_modify() {
        let source = replace_table(
            base_schema(),
            users_table().with_engine("MyISAM").with_comment("accounts"),
        );

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].kind(), EditKind::Modify);
        assert_eq!(edits[0].description(), "Update options of table `users`");
        let Some(EntityState::TableOptions(after)) = edits[0].after() else {
            panic!("expected table options");
        };
        assert_eq!(after.engine, "MyISAM");
        assert_eq!(after.comment, "accounts");
        assert_eq!(after.charset.as_deref(), Some("utf8mb4"));
    }

    #[test]
    fn test_unspecified_source_charset_is_not_compared() {
        let mut users = users_table();
        users.charset = None;
        let source = replace_table(base_schema(), users);

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert!(edits.is_empty());
    }

    #[test]
    fn test_engine_comparison_ignores_case() {
        let source = replace_table(base_schema(), users_table().with_engine("innodb"));
        assert!(compare(&source, &base_schema(), &CompareOptions::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let mut broken = base_schema();
        broken.tables.remove("users");
        broken.triggers.clear();

        let err = compare(&base_schema(), &broken, &CompareOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComparisonInput);
        assert!(err.to_string().contains("fk1"));
    }
}

#[cfg(test)]
mod column_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_added_not_null_column_without_default() {
        let source = Schema::new("db").with_table(
            Table::new("t")
                .with_column(Column::new("id", "INT").not_null())
                .with_column(Column::new("name", "VARCHAR(50)").not_null())
                .with_primary_key(["id"]),
        );
        let destination = Schema::new("db").with_table(
            Table::new("t")
                .with_column(Column::new("id", "INT").not_null())
                .with_primary_key(["id"]),
        );

        let edits = compare(&source, &destination, &CompareOptions::new()).unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].kind(), EditKind::Add);
        assert_eq!(edits[0].entity(), &EntityRef::column("t", "name"));
        assert_eq!(categories(&edits[0]), vec![WarningCategory::MissingDefault]);
        assert!(edits[0].has_blocking_warnings());
    }

    #[test]
    fn test_known_empty_table_skips_missing_default() {
        let source = replace_table(
            base_schema(),
            users_table().with_column(Column::new("age", "int").not_null()),
        );
        let options = CompareOptions::new().with_empty_table("users");

        let edits = compare(&source, &base_schema(), &options).unwrap();
        assert_eq!(edits.len(), 1);
        assert!(edits[0].warnings().is_empty());
    }

    #[test]
    fn test_type_change_is_a_modify_with_warning() {
        let mut users = users_table();
        users.columns[1].data_type = "varchar(100)".to_string();
        let source = replace_table(base_schema(), users);

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(
            summary(&edits),
            vec![(EditKind::Modify, EntityRef::column("users", "email"))]
        );
        assert_eq!(categories(&edits[0]), vec![WarningCategory::SizeReduction]);

        let Some(EntityState::Column(before)) = edits[0].before() else {
            panic!("expected a column state");
        };
        assert_eq!(before.data_type, "varchar(255)");
    }

    #[test]
    fn test_type_case_is_ignored() {
        let mut users = users_table();
        users.columns[1].data_type = "VARCHAR(255)".to_string();
        let source = replace_table(base_schema(), users);
        assert!(compare(&source, &base_schema(), &CompareOptions::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_comment_change_is_detected() {
        let mut users = users_table();
        users.columns[2].comment = "display name".to_string();
        let source = replace_table(base_schema(), users);

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(edits.len(), 1);
        assert!(edits[0].warnings().is_empty());
    }

    #[test]
    fn test_nullability_tightened() {
        let mut users = users_table();
        users.columns[2].is_nullable = false;
        users.columns[2].default = Some(String::new());
        let source = replace_table(base_schema(), users);

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(categories(&edits[0]), vec![WarningCategory::NullabilityTightened]);
    }

    #[test]
    fn test_extra_column_dropped_only_when_destructive() {
        let mut users = users_table();
        users.columns.retain(|c| c.name != "name");
        users.indexes.clear();
        let source = replace_table(base_schema(), users);

        let kept = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert!(kept.is_empty());

        let edits = compare(&source, &base_schema(), &CompareOptions::new().destructive()).unwrap();
        assert_eq!(
            summary(&edits),
            vec![
                (EditKind::Remove, EntityRef::column("users", "name")),
                (EditKind::Remove, EntityRef::index("users", "idx_name")),
            ]
        );
        assert!(edits.iter().all(Edit::is_destructive));
        assert!(edits.iter().all(Edit::has_blocking_warnings));
    }
}

#[cfg(test)]
mod key_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_index_uniqueness_change_is_remove_then_add() {
        let users = users_table();
        let mut unique = users.clone();
        unique.indexes = vec![Index::new("idx_name", ["name"]).unique()];
        let source = replace_table(base_schema(), unique);

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(
            summary(&edits),
            vec![
                (EditKind::Remove, EntityRef::index("users", "idx_name")),
                (EditKind::Add, EntityRef::index("users", "idx_name")),
            ]
        );
        assert!(!edits[0].is_destructive());
        assert_eq!(edits[0].before(), Some(&EntityState::Index(users.indexes[0].clone())));
    }

    #[test]
    fn test_functional_index_compares_clean_against_itself() {
        let users = users_table().with_index(Index::new(
            "idx_lower_email",
            [IndexPart::expression("lower(`email`)")],
        ));
        let schema = replace_table(base_schema(), users);

        let edits = compare(&schema, &schema, &CompareOptions::new()).unwrap();
        assert!(edits.is_empty());
    }

    #[test]
    fn test_functional_index_expression_change() {
        let functional = |expression: &str| {
            users_table().with_index(Index::new(
                "idx_email",
                vec![IndexPart::column("name"), IndexPart::expression(expression)],
            ))
        };
        let source = replace_table(base_schema(), functional("lower(`email`)"));
        let destination = replace_table(base_schema(), functional("upper(`email`)"));

        let edits = compare(&source, &destination, &CompareOptions::new()).unwrap();
        assert_eq!(
            summary(&edits),
            vec![
                (EditKind::Remove, EntityRef::index("users", "idx_email")),
                (EditKind::Add, EntityRef::index("users", "idx_email")),
            ]
        );
    }

    #[test]
    fn test_expression_part_never_equals_column_part() {
        let source = replace_table(
            base_schema(),
            users_table().with_index(Index::new("idx_email", [IndexPart::expression("email")])),
        );
        let destination = replace_table(
            base_schema(),
            users_table().with_index(Index::new("idx_email", ["email"])),
        );

        let edits = compare(&source, &destination, &CompareOptions::new()).unwrap();
        assert_eq!(edits.len(), 2);
    }

    #[test]
    fn test_primary_key_change() {
        let source = replace_table(base_schema(), users_table().with_primary_key(["id", "email"]));

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(
            summary(&edits),
            vec![
                (EditKind::Remove, EntityRef::primary_key("users")),
                (EditKind::Add, EntityRef::primary_key("users")),
            ]
        );
    }

    #[test]
    fn test_primary_key_removal_needs_destructive() {
        let mut users = users_table();
        users.primary_key.clear();
        let source = replace_table(base_schema(), users);

        assert!(compare(&source, &base_schema(), &CompareOptions::new())
            .unwrap()
            .is_empty());

        let edits = compare(&source, &base_schema(), &CompareOptions::new().destructive()).unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(
            categories(&edits[0]),
            vec![
                WarningCategory::DestructiveRemoval,
                WarningCategory::MissingPrimaryKey
            ]
        );
    }

    #[test]
    fn test_foreign_key_action_change() {
        let mut orders = orders_table();
        orders.foreign_keys[0] = orders.foreign_keys[0]
            .clone()
            .on_delete(ForeignKeyAction::Cascade);
        let source = replace_table(base_schema(), orders);

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(
            summary(&edits),
            vec![
                (EditKind::Remove, EntityRef::foreign_key("orders", "fk1")),
                (EditKind::Add, EntityRef::foreign_key("orders", "fk1")),
            ]
        );
    }
}

#[cfg(test)]
mod program_object_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_changed_view_is_replaced() {
        let source = base_schema().with_view(
            View::new("v_users", "SELECT id, email, name FROM users").with_security_type("INVOKER"),
        );

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(
            summary(&edits),
            vec![
                (EditKind::Remove, EntityRef::view("v_users")),
                (EditKind::Add, EntityRef::view("v_users")),
            ]
        );
    }

    #[test]
    fn test_view_whitespace_is_ignored() {
        let source =
            base_schema().with_view(View::new("v_users", "  SELECT id, email FROM users\n"));
        assert!(compare(&source, &base_schema(), &CompareOptions::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_changed_routine_is_replaced() {
        let source = base_schema().with_routine(StoredRoutine::procedure(
            "cleanup",
            "BEGIN DELETE FROM orders WHERE total <= 0; END",
        ));

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(count_by_kind(&edits), (1, 1, 0));
        assert!(edits.iter().all(|e| e.entity().kind() == EntityKind::Routine));
    }

    #[test]
    fn test_changed_trigger_is_replaced() {
        let source = base_schema().with_trigger(Trigger::new(
            "trg_users_email",
            "users",
            TriggerTiming::Before,
            TriggerEvent::Update,
            "SET NEW.email = LOWER(NEW.email)",
        ));

        let edits = compare(&source, &base_schema(), &CompareOptions::new()).unwrap();
        assert_eq!(
            summary(&edits),
            vec![
                (EditKind::Remove, EntityRef::trigger("users", "trg_users_email")),
                (EditKind::Add, EntityRef::trigger("users", "trg_users_email")),
            ]
        );
    }

    #[test]
    fn test_include_toggles_skip_entity_kinds() {
        let mut source = base_schema()
            .with_view(View::new("v_users", "SELECT 1"))
            .with_routine(StoredRoutine::function("one", "RETURN 1", "INT"));
        source.triggers.clear();

        let options = CompareOptions::new()
            .without_views()
            .without_procedures()
            .without_triggers()
            .destructive();
        assert!(compare(&source, &base_schema(), &options).unwrap().is_empty());

        let tables_only = CompareOptions::new().without_tables();
        let edits = compare(&source, &base_schema(), &tables_only).unwrap();
        assert_eq!(count_by_kind(&edits), (2, 1, 0));
    }
}
