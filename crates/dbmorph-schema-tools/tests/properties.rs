//! Properties of comparison and planning that hold across whole schemas
//!
//! Plans are checked by simulating them against the destination snapshot and
//! comparing the outcome with the source.

mod common;

use dbmorph_core::{Column, EntityRef, Index, Schema, Table, WarningCategory, is_blocked};
use dbmorph_schema_tools::{
    CompareOptions, MigrationPlan, Stage, compare, plan, render, simulate, warnings,
};
use pretty_assertions::assert_eq;

use common::{all_option_combinations, catalog_v1, catalog_v1_superset, catalog_v2};

fn plan_between(source: &Schema, destination: &Schema, options: &CompareOptions) -> MigrationPlan {
    plan(&compare(source, destination, options).expect("schemas should compare"))
}

fn assert_monotonic(plan: &MigrationPlan) {
    let numbers: Vec<u8> = plan.steps().iter().map(|s| s.stage.number()).collect();
    assert!(
        numbers.windows(2).all(|w| w[0] <= w[1]),
        "stages out of order: {:?}",
        numbers
    );
}

// ============ Idempotence ============

#[test]
fn comparing_a_schema_with_itself_is_empty_for_every_option_set() {
    for schema in [catalog_v1(), catalog_v2(), catalog_v1_superset(), Schema::new("empty")] {
        for options in all_option_combinations() {
            let edits = compare(&schema, &schema, &options).expect("schema should compare");
            assert!(edits.is_empty(), "{:?} produced {} edit(s)", options, edits.len());
        }
    }
}

// ============ Determinism ============

#[test]
fn repeated_planning_renders_identical_statements() {
    let options = CompareOptions::new().destructive();
    let first = render(&plan_between(&catalog_v2(), &catalog_v1(), &options));
    assert!(!first.is_empty());

    for _ in 0..10 {
        assert_eq!(render(&plan_between(&catalog_v2(), &catalog_v1(), &options)), first);
    }
}

// ============ Stage monotonicity ============

#[test]
fn plan_stages_never_decrease() {
    let pairs = [
        (catalog_v1(), catalog_v2()),
        (catalog_v2(), catalog_v1()),
        (catalog_v1(), catalog_v1_superset()),
        (catalog_v1_superset(), catalog_v2()),
        (catalog_v2(), Schema::new("empty")),
        (Schema::new("empty"), catalog_v2()),
    ];
    for (source, destination) in &pairs {
        for options in all_option_combinations() {
            assert_monotonic(&plan_between(source, destination, &options));
        }
    }
}

// ============ Non-destructive additivity ============

#[test]
fn extra_destination_entities_are_left_alone() {
    let edits = compare(&catalog_v1(), &catalog_v1_superset(), &CompareOptions::new())
        .expect("schemas should compare");
    assert!(edits.is_empty());

    let edits = compare(&Schema::new("empty"), &catalog_v2(), &CompareOptions::new())
        .expect("schemas should compare");
    assert!(edits.is_empty());
}

#[test]
fn destructive_mode_removes_extra_entities() {
    let options = CompareOptions::new().destructive();
    let plan = plan_between(&catalog_v1(), &catalog_v1_superset(), &options);

    assert!(plan.is_blocked(false));
    assert!(
        warnings(&plan)
            .iter()
            .all(|w| w.category == WarningCategory::DestructiveRemoval)
    );
    let result = simulate(&catalog_v1_superset(), &plan).expect("plan should apply");
    assert_eq!(result, catalog_v1());
}

// ============ Destructive symmetry ============

#[test]
fn applying_a_destructive_plan_reaches_the_source() {
    let options = CompareOptions::new().destructive();
    let pairs = [
        (catalog_v1(), catalog_v2()),
        (catalog_v2(), catalog_v1()),
        (catalog_v2(), Schema::new("catalog")),
        (Schema::new("catalog"), catalog_v2()),
        (catalog_v1_superset(), catalog_v2()),
    ];

    for (source, destination) in &pairs {
        let plan = plan_between(source, destination, &options);
        let result = simulate(destination, &plan).expect("plan should apply");
        let remaining = compare(source, &result, &options).expect("result should compare");
        assert!(
            remaining.is_empty(),
            "{} edit(s) left, first: {:?}",
            remaining.len(),
            remaining.first().map(|e| e.description())
        );
    }
}

#[test]
fn non_destructive_plan_covers_the_source() {
    let plan = plan_between(&catalog_v2(), &catalog_v1(), &CompareOptions::new());
    let result = simulate(&catalog_v1(), &plan).expect("plan should apply");

    assert!(compare(&catalog_v2(), &result, &CompareOptions::new())
        .expect("result should compare")
        .is_empty());
    // Extras survive: v1's products table is still there
    assert!(result.table("products").is_some());
}

// ============ Concrete cases ============

#[test]
fn not_null_column_without_default_blocks_in_add_columns() {
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

    let plan = plan_between(&source, &destination, &CompareOptions::new());
    let all = warnings(&plan);

    assert_eq!(plan.len(), 1);
    assert_eq!(plan.steps()[0].stage, Stage::AddColumns);
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].category, WarningCategory::MissingDefault);
    assert_eq!(all[0].entity, EntityRef::column("t", "name"));
    assert!(is_blocked(&all, false));
    assert!(!is_blocked(&all, true));
}

#[test]
fn foreign_key_is_dropped_before_its_table() {
    let users = Table::new("users")
        .with_column(Column::new("id", "int").not_null())
        .with_primary_key(["id"]);
    let orders = Table::new("orders")
        .with_column(Column::new("id", "int").not_null())
        .with_column(Column::new("user_id", "int"))
        .with_primary_key(["id"])
        .with_foreign_key(dbmorph_core::ForeignKey::new("fk1", ["user_id"], "users", ["id"]));
    let source = Schema::new("db").with_table(users.clone());
    let destination = Schema::new("db").with_table(users).with_table(orders);

    let plan = plan_between(&source, &destination, &CompareOptions::new().destructive());
    let fk_step = plan
        .steps()
        .iter()
        .position(|s| s.edit.entity() == &EntityRef::foreign_key("orders", "fk1"))
        .expect("foreign key step");
    let table_step = plan
        .steps()
        .iter()
        .position(|s| s.edit.entity() == &EntityRef::table("orders"))
        .expect("table step");

    assert_eq!(plan.steps()[fk_step].stage.number(), 3);
    assert_eq!(plan.steps()[table_step].stage.number(), 6);
    assert!(fk_step < table_step);
}

#[test]
fn index_uniqueness_change_is_exactly_drop_and_create() {
    let table = Table::new("users")
        .with_column(Column::new("id", "int").not_null())
        .with_column(Column::new("name", "varchar(100)"))
        .with_primary_key(["id"]);
    let source = Schema::new("db")
        .with_table(table.clone().with_index(Index::new("idx_name", ["name"]).unique()));
    let destination =
        Schema::new("db").with_table(table.with_index(Index::new("idx_name", ["name"])));

    let plan = plan_between(&source, &destination, &CompareOptions::new());
    let stages: Vec<Stage> = plan.steps().iter().map(|s| s.stage).collect();

    assert_eq!(stages, vec![Stage::DropIndexes, Stage::CreateIndexes]);
    assert!(plan.statements().iter().all(|s| !s.contains("ALTER INDEX")));
}
