//! Shared schema fixtures
//!
//! Two revisions of a small order-management schema that differ in every
//! entity kind, plus helpers to enumerate comparison options.

#![allow(dead_code)]

use dbmorph_core::{
    Column, ForeignKey, ForeignKeyAction, Index, Schema, StoredRoutine, Table, Trigger,
    TriggerEvent, TriggerTiming, View,
};
use dbmorph_schema_tools::CompareOptions;

pub fn catalog_v1() -> Schema {
    Schema::new("catalog")
        .with_table(
            Table::new("customers")
                .with_column(Column::new("id", "int").not_null().auto_increment())
                .with_column(Column::new("email", "varchar(255)").not_null())
                .with_column(Column::new("name", "varchar(100)"))
                .with_column(
                    Column::new("created_at", "timestamp")
                        .with_default("CURRENT_TIMESTAMP")
                        .with_extra("DEFAULT_GENERATED"),
                )
                .with_primary_key(["id"])
                .with_index(Index::new("uq_email", ["email"]).unique())
                .with_charset("utf8mb4"),
        )
        .with_table(
            Table::new("orders")
                .with_column(Column::new("id", "int").not_null().auto_increment())
                .with_column(Column::new("customer_id", "int").not_null())
                .with_column(
                    Column::new("total", "decimal(10,2)")
                        .not_null()
                        .with_default("0.00"),
                )
                .with_column(Column::new("status", "enum('new','paid')").with_default("new"))
                .with_primary_key(["id"])
                .with_index(Index::new("idx_customer", ["customer_id"]))
                .with_foreign_key(
                    ForeignKey::new("fk_orders_customer", ["customer_id"], "customers", ["id"])
                        .on_delete(ForeignKeyAction::Cascade),
                ),
        )
        .with_table(
            Table::new("products")
                .with_column(Column::new("id", "int").not_null().auto_increment())
                .with_column(Column::new("sku", "varchar(32)").not_null())
                .with_column(Column::new("price", "decimal(10,2)"))
                .with_primary_key(["id"]),
        )
        .with_view(View::new(
            "v_customer_orders",
            "SELECT c.email, o.total FROM customers c JOIN orders o ON o.customer_id = c.id",
        ))
        .with_routine(
            StoredRoutine::procedure(
                "archive_orders",
                "BEGIN DELETE FROM orders WHERE status = 'paid'; END",
            )
            .with_parameters("IN cutoff DATE"),
        )
        .with_trigger(Trigger::new(
            "trg_orders_status",
            "orders",
            TriggerTiming::Before,
            TriggerEvent::Insert,
            "SET NEW.status = COALESCE(NEW.status, 'new')",
        ))
}

pub fn catalog_v2() -> Schema {
    Schema::new("catalog")
        .with_table(
            Table::new("customers")
                .with_column(Column::new("id", "int").not_null().auto_increment())
                .with_column(Column::new("email", "varchar(320)").not_null())
                .with_column(
                    Column::new("created_at", "timestamp")
                        .with_default("CURRENT_TIMESTAMP")
                        .with_extra("DEFAULT_GENERATED"),
                )
                .with_column(Column::new("phone", "varchar(20)"))
                .with_primary_key(["id"])
                .with_index(Index::new("uq_email", ["email"]))
                .with_charset("utf8mb4")
                .with_comment("customer accounts"),
        )
        .with_table(
            Table::new("orders")
                .with_column(Column::new("id", "int").not_null().auto_increment())
                .with_column(Column::new("customer_id", "int").not_null())
                .with_column(
                    Column::new("total", "decimal(10,2)")
                        .not_null()
                        .with_default("0.00"),
                )
                .with_column(
                    Column::new("status", "enum('new','paid','shipped')").with_default("new"),
                )
                .with_column(Column::new("note", "text"))
                .with_primary_key(["id"])
                .with_index(Index::new("idx_customer", ["customer_id"]))
                .with_foreign_key(ForeignKey::new(
                    "fk_orders_customer",
                    ["customer_id"],
                    "customers",
                    ["id"],
                )),
        )
        .with_table(
            Table::new("shipments")
                .with_column(Column::new("id", "int").not_null().auto_increment())
                .with_column(Column::new("order_id", "int").not_null())
                .with_column(Column::new("carrier", "varchar(50)"))
                .with_primary_key(["id"])
                .with_foreign_key(ForeignKey::new("fk_ship_order", ["order_id"], "orders", ["id"])),
        )
        .with_view(View::new(
            "v_customer_orders",
            "SELECT c.email, o.total, o.status FROM customers c JOIN orders o ON o.customer_id = c.id",
        ))
        .with_view(View::new("v_shipments", "SELECT order_id, carrier FROM shipments"))
        .with_routine(
            StoredRoutine::procedure(
                "archive_orders",
                "BEGIN DELETE FROM orders WHERE status = 'shipped'; END",
            )
            .with_parameters("IN cutoff DATE"),
        )
        .with_routine(StoredRoutine::function(
            "order_count",
            "RETURN (SELECT COUNT(*) FROM orders)",
            "INT",
        ))
        .with_trigger(Trigger::new(
            "trg_shipments_carrier",
            "shipments",
            TriggerTiming::Before,
            TriggerEvent::Insert,
            "SET NEW.carrier = UPPER(NEW.carrier)",
        ))
}

/// `catalog_v1` with extra entities of every kind; shared entities untouched
pub fn catalog_v1_superset() -> Schema {
    let mut schema = catalog_v1();
    if let Some(orders) = schema.tables.get_mut("orders") {
        orders.columns.push(Column::new("coupon", "varchar(16)"));
        orders.indexes.push(Index::new("idx_status", ["status"]));
    }
    schema
        .with_table(
            Table::new("audit_log")
                .with_column(Column::new("id", "bigint").not_null().auto_increment())
                .with_column(Column::new("order_id", "int"))
                .with_primary_key(["id"])
                .with_foreign_key(ForeignKey::new("fk_audit_order", ["order_id"], "orders", ["id"])),
        )
        .with_view(View::new("v_products", "SELECT sku FROM products"))
        .with_routine(StoredRoutine::function("one", "RETURN 1", "INT"))
        .with_trigger(Trigger::new(
            "trg_audit_insert",
            "audit_log",
            TriggerTiming::After,
            TriggerEvent::Insert,
            "SET @audited = @audited + 1",
        ))
}

/// Every combination of the four include toggles and the destructive flag
pub fn all_option_combinations() -> Vec<CompareOptions> {
    (0u8..32)
        .map(|mask| {
            let mut options = CompareOptions::new();
            if mask & 1 != 0 {
                options = options.without_tables();
            }
            if mask & 2 != 0 {
                options = options.without_views();
            }
            if mask & 4 != 0 {
                options = options.without_procedures();
            }
            if mask & 8 != 0 {
                options = options.without_triggers();
            }
            if mask & 16 != 0 {
                options = options.destructive();
            }
            options
        })
        .collect()
}
