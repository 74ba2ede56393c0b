//! Terminal output helpers

use comfy_table::{Attribute, Cell, Color, Table, presets};

use dbmorph_core::Warning;
use dbmorph_schema_tools::MigrationPlan;

/// Renders warnings as a table, blocking ones highlighted
pub fn warnings_table(warnings: &[Warning]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_header(
        ["Severity", "Category", "Entity", "Message"]
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );

    for warning in warnings {
        let severity = Cell::new(warning.severity.as_str());
        let severity = if warning.is_blocking() {
            severity.fg(Color::Red).add_attribute(Attribute::Bold)
        } else {
            severity.fg(Color::Yellow)
        };
        table.add_row(vec![
            severity,
            Cell::new(warning.category.as_str()),
            Cell::new(warning.entity.to_string()),
            Cell::new(&warning.message),
        ]);
    }

    table
}

/// Prints warnings to stderr; prints nothing when there are none
pub fn print_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!("{}", warnings_table(warnings));
}

/// One-line plan summary for stderr
pub fn plan_summary(plan: &MigrationPlan) -> String {
    if plan.is_empty() {
        return "Schemas are in sync, nothing to do".to_string();
    }
    let warnings = plan.warnings();
    let blocking = warnings.iter().filter(|w| w.is_blocking()).count();
    format!(
        "{} step(s), {} warning(s), {} blocking",
        plan.len(),
        warnings.len(),
        blocking
    )
}
