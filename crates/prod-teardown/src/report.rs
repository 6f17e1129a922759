//! Inventory and summary display
//!
//! The reporting pass prints an indented tree per family. After the
//! execution pass a table gives discovered, attempted, deleted and failed
//! counts per family, followed by every recorded error.

use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use prod_teardown_common::{DiscoveredResource, ResourceFamily, RunSummary};

use crate::pipeline::RunOutcome;

/// Lines of the inventory tree for one family
pub fn inventory_lines(family: ResourceFamily, resources: &[DiscoveredResource]) -> Vec<String> {
    let total: usize = resources.iter().map(DiscoveredResource::total_count).sum();
    let mut lines = vec![format!("{} ({total})", family.display_name())];
    if resources.is_empty() {
        lines.push("  (none found)".to_string());
    }
    for resource in resources {
        push_resource(&mut lines, resource, 1);
    }
    lines
}

fn push_resource(lines: &mut Vec<String>, resource: &DiscoveredResource, depth: usize) {
    let indent = "  ".repeat(depth);
    if resource.name == resource.id {
        lines.push(format!("{indent}{} {}", resource.kind, resource.id));
    } else {
        lines.push(format!(
            "{indent}{} {} ({})",
            resource.kind, resource.name, resource.id
        ));
    }
    for dependent in &resource.dependents {
        push_resource(lines, dependent, depth + 1);
    }
}

pub fn print_inventory(family: ResourceFamily, resources: &[DiscoveredResource]) {
    for line in inventory_lines(family, resources) {
        println!("{line}");
    }
}

/// Per-family counts with a totals row
pub fn summary_table(summary: &RunSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Family"),
            Cell::new("Discovered"),
            Cell::new("Attempted"),
            Cell::new("Deleted"),
            Cell::new("Failed"),
        ]);

    for outcome in &summary.outcomes {
        table.add_row(vec![
            Cell::new(outcome.family.display_name()),
            Cell::new(outcome.discovered),
            Cell::new(outcome.attempted),
            Cell::new(outcome.deleted),
            Cell::new(outcome.failed()),
        ]);
    }

    table.add_row(vec![
        Cell::new("Total"),
        Cell::new(summary.total_discovered()),
        Cell::new(summary.total_attempted()),
        Cell::new(summary.total_deleted()),
        Cell::new(summary.total_failed()),
    ]);

    table
}

/// `family: resource: cause` for every recorded error, in teardown order
pub fn error_lines(summary: &RunSummary) -> Vec<String> {
    summary
        .outcomes
        .iter()
        .flat_map(|o| {
            o.errors
                .iter()
                .map(move |e| format!("{}: {}: {}", o.family, e.resource_id, e.cause))
        })
        .collect()
}

pub fn print_summary(summary: &RunSummary) {
    println!("\n=== Teardown Summary ({}) ===\n", summary.mode);
    println!("{}", summary_table(summary));

    let errors = error_lines(summary);
    if !errors.is_empty() {
        println!("\nErrors:");
        for line in errors {
            println!("  {line}");
        }
    }
}

/// JSON form of a finished run
pub fn outcome_json(outcome: &RunOutcome) -> serde_json::Value {
    match outcome {
        RunOutcome::Completed {
            inventory,
            execution,
        } => serde_json::json!({
            "status": "completed",
            "discovered": inventory.total_discovered(),
            "summary": execution,
        }),
        RunOutcome::Cancelled { inventory } => serde_json::json!({
            "status": "cancelled",
            "discovered": inventory.total_discovered(),
            "summary": inventory,
        }),
    }
}
