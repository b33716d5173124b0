use anyhow::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use rust_decimal::Decimal;

use costtree::aggregate::ProjectSummary;
use costtree::schema::{CostComponent, Period, Resource, HOURS_PER_MONTH};

fn format_cost(cost: Option<Decimal>) -> String {
    match cost {
        Some(c) => format!("${:.2}", c),
        None => "N/A".to_string(),
    }
}

fn format_decimal(d: Decimal) -> String {
    d.round_dp(4).normalize().to_string()
}

/// Monthly quantity in display units.
fn monthly_quantity(c: &CostComponent) -> Option<Decimal> {
    let q = c.quantity.value()?;
    let monthly = match c.period {
        Period::Hourly => q * HOURS_PER_MONTH,
        Period::Monthly => q,
    };
    Some(monthly / c.unit_multiplier)
}

fn component_row(c: &CostComponent, depth: usize) -> Vec<Cell> {
    let quantity = match monthly_quantity(c) {
        Some(q) => format_decimal(q),
        None => "not set".to_string(),
    };
    let price = c
        .effective_price()
        .map(|p| format_decimal(p * c.unit_multiplier))
        .unwrap_or_else(|| "N/A".to_string());

    vec![
        Cell::new(format!("{}{}", "  ".repeat(depth), c.name)),
        Cell::new(quantity),
        Cell::new(&c.unit),
        Cell::new(price),
        Cell::new(format_cost(c.hourly_cost())),
        Cell::new(format_cost(c.monthly_cost())),
    ]
}

fn add_resource_rows(table: &mut Table, r: &Resource, depth: usize) {
    let indent = "  ".repeat(depth);
    let costs = r.costs();

    if r.skipped {
        let reason = r.skip_message.as_deref().unwrap_or("skipped");
        table.add_row(vec![
            Cell::new(format!("{indent}{}", r.name)),
            Cell::new(reason),
        ]);
        return;
    }

    table.add_row(vec![
        Cell::new(format!("{indent}{}", r.name)),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(format_cost(costs.and_then(|c| c.hourly))),
        Cell::new(format_cost(costs.and_then(|c| c.monthly))),
    ]);

    for c in &r.cost_components {
        table.add_row(component_row(c, depth + 1));
    }
    for sub in &r.sub_resources {
        add_resource_rows(table, sub, depth + 1);
    }
}

pub fn print_table(resources: &[Resource], summary: &ProjectSummary) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        "Name",
        "Monthly Qty",
        "Unit",
        "Price",
        "Hourly Cost",
        "Monthly Cost",
    ]);

    for r in resources {
        add_resource_rows(&mut table, r, 0);
    }

    table.add_row(vec![
        Cell::new("TOTAL"),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(format_cost(summary.total_hourly_cost)),
        Cell::new(format_cost(summary.total_monthly_cost)),
    ]);

    println!("{table}");
    println!(
        "{} resources: {} priced, {} unpriced, {} free, {} skipped",
        summary.total_resources(),
        summary.priced,
        summary.unpriced,
        summary.free,
        summary.skipped
    );
}

pub fn breakdown_json(resources: &[Resource], summary: &ProjectSummary) -> serde_json::Value {
    let resources: Vec<serde_json::Value> = resources
        .iter()
        .map(|r| {
            serde_json::json!({
                "resource": r,
                "costs": r.costs(),
            })
        })
        .collect();

    serde_json::json!({
        "resources": resources,
        "summary": summary,
    })
}

pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
