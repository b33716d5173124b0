use rust_decimal::Decimal;
use serde::Serialize;

use crate::schema::{merge_cost, Resource, ResourceCosts};

/// Project totals plus how many resources fell into each pricing bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub total_hourly_cost: Option<Decimal>,
    pub total_monthly_cost: Option<Decimal>,
    pub total_monthly_usage_cost: Option<Decimal>,
    /// Resources with at least one known cost.
    pub priced: usize,
    /// Resources with components but no known cost.
    pub unpriced: usize,
    /// Resources the mapping could not build.
    pub skipped: usize,
    /// Resources marked free, or built with nothing to price.
    pub free: usize,
}

impl ProjectSummary {
    pub fn accumulate(&mut self, costs: &ResourceCosts) {
        merge_cost(&mut self.total_hourly_cost, costs.hourly);
        merge_cost(&mut self.total_monthly_cost, costs.monthly);
        merge_cost(&mut self.total_monthly_usage_cost, costs.monthly_usage);
    }

    pub fn total_resources(&self) -> usize {
        self.priced + self.unpriced + self.skipped + self.free
    }
}

fn has_components(r: &Resource) -> bool {
    !r.cost_components.is_empty() || r.sub_resources.iter().any(has_components)
}

pub fn summarize(resources: &[Resource]) -> ProjectSummary {
    let mut summary = ProjectSummary::default();

    for r in resources {
        if r.skipped {
            summary.skipped += 1;
            continue;
        }
        if r.no_price || !has_components(r) {
            summary.free += 1;
            continue;
        }
        match r.costs() {
            Some(costs) => {
                summary.priced += 1;
                summary.accumulate(&costs);
            }
            None => summary.unpriced += 1,
        }
    }

    summary
}
