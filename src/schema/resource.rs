use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cost_component::CostComponent;
use super::quantity::Quantity;
use super::usage::UsageItem;
use crate::error::Result;

/// A priced node: its own cost components plus child resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub cost_components: Vec<CostComponent>,
    #[serde(default)]
    pub sub_resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usage_schema: Vec<UsageItem>,
    #[serde(default)]
    pub no_price: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_message: Option<String>,
}

/// Rolled-up cost of a resource subtree. `None` fields mean unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCosts {
    pub hourly: Option<Decimal>,
    pub monthly: Option<Decimal>,
    pub monthly_usage: Option<Decimal>,
}

/// Merge an optional cost into an existing optional accumulator.
pub(crate) fn merge_cost(target: &mut Option<Decimal>, source: Option<Decimal>) {
    match (target, source) {
        (Some(ref mut c), Some(v)) => *c += v,
        (t @ None, Some(v)) => *t = Some(v),
        _ => {}
    }
}

impl ResourceCosts {
    pub fn accumulate_from(&mut self, other: &ResourceCosts) {
        merge_cost(&mut self.hourly, other.hourly);
        merge_cost(&mut self.monthly, other.monthly);
        merge_cost(&mut self.monthly_usage, other.monthly_usage);
    }
}

impl Resource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A placeholder that shows up in output but never in totals.
    pub fn skipped(name: impl Into<String>, message: Option<&str>) -> Self {
        Self {
            name: name.into(),
            no_price: true,
            skipped: true,
            skip_message: message.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn with_cost_components(mut self, components: Vec<CostComponent>) -> Self {
        self.cost_components = components;
        self
    }

    pub fn with_sub_resources(mut self, sub_resources: Vec<Resource>) -> Self {
        self.sub_resources = sub_resources;
        self
    }

    pub fn with_usage_schema(mut self, schema: Vec<UsageItem>) -> Self {
        self.usage_schema = schema;
        self
    }

    pub fn is_excluded(&self) -> bool {
        self.no_price || self.skipped
    }

    /// Every descendant, depth-first, parents before their children.
    pub fn flattened_sub_resources(&self) -> Vec<&Resource> {
        let mut out = Vec::with_capacity(self.sub_resources.len());
        for sub in &self.sub_resources {
            out.push(sub);
            out.extend(sub.flattened_sub_resources());
        }
        out
    }

    /// Drop the first component named `name`. Returns whether one was removed.
    pub fn remove_cost_component(&mut self, name: &str) -> bool {
        match self.cost_components.iter().position(|c| c.name == name) {
            Some(idx) => {
                self.cost_components.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Validate every component in the subtree.
    pub fn validate(&self) -> Result<()> {
        for c in &self.cost_components {
            c.validate()?;
        }
        for sub in &self.sub_resources {
            sub.validate()?;
        }
        Ok(())
    }

    /// Sum component and sub-resource costs. `None` when nothing in the
    /// subtree has a known cost, so unknown never reads as free.
    pub fn costs(&self) -> Option<ResourceCosts> {
        if self.is_excluded() {
            tracing::debug!("Skipping free resource {}", self.name);
            return None;
        }

        let mut totals = ResourceCosts::default();
        let mut has_cost = false;

        for c in &self.cost_components {
            let hourly = c.hourly_cost();
            let monthly = c.monthly_cost();
            if hourly.is_none() && monthly.is_none() {
                continue;
            }
            has_cost = true;
            merge_cost(&mut totals.hourly, hourly);
            merge_cost(&mut totals.monthly, monthly);
            if c.usage_based {
                merge_cost(&mut totals.monthly_usage, monthly);
            }
        }

        for sub in &self.sub_resources {
            if let Some(sub_costs) = sub.costs() {
                has_cost = true;
                totals.accumulate_from(&sub_costs);
            }
        }

        has_cost.then_some(totals)
    }
}

/// Scale every present quantity in the subtree by `factor`, in place.
///
/// Unset quantities stay unset, and so does a product that overflows.
/// Calling this twice multiplies twice.
pub fn multiply_quantities(resource: &mut Resource, factor: Decimal) {
    for c in &mut resource.cost_components {
        let Some(q) = c.quantity.value() else {
            continue;
        };
        c.quantity = match q.checked_mul(factor) {
            Some(scaled) => Quantity::Value(scaled),
            None => {
                tracing::warn!(
                    "{} in {} overflows when scaled by {factor}",
                    c.name,
                    resource.name
                );
                Quantity::Unset
            }
        };
    }
    for sub in &mut resource.sub_resources {
        multiply_quantities(sub, factor);
    }
}
