mod cost_component;
mod filters;
mod quantity;
mod resource;
mod usage;

pub use cost_component::{CostComponent, Period};
pub use filters::{AttributeFilter, AttributeMatch, PriceFilter, ProductFilter};
pub use quantity::{Quantity, DAYS_IN_MONTH, HOURS_PER_MONTH};
pub use resource::{multiply_quantities, Resource, ResourceCosts};
pub(crate) use resource::merge_cost;
pub use usage::{UsageData, UsageDefault, UsageItem, UsageMap, UsageValue, UsageValueType};
