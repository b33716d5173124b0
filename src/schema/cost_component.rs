use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::filters::{PriceFilter, ProductFilter};
use super::quantity::{Quantity, HOURS_PER_MONTH};
use crate::error::{Error, Result};

/// Whether a component's quantity is a rate per hour or a total per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hourly,
    Monthly,
}

/// One priced line item of a resource.
///
/// The quantity is either hourly or monthly, never both; use
/// [`CostComponent::hourly_quantity`] / [`CostComponent::monthly_quantity`]
/// to read it in either shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostComponent {
    pub name: String,
    pub unit: String,
    pub unit_multiplier: Decimal,
    pub period: Period,
    #[serde(default)]
    pub quantity: Quantity,
    pub product_filter: ProductFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_filter: Option<PriceFilter>,
    #[serde(default)]
    pub usage_based: bool,
    #[serde(default)]
    pub ignore_if_missing_price: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_price: Option<Decimal>,
    /// Unit price filled in by the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

impl CostComponent {
    fn new(name: impl Into<String>, unit: &str, period: Period, quantity: Quantity) -> Self {
        Self {
            name: name.into(),
            unit: unit.to_string(),
            unit_multiplier: Decimal::ONE,
            period,
            quantity,
            product_filter: ProductFilter::default(),
            price_filter: None,
            usage_based: false,
            ignore_if_missing_price: false,
            custom_price: None,
            price: None,
        }
    }

    pub fn hourly(name: impl Into<String>, unit: &str, quantity: impl Into<Quantity>) -> Self {
        Self::new(name, unit, Period::Hourly, quantity.into())
    }

    pub fn monthly(name: impl Into<String>, unit: &str, quantity: impl Into<Quantity>) -> Self {
        Self::new(name, unit, Period::Monthly, quantity.into())
    }

    pub fn with_product_filter(mut self, filter: ProductFilter) -> Self {
        self.product_filter = filter;
        self
    }

    pub fn with_price_filter(mut self, filter: PriceFilter) -> Self {
        self.price_filter = Some(filter);
        self
    }

    pub fn with_unit_multiplier(mut self, multiplier: Decimal) -> Self {
        self.unit_multiplier = multiplier;
        self
    }

    pub fn usage_based(mut self) -> Self {
        self.usage_based = true;
        self
    }

    pub fn ignore_if_missing_price(mut self, ignore: bool) -> Self {
        self.ignore_if_missing_price = ignore;
        self
    }

    pub fn with_custom_price(mut self, price: Decimal) -> Self {
        self.custom_price = Some(price);
        self
    }

    pub fn hourly_quantity(&self) -> Quantity {
        match self.period {
            Period::Hourly => self.quantity,
            Period::Monthly => Quantity::Unset,
        }
    }

    pub fn monthly_quantity(&self) -> Quantity {
        match self.period {
            Period::Monthly => self.quantity,
            Period::Hourly => Quantity::Unset,
        }
    }

    /// The price used for costing: a custom price wins over the catalog's.
    pub fn effective_price(&self) -> Option<Decimal> {
        self.custom_price.or(self.price)
    }

    pub fn set_price(&mut self, price: Decimal) {
        self.price = Some(price);
    }

    /// `None` when the price or quantity is unknown, or the cost overflows.
    pub fn hourly_cost(&self) -> Option<Decimal> {
        let cost = self.effective_price()?.checked_mul(self.quantity.value()?)?;
        match self.period {
            Period::Hourly => Some(cost),
            Period::Monthly => cost.checked_div(HOURS_PER_MONTH),
        }
    }

    pub fn monthly_cost(&self) -> Option<Decimal> {
        let cost = self.effective_price()?.checked_mul(self.quantity.value()?)?;
        match self.period {
            Period::Hourly => cost.checked_mul(HOURS_PER_MONTH),
            Period::Monthly => Some(cost),
        }
    }

    /// Check the invariants the catalog and roll-up rely on.
    pub fn validate(&self) -> Result<()> {
        if self.unit_multiplier <= Decimal::ZERO {
            return Err(self.invalid(format!(
                "unit multiplier must be positive, got {}",
                self.unit_multiplier
            )));
        }
        if let Some(q) = self.quantity.value() {
            if q.is_sign_negative() && !q.is_zero() {
                return Err(self.invalid(format!("quantity must not be negative, got {q}")));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> Error {
        Error::InvalidCostComponent {
            name: self.name.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_only_one_period_is_visible() {
        let c = CostComponent::hourly("Instance usage", "hours", dec!(2));
        assert_eq!(c.hourly_quantity(), Quantity::Value(dec!(2)));
        assert_eq!(c.monthly_quantity(), Quantity::Unset);

        let c = CostComponent::monthly("Storage", "GB", dec!(10));
        assert_eq!(c.hourly_quantity(), Quantity::Unset);
        assert_eq!(c.monthly_quantity(), Quantity::Value(dec!(10)));
    }

    #[test]
    fn test_costs_fill_the_other_period() {
        let mut c = CostComponent::hourly("Instance usage", "hours", dec!(2));
        c.set_price(dec!(0.5));
        assert_eq!(c.hourly_cost(), Some(dec!(1)));
        assert_eq!(c.monthly_cost(), Some(dec!(730)));

        let mut c = CostComponent::monthly("Storage", "GB", dec!(73));
        c.set_price(dec!(0.1));
        assert_eq!(c.monthly_cost(), Some(dec!(7.3)));
        assert_eq!(c.hourly_cost(), Some(dec!(0.01)));
    }

    #[test]
    fn test_unknown_quantity_or_price_has_no_cost() {
        let mut c = CostComponent::monthly("Requests", "1M requests", Quantity::Unset);
        c.set_price(dec!(0.4));
        assert_eq!(c.monthly_cost(), None);

        let c = CostComponent::monthly("Storage", "GB", dec!(10));
        assert_eq!(c.monthly_cost(), None);
    }

    #[test]
    fn test_overflowing_cost_is_unknown() {
        let mut c = CostComponent::hourly("Usage", "hours", Decimal::MAX);
        c.set_price(dec!(2));
        assert_eq!(c.hourly_cost(), None);
        assert_eq!(c.monthly_cost(), None);
    }

    #[test]
    fn test_custom_price_overrides_catalog() {
        let mut c = CostComponent::monthly("Storage", "GB", dec!(10)).with_custom_price(dec!(1));
        c.set_price(dec!(0.1));
        assert_eq!(c.monthly_cost(), Some(dec!(10)));
    }

    #[test]
    fn test_unit_multiplier_does_not_change_cost() {
        let mut c = CostComponent::monthly("Requests", "1M requests", dec!(3000000))
            .with_unit_multiplier(dec!(1000000));
        c.set_price(dec!(0.0000004));
        assert_eq!(c.monthly_cost(), Some(dec!(1.2)));
    }

    #[test]
    fn test_validate() {
        assert!(CostComponent::hourly("ok", "hours", dec!(1)).validate().is_ok());

        let err = CostComponent::hourly("bad", "hours", dec!(1))
            .with_unit_multiplier(Decimal::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCostComponent { ref name, .. } if name == "bad"));

        assert!(CostComponent::monthly("neg", "GB", dec!(-1)).validate().is_err());
    }
}
