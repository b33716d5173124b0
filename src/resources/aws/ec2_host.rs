use rust_decimal::Decimal;
use serde::Deserialize;

use super::aws_product;
use crate::reservation::{ReservationResolver, ReservationTables};
use crate::resources::CoreResource;
use crate::schema::{AttributeFilter, CostComponent, PriceFilter, Resource, UsageData, UsageItem};

/// A dedicated EC2 host, billed per host-hour on demand or reserved.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ec2Host {
    pub address: String,
    pub region: String,
    #[serde(default)]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub instance_family: Option<String>,

    #[serde(skip)]
    pub reserved_instance_term: Option<String>,
    #[serde(skip)]
    pub reserved_instance_payment_option: Option<String>,
}

impl Ec2Host {
    fn family(&self) -> &str {
        match (&self.instance_type, &self.instance_family) {
            (Some(t), _) if !t.is_empty() => t.split('.').next().unwrap_or(t.as_str()),
            (_, Some(f)) => f.as_str(),
            _ => "",
        }
    }

    /// Reserved price filter when a valid reservation is configured.
    fn reservation(&self) -> Option<PriceFilter> {
        let term = self.reserved_instance_term.as_deref()?;
        let payment = self.reserved_instance_payment_option.as_deref().unwrap_or_default();
        match ReservationResolver::new(ReservationTables::ec2_host()).resolve(term, payment, None) {
            Ok(filter) => Some(filter),
            Err(e) => {
                tracing::warn!("{}", e.error);
                None
            }
        }
    }
}

impl CoreResource for Ec2Host {
    fn core_type(&self) -> &'static str {
        "Ec2Host"
    }

    fn usage_schema(&self) -> Vec<UsageItem> {
        vec![
            UsageItem::string("reserved_instance_term", ""),
            UsageItem::string("reserved_instance_payment_option", ""),
        ]
    }

    fn populate_usage(&mut self, usage: &UsageData) {
        self.reserved_instance_term = usage.get_string("reserved_instance_term");
        self.reserved_instance_payment_option =
            usage.get_string("reserved_instance_payment_option");
    }

    fn build_resource(&self) -> Option<Resource> {
        let family = self.family();
        let (label, usage_type, price_filter) = match self.reservation() {
            Some(filter) => ("reserved", "ReservedHostUsage", filter),
            None => ("on-demand", "HostUsage", PriceFilter::on_demand()),
        };

        let host = CostComponent::hourly(
            format!("EC2 Dedicated Host ({label}, {family})"),
            "hours",
            Decimal::ONE,
        )
        .with_product_filter(
            aws_product(&self.region, "AmazonEC2", "Dedicated Host")
                .attribute(AttributeFilter::value("usagetype", format!("{usage_type}:{family}"))),
        )
        .with_price_filter(price_filter);

        Some(
            Resource::new(&self.address)
                .with_cost_components(vec![host])
                .with_usage_schema(self.usage_schema()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeMatch, UsageValue};

    fn host() -> Ec2Host {
        Ec2Host {
            address: "aws_ec2_host.dedicated".into(),
            region: "us-east-1".into(),
            instance_type: Some("c5.large".into()),
            ..Ec2Host::default()
        }
    }

    #[test]
    fn test_on_demand_host() {
        let r = host().build_resource().unwrap();
        let c = &r.cost_components[0];
        assert_eq!(c.name, "EC2 Dedicated Host (on-demand, c5)");
        assert_eq!(
            c.product_filter.attribute_filters[0].matcher,
            AttributeMatch::Value("HostUsage:c5".into())
        );
    }

    #[test]
    fn test_reserved_host_uses_unspaced_labels() {
        let mut h = host();
        h.populate_usage(
            &UsageData::new("aws_ec2_host.dedicated")
                .with("reserved_instance_term", UsageValue::String("1_year".into()))
                .with("reserved_instance_payment_option", UsageValue::String("all_upfront".into())),
        );
        let r = h.build_resource().unwrap();
        let c = &r.cost_components[0];
        assert_eq!(c.name, "EC2 Dedicated Host (reserved, c5)");
        assert_eq!(
            c.price_filter.as_ref().unwrap().term_purchase_option.as_deref(),
            Some("AllUpfront")
        );
        assert_eq!(
            c.product_filter.attribute_filters[0].matcher,
            AttributeMatch::Value("ReservedHostUsage:c5".into())
        );
    }

    #[test]
    fn test_invalid_payment_stays_on_demand() {
        let mut h = Ec2Host {
            instance_type: None,
            instance_family: Some("mac1".into()),
            ..host()
        };
        h.populate_usage(
            &UsageData::new("aws_ec2_host.dedicated")
                .with("reserved_instance_term", UsageValue::String("1_year".into()))
                .with("reserved_instance_payment_option", UsageValue::String("No Upfront".into())),
        );
        let r = h.build_resource().unwrap();
        assert_eq!(r.cost_components[0].name, "EC2 Dedicated Host (on-demand, mac1)");
        assert_eq!(r.cost_components[0].price_filter, Some(PriceFilter::on_demand()));
    }
}
