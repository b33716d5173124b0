use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::aws_product;
use crate::resources::CoreResource;
use crate::schema::{
    AttributeFilter, CostComponent, PriceFilter, ProductFilter, Quantity, Resource, UsageData,
    UsageItem,
};
use crate::tiers;

/// Widths of the ingest tiers in GB: the first 500 TB, then the next 1.5 PB.
const INGEST_TIERS: [u64; 2] = [512_000, 1_536_000];

/// Tier label, catalog start and end usage amounts.
const INGEST_TIER_PRICES: [(&str, &str, &str); 3] = [
    ("first 500TB", "0", "512000"),
    ("next 1.5PB", "512000", "2048000"),
    ("next 3PB", "2048000", "Inf"),
];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KinesisFirehoseDeliveryStream {
    pub address: String,
    pub region: String,
    #[serde(default)]
    pub data_format_conversion_enabled: bool,
    #[serde(default)]
    pub vpc_delivery_enabled: bool,
    #[serde(default)]
    pub vpc_delivery_azs: i64,

    #[serde(skip)]
    pub monthly_data_ingested_gb: Option<Decimal>,
}

impl KinesisFirehoseDeliveryStream {
    pub fn with_monthly_data_ingested_gb(mut self, gb: f64) -> Self {
        self.monthly_data_ingested_gb = Decimal::from_f64(gb);
        self
    }

    fn product(&self) -> ProductFilter {
        aws_product(&self.region, "AmazonKinesisFirehose", "Kinesis Firehose")
    }

    fn data_ingested(&self, tier: usize, quantity: Quantity) -> CostComponent {
        let (label, start, end) = INGEST_TIER_PRICES[tier];
        CostComponent::monthly(format!("Data ingested ({label})"), "GB", quantity)
            .with_product_filter(
                self.product()
                    .attribute(AttributeFilter::value("group", "Event-by-Event Processing"))
                    .attribute(AttributeFilter::value("sourcetype", "")),
            )
            .with_price_filter(PriceFilter::usage_tier(start, Some(end)))
            .usage_based()
    }

    fn by_operation(&self, name: &str, operation: &str, quantity: Quantity) -> CostComponent {
        CostComponent::monthly(name, "GB", quantity).with_product_filter(
            self.product()
                .attribute(AttributeFilter::value("operation", operation)),
        )
    }

    fn vpc_delivery(&self) -> CostComponent {
        CostComponent::hourly("VPC AZ delivery", "hours", self.vpc_delivery_azs).with_product_filter(
            self.product()
                .attribute(AttributeFilter::value("operation", "RunVpcInstance")),
        )
    }
}

impl CoreResource for KinesisFirehoseDeliveryStream {
    fn core_type(&self) -> &'static str {
        "KinesisFirehoseDeliveryStream"
    }

    fn usage_schema(&self) -> Vec<UsageItem> {
        vec![UsageItem::float("monthly_data_ingested_gb", 0.0)]
    }

    fn populate_usage(&mut self, usage: &UsageData) {
        self.monthly_data_ingested_gb = usage.get_decimal("monthly_data_ingested_gb").value();
    }

    fn build_resource(&self) -> Option<Resource> {
        let mut components = Vec::new();

        match self.monthly_data_ingested_gb {
            Some(total) => {
                for (tier, gb) in tiers::allocate(total, &INGEST_TIERS).into_iter().enumerate() {
                    if gb > Decimal::ZERO {
                        components.push(self.data_ingested(tier, gb.into()));
                    }
                }
            }
            None => components.push(self.data_ingested(0, Quantity::Unset)),
        }

        let ingested: Quantity = self.monthly_data_ingested_gb.into();
        if self.data_format_conversion_enabled {
            components.push(self.by_operation("Format conversion", "DataFormatConversion", ingested));
        }
        if self.vpc_delivery_enabled {
            components.push(self.by_operation("VPC data", "VpcBandwidth", ingested));
            components.push(self.vpc_delivery());
        }

        Some(
            Resource::new(&self.address)
                .with_cost_components(components)
                .with_usage_schema(self.usage_schema()),
        )
    }
}
