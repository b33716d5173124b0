use rust_decimal::Decimal;
use serde::Deserialize;

use super::aws_product;
use crate::schema::{
    AttributeFilter, CostComponent, Quantity, Resource, UsageData, UsageItem,
};

const DEFAULT_VOLUME_SIZE_GB: i64 = 8;
const GP3_BASELINE_IOPS: i64 = 3000;

/// A block device, priced standalone or as a sub-resource of an instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EbsVolume {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub size_gb: Option<i64>,
    #[serde(default)]
    pub iops: i64,

    #[serde(skip)]
    pub monthly_standard_io_requests: Option<i64>,
}

impl EbsVolume {
    pub fn usage_schema() -> Vec<UsageItem> {
        vec![UsageItem::int("monthly_standard_io_requests", 0)]
    }

    pub fn populate_usage(&mut self, usage: &UsageData) {
        self.monthly_standard_io_requests = usage.get_int("monthly_standard_io_requests");
    }

    fn volume_type(&self) -> String {
        self.volume_type
            .as_deref()
            .unwrap_or("gp2")
            .to_lowercase()
    }

    /// Build the volume as a resource called `default_name` unless it was
    /// given its own name.
    pub fn build(&self, region: &str, default_name: &str) -> Resource {
        let region = if self.region.is_empty() {
            region
        } else {
            &self.region
        };
        let volume_type = self.volume_type();

        let mut components = vec![self.storage(region, &volume_type)];

        match volume_type.as_str() {
            "io1" => components.push(provisioned_iops(
                region,
                &volume_type,
                "EBS:VolumeP-IOPS.piops",
                self.iops,
            )),
            "io2" => components.push(provisioned_iops(
                region,
                &volume_type,
                "EBS:VolumeP-IOPS.io2$",
                self.iops,
            )),
            "gp3" if self.iops > GP3_BASELINE_IOPS => components.push(provisioned_iops(
                region,
                &volume_type,
                "VolumeP-IOPS.gp3",
                self.iops - GP3_BASELINE_IOPS,
            )),
            "standard" => components.push(self.io_requests(region)),
            _ => {}
        }

        Resource::new(self.name.as_deref().unwrap_or(default_name))
            .with_cost_components(components)
            .with_usage_schema(Self::usage_schema())
    }

    fn storage(&self, region: &str, volume_type: &str) -> CostComponent {
        let name = match volume_type {
            "standard" => "Storage (magnetic)",
            "io1" => "Storage (provisioned IOPS SSD, io1)",
            "io2" => "Storage (provisioned IOPS SSD, io2)",
            "st1" => "Storage (throughput optimized HDD, st1)",
            "sc1" => "Storage (cold HDD, sc1)",
            "gp3" => "Storage (general purpose SSD, gp3)",
            "gp2" => "Storage (general purpose SSD, gp2)",
            _ => "Storage (unknown)",
        };

        CostComponent::monthly(name, "GB", self.size_gb.unwrap_or(DEFAULT_VOLUME_SIZE_GB))
            .with_product_filter(
                aws_product(region, "AmazonEC2", "Storage")
                    .attribute(AttributeFilter::regex("volumeApiName", format!("/{volume_type}/i"))),
            )
    }

    fn io_requests(&self, region: &str) -> CostComponent {
        let quantity: Quantity = self.monthly_standard_io_requests.map(Decimal::from).into();
        CostComponent::monthly("I/O requests", "1M request", quantity)
            .with_unit_multiplier(Decimal::from(1_000_000))
            .with_product_filter(
                aws_product(region, "AmazonEC2", "System Operation")
                    .attribute(AttributeFilter::regex("usagetype", "/EBS:VolumeIOUsage/i")),
            )
            .usage_based()
    }
}

fn provisioned_iops(region: &str, volume_type: &str, usage_type: &str, iops: i64) -> CostComponent {
    CostComponent::monthly("Provisioned IOPS", "IOPS", iops).with_product_filter(
        aws_product(region, "AmazonEC2", "System Operation")
            .attribute(AttributeFilter::regex("volumeApiName", format!("/{volume_type}/i")))
            .attribute(AttributeFilter::regex("usagetype", format!("/{usage_type}/i"))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UsageValue;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_to_8gb_gp2() {
        let r = EbsVolume::default().build("us-east-1", "root_block_device");
        assert_eq!(r.name, "root_block_device");
        assert_eq!(r.cost_components.len(), 1);
        assert_eq!(r.cost_components[0].name, "Storage (general purpose SSD, gp2)");
        assert_eq!(r.cost_components[0].monthly_quantity(), Quantity::Value(dec!(8)));
    }

    #[test]
    fn test_gp3_iops_above_baseline() {
        let volume = EbsVolume {
            volume_type: Some("gp3".into()),
            iops: 4000,
            size_gb: Some(100),
            ..EbsVolume::default()
        };
        let r = volume.build("eu-west-1", "data");
        assert_eq!(r.cost_components[1].name, "Provisioned IOPS");
        assert_eq!(r.cost_components[1].monthly_quantity(), Quantity::Value(dec!(1000)));
    }

    #[test]
    fn test_magnetic_io_requests_follow_usage() {
        let mut volume = EbsVolume {
            volume_type: Some("standard".into()),
            ..EbsVolume::default()
        };
        let r = volume.build("us-east-1", "root_block_device");
        let io = &r.cost_components[1];
        assert!(io.usage_based);
        assert_eq!(io.quantity, Quantity::Unset);

        volume.populate_usage(
            &UsageData::new("v").with("monthly_standard_io_requests", UsageValue::Int(2000000)),
        );
        let r = volume.build("us-east-1", "root_block_device");
        assert_eq!(r.cost_components[1].quantity, Quantity::Value(dec!(2000000)));
    }
}
