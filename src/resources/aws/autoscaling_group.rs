use rust_decimal::Decimal;
use serde::Deserialize;

use super::instance::{instance_usage_schema, Instance};
use crate::estimate::UsageEstimator;
use crate::resources::CoreResource;
use crate::schema::{multiply_quantities, Resource, UsageData, UsageItem};

/// An autoscaling group priced as `instances` copies of its launch template.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoscalingGroup {
    pub address: String,
    pub region: String,
    #[serde(default)]
    pub desired_capacity: Option<i64>,
    pub launch_template: Instance,

    #[serde(skip)]
    pub instances: Option<i64>,
}

impl AutoscalingGroup {
    pub fn new(address: &str, region: &str, launch_template: Instance) -> Self {
        Self {
            address: address.to_string(),
            region: region.to_string(),
            desired_capacity: None,
            launch_template,
            instances: None,
        }
    }

    fn template(&self) -> Instance {
        let mut template = self.launch_template.clone();
        if template.region.is_empty() {
            template.region = self.region.clone();
        }
        template.address = "launch_template".to_string();
        template
    }

    /// Negative counts are clamped to zero.
    fn instance_count(&self) -> i64 {
        let count = self.instances.or(self.desired_capacity).unwrap_or(0);
        if count < 0 {
            tracing::warn!(
                "Negative instance count {count} for {}, using 0",
                self.address
            );
            return 0;
        }
        count
    }
}

impl CoreResource for AutoscalingGroup {
    fn core_type(&self) -> &'static str {
        "AutoscalingGroup"
    }

    fn usage_schema(&self) -> Vec<UsageItem> {
        let mut schema = vec![UsageItem::int(
            "instances",
            self.desired_capacity.unwrap_or(0).max(0),
        )];
        schema.extend(instance_usage_schema());
        schema
    }

    /// The group's usage carries the template's keys too.
    fn populate_usage(&mut self, usage: &UsageData) {
        self.instances = usage.get_int("instances");
        self.launch_template.populate_usage(usage);
    }

    fn build_resource(&self) -> Option<Resource> {
        let mut template = self.template().build_resource()?;
        template.usage_schema.clear();
        multiply_quantities(&mut template, Decimal::from(self.instance_count()));

        Some(
            Resource::new(&self.address)
                .with_sub_resources(vec![template])
                .with_usage_schema(self.usage_schema()),
        )
    }

    fn estimator(&self) -> Option<Box<dyn UsageEstimator>> {
        self.template().estimator()
    }
}
