use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::aws_product;
use super::ebs_volume::EbsVolume;
use crate::estimate::{EstimateError, UsageEstimator};
use crate::reservation::{ReservationResolver, ReservationTables};
use crate::resources::CoreResource;
use crate::schema::{
    AttributeFilter, CostComponent, PriceFilter, Quantity, Resource, UsageData, UsageItem,
    UsageValue,
};

const DEFAULT_METRIC_COUNT: i64 = 7;
const BURSTABLE_FAMILIES: &[&str] = &["t2", "t3", "t3a", "t4g"];

/// Resolves the platform an image runs, e.g. through the provider's
/// image-describe API.
#[async_trait]
pub trait ImageInspector: Send + Sync {
    async fn operating_system(&self, region: &str, image_id: &str)
        -> Result<Option<String>, EstimateError>;
}

/// Estimates `operating_system` from the instance's image.
pub struct OsEstimator {
    inspector: Arc<dyn ImageInspector>,
    region: String,
    image_id: String,
}

#[async_trait]
impl UsageEstimator for OsEstimator {
    async fn estimate(&self, usage: &UsageData) -> Result<UsageData, EstimateError> {
        let mut estimated = UsageData::new(usage.address.clone());
        if let Some(os) = self
            .inspector
            .operating_system(&self.region, &self.image_id)
            .await?
        {
            estimated.set("operating_system", UsageValue::String(os));
        }
        Ok(estimated)
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct Instance {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub region: String,
    pub instance_type: String,
    #[serde(default)]
    pub tenancy: Option<String>,
    #[serde(default)]
    pub purchase_option: Option<String>,
    #[serde(default)]
    pub ami: Option<String>,
    #[serde(default)]
    pub ebs_optimized: bool,
    #[serde(default)]
    pub enable_monitoring: bool,
    #[serde(default)]
    pub cpu_credits: Option<String>,
    #[serde(default)]
    pub root_block_device: Option<EbsVolume>,
    #[serde(default)]
    pub ebs_block_devices: Vec<EbsVolume>,

    #[serde(skip)]
    pub image_inspector: Option<Arc<dyn ImageInspector>>,

    #[serde(skip)]
    pub operating_system: Option<String>,
    #[serde(skip)]
    pub reserved_instance_type: Option<String>,
    #[serde(skip)]
    pub reserved_instance_term: Option<String>,
    #[serde(skip)]
    pub reserved_instance_payment_option: Option<String>,
    #[serde(skip)]
    pub monthly_cpu_credit_hrs: Option<i64>,
    #[serde(skip)]
    pub vcpu_count: Option<i64>,
    #[serde(skip)]
    pub monthly_hrs: Option<Decimal>,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("address", &self.address)
            .field("region", &self.region)
            .field("instance_type", &self.instance_type)
            .field("operating_system", &self.operating_system)
            .finish_non_exhaustive()
    }
}

pub(crate) fn instance_usage_schema() -> Vec<UsageItem> {
    vec![
        UsageItem::string("operating_system", "linux"),
        UsageItem::string("reserved_instance_type", ""),
        UsageItem::string("reserved_instance_term", ""),
        UsageItem::string("reserved_instance_payment_option", ""),
        UsageItem::int("monthly_cpu_credit_hrs", 0),
        UsageItem::int("vcpu_count", 0),
        UsageItem::float("monthly_hrs", 730.0),
        UsageItem::sub_resource("root_block_device", EbsVolume::usage_schema()),
    ]
}

struct Os {
    label: &'static str,
    filter: &'static str,
}

impl Instance {
    pub fn with_image_inspector(mut self, inspector: Arc<dyn ImageInspector>) -> Self {
        self.image_inspector = Some(inspector);
        self
    }

    fn tenancy_label(&self) -> Option<&'static str> {
        match self.tenancy.as_deref().map(str::to_lowercase).as_deref() {
            Some("host") => None,
            Some("dedicated") => Some("Dedicated"),
            _ => Some("Shared"),
        }
    }

    fn os(&self) -> Os {
        match self.operating_system.as_deref().unwrap_or("linux") {
            "windows" => Os { label: "Windows", filter: "Windows" },
            "rhel" => Os { label: "RHEL", filter: "RHEL" },
            "suse" => Os { label: "SUSE", filter: "SUSE" },
            other => {
                if other != "linux" {
                    tracing::warn!("Unrecognized operating system {other}, defaulting to Linux/UNIX");
                }
                Os { label: "Linux/UNIX", filter: "Linux" }
            }
        }
    }

    fn effective_cpu_credits(&self) -> Option<&str> {
        match self.cpu_credits.as_deref() {
            Some(c) => Some(c),
            None if self.instance_type.starts_with("t3.")
                || self.instance_type.starts_with("t4g.") =>
            {
                Some("unlimited")
            }
            None => None,
        }
    }

    fn burstable_family(&self) -> Option<&str> {
        let family = self.instance_type.split('.').next()?;
        BURSTABLE_FAMILIES.contains(&family).then_some(family)
    }

    /// Hourly at one unit unless usage gives the monthly hours.
    fn always_on(&self, name: String) -> CostComponent {
        match self.monthly_hrs {
            Some(hours) => CostComponent::monthly(name, "hours", hours),
            None => CostComponent::hourly(name, "hours", Decimal::ONE),
        }
    }

    fn compute(&self, tenancy: &str) -> CostComponent {
        let os = self.os();
        let purchase_option = self.purchase_option.as_deref().unwrap_or("on_demand");

        let mut product = aws_product(&self.region, "AmazonEC2", "Compute Instance")
            .attribute(AttributeFilter::value("instanceType", &self.instance_type))
            .attribute(AttributeFilter::value("tenancy", tenancy))
            .attribute(AttributeFilter::value("operatingSystem", os.filter))
            .attribute(AttributeFilter::value("preInstalledSw", "NA"));

        if let Some(offering_class) = self.reserved_instance_type.as_deref() {
            let resolved = ReservationResolver::new(ReservationTables::ec2_instance()).resolve(
                self.reserved_instance_term.as_deref().unwrap_or_default(),
                self.reserved_instance_payment_option.as_deref().unwrap_or_default(),
                Some(offering_class),
            );
            match resolved {
                Ok(filter) => {
                    product = product.attribute(AttributeFilter::value("capacitystatus", "Used"));
                    return self
                        .always_on(format!(
                            "Instance usage ({}, reserved, {})",
                            os.label, self.instance_type
                        ))
                        .with_product_filter(product)
                        .with_price_filter(filter);
                }
                Err(e) => tracing::warn!("{}", e.error),
            }
        }

        let purchase_label = match purchase_option {
            "spot" => "spot",
            _ => "on-demand",
        };

        product = product
            .attribute(AttributeFilter::value("licenseModel", "No License required"))
            .attribute(AttributeFilter::value("capacitystatus", "Used"));

        self.always_on(format!(
            "Instance usage ({}, {}, {})",
            os.label, purchase_label, self.instance_type
        ))
        .with_product_filter(product)
        .with_price_filter(PriceFilter::purchase_option(purchase_option))
    }

    fn ebs_optimized_usage(&self) -> CostComponent {
        CostComponent::hourly("EBS-optimized usage", "hours", Decimal::ONE)
            .with_product_filter(
                aws_product(&self.region, "AmazonEC2", "Compute Instance")
                    .attribute(AttributeFilter::value("instanceType", &self.instance_type))
                    .attribute(AttributeFilter::regex("usagetype", "/EBSOptimized/")),
            )
            .ignore_if_missing_price(true)
    }

    fn detailed_monitoring(&self) -> CostComponent {
        CostComponent::monthly("EC2 detailed monitoring", "metrics", DEFAULT_METRIC_COUNT)
            .with_product_filter(aws_product(&self.region, "AmazonCloudWatch", "Metric"))
            .with_price_filter(PriceFilter::usage_tier(0, None))
            .ignore_if_missing_price(true)
    }

    fn cpu_credit(&self, family: &str) -> CostComponent {
        let quantity: Quantity = match (self.monthly_cpu_credit_hrs, self.vcpu_count) {
            (Some(hrs), Some(vcpus)) => {
                let total = Decimal::from(hrs).checked_mul(Decimal::from(vcpus));
                if total.is_none() {
                    tracing::warn!(
                        "CPU credit usage for {} is out of range, leaving it unset",
                        self.address
                    );
                }
                total.into()
            }
            _ => Quantity::Unset,
        };

        CostComponent::monthly("CPU credits", "vCPU-hours", quantity)
            .with_product_filter(
                aws_product(&self.region, "AmazonEC2", "CPU Credits")
                    .attribute(AttributeFilter::value("operatingSystem", "Linux"))
                    .attribute(AttributeFilter::regex(
                        "usagetype",
                        format!("/CPUCredits:{family}$/"),
                    )),
            )
            .usage_based()
    }
}

impl CoreResource for Instance {
    fn core_type(&self) -> &'static str {
        "Instance"
    }

    fn usage_schema(&self) -> Vec<UsageItem> {
        instance_usage_schema()
    }

    fn populate_usage(&mut self, usage: &UsageData) {
        self.operating_system = usage.get_string("operating_system");
        self.reserved_instance_type = usage.get_string("reserved_instance_type");
        self.reserved_instance_term = usage.get_string("reserved_instance_term");
        self.reserved_instance_payment_option =
            usage.get_string("reserved_instance_payment_option");
        self.monthly_cpu_credit_hrs = usage.get_int("monthly_cpu_credit_hrs");
        self.vcpu_count = usage.get_int("vcpu_count");
        self.monthly_hrs = usage.get_decimal("monthly_hrs").value();

        if let Some(root) = self.root_block_device.as_mut() {
            if let Some(root_usage) = usage.get_items("root_block_device") {
                root.populate_usage(&root_usage);
            }
        }
    }

    fn build_resource(&self) -> Option<Resource> {
        let Some(tenancy) = self.tenancy_label() else {
            tracing::warn!(
                "Skipping resource {}. Host tenancy is not supported for EC2 instances",
                self.address
            );
            return None;
        };

        let mut sub_resources = Vec::new();
        if let Some(root) = &self.root_block_device {
            sub_resources.push(root.build(&self.region, "root_block_device"));
        }
        for (i, ebs) in self.ebs_block_devices.iter().enumerate() {
            sub_resources.push(ebs.build(&self.region, &format!("ebs_block_device[{i}]")));
        }

        let mut components = vec![self.compute(tenancy)];
        if self.ebs_optimized {
            components.push(self.ebs_optimized_usage());
        }
        if self.enable_monitoring {
            components.push(self.detailed_monitoring());
        }
        if self.effective_cpu_credits() == Some("unlimited") {
            if let Some(family) = self.burstable_family() {
                components.push(self.cpu_credit(family));
            }
        }

        Some(
            Resource::new(&self.address)
                .with_cost_components(components)
                .with_sub_resources(sub_resources)
                .with_usage_schema(instance_usage_schema()),
        )
    }

    fn estimator(&self) -> Option<Box<dyn UsageEstimator>> {
        let inspector = self.image_inspector.clone()?;
        let image_id = self.ami.clone().filter(|a| !a.is_empty())?;
        Some(Box::new(OsEstimator {
            inspector,
            region: self.region.clone(),
            image_id,
        }))
    }
}
