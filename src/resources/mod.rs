pub mod aws;

use std::time::Duration;

use serde::Deserialize;

use crate::estimate::{run_estimate, CancelSignal, UsageEstimator};
use crate::schema::{Resource, UsageData, UsageItem};

pub const UNSUPPORTED_MESSAGE: &str = "This resource is not currently supported";

/// A provider resource that knows how to turn itself, plus usage, into a
/// priced [`Resource`] tree.
pub trait CoreResource: Send + Sync {
    fn core_type(&self) -> &'static str;

    fn usage_schema(&self) -> Vec<UsageItem>;

    fn populate_usage(&mut self, usage: &UsageData);

    /// `None` when this configuration cannot be priced.
    fn build_resource(&self) -> Option<Resource>;

    fn estimator(&self) -> Option<Box<dyn UsageEstimator>> {
        None
    }
}

/// Stands in for resources that are known but never priced.
#[derive(Debug, Clone, Deserialize)]
pub struct BlankCoreResource {
    pub address: String,
    #[serde(default)]
    pub resource_type: String,
}

impl CoreResource for BlankCoreResource {
    fn core_type(&self) -> &'static str {
        "BlankCoreResource"
    }

    fn usage_schema(&self) -> Vec<UsageItem> {
        Vec::new()
    }

    fn populate_usage(&mut self, _usage: &UsageData) {}

    fn build_resource(&self) -> Option<Resource> {
        Some(Resource::skipped(&self.address, None))
    }
}

/// A parsed resource that has not been built yet.
pub struct PartialResource {
    pub resource_type: String,
    pub address: String,
    pub usage: Option<UsageData>,
    pub core: Box<dyn CoreResource>,
}

impl PartialResource {
    pub fn new(
        resource_type: impl Into<String>,
        address: impl Into<String>,
        core: Box<dyn CoreResource>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            address: address.into(),
            usage: None,
            core,
        }
    }

    pub fn with_usage(mut self, usage: UsageData) -> Self {
        self.usage = Some(usage);
        self
    }
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub estimate: bool,
    pub estimate_timeout: Duration,
    pub cancel: CancelSignal,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            estimate: true,
            estimate_timeout: Duration::from_secs(10),
            cancel: CancelSignal::never(),
        }
    }
}

/// Merge declared and estimated usage, populate it and build the tree.
///
/// Estimation problems are logged and the declared usage is used as is.
pub async fn build_resource(partial: PartialResource, options: &BuildOptions) -> Resource {
    let PartialResource {
        resource_type,
        address,
        usage,
        mut core,
    } = partial;

    let declared = usage.unwrap_or_else(|| UsageData::new(&address));

    let usage = match core.estimator() {
        Some(estimator) if options.estimate => {
            match run_estimate(
                &address,
                estimator.as_ref(),
                &declared,
                options.estimate_timeout,
                &options.cancel,
            )
            .await
            {
                Ok(merged) => merged,
                Err(e) => {
                    tracing::warn!("{e}");
                    declared
                }
            }
        }
        _ => declared,
    };

    core.populate_usage(&usage);

    let Some(mut resource) = core.build_resource() else {
        tracing::debug!("Skipping resource {address}: {UNSUPPORTED_MESSAGE}");
        let mut skipped = Resource::skipped(&address, Some(UNSUPPORTED_MESSAGE));
        skipped.resource_type = Some(resource_type);
        skipped.usage_schema = core.usage_schema();
        return skipped;
    };

    resource.resource_type = Some(resource_type);
    if resource.usage_schema.is_empty() {
        resource.usage_schema = core.usage_schema();
    }
    resource
}

/// Resource definitions as accepted on the command line, one JSON object per
/// resource tagged with its type.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ResourceSpec {
    #[serde(rename = "aws_instance")]
    Instance(aws::Instance),
    #[serde(rename = "aws_ec2_host")]
    Ec2Host(aws::Ec2Host),
    #[serde(rename = "aws_db_instance")]
    DbInstance(aws::DbInstance),
    #[serde(rename = "aws_elasticache_cluster")]
    ElastiCacheCluster(aws::ElastiCacheCluster),
    #[serde(rename = "aws_autoscaling_group")]
    AutoscalingGroup(aws::AutoscalingGroup),
    #[serde(rename = "aws_kinesis_firehose_delivery_stream")]
    KinesisFirehoseDeliveryStream(aws::KinesisFirehoseDeliveryStream),
    #[serde(other)]
    Unsupported,
}

impl ResourceSpec {
    /// Parse a JSON array of resource definitions. Objects with an unknown
    /// `type`, or that do not fit their type, are kept as blank placeholders.
    pub fn parse_list(data: &str) -> serde_json::Result<Vec<PartialResource>> {
        let raw: Vec<serde_json::Value> = serde_json::from_str(data)?;
        Ok(raw
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let resource_type = value
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default()
                    .to_string();
                let address = value
                    .get("address")
                    .and_then(|a| a.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{resource_type}[{i}]"));
                let definition = serde_json::from_value(value).unwrap_or_else(|e| {
                    tracing::warn!("Invalid definition for {address}, skipping it: {e}");
                    ResourceSpec::Unsupported
                });
                definition.into_partial(resource_type, address)
            })
            .collect())
    }

    fn into_partial(self, resource_type: String, address: String) -> PartialResource {
        let core: Box<dyn CoreResource> = match self {
            ResourceSpec::Instance(r) => Box::new(r),
            ResourceSpec::Ec2Host(r) => Box::new(r),
            ResourceSpec::DbInstance(r) => Box::new(r),
            ResourceSpec::ElastiCacheCluster(r) => Box::new(r),
            ResourceSpec::AutoscalingGroup(r) => Box::new(r),
            ResourceSpec::KinesisFirehoseDeliveryStream(r) => Box::new(r),
            ResourceSpec::Unsupported => Box::new(BlankCoreResource {
                address: address.clone(),
                resource_type: resource_type.clone(),
            }),
        };
        PartialResource::new(resource_type, address, core)
    }
}
