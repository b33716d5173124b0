use std::fs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use costtree::aggregate::summarize;
use costtree::cost::{price_resources, PriceCatalog};
use costtree::estimate::{cancel_pair, EstimateError};
use costtree::pricing::load_catalog;
use costtree::resources::aws::{ImageInspector, Instance};
use costtree::resources::{build_resource, BuildOptions, PartialResource, ResourceSpec};
use costtree::schema::{Resource, UsageMap};

const RESOURCES: &str = r#"[
    {
        "type": "aws_instance",
        "address": "aws_instance.web",
        "region": "us-east-1",
        "instance_type": "m5.large",
        "root_block_device": {"size_gb": 20}
    },
    {
        "type": "aws_autoscaling_group",
        "address": "aws_autoscaling_group.workers",
        "region": "us-east-1",
        "desired_capacity": 2,
        "launch_template": {"instance_type": "m5.large"}
    },
    {
        "type": "aws_kinesis_firehose_delivery_stream",
        "address": "aws_kinesis_firehose_delivery_stream.logs",
        "region": "us-east-1"
    },
    {
        "type": "aws_elasticache_cluster",
        "address": "aws_elasticache_cluster.replica",
        "region": "us-east-1",
        "node_type": "cache.r6g.large",
        "engine": "redis",
        "has_replication_group": true
    },
    {
        "type": "aws_s3_bucket",
        "address": "aws_s3_bucket.assets",
        "bucket": "assets"
    }
]"#;

const USAGE: &str = r#"
["aws_autoscaling_group.workers"]
instances = 3

["aws_kinesis_firehose_delivery_stream.logs"]
monthly_data_ingested_gb = 1000
"#;

const CATALOG: &str = r#"[
    {
        "vendorName": "aws", "region": "us-east-1", "service": "AmazonEC2",
        "productFamily": "Compute Instance",
        "attributes": {
            "instanceType": "m5.large", "tenancy": "Shared",
            "operatingSystem": "Linux", "preInstalledSw": "NA",
            "licenseModel": "No License required", "capacitystatus": "Used"
        },
        "purchaseOption": "on_demand", "price": "0.096"
    },
    {
        "vendorName": "aws", "region": "us-east-1", "service": "AmazonEC2",
        "productFamily": "Storage",
        "attributes": {"volumeApiName": "gp2"},
        "price": "0.10"
    },
    {
        "vendorName": "aws", "region": "us-east-1", "service": "AmazonKinesisFirehose",
        "productFamily": "Kinesis Firehose",
        "attributes": {"group": "Event-by-Event Processing"},
        "startUsageAmount": "0", "endUsageAmount": "512000", "price": "0.029"
    }
]"#;

async fn build_all(partials: Vec<PartialResource>, usage: &UsageMap) -> Vec<Resource> {
    let options = BuildOptions::default();
    let mut resources = Vec::new();
    for partial in partials {
        let partial = match usage.get(&partial.address) {
            Some(u) => partial.with_usage(u.clone()),
            None => partial,
        };
        resources.push(build_resource(partial, &options).await);
    }
    resources
}

#[tokio::test]
async fn test_project_breakdown() {
    let dir = tempfile::tempdir().unwrap();
    let usage_path = dir.path().join("usage.toml");
    let catalog_path = dir.path().join("prices.json");
    fs::write(&usage_path, USAGE).unwrap();
    fs::write(&catalog_path, CATALOG).unwrap();

    let partials = ResourceSpec::parse_list(RESOURCES).unwrap();
    let usage = UsageMap::load(&usage_path).unwrap();
    let catalog = load_catalog(&catalog_path).unwrap();

    let mut resources = build_all(partials, &usage).await;
    price_resources(&mut resources, &catalog);

    let web = resources[0].costs().unwrap();
    assert_eq!(web.monthly, Some(dec!(72.08)));

    let workers = &resources[1];
    assert_eq!(workers.resource_type.as_deref(), Some("aws_autoscaling_group"));
    assert_eq!(workers.costs().unwrap().monthly, Some(dec!(210.24)));

    let logs = resources[2].costs().unwrap();
    assert_eq!(logs.monthly, Some(dec!(29)));
    assert_eq!(logs.monthly_usage, Some(dec!(29)));

    assert!(resources[3].skipped);
    assert!(resources[4].skipped);
    assert_eq!(
        resources[4].skip_message.as_deref(),
        Some("This resource is not currently supported")
    );

    let summary = summarize(&resources);
    assert_eq!(summary.priced, 3);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.unpriced, 0);
    assert_eq!(summary.total_monthly_cost, Some(dec!(311.32)));
    assert_eq!(summary.total_monthly_usage_cost, Some(dec!(29)));
}

#[tokio::test]
async fn test_missing_prices_stay_unknown() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("prices.json");
    fs::write(&catalog_path, "[]").unwrap();
    let catalog = load_catalog(&catalog_path).unwrap();

    let partials = ResourceSpec::parse_list(RESOURCES).unwrap();
    let mut resources = build_all(partials, &UsageMap::default()).await;

    let unpriced = catalog.unpriced_components(&resources[0]);
    assert_eq!(
        unpriced,
        [
            "aws_instance.web: Instance usage (Linux/UNIX, on-demand, m5.large)",
            "root_block_device: Storage (general purpose SSD, gp2)",
        ]
    );

    price_resources(&mut resources, &catalog);
    let summary = summarize(&resources);
    assert_eq!(summary.priced, 0);
    assert_eq!(summary.unpriced, 3);
    assert_eq!(summary.total_monthly_cost, None);
}

struct SlowInspector {
    delay: Duration,
    os: &'static str,
}

#[async_trait]
impl ImageInspector for SlowInspector {
    async fn operating_system(
        &self,
        _region: &str,
        _image_id: &str,
    ) -> Result<Option<String>, EstimateError> {
        tokio::time::sleep(self.delay).await;
        Ok(Some(self.os.to_string()))
    }
}

fn inspected_instance(delay: Duration) -> PartialResource {
    let instance = Instance {
        address: "aws_instance.app".into(),
        region: "us-east-1".into(),
        instance_type: "m5.large".into(),
        ami: Some("ami-0abc".into()),
        ..Instance::default()
    }
    .with_image_inspector(Arc::new(SlowInspector { delay, os: "windows" }));
    PartialResource::new("aws_instance", "aws_instance.app", Box::new(instance))
}

#[tokio::test(start_paused = true)]
async fn test_estimated_os_is_used() {
    let r = build_resource(
        inspected_instance(Duration::from_secs(1)),
        &BuildOptions::default(),
    )
    .await;
    assert_eq!(
        r.cost_components[0].name,
        "Instance usage (Windows, on-demand, m5.large)"
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_estimate_falls_back_to_declared_usage() {
    let options = BuildOptions {
        estimate_timeout: Duration::from_secs(2),
        ..BuildOptions::default()
    };
    let r = build_resource(inspected_instance(Duration::from_secs(60)), &options).await;
    assert_eq!(
        r.cost_components[0].name,
        "Instance usage (Linux/UNIX, on-demand, m5.large)"
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_estimate_falls_back() {
    let (handle, cancel) = cancel_pair();
    handle.cancel();
    let options = BuildOptions {
        cancel,
        ..BuildOptions::default()
    };
    let r = build_resource(inspected_instance(Duration::from_secs(1)), &options).await;
    assert_eq!(
        r.cost_components[0].name,
        "Instance usage (Linux/UNIX, on-demand, m5.large)"
    );
}

#[tokio::test]
async fn test_estimation_disabled() {
    let options = BuildOptions {
        estimate: false,
        ..BuildOptions::default()
    };
    let r = build_resource(inspected_instance(Duration::ZERO), &options).await;
    assert_eq!(
        r.cost_components[0].name,
        "Instance usage (Linux/UNIX, on-demand, m5.large)"
    );
}
