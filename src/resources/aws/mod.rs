mod autoscaling_group;
mod db_instance;
mod ebs_volume;
mod ec2_host;
mod elasticache_cluster;
mod instance;
mod kinesis_firehose_delivery_stream;

pub use autoscaling_group::AutoscalingGroup;
pub use db_instance::DbInstance;
pub use ebs_volume::EbsVolume;
pub use ec2_host::Ec2Host;
pub use elasticache_cluster::ElastiCacheCluster;
pub use instance::{ImageInspector, Instance, OsEstimator};
pub use kinesis_firehose_delivery_stream::KinesisFirehoseDeliveryStream;

use crate::schema::ProductFilter;

fn aws_product(region: &str, service: &str, family: &str) -> ProductFilter {
    ProductFilter::new("aws", region, service).product_family(family)
}

/// "redis" -> "Redis", as the catalog spells engine names.
fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("redis"), "Redis");
        assert_eq!(title_case("memcached"), "Memcached");
        assert_eq!(title_case(""), "");
    }
}
