use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{aws_product, title_case};
use crate::reservation::{is_legacy_payment_option, ReservationResolver, ReservationTables};
use crate::resources::CoreResource;
use crate::schema::{
    AttributeFilter, CostComponent, PriceFilter, Quantity, Resource, UsageData, UsageItem,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElastiCacheCluster {
    pub address: String,
    pub region: String,
    pub node_type: String,
    pub engine: String,
    #[serde(default = "default_cache_nodes")]
    pub cache_nodes: i64,
    #[serde(default)]
    pub has_replication_group: bool,
    #[serde(default)]
    pub snapshot_retention_limit: i64,

    #[serde(skip)]
    pub snapshot_storage_size_gb: Option<f64>,
    #[serde(skip)]
    pub reserved_instance_term: Option<String>,
    #[serde(skip)]
    pub reserved_instance_payment_option: Option<String>,
}

fn default_cache_nodes() -> i64 {
    1
}

impl ElastiCacheCluster {
    fn nodes(&self) -> CostComponent {
        let (label, price_filter) = match self.reserved_instance_term.as_deref() {
            Some(term) => {
                let resolver = ReservationResolver::new(ReservationTables::elasticache())
                    .for_node_type(&self.node_type);
                let payment = self.reserved_instance_payment_option.as_deref().unwrap_or_default();
                let filter = resolver.resolve_or_fallback(term, payment, None);
                let label = if filter.purchase_option.as_deref() == Some("reserved") {
                    "reserved"
                } else {
                    "on-demand"
                };
                (label, filter)
            }
            None => ("on-demand", PriceFilter::on_demand()),
        };

        // Legacy offerings are missing from many regions' price lists.
        let legacy = self
            .reserved_instance_payment_option
            .as_deref()
            .is_some_and(is_legacy_payment_option);

        CostComponent::hourly(
            format!("ElastiCache ({label}, {})", self.node_type),
            "hours",
            self.cache_nodes,
        )
        .with_product_filter(
            aws_product(&self.region, "AmazonElastiCache", "Cache Instance")
                .attribute(AttributeFilter::value("instanceType", &self.node_type))
                .attribute(AttributeFilter::value("locationType", "AWS Region"))
                .attribute(AttributeFilter::value("cacheEngine", title_case(&self.engine))),
        )
        .with_price_filter(price_filter)
        .ignore_if_missing_price(legacy)
    }

    fn backup_storage(&self) -> CostComponent {
        let retained = Decimal::from(self.snapshot_retention_limit - 1);
        let quantity: Quantity = self
            .snapshot_storage_size_gb
            .and_then(Decimal::from_f64)
            .map(|gb| gb * retained)
            .into();

        CostComponent::monthly("Backup storage", "GB", quantity)
            .with_product_filter(aws_product(
                &self.region,
                "AmazonElastiCache",
                "Storage Snapshot",
            ))
            .usage_based()
    }
}

impl CoreResource for ElastiCacheCluster {
    fn core_type(&self) -> &'static str {
        "ElastiCacheCluster"
    }

    fn usage_schema(&self) -> Vec<UsageItem> {
        vec![
            UsageItem::float("snapshot_storage_size_gb", 0.0),
            UsageItem::string("reserved_instance_term", ""),
            UsageItem::string("reserved_instance_payment_option", ""),
        ]
    }

    fn populate_usage(&mut self, usage: &UsageData) {
        self.snapshot_storage_size_gb = usage.get_float("snapshot_storage_size_gb");
        self.reserved_instance_term = usage.get_string("reserved_instance_term");
        self.reserved_instance_payment_option =
            usage.get_string("reserved_instance_payment_option");
    }

    fn build_resource(&self) -> Option<Resource> {
        // Nodes in a replication group are priced on the group.
        if self.has_replication_group {
            return Some(
                Resource::skipped(&self.address, None).with_usage_schema(self.usage_schema()),
            );
        }

        let mut components = vec![self.nodes()];
        if self.engine.eq_ignore_ascii_case("redis") && self.snapshot_retention_limit > 1 {
            components.push(self.backup_storage());
        }

        Some(
            Resource::new(&self.address)
                .with_cost_components(components)
                .with_usage_schema(self.usage_schema()),
        )
    }
}
