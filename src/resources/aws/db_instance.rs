use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::aws_product;
use crate::reservation::{ReservationResolver, ReservationTables};
use crate::resources::CoreResource;
use crate::schema::{
    AttributeFilter, CostComponent, PriceFilter, Quantity, Resource, UsageData, UsageItem,
};

const DEFAULT_STORAGE_GB: i64 = 20;
const IO1_MIN_IOPS: i64 = 1000;
const IO1_MIN_STORAGE_GB: i64 = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DbInstance {
    pub address: String,
    pub region: String,
    pub instance_class: String,
    pub engine: String,
    #[serde(default)]
    pub license_model: Option<String>,
    #[serde(default)]
    pub storage_type: Option<String>,
    #[serde(default)]
    pub allocated_storage_gb: Option<f64>,
    #[serde(default)]
    pub iops: f64,
    #[serde(default)]
    pub multi_az: bool,
    #[serde(default)]
    pub backup_retention_period: i64,

    #[serde(skip)]
    pub monthly_standard_io_requests: Option<i64>,
    #[serde(skip)]
    pub additional_backup_storage_gb: Option<f64>,
    #[serde(skip)]
    pub reserved_instance_term: Option<String>,
    #[serde(skip)]
    pub reserved_instance_payment_option: Option<String>,
}

fn database_engine(engine: &str) -> Option<&'static str> {
    Some(match engine {
        "postgres" => "PostgreSQL",
        "mysql" => "MySQL",
        "mariadb" => "MariaDB",
        "aurora" | "aurora-mysql" => "Aurora MySQL",
        "aurora-postgresql" => "Aurora PostgreSQL",
        "oracle-se" | "oracle-se1" | "oracle-se2" | "oracle-se2-cdb" | "oracle-ee"
        | "oracle-ee-cdb" => "Oracle",
        "sqlserver-ex" | "sqlserver-web" | "sqlserver-se" | "sqlserver-ee" => "SQL Server",
        _ => return None,
    })
}

fn database_edition(engine: &str) -> Option<&'static str> {
    Some(match engine {
        "oracle-se" | "sqlserver-se" => "Standard",
        "oracle-se1" => "Standard One",
        "oracle-se2" | "oracle-se2-cdb" => "Standard Two",
        "oracle-ee" | "oracle-ee-cdb" | "sqlserver-ee" => "Enterprise",
        "sqlserver-ex" => "Express",
        "sqlserver-web" => "Web",
        _ => return None,
    })
}

struct Storage {
    volume_type: &'static str,
    name: &'static str,
}

impl DbInstance {
    fn engine(&self) -> String {
        self.engine.to_lowercase()
    }

    fn deployment_option(&self) -> &'static str {
        if self.multi_az {
            "Multi-AZ"
        } else {
            "Single-AZ"
        }
    }

    fn license_model(&self) -> Option<&'static str> {
        if self
            .license_model
            .as_deref()
            .is_some_and(|l| l.eq_ignore_ascii_case("bring-your-own-license"))
        {
            return Some("Bring your own license");
        }
        let engine = self.engine();
        let included = matches!(engine.as_str(), "oracle-se1" | "oracle-se2" | "oracle-se2-cdb")
            || engine.starts_with("sqlserver-");
        included.then_some("License included")
    }

    fn storage_type(&self) -> String {
        self.storage_type
            .as_deref()
            .unwrap_or("gp2")
            .to_lowercase()
    }

    fn storage(&self) -> Storage {
        match self.storage_type().as_str() {
            "io1" => Storage {
                volume_type: "Provisioned IOPS",
                name: "Storage (provisioned IOPS SSD, io1)",
            },
            "standard" => Storage {
                volume_type: "Magnetic",
                name: "Storage (magnetic)",
            },
            "gp3" => Storage {
                volume_type: "General Purpose-GP3",
                name: "Storage (general purpose SSD, gp3)",
            },
            _ => Storage {
                volume_type: "General Purpose",
                name: "Storage (general purpose SSD, gp2)",
            },
        }
    }

    fn allocated_storage(&self) -> Decimal {
        let allocated = self
            .allocated_storage_gb
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::from(DEFAULT_STORAGE_GB));
        if self.storage_type() == "io1" {
            allocated.max(Decimal::from(IO1_MIN_STORAGE_GB))
        } else {
            allocated
        }
    }

    fn instance(&self) -> CostComponent {
        let engine = self.engine();
        let deployment = self.deployment_option();
        let db_engine = database_engine(&engine).unwrap_or_default();

        let mut product = aws_product(&self.region, "AmazonRDS", "Database Instance")
            .attribute(AttributeFilter::value("instanceType", &self.instance_class))
            .attribute(AttributeFilter::value("deploymentOption", deployment))
            .attribute(AttributeFilter::value("databaseEngine", db_engine));
        if let Some(edition) = database_edition(&engine) {
            product = product.attribute(AttributeFilter::value("databaseEdition", edition));
        }
        if let Some(license) = self.license_model() {
            product = product.attribute(AttributeFilter::value("licenseModel", license));
        }
        if db_engine == "Oracle" {
            product = product.attribute(AttributeFilter::value("deploymentModel", ""));
        }
        if db_engine.starts_with("Aurora") {
            product = product.attribute(AttributeFilter::regex("usagetype", "/InstanceUsage:/"));
        }

        let (label, price_filter) = match self.reserved_instance_term.as_deref() {
            Some(term) => {
                let resolved = ReservationResolver::new(ReservationTables::rds()).resolve(
                    term,
                    self.reserved_instance_payment_option.as_deref().unwrap_or_default(),
                    None,
                );
                match resolved {
                    Ok(filter) => ("reserved", filter),
                    Err(e) => {
                        tracing::warn!("{}", e.error);
                        ("on-demand", e.fallback)
                    }
                }
            }
            None => ("on-demand", PriceFilter::on_demand()),
        };

        CostComponent::hourly(
            format!(
                "Database instance ({label}, {deployment}, {})",
                self.instance_class
            ),
            "hours",
            Decimal::ONE,
        )
        .with_product_filter(product)
        .with_price_filter(price_filter)
    }

    fn storage_component(&self, storage: &Storage) -> CostComponent {
        CostComponent::monthly(storage.name, "GB", self.allocated_storage()).with_product_filter(
            aws_product(&self.region, "AmazonRDS", "Database Storage")
                .attribute(AttributeFilter::value("deploymentOption", self.deployment_option()))
                .attribute(AttributeFilter::value("databaseEngine", "Any"))
                .attribute(AttributeFilter::value("volumeType", storage.volume_type)),
        )
    }

    fn io_requests(&self) -> CostComponent {
        let quantity: Quantity = self.monthly_standard_io_requests.map(Decimal::from).into();
        CostComponent::monthly("I/O requests", "1M requests", quantity)
            .with_unit_multiplier(Decimal::from(1_000_000))
            .with_product_filter(
                aws_product(&self.region, "AmazonRDS", "System Operation")
                    .attribute(AttributeFilter::regex("usagetype", "/RDS:StorageIOUsage/i")),
            )
            .usage_based()
    }

    fn provisioned_iops(&self) -> CostComponent {
        let iops = Decimal::from_f64(self.iops)
            .unwrap_or_default()
            .max(Decimal::from(IO1_MIN_IOPS));
        CostComponent::monthly("Provisioned IOPS", "IOPS", iops).with_product_filter(
            aws_product(&self.region, "AmazonRDS", "Provisioned IOPS")
                .attribute(AttributeFilter::value("deploymentOption", self.deployment_option()))
                .attribute(AttributeFilter::value("groupDescription", "RDS Provisioned IOPS"))
                .attribute(AttributeFilter::value("databaseEngine", "Any")),
        )
    }

    fn backup_storage(&self) -> CostComponent {
        let quantity: Quantity = self.additional_backup_storage_gb.and_then(Decimal::from_f64).into();
        CostComponent::monthly("Additional backup storage", "GB", quantity)
            .with_product_filter(
                aws_product(&self.region, "AmazonRDS", "Storage Snapshot")
                    .attribute(AttributeFilter::value("databaseEngine", "Any"))
                    .attribute(AttributeFilter::regex("usagetype", "/RDS:ChargedBackupUsage$/")),
            )
            .usage_based()
    }
}

impl CoreResource for DbInstance {
    fn core_type(&self) -> &'static str {
        "DBInstance"
    }

    fn usage_schema(&self) -> Vec<UsageItem> {
        vec![
            UsageItem::int("monthly_standard_io_requests", 0),
            UsageItem::float("additional_backup_storage_gb", 0.0),
            UsageItem::string("reserved_instance_term", ""),
            UsageItem::string("reserved_instance_payment_option", ""),
        ]
    }

    fn populate_usage(&mut self, usage: &UsageData) {
        self.monthly_standard_io_requests = usage.get_int("monthly_standard_io_requests");
        self.additional_backup_storage_gb = usage.get_float("additional_backup_storage_gb");
        self.reserved_instance_term = usage.get_string("reserved_instance_term");
        self.reserved_instance_payment_option =
            usage.get_string("reserved_instance_payment_option");
    }

    fn build_resource(&self) -> Option<Resource> {
        let storage = self.storage();
        let mut components = vec![self.instance(), self.storage_component(&storage)];

        match self.storage_type().as_str() {
            "standard" => components.push(self.io_requests()),
            "io1" => components.push(self.provisioned_iops()),
            _ => {}
        }

        let has_backup_usage = self
            .additional_backup_storage_gb
            .is_some_and(|gb| gb > 0.0);
        if self.backup_retention_period > 0 || has_backup_usage {
            components.push(self.backup_storage());
        }

        Some(
            Resource::new(&self.address)
                .with_cost_components(components)
                .with_usage_schema(self.usage_schema()),
        )
    }
}
