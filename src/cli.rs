use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Deserialize;

use costtree::reservation::ReservationTables;

#[derive(Parser, Debug)]
#[command(
    name = "costtree",
    about = "Estimate monthly infrastructure cost from priced resource trees"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (default: config.toml in the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Only log errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Split a quantity across consecutive price tiers
    Tiers {
        /// Quantity to allocate
        total: Decimal,
        /// Tier widths, each relative to the end of the previous tier
        #[arg(required = true)]
        widths: Vec<u64>,
    },
    /// Resolve a reservation into the price filter sent to the catalog
    Reserve {
        #[arg(long, value_enum)]
        kind: ReservationKind,
        /// 1_year or 3_year
        #[arg(long)]
        term: String,
        /// e.g. no_upfront, partial_upfront, all_upfront
        #[arg(long)]
        payment_option: String,
        /// standard or convertible (EC2 instances only)
        #[arg(long)]
        offering_class: Option<String>,
        /// Node type, used to detect legacy ElastiCache families
        #[arg(long)]
        node_type: Option<String>,
    },
    /// Build, price and print the cost breakdown of a list of resources
    Breakdown {
        /// JSON array of resource definitions
        resources: PathBuf,
        /// TOML usage overrides keyed by resource address
        #[arg(long)]
        usage: Option<PathBuf>,
        /// JSON price catalog (default: from config, then the user data directory)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Output format: table (default), json
        #[arg(long)]
        format: Option<OutputFormat>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum ReservationKind {
    Ec2,
    Ec2Host,
    Rds,
    Elasticache,
}

impl ReservationKind {
    pub fn tables(self) -> &'static ReservationTables {
        match self {
            ReservationKind::Ec2 => ReservationTables::ec2_instance(),
            ReservationKind::Ec2Host => ReservationTables::ec2_host(),
            ReservationKind::Rds => ReservationTables::rds(),
            ReservationKind::Elasticache => ReservationTables::elasticache(),
        }
    }
}

#[derive(ValueEnum, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}
