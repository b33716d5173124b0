mod cli;
mod config;
mod output;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, OutputFormat, ReservationKind};
use config::Config;
use costtree::aggregate::summarize;
use costtree::cost::price_resources;
use costtree::estimate::cancel_pair;
use costtree::pricing::{self, StaticCatalog};
use costtree::reservation::ReservationResolver;
use costtree::resources::{build_resource, BuildOptions, ResourceSpec};
use costtree::schema::UsageMap;
use costtree::tiers;

fn init_logging(quiet: bool) {
    let default_level = if quiet { "error" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_tiers(total: rust_decimal::Decimal, widths: &[u64]) {
    let buckets = tiers::allocate(total, widths);
    let last = buckets.len() - 1;
    for (i, bucket) in buckets.iter().enumerate() {
        let label = if i == last {
            "remainder".to_string()
        } else {
            format!("tier {} (width {})", i + 1, widths[i])
        };
        println!("{label}: {bucket}");
    }
}

fn print_reservation(
    kind: ReservationKind,
    term: &str,
    payment_option: &str,
    offering_class: Option<&str>,
    node_type: Option<&str>,
) -> Result<()> {
    let mut resolver = ReservationResolver::new(kind.tables());
    if let Some(node_type) = node_type {
        resolver = resolver.for_node_type(node_type);
    }

    match resolver.resolve(term, payment_option, offering_class) {
        Ok(filter) => {
            if let Some(warning) = resolver.legacy_warning(payment_option) {
                tracing::warn!("{warning}");
            }
            output::print_json(&filter)
        }
        Err(e) => {
            tracing::warn!("{}", e.error);
            output::print_json(&e.fallback)
        }
    }
}

/// `--catalog`, then the config, then the user data directory.
fn load_catalog(explicit: Option<&Path>, config: &Config) -> Result<StaticCatalog> {
    if let Some(path) = explicit.or(config.catalog.as_deref()) {
        return pricing::load_catalog(path)
            .with_context(|| format!("Failed to load price catalog {}", path.display()));
    }

    match pricing::default_catalog_path().filter(|p| p.exists()) {
        Some(path) => pricing::load_catalog(&path)
            .with_context(|| format!("Failed to load price catalog {}", path.display())),
        None => {
            tracing::warn!("No price catalog found, costs will show as N/A");
            Ok(StaticCatalog::default())
        }
    }
}

async fn breakdown(
    resources_path: &Path,
    usage_path: Option<&Path>,
    catalog_path: Option<&Path>,
    format: Option<OutputFormat>,
    config: &Config,
) -> Result<()> {
    let data = fs::read_to_string(resources_path)
        .with_context(|| format!("Failed to read {}", resources_path.display()))?;
    let partials = ResourceSpec::parse_list(&data)
        .with_context(|| format!("Failed to parse resources in {}", resources_path.display()))?;

    let usage = match usage_path {
        Some(path) => UsageMap::load(path).context("Failed to load usage file")?,
        None => UsageMap::default(),
    };

    let (cancel_handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling usage estimates");
            cancel_handle.cancel();
        }
    });

    let options = BuildOptions {
        estimate: config.estimate_enabled(),
        estimate_timeout: config.estimate_timeout(),
        cancel,
    };

    let mut resources = Vec::with_capacity(partials.len());
    for partial in partials {
        let partial = match usage.get(&partial.address) {
            Some(u) => partial.with_usage(u.clone()),
            None => partial,
        };
        let resource = build_resource(partial, &options).await;
        if let Err(e) = resource.validate() {
            tracing::warn!("{e}");
        }
        resources.push(resource);
    }

    let catalog = load_catalog(catalog_path, config)?;
    price_resources(&mut resources, &catalog);

    let summary = summarize(&resources);

    match format.or(config.format).unwrap_or(OutputFormat::Table) {
        OutputFormat::Json => output::print_json(&output::breakdown_json(&resources, &summary))?,
        OutputFormat::Table => output::print_table(&resources, &summary),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let config = config::load_config(cli.config.as_deref());

    match cli.command {
        Command::Tiers { total, widths } => print_tiers(total, &widths),
        Command::Reserve {
            kind,
            term,
            payment_option,
            offering_class,
            node_type,
        } => print_reservation(
            kind,
            &term,
            &payment_option,
            offering_class.as_deref(),
            node_type.as_deref(),
        )?,
        Command::Breakdown {
            resources,
            usage,
            catalog,
            format,
        } => {
            breakdown(
                &resources,
                usage.as_deref(),
                catalog.as_deref(),
                format,
                &config,
            )
            .await?
        }
    }

    Ok(())
}
