/*!

`eks-inventory` takes a snapshot of the EKS clusters in one or more regions and publishes it as a
JSON, plain text or xlsx report to S3, a local file or stdout.

!*/

use clap::Parser;
use eks_inventory::aggregate::Aggregator;
use eks_inventory::aws::{credentials_provider, sdk_config};
use eks_inventory::cluster_api::KubeConnector;
use eks_inventory::config::{parse_addon_workload, trim_names, GpuClassifier, InventorySettings};
use eks_inventory::constants::{DEFAULT_CONCURRENCY, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT_SECONDS};
use eks_inventory::control_plane::EksControlPlane;
use eks_inventory::error::{self, Result};
use eks_inventory::init_logger;
use eks_inventory::publish::{publish, OutputLocation};
use eks_inventory::report::{render, ReportFormat};
use log::{info, LevelFilter};
use snafu::ensure;
use std::time::Duration;

/// Inventory EKS clusters, their node groups, add-ons and workloads.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,

    /// Regions to inventory, in report order.
    #[clap(long, env = "REGIONS", required = true, value_delimiter = ',')]
    regions: Vec<String>,

    /// The namespace to list pods and look up deployments in.
    #[clap(long, env = "NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Deployments to report that are not managed add-ons.
    #[clap(long, env = "WORKLOADS", value_delimiter = ',')]
    workloads: Vec<String>,

    /// `addon=deployment` pairs for add-ons whose deployment is named differently.
    #[clap(
        long,
        env = "ADDON_WORKLOADS",
        value_delimiter = ',',
        value_parser = parse_addon_workload
    )]
    addon_workloads: Vec<(String, String)>,

    /// Instance family prefixes that mark a node group as GPU backed.
    #[clap(long, env = "GPU_PREFIXES", default_value = "g,p", value_delimiter = ',')]
    gpu_prefixes: Vec<String>,

    /// How many clusters of a region are inventoried at the same time.
    #[clap(long, env = "CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Timeout for each AWS and Kubernetes API call.
    #[clap(long, env = "TIMEOUT_SECONDS", default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    timeout_seconds: u64,

    /// A role to assume before inventorying, e.g. for another account.
    #[clap(long, env = "ASSUME_ROLE")]
    assume_role: Option<String>,

    /// `s3://bucket/key`, a file path, or `-` for stdout.
    #[clap(long, env = "OUTPUT", default_value = "-")]
    output: OutputLocation,

    #[clap(long, env = "FORMAT", value_enum, default_value = "json")]
    format: ReportFormat,

    /// Exit with an error if any cluster or region could not be inventoried. The report is still
    /// published.
    #[clap(long)]
    strict: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(env!("CARGO_CRATE_NAME"), Some(args.log_level));
    if let Err(e) = run(args).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = InventorySettings {
        regions: trim_names(&args.regions),
        namespace: args.namespace.trim().to_string(),
        workloads: trim_names(&args.workloads),
        addon_workloads: args.addon_workloads.into_iter().collect(),
        gpu: GpuClassifier::new(&args.gpu_prefixes),
        concurrency: args.concurrency,
    };
    settings.validate()?;
    let timeout = Duration::from_secs(args.timeout_seconds);
    ensure!(
        !timeout.is_zero(),
        error::ConfigSnafu {
            what: "timeout must be at least 1 second",
        }
    );

    // Regions are validated to be non-empty.
    let home_region = settings.regions[0].clone();
    let credentials = credentials_provider(args.assume_role.as_deref(), &home_region).await;
    let mut configs = Vec::with_capacity(settings.regions.len());
    for region in &settings.regions {
        configs.push(sdk_config(region, &credentials, timeout).await);
    }

    let aggregator = Aggregator::new(
        EksControlPlane::new(&configs),
        KubeConnector::new(timeout),
        credentials,
        settings,
    );
    let report = aggregator.run().await;
    info!(
        "Inventoried {} cluster(s), {} failure(s)",
        report.clusters.len(),
        report.failures.len()
    );

    let body = render(&report.clusters, args.format)?;
    // Only the credentials of the home region config are used; uploads go to the bucket's region.
    publish(body, args.format.content_type(), &args.output, &configs[0]).await?;

    ensure!(
        !args.strict || report.is_complete(),
        error::IncompleteSnafu {
            count: report.failures.len(),
        }
    );
    Ok(())
}
