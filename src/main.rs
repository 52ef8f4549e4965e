//! hypcap - SageMaker HyperPod fleet capacity and quota report.
//!
//! For every HyperPod cluster (or an explicit list) reports, per instance type:
//! - Node totals split by health status
//! - Deep health check results
//! - Free accelerator devices
//! - Nominal and available accelerator quota of selected namespaces

mod aws;
mod capacity;
mod config;
mod error;
mod k8s;
mod output;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, info};

use aws::AwsClients;
use aws::eks::EksClient;
use aws::sagemaker::SageMakerControlPlane;
use capacity::engine::{CapacityEngine, CapacityRequest};
use capacity::fetch::CapacityFetcher;
use capacity::rate_limit::RateLimiter;
use capacity::upstream::{ClusterAccess, ControlPlane};
use config::{Args, Config};
use error::HypcapError;
use k8s::access::KubeAccess;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = match Config::from_args(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    debug!("Starting hypcap - HyperPod capacity report");

    if let Err(e) = run(&config).await {
        error!("{:#}", e);
        if e
            .downcast_ref::<HypcapError>()
            .is_some_and(HypcapError::is_setup_failure)
        {
            error!("Check AWS credentials and region (--profile, --region)");
        }
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(config: &Config) -> Result<()> {
    // Create AWS clients
    let clients = AwsClients::new(config.profile.as_deref(), config.region.as_deref()).await?;

    // Verify credentials before any cluster is touched
    let identity = clients.verify_identity().await?;
    info!(
        "Authenticated as {} (account {}) in {}",
        identity.arn, identity.account_id, clients.region
    );

    // Wire upstream adapters
    let control_plane: Arc<dyn ControlPlane> =
        Arc::new(SageMakerControlPlane::new(clients.sagemaker.clone()));
    let access: Arc<dyn ClusterAccess> = Arc::new(KubeAccess::new(
        EksClient::new(clients.eks.clone()),
        clients.region.clone(),
        config.profile.clone(),
    ));
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_calls,
        config.rate_limit_period,
    ));
    debug!(
        "Rate limit: {} cluster fetches per {:?}, {}s deadline per cluster",
        limiter.max_calls(),
        limiter.period(),
        config.cluster_timeout.as_secs()
    );

    // Build the fetch engine
    let fetcher = CapacityFetcher::new(
        Arc::clone(&control_plane),
        access,
        limiter,
        config.namespaces.clone(),
        config.kubeconfig_dir.clone(),
        config.cluster_timeout,
    );
    let engine = CapacityEngine::new(control_plane, Arc::new(fetcher), config.max_concurrency);

    // Collect capacity and print the report
    let request = CapacityRequest {
        clusters: config.clusters.clone(),
    };
    let report = engine.collect(&request).await?;

    output::print_report(&report, config.output)
}

/// Initialize tracing subscriber on stderr; stdout carries only the report.
fn init_tracing(log_level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to initialize log filter: {}", e))?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
