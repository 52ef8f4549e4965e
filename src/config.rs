//! CLI configuration and argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::HypcapError;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = env!("BUILD_COMMIT");
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Report format written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One row per cluster and instance type
    Table,
    /// Nested per-cluster view
    Json,
}

/// SageMaker HyperPod fleet capacity and quota report.
///
/// Samples every HyperPod cluster (or the given ones) concurrently and
/// reports node health, free accelerators and namespace quota per
/// instance type.
#[derive(Parser, Debug, Clone)]
#[command(name = "hypcap")]
#[command(about = "SageMaker HyperPod fleet capacity and quota report")]
#[command(version = const_format::formatcp!(
    "{} (commit: {}, build date: {})",
    VERSION, COMMIT, BUILD_DATE
))]
pub struct Args {
    /// Comma-delimited cluster names (default: every visible cluster)
    #[arg(short, long, value_name = "A,B,C")]
    pub clusters: Option<String>,

    /// AWS region
    #[arg(short, long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// AWS profile to use
    #[arg(short, long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Namespace whose accelerator quota to report (repeatable)
    #[arg(short, long = "namespace", value_name = "NAMESPACE")]
    pub namespaces: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Maximum clusters sampled at once
    #[arg(long, default_value = "16", env = "HYPCAP_MAX_CONCURRENCY")]
    pub max_concurrency: usize,

    /// Cluster fetches started per rate limit period
    #[arg(long, default_value = "4", env = "HYPCAP_RATE_LIMIT_CALLS")]
    pub rate_limit_calls: usize,

    /// Rate limit period in seconds
    #[arg(long, default_value = "1", env = "HYPCAP_RATE_LIMIT_PERIOD")]
    pub rate_limit_period_secs: u64,

    /// Deadline for sampling a single cluster, in seconds
    #[arg(long, default_value = "120", env = "HYPCAP_CLUSTER_TIMEOUT")]
    pub cluster_timeout_secs: u64,

    /// Directory for per-cluster kubeconfig files (default: <tmp>/hypcap)
    #[arg(long, env = "HYPCAP_KUBECONFIG_DIR")]
    pub kubeconfig_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "HYPCAP_LOG_LEVEL")]
    pub log_level: String,
}

/// Application configuration derived from CLI args.
#[derive(Debug, Clone)]
pub struct Config {
    pub clusters: Option<Vec<String>>,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub namespaces: Vec<String>,
    pub output: OutputFormat,
    pub max_concurrency: usize,
    pub rate_limit_calls: usize,
    pub rate_limit_period: Duration,
    pub cluster_timeout: Duration,
    pub kubeconfig_dir: PathBuf,
    pub log_level: String,
}

impl Config {
    /// Create config from CLI arguments.
    pub fn from_args(args: Args) -> Result<Self, HypcapError> {
        if args.max_concurrency == 0 {
            return Err(HypcapError::InvalidConfig(
                "--max-concurrency must be at least 1".to_string(),
            ));
        }
        if args.rate_limit_calls == 0 {
            return Err(HypcapError::InvalidConfig(
                "--rate-limit-calls must be at least 1".to_string(),
            ));
        }
        if args.rate_limit_period_secs == 0 {
            return Err(HypcapError::InvalidConfig(
                "--rate-limit-period-secs must be at least 1".to_string(),
            ));
        }
        if args.cluster_timeout_secs == 0 {
            return Err(HypcapError::InvalidConfig(
                "--cluster-timeout-secs must be at least 1".to_string(),
            ));
        }

        let clusters = args.clusters.as_deref().map(|list| {
            dedupe(
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from),
            )
        });

        let namespaces = dedupe(
            args.namespaces
                .into_iter()
                .map(|ns| ns.trim().to_string())
                .filter(|ns| !ns.is_empty()),
        );

        Ok(Self {
            clusters,
            region: args.region,
            profile: args.profile,
            namespaces,
            output: args.output,
            max_concurrency: args.max_concurrency,
            rate_limit_calls: args.rate_limit_calls,
            rate_limit_period: Duration::from_secs(args.rate_limit_period_secs),
            cluster_timeout: Duration::from_secs(args.cluster_timeout_secs),
            kubeconfig_dir: args
                .kubeconfig_dir
                .unwrap_or_else(|| std::env::temp_dir().join("hypcap")),
            log_level: args.log_level,
        })
    }
}

/// Remove duplicates, keeping first occurrences in order.
fn dedupe(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
