//! Custom error types for hypcap.

use thiserror::Error;

use crate::capacity::types::ClusterId;

/// Errors raised by the AWS and Kubernetes adapters and by node aggregation.
#[derive(Error, Debug)]
pub enum HypcapError {
    #[error("[{0}] {1}")]
    AwsSdk(String, String),

    #[error("[{0}] AWS credentials error: {1}")]
    AwsCredentials(String, String),

    #[error("[{0}] AWS region not configured: {1}")]
    AwsRegion(String, String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cluster has no orchestrator reference: {0}")]
    OrchestratorNotFound(String),

    #[error("Kubernetes API error: {0}")]
    KubernetesApi(String),

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(String),

    #[error("Node {node} has unexpected health status '{status}'")]
    UnexpectedHealthStatus { node: String, status: String },

    #[error("Timeout waiting for {operation}: {details}")]
    Timeout { operation: String, details: String },
}

impl HypcapError {
    /// Create an AWS SDK error from any error type.
    /// Analyzes the error message to provide more specific error types.
    pub fn aws<E: std::fmt::Debug + std::fmt::Display>(component: &str, err: E) -> Self {
        let err_debug = format!("{err:?}");
        let err_display = err.to_string();
        let component = component.to_string();

        let combined_lower = format!("{err_display} {err_debug}").to_lowercase();

        if CREDENTIAL_MARKERS
            .iter()
            .any(|marker| combined_lower.contains(marker))
        {
            return Self::AwsCredentials(
                component,
                Self::extract_error_details(&err_debug, &err_display),
            );
        }

        if REGION_MARKERS
            .iter()
            .any(|marker| combined_lower.contains(marker))
        {
            return Self::AwsRegion(
                component,
                Self::extract_error_details(&err_debug, &err_display),
            );
        }

        Self::AwsSdk(
            component,
            Self::extract_error_details(&err_debug, &err_display),
        )
    }

    /// Whether this error means the caller cannot talk to AWS at all.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::AwsCredentials(..) | Self::AwsRegion(..))
    }

    /// Extract the `message` field from an AWS SDK error as a single line.
    fn extract_error_details(debug_str: &str, display_str: &str) -> String {
        if let Some(pos) = debug_str.find("message: Some(\"") {
            let rest = &debug_str[pos + "message: Some(\"".len()..];
            if let Some(end) = rest.find('"') {
                return rest[..end].to_string();
            }
        }

        if !display_str.to_lowercase().contains("service error") {
            return display_str.to_string();
        }

        "AWS API request failed".to_string()
    }
}

const CREDENTIAL_MARKERS: &[&str] = &[
    "no credentials",
    "credentials not found",
    "invalid credentials",
    "expired token",
    "expiredtoken",
    "the security token included in the request is invalid",
    "the security token included in the request is expired",
    "unrecognized client",
    "invalidclienttokenid",
    "signaturedoesnotmatch",
    "access denied",
    "not authorized",
    "accessdenied",
];

const REGION_MARKERS: &[&str] = &["no region", "region not found", "missing region"];

/// Outcome classes of a capacity collection run.
///
/// Only `Fatal` escapes [`crate::capacity::engine::CapacityEngine::collect`];
/// `PerCluster` is logged and the cluster is left out of the report.
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("{0:#}")]
    Fatal(anyhow::Error),

    #[error("cluster {cluster}: {cause:#}")]
    PerCluster { cluster: ClusterId, cause: anyhow::Error },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unexpected_health_status() {
        let err = HypcapError::UnexpectedHealthStatus {
            node: "hyperpod-i-0abc".to_string(),
            status: "Unexpected".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Node hyperpod-i-0abc has unexpected health status 'Unexpected'"
        );
    }

    #[test]
    fn test_error_display_timeout() {
        let err = HypcapError::Timeout {
            operation: "cluster ml-cluster".to_string(),
            details: "exceeded 120s".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Timeout waiting for cluster ml-cluster: exceeded 120s"
        );
    }

    #[test]
    fn test_error_aws_helper_generic() {
        let err = HypcapError::aws("aws::sagemaker", "connection failed");
        assert!(matches!(err, HypcapError::AwsSdk(_, _)));
        assert!(err.to_string().contains("[aws::sagemaker]"));
        assert!(err.to_string().contains("connection failed"));
        assert!(!err.is_setup_failure());
    }

    #[test]
    fn test_error_aws_credentials_no_credentials() {
        let err = HypcapError::aws("aws::sts", "No credentials in the property bag");
        assert!(matches!(err, HypcapError::AwsCredentials(_, _)));
        assert!(err.to_string().contains("AWS credentials error"));
        assert!(err.is_setup_failure());
    }

    #[test]
    fn test_error_aws_credentials_expired() {
        let err = HypcapError::aws(
            "aws::sagemaker",
            "The security token included in the request is expired",
        );
        assert!(matches!(err, HypcapError::AwsCredentials(_, _)));
    }

    #[test]
    fn test_error_aws_region_missing() {
        let err = HypcapError::aws("aws::config", "No region was found");
        assert!(matches!(err, HypcapError::AwsRegion(_, _)));
        assert!(err.to_string().contains("AWS region not configured"));
        assert!(err.is_setup_failure());
    }

    #[test]
    fn test_extract_error_details_from_debug_message() {
        let details = HypcapError::extract_error_details(
            "ServiceError { message: Some(\"Cluster not found\") }",
            "service error",
        );
        assert_eq!(details, "Cluster not found");
    }

    #[test]
    fn test_extract_error_details_generic_service_error() {
        let details = HypcapError::extract_error_details("ServiceError {}", "service error");
        assert_eq!(details, "AWS API request failed");
    }

    #[test]
    fn test_collect_error_per_cluster_display() {
        let err = CollectError::PerCluster {
            cluster: "ml-cluster-a".to_string(),
            cause: anyhow::anyhow!("describe failed"),
        };
        assert_eq!(err.to_string(), "cluster ml-cluster-a: describe failed");
    }
}
