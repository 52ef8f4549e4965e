//! AWS client factory and credential preflight.

pub mod eks;
pub mod sagemaker;

use anyhow::Result;
use tracing::debug;

use crate::error::HypcapError;

/// Caller identity returned by STS.
#[derive(Debug, Clone)]
pub struct AwsIdentity {
    pub account_id: String,
    pub arn: String,
}

/// AWS clients sharing one resolved SDK configuration.
#[derive(Clone)]
pub struct AwsClients {
    pub sagemaker: aws_sdk_sagemaker::Client,
    pub eks: aws_sdk_eks::Client,
    pub sts: aws_sdk_sts::Client,
    pub region: String,
}

impl AwsClients {
    /// Load the SDK configuration for the given profile and region.
    ///
    /// Fails when no region can be resolved from the arguments or the
    /// default provider chain.
    pub async fn new(profile: Option<&str>, region: Option<&str>) -> Result<Self> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(profile) = profile {
            debug!("Using AWS profile: {}", profile);
            config_loader = config_loader.profile_name(profile);
        }

        if let Some(region) = region {
            debug!("Using AWS region: {}", region);
            config_loader = config_loader.region(aws_config::Region::new(region.to_string()));
        }

        let config = config_loader.load().await;
        let region = config.region().map(|r| r.to_string()).ok_or_else(|| {
            HypcapError::AwsRegion(
                module_path!().to_string(),
                "pass --region or set AWS_REGION".to_string(),
            )
        })?;

        Ok(Self {
            sagemaker: aws_sdk_sagemaker::Client::new(&config),
            eks: aws_sdk_eks::Client::new(&config),
            sts: aws_sdk_sts::Client::new(&config),
            region,
        })
    }

    /// Verify credentials by calling STS `GetCallerIdentity`.
    pub async fn verify_identity(&self) -> Result<AwsIdentity> {
        let resp = self
            .sts
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| HypcapError::aws("sts::get_caller_identity", e))?;

        Ok(AwsIdentity {
            account_id: resp.account().unwrap_or("unknown").to_string(),
            arn: resp.arn().unwrap_or("unknown").to_string(),
        })
    }
}
