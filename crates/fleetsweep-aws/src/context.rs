//! Shared AWS configuration context
//!
//! The SDK config is loaded once per region and every service client of
//! that region is built from it.

use crate::error::{AwsError, from_sdk};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;

/// Region used to enumerate enabled regions when none is given
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Clone)]
pub struct AwsContext {
    config: Arc<SdkConfig>,
    region: String,
}

impl AwsContext {
    /// Load credentials and settings from the environment for `region`
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            config: Arc::new(config),
            region: region.to_string(),
        }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn ec2_client(&self) -> aws_sdk_ec2::Client {
        aws_sdk_ec2::Client::new(self.sdk_config())
    }

    pub fn dynamodb_client(&self) -> aws_sdk_dynamodb::Client {
        aws_sdk_dynamodb::Client::new(self.sdk_config())
    }

    pub fn ecr_client(&self) -> aws_sdk_ecr::Client {
        aws_sdk_ecr::Client::new(self.sdk_config())
    }

    pub fn rds_client(&self) -> aws_sdk_rds::Client {
        aws_sdk_rds::Client::new(self.sdk_config())
    }

    pub fn codedeploy_client(&self) -> aws_sdk_codedeploy::Client {
        aws_sdk_codedeploy::Client::new(self.sdk_config())
    }

    pub fn cloudwatch_client(&self) -> aws_sdk_cloudwatch::Client {
        aws_sdk_cloudwatch::Client::new(self.sdk_config())
    }

    /// Regions enabled for the account, sorted by name
    pub async fn enabled_regions(&self) -> Result<Vec<String>, AwsError> {
        let output = self
            .ec2_client()
            .describe_regions()
            .send()
            .await
            .map_err(from_sdk)?;

        let mut regions: Vec<String> = output
            .regions()
            .iter()
            .filter_map(|r| r.region_name().map(str::to_string))
            .collect();
        regions.sort();
        Ok(regions)
    }
}

impl std::fmt::Debug for AwsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsContext")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}
