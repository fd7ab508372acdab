//! RDS DB subnet groups

use super::{AwsController, KindSpec, ResourceApi, ResourceRecord};
use crate::context::AwsContext;
use crate::error::{AwsError, from_sdk};
use async_trait::async_trait;
use fleetsweep_core::WaitPolicy;
use std::time::Duration;

pub const NAME: &str = "rds-subnet-group";

/// Deletion can take up to 15 minutes to become visible
pub const SPEC: KindSpec = KindSpec {
    name: NAME,
    max_batch_size: 49,
    completion: Some(WaitPolicy::new(Duration::from_secs(10), 90)),
};

pub struct DbSubnetGroupApi {
    client: aws_sdk_rds::Client,
}

pub fn controller(ctx: &AwsContext) -> AwsController<DbSubnetGroupApi> {
    AwsController::new(
        SPEC,
        DbSubnetGroupApi {
            client: ctx.rds_client(),
        },
    )
}

#[async_trait]
impl ResourceApi for DbSubnetGroupApi {
    /// Subnet groups expose neither a creation time nor inline tags
    async fn list(&self) -> Result<Vec<ResourceRecord>, AwsError> {
        let mut records = Vec::new();
        let mut marker = None;
        loop {
            let output = self
                .client
                .describe_db_subnet_groups()
                .set_marker(marker)
                .send()
                .await
                .map_err(from_sdk)?;
            records.extend(
                output
                    .db_subnet_groups()
                    .iter()
                    .filter_map(|group| group.db_subnet_group_name())
                    .map(ResourceRecord::named),
            );

            marker = output.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(records)
    }

    async fn delete(&self, identifier: &str) -> Result<(), AwsError> {
        self.client
            .delete_db_subnet_group()
            .db_subnet_group_name(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    /// DBSubnetGroupNotFoundFault is classified as not found, which means gone
    async fn exists(&self, identifier: &str) -> Result<bool, AwsError> {
        let output = self
            .client
            .describe_db_subnet_groups()
            .db_subnet_group_name(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(!output.db_subnet_groups().is_empty())
    }
}
