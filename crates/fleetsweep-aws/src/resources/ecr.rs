//! ECR repositories
//!
//! Repositories are deleted with `force`, which removes their images too.

use super::{AwsController, KindSpec, ResourceApi, ResourceRecord, to_chrono};
use crate::context::AwsContext;
use crate::error::{AwsError, from_sdk};
use async_trait::async_trait;
use aws_sdk_ecr::types::Repository;
use fleetsweep_core::ResourceValue;

pub const NAME: &str = "ecr";

pub const SPEC: KindSpec = KindSpec {
    name: NAME,
    max_batch_size: 49,
    completion: None,
};

pub struct EcrApi {
    client: aws_sdk_ecr::Client,
}

pub fn controller(ctx: &AwsContext) -> AwsController<EcrApi> {
    AwsController::new(
        SPEC,
        EcrApi {
            client: ctx.ecr_client(),
        },
    )
}

fn record(repository: &Repository) -> Option<ResourceRecord> {
    let name = repository.repository_name()?;
    Some(ResourceRecord::new(
        name,
        ResourceValue {
            name: Some(name.to_string()),
            creation_time: repository.created_at().and_then(to_chrono),
            tags: None,
        },
    ))
}

#[async_trait]
impl ResourceApi for EcrApi {
    async fn list(&self) -> Result<Vec<ResourceRecord>, AwsError> {
        let mut records = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .describe_repositories()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(from_sdk)?;
            records.extend(output.repositories().iter().filter_map(record));

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(records)
    }

    async fn delete(&self, identifier: &str) -> Result<(), AwsError> {
        self.client
            .delete_repository()
            .repository_name(identifier)
            .force(true)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }
}
