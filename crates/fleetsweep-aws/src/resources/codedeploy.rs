//! CodeDeploy applications

use super::{AwsController, KindSpec, ResourceApi, ResourceRecord, to_chrono};
use crate::context::AwsContext;
use crate::error::{AwsError, from_sdk};
use async_trait::async_trait;
use aws_sdk_codedeploy::types::ApplicationInfo;
use fleetsweep_core::ResourceValue;

pub const NAME: &str = "codedeploy-application";

pub const SPEC: KindSpec = KindSpec {
    name: NAME,
    max_batch_size: 100,
    completion: None,
};

/// BatchGetApplications accepts at most this many names
const DESCRIBE_CHUNK: usize = 100;

pub struct CodeDeployApi {
    client: aws_sdk_codedeploy::Client,
}

pub fn controller(ctx: &AwsContext) -> AwsController<CodeDeployApi> {
    AwsController::new(
        SPEC,
        CodeDeployApi {
            client: ctx.codedeploy_client(),
        },
    )
}

fn record(info: &ApplicationInfo) -> Option<ResourceRecord> {
    let name = info.application_name()?;
    Some(ResourceRecord::new(
        name,
        ResourceValue {
            name: Some(name.to_string()),
            creation_time: info.create_time().and_then(to_chrono),
            tags: None,
        },
    ))
}

impl CodeDeployApi {
    async fn list_names(&self) -> Result<Vec<String>, AwsError> {
        let mut names = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .list_applications()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(from_sdk)?;
            names.extend(output.applications().iter().cloned());

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl ResourceApi for CodeDeployApi {
    async fn list(&self) -> Result<Vec<ResourceRecord>, AwsError> {
        let names = self.list_names().await?;

        let mut records = Vec::with_capacity(names.len());
        for chunk in names.chunks(DESCRIBE_CHUNK) {
            let output = self
                .client
                .batch_get_applications()
                .set_application_names(Some(chunk.to_vec()))
                .send()
                .await
                .map_err(from_sdk)?;
            records.extend(output.applications_info().iter().filter_map(record));
        }
        Ok(records)
    }

    async fn delete(&self, identifier: &str) -> Result<(), AwsError> {
        self.client
            .delete_application()
            .application_name(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }
}
