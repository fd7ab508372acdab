//! EC2 key pairs

use super::{AwsController, KindSpec, ResourceApi, ResourceRecord, ec2_tags, to_chrono};
use crate::context::AwsContext;
use crate::error::{AwsError, from_sdk};
use async_trait::async_trait;
use aws_sdk_ec2::types::KeyPairInfo;
use fleetsweep_core::ResourceValue;

pub const NAME: &str = "ec2-keypairs";

pub const SPEC: KindSpec = KindSpec {
    name: NAME,
    max_batch_size: 200,
    completion: None,
};

pub struct Ec2KeyPairApi {
    client: aws_sdk_ec2::Client,
}

impl Ec2KeyPairApi {
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
        Self { client }
    }
}

pub fn controller(ctx: &AwsContext) -> AwsController<Ec2KeyPairApi> {
    AwsController::new(SPEC, Ec2KeyPairApi::new(ctx.ec2_client()))
}

/// Key pairs are deleted by ID and filtered by key name
fn record(key_pair: &KeyPairInfo) -> Option<ResourceRecord> {
    let id = key_pair.key_pair_id()?;
    let mut value = ResourceValue::new().with_tags(ec2_tags(key_pair.tags()));
    value.name = key_pair.key_name().map(str::to_string);
    value.creation_time = key_pair.create_time().and_then(to_chrono);
    Some(ResourceRecord::new(id, value))
}

#[async_trait]
impl ResourceApi for Ec2KeyPairApi {
    async fn list(&self) -> Result<Vec<ResourceRecord>, AwsError> {
        let output = self
            .client
            .describe_key_pairs()
            .send()
            .await
            .map_err(from_sdk)?;

        Ok(output.key_pairs().iter().filter_map(record).collect())
    }

    async fn delete(&self, identifier: &str) -> Result<(), AwsError> {
        self.client
            .delete_key_pair()
            .key_pair_id(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_ec2::primitives::DateTime;
    use aws_sdk_ec2::types::Tag;

    #[test]
    fn test_record_uses_id_and_name() {
        let key_pair = KeyPairInfo::builder()
            .key_pair_id("key-0123")
            .key_name("ci-deploy")
            .create_time(DateTime::from_secs(1_700_000_000))
            .tags(Tag::builder().key("team").value("infra").build())
            .build();

        let record = record(&key_pair).unwrap();
        assert_eq!(record.identifier, "key-0123");
        assert_eq!(record.value.name.as_deref(), Some("ci-deploy"));
        assert_eq!(record.value.creation_time.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(record.value.tags.unwrap()["team"], "infra");
    }

    #[test]
    fn test_record_without_id_is_skipped() {
        let key_pair = KeyPairInfo::builder().key_name("orphan").build();
        assert!(record(&key_pair).is_none());
    }
}
