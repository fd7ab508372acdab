//! DynamoDB tables

use super::{AwsController, KindSpec, ResourceApi, ResourceRecord, to_chrono};
use crate::context::AwsContext;
use crate::error::{AwsError, from_sdk};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::TableDescription;
use fleetsweep_core::{ResourceValue, WaitPolicy};
use std::time::Duration;

pub const NAME: &str = "dynamodb";

pub const SPEC: KindSpec = KindSpec {
    name: NAME,
    max_batch_size: 49,
    completion: Some(WaitPolicy::new(Duration::from_secs(5), 60)),
};

pub struct DynamoDbApi {
    client: aws_sdk_dynamodb::Client,
}

pub fn controller(ctx: &AwsContext) -> AwsController<DynamoDbApi> {
    AwsController::new(
        SPEC,
        DynamoDbApi {
            client: ctx.dynamodb_client(),
        },
    )
}

fn record(name: &str, table: Option<&TableDescription>) -> ResourceRecord {
    ResourceRecord::new(
        name,
        ResourceValue {
            name: Some(name.to_string()),
            creation_time: table
                .and_then(|t| t.creation_date_time())
                .and_then(to_chrono),
            tags: None,
        },
    )
}

#[async_trait]
impl ResourceApi for DynamoDbApi {
    /// Table names come from ListTables; creation time needs one DescribeTable each
    async fn list(&self) -> Result<Vec<ResourceRecord>, AwsError> {
        let mut records = Vec::new();
        let mut start = None;
        loop {
            let output = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start)
                .send()
                .await
                .map_err(from_sdk)?;

            for name in output.table_names() {
                let described = match self.client.describe_table().table_name(name).send().await {
                    Ok(described) => described,
                    Err(e) => match from_sdk(e) {
                        // 一覧取得後に削除されたテーブル
                        err if err.is_not_found() => continue,
                        err => return Err(err),
                    },
                };
                records.push(record(name, described.table()));
            }

            start = output.last_evaluated_table_name().map(str::to_string);
            if start.is_none() {
                break;
            }
        }
        Ok(records)
    }

    async fn delete(&self, identifier: &str) -> Result<(), AwsError> {
        self.client
            .delete_table()
            .table_name(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    /// A table in DELETING state still describes successfully
    async fn exists(&self, identifier: &str) -> Result<bool, AwsError> {
        match self
            .client
            .describe_table()
            .table_name(identifier)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let err = from_sdk(e);
                if err.is_not_found() {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::primitives::DateTime;

    #[test]
    fn test_record_carries_creation_time() {
        let table = TableDescription::builder()
            .table_name("ci-orders")
            .creation_date_time(DateTime::from_secs(1_600_000_000))
            .build();

        let record = record("ci-orders", Some(&table));
        assert_eq!(record.identifier, "ci-orders");
        assert_eq!(record.value.creation_time.unwrap().timestamp(), 1_600_000_000);
        assert!(record.value.tags.is_none());
    }

    #[test]
    fn test_record_without_description() {
        let record = record("ci-orders", None);
        assert_eq!(record.value.name.as_deref(), Some("ci-orders"));
        assert!(record.value.creation_time.is_none());
    }
}
