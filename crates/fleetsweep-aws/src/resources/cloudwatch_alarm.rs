//! CloudWatch alarms
//!
//! DeleteAlarms removes up to 100 alarms per call, so a batch is one request
//! and a failed request fails the whole batch. Composite alarms are listed
//! first: a metric alarm referenced by a composite alarm cannot be deleted
//! before it.

use super::{AwsController, KindSpec, ResourceApi, ResourceRecord, to_chrono};
use crate::context::AwsContext;
use crate::error::{AwsError, from_sdk};
use async_trait::async_trait;
use aws_sdk_cloudwatch::types::AlarmType;
use fleetsweep_core::ResourceValue;

pub const NAME: &str = "cloudwatch-alarm";

pub const SPEC: KindSpec = KindSpec {
    name: NAME,
    max_batch_size: 99,
    completion: None,
};

pub struct CloudWatchAlarmApi {
    client: aws_sdk_cloudwatch::Client,
}

pub fn controller(ctx: &AwsContext) -> AwsController<CloudWatchAlarmApi> {
    AwsController::new(
        SPEC,
        CloudWatchAlarmApi {
            client: ctx.cloudwatch_client(),
        },
    )
}

fn record(name: Option<&str>, updated: Option<&aws_sdk_cloudwatch::primitives::DateTime>) -> Option<ResourceRecord> {
    let name = name?;
    Some(ResourceRecord::new(
        name,
        ResourceValue {
            name: Some(name.to_string()),
            creation_time: updated.and_then(to_chrono),
            tags: None,
        },
    ))
}

#[async_trait]
impl ResourceApi for CloudWatchAlarmApi {
    /// Alarms carry no creation time; the last configuration update stands in
    async fn list(&self) -> Result<Vec<ResourceRecord>, AwsError> {
        let mut composite = Vec::new();
        let mut metric = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .describe_alarms()
                .alarm_types(AlarmType::CompositeAlarm)
                .alarm_types(AlarmType::MetricAlarm)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(from_sdk)?;

            composite.extend(output.composite_alarms().iter().filter_map(|alarm| {
                record(
                    alarm.alarm_name(),
                    alarm.alarm_configuration_updated_timestamp(),
                )
            }));
            metric.extend(output.metric_alarms().iter().filter_map(|alarm| {
                record(
                    alarm.alarm_name(),
                    alarm.alarm_configuration_updated_timestamp(),
                )
            }));

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        composite.extend(metric);
        Ok(composite)
    }

    async fn delete(&self, identifier: &str) -> Result<(), AwsError> {
        self.client
            .delete_alarms()
            .alarm_names(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    fn supports_batch_delete(&self) -> bool {
        true
    }

    async fn delete_batch(&self, identifiers: &[String]) -> Result<(), AwsError> {
        self.client
            .delete_alarms()
            .set_alarm_names(Some(identifiers.to_vec()))
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }
}
