//! AWS resource kinds
//!
//! Every kind is an [`AwsController`] over a narrow [`ResourceApi`]: the SDK
//! implementation of the API holds nothing but a service client, so the
//! controller logic is exercised in tests against fakes.

pub mod cloudwatch_alarm;
pub mod codedeploy;
pub mod dynamodb;
pub mod ec2_key_pair;
pub mod ecr;
pub mod rds_subnet_group;
pub mod transit_gateway;

use crate::context::AwsContext;
use crate::error::AwsError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleetsweep_core::{
    Config, ExecutionContext, ItemOutcome, ProbeStatus, ResourceController, ResourceValue,
    SweepError, WaitPolicy,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Every supported kind, in the order units are submitted
pub const RESOURCE_NAMES: &[&str] = &[
    ec2_key_pair::NAME,
    transit_gateway::ATTACHMENT_NAME,
    transit_gateway::ROUTE_TABLE_NAME,
    transit_gateway::GATEWAY_NAME,
    dynamodb::NAME,
    ecr::NAME,
    rds_subnet_group::NAME,
    codedeploy::NAME,
    cloudwatch_alarm::NAME,
];

/// One listed resource: its identifier and the facts the filters see
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub identifier: String,
    pub value: ResourceValue,
}

impl ResourceRecord {
    pub fn new(identifier: impl Into<String>, value: ResourceValue) -> Self {
        Self {
            identifier: identifier.into(),
            value,
        }
    }

    /// Record whose identifier is also its name
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: ResourceValue::new().with_name(name.clone()),
            identifier: name,
        }
    }
}

/// Service calls one resource kind needs
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Every resource of the kind in the client's region
    async fn list(&self) -> Result<Vec<ResourceRecord>, AwsError>;

    /// Delete one resource
    async fn delete(&self, identifier: &str) -> Result<(), AwsError>;

    /// `true` when the service offers a single call deleting many resources
    fn supports_batch_delete(&self) -> bool {
        false
    }

    /// Delete all `identifiers` in one call
    async fn delete_batch(&self, identifiers: &[String]) -> Result<(), AwsError> {
        for identifier in identifiers {
            self.delete(identifier).await?;
        }
        Ok(())
    }

    /// Whether the resource still exists
    async fn exists(&self, _identifier: &str) -> Result<bool, AwsError> {
        Ok(false)
    }
}

/// Static facts about a kind
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub name: &'static str,
    pub max_batch_size: usize,
    /// Set for kinds whose delete call returns before the resource is gone
    pub completion: Option<WaitPolicy>,
}

/// [`ResourceController`] for one AWS kind
pub struct AwsController<A> {
    spec: KindSpec,
    api: A,
}

impl<A: ResourceApi> AwsController<A> {
    pub fn new(spec: KindSpec, api: A) -> Self {
        Self { spec, api }
    }

    pub fn spec(&self) -> &KindSpec {
        &self.spec
    }

    async fn delete_each(&self, batch: &[String]) -> Vec<ItemOutcome> {
        let mut outcomes = Vec::with_capacity(batch.len());
        for identifier in batch {
            let outcome = match self.api.delete(identifier).await {
                Ok(()) => ItemOutcome::accepted(identifier),
                Err(e) if e.is_not_found() => {
                    debug!(identifier = %identifier, "Already deleted");
                    ItemOutcome::accepted(identifier)
                }
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "Delete rejected");
                    ItemOutcome::failed(
                        identifier,
                        SweepError::per_item(self.spec.name, identifier, e),
                    )
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[async_trait]
impl<A: ResourceApi + 'static> ResourceController for AwsController<A> {
    fn resource_name(&self) -> &str {
        self.spec.name
    }

    fn max_batch_size(&self) -> usize {
        self.spec.max_batch_size
    }

    async fn discover(
        &self,
        ctx: &ExecutionContext,
        config: &Config,
    ) -> fleetsweep_core::Result<Vec<String>> {
        let records = self
            .api
            .list()
            .await
            .map_err(|e| SweepError::discovery(self.spec.name, ctx.region(), e))?;

        let rules = config.for_kind(self.spec.name);
        let listed = records.len();
        let ids: Vec<String> = records
            .into_iter()
            .filter(|record| rules.should_include(&record.value))
            .map(|record| record.identifier)
            .collect();

        debug!(listed, selected = ids.len(), "Discovered {}", self.spec.name);
        Ok(ids)
    }

    async fn delete(
        &self,
        ctx: &ExecutionContext,
        batch: &[String],
    ) -> fleetsweep_core::Result<Vec<ItemOutcome>> {
        if !self.api.supports_batch_delete() {
            return Ok(self.delete_each(batch).await);
        }

        self.api.delete_batch(batch).await.map_err(|e| {
            SweepError::batch_transport(self.spec.name, ctx.region(), batch.len(), e)
        })?;
        Ok(batch.iter().map(ItemOutcome::accepted).collect())
    }

    fn completion(&self) -> Option<WaitPolicy> {
        self.spec.completion
    }

    async fn probe(
        &self,
        _ctx: &ExecutionContext,
        identifier: &str,
    ) -> fleetsweep_core::Result<ProbeStatus> {
        match self.api.exists(identifier).await {
            Ok(true) => Ok(ProbeStatus::StillPresent),
            Ok(false) => Ok(ProbeStatus::Gone),
            Err(e) if e.is_not_found() => Ok(ProbeStatus::Gone),
            Err(e) => Err(SweepError::probe(self.spec.name, identifier, e)),
        }
    }
}

/// Controllers for every kind in `ctx`'s region, in [`RESOURCE_NAMES`] order
pub fn registry(ctx: &AwsContext) -> Vec<Arc<dyn ResourceController>> {
    vec![
        Arc::new(ec2_key_pair::controller(ctx)),
        Arc::new(transit_gateway::attachment_controller(ctx)),
        Arc::new(transit_gateway::route_table_controller(ctx)),
        Arc::new(transit_gateway::gateway_controller(ctx)),
        Arc::new(dynamodb::controller(ctx)),
        Arc::new(ecr::controller(ctx)),
        Arc::new(rds_subnet_group::controller(ctx)),
        Arc::new(codedeploy::controller(ctx)),
        Arc::new(cloudwatch_alarm::controller(ctx)),
    ]
}

/// EC2 tags as a key/value map; tags missing either half are dropped
pub(crate) fn ec2_tags(tags: &[aws_sdk_ec2::types::Tag]) -> HashMap<String, String> {
    tags.iter()
        .filter_map(|tag| Some((tag.key()?.to_string(), tag.value()?.to_string())))
        .collect()
}

/// Convert an SDK timestamp
pub(crate) fn to_chrono(time: &aws_sdk_ec2::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}
