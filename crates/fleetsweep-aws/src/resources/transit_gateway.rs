//! Transit gateways, their VPC attachments and route tables
//!
//! All three delete asynchronously and report a `deleting` state in between;
//! resources already on their way out are not listed again.

use super::{AwsController, KindSpec, ResourceApi, ResourceRecord, ec2_tags, to_chrono};
use crate::context::AwsContext;
use crate::error::{AwsError, from_sdk};
use async_trait::async_trait;
use aws_sdk_ec2::types::{
    Tag, TransitGateway, TransitGatewayAttachmentState, TransitGatewayRouteTable,
    TransitGatewayRouteTableState, TransitGatewayState, TransitGatewayVpcAttachment,
};
use fleetsweep_core::{ResourceValue, WaitPolicy};
use std::time::Duration;

pub const ATTACHMENT_NAME: &str = "transit-gateway-attachment";
pub const ROUTE_TABLE_NAME: &str = "transit-gateway-route-table";
pub const GATEWAY_NAME: &str = "transit-gateway";

const MAX_BATCH_SIZE: usize = 50;
const WAIT: WaitPolicy = WaitPolicy::new(Duration::from_secs(10), 60);

pub const ATTACHMENT_SPEC: KindSpec = KindSpec {
    name: ATTACHMENT_NAME,
    max_batch_size: MAX_BATCH_SIZE,
    completion: Some(WAIT),
};

pub const ROUTE_TABLE_SPEC: KindSpec = KindSpec {
    name: ROUTE_TABLE_NAME,
    max_batch_size: MAX_BATCH_SIZE,
    completion: None,
};

pub const GATEWAY_SPEC: KindSpec = KindSpec {
    name: GATEWAY_NAME,
    max_batch_size: MAX_BATCH_SIZE,
    completion: Some(WAIT),
};

pub fn attachment_controller(ctx: &AwsContext) -> AwsController<AttachmentApi> {
    AwsController::new(
        ATTACHMENT_SPEC,
        AttachmentApi {
            client: ctx.ec2_client(),
        },
    )
}

pub fn route_table_controller(ctx: &AwsContext) -> AwsController<RouteTableApi> {
    AwsController::new(
        ROUTE_TABLE_SPEC,
        RouteTableApi {
            client: ctx.ec2_client(),
        },
    )
}

pub fn gateway_controller(ctx: &AwsContext) -> AwsController<GatewayApi> {
    AwsController::new(
        GATEWAY_SPEC,
        GatewayApi {
            client: ctx.ec2_client(),
        },
    )
}

/// Name tag plus all tags, creation time
fn value(tags: &[Tag], created: Option<&aws_sdk_ec2::primitives::DateTime>) -> ResourceValue {
    let tags = ec2_tags(tags);
    ResourceValue {
        name: tags.get("Name").cloned(),
        creation_time: created.and_then(to_chrono),
        tags: Some(tags),
    }
}

fn gateway_record(gateway: &TransitGateway) -> Option<ResourceRecord> {
    if matches!(
        gateway.state(),
        Some(TransitGatewayState::Deleting | TransitGatewayState::Deleted)
    ) {
        return None;
    }
    let id = gateway.transit_gateway_id()?;
    Some(ResourceRecord::new(
        id,
        value(gateway.tags(), gateway.creation_time()),
    ))
}

fn attachment_record(attachment: &TransitGatewayVpcAttachment) -> Option<ResourceRecord> {
    if matches!(
        attachment.state(),
        Some(TransitGatewayAttachmentState::Deleting | TransitGatewayAttachmentState::Deleted)
    ) {
        return None;
    }
    let id = attachment.transit_gateway_attachment_id()?;
    Some(ResourceRecord::new(
        id,
        value(attachment.tags(), attachment.creation_time()),
    ))
}

/// Default association route tables go away with their gateway
fn route_table_record(table: &TransitGatewayRouteTable) -> Option<ResourceRecord> {
    if table.default_association_route_table() == Some(true) {
        return None;
    }
    if matches!(
        table.state(),
        Some(TransitGatewayRouteTableState::Deleting | TransitGatewayRouteTableState::Deleted)
    ) {
        return None;
    }
    let id = table.transit_gateway_route_table_id()?;
    Some(ResourceRecord::new(
        id,
        value(table.tags(), table.creation_time()),
    ))
}

pub struct GatewayApi {
    client: aws_sdk_ec2::Client,
}

#[async_trait]
impl ResourceApi for GatewayApi {
    async fn list(&self) -> Result<Vec<ResourceRecord>, AwsError> {
        let mut records = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .describe_transit_gateways()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(from_sdk)?;
            records.extend(output.transit_gateways().iter().filter_map(gateway_record));

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(records)
    }

    async fn delete(&self, identifier: &str) -> Result<(), AwsError> {
        self.client
            .delete_transit_gateway()
            .transit_gateway_id(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    async fn exists(&self, identifier: &str) -> Result<bool, AwsError> {
        let output = self
            .client
            .describe_transit_gateways()
            .transit_gateway_ids(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(output
            .transit_gateways()
            .iter()
            .any(|g| g.state() != Some(&TransitGatewayState::Deleted)))
    }
}

pub struct AttachmentApi {
    client: aws_sdk_ec2::Client,
}

#[async_trait]
impl ResourceApi for AttachmentApi {
    async fn list(&self) -> Result<Vec<ResourceRecord>, AwsError> {
        let mut records = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .describe_transit_gateway_vpc_attachments()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(from_sdk)?;
            records.extend(
                output
                    .transit_gateway_vpc_attachments()
                    .iter()
                    .filter_map(attachment_record),
            );

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(records)
    }

    async fn delete(&self, identifier: &str) -> Result<(), AwsError> {
        self.client
            .delete_transit_gateway_vpc_attachment()
            .transit_gateway_attachment_id(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }

    async fn exists(&self, identifier: &str) -> Result<bool, AwsError> {
        let output = self
            .client
            .describe_transit_gateway_vpc_attachments()
            .transit_gateway_attachment_ids(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(output
            .transit_gateway_vpc_attachments()
            .iter()
            .any(|a| a.state() != Some(&TransitGatewayAttachmentState::Deleted)))
    }
}

pub struct RouteTableApi {
    client: aws_sdk_ec2::Client,
}

#[async_trait]
impl ResourceApi for RouteTableApi {
    async fn list(&self) -> Result<Vec<ResourceRecord>, AwsError> {
        let mut records = Vec::new();
        let mut next_token = None;
        loop {
            let output = self
                .client
                .describe_transit_gateway_route_tables()
                .set_next_token(next_token)
                .send()
                .await
                .map_err(from_sdk)?;
            records.extend(
                output
                    .transit_gateway_route_tables()
                    .iter()
                    .filter_map(route_table_record),
            );

            next_token = output.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        Ok(records)
    }

    async fn delete(&self, identifier: &str) -> Result<(), AwsError> {
        self.client
            .delete_transit_gateway_route_table()
            .transit_gateway_route_table_id(identifier)
            .send()
            .await
            .map_err(from_sdk)?;
        Ok(())
    }
}
