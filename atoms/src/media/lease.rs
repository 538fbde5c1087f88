use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_dynamodb::types::AttributeValue;
use std::time::Duration;

use super::service::project_pk;

/// Sort key of the per-project gallery lease row. Outside the IMAGE# prefix,
/// so gallery queries never see it.
pub const LEASE_SK: &str = "GALLERY#LEASE";

/// Take the project's gallery lease unless another holder has an unexpired one.
/// Returns `Ok(false)` when the lease is held elsewhere.
pub async fn acquire_gallery_lease(
    client: &DynamoClient,
    table_name: &str,
    project_id: &str,
    holder: &str,
    ttl: Duration,
) -> Result<bool, String> {
    let now = chrono::Utc::now().timestamp_millis();
    let expires_at = now + ttl.as_millis() as i64;

    let result = client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(project_pk(project_id)))
        .item("SK", AttributeValue::S(LEASE_SK.to_string()))
        .item("holder", AttributeValue::S(holder.to_string()))
        .item("expires_at", AttributeValue::N(expires_at.to_string()))
        .condition_expression("attribute_not_exists(SK) OR expires_at < :now")
        .expression_attribute_values(":now", AttributeValue::N(now.to_string()))
        .send()
        .await;

    match result {
        Ok(_) => Ok(true),
        Err(e) => {
            let e = e.into_service_error();
            if e.is_conditional_check_failed_exception() {
                Ok(false)
            } else {
                Err(format!("DynamoDB put_item error: {}", e))
            }
        }
    }
}

/// Delete the lease row if `holder` still owns it
pub async fn release_gallery_lease(
    client: &DynamoClient,
    table_name: &str,
    project_id: &str,
    holder: &str,
) -> Result<(), String> {
    let result = client
        .delete_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(project_pk(project_id)))
        .key("SK", AttributeValue::S(LEASE_SK.to_string()))
        .condition_expression("holder = :holder")
        .expression_attribute_values(":holder", AttributeValue::S(holder.to_string()))
        .send()
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) => {
            let e = e.into_service_error();
            // Expired and taken over by another writer: nothing left to release
            if e.is_conditional_check_failed_exception() {
                Ok(())
            } else {
                Err(format!("DynamoDB delete_item error: {}", e))
            }
        }
    }
}
