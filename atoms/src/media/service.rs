use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_dynamodb::types::AttributeValue;
use super::model::{GalleryItem, UpdateGalleryItemPayload};
use std::collections::HashMap;

pub(crate) fn project_pk(project_id: &str) -> String {
    format!("PROJECT#{}", project_id)
}

fn image_sk(image_id: &str) -> String {
    format!("IMAGE#{}", image_id)
}

/// Build a GalleryItem out of a raw DynamoDB row. Rows without an IMAGE# sort key are skipped.
pub fn item_from_row(project_id: &str, item: &HashMap<String, AttributeValue>) -> Option<GalleryItem> {
    let sk = item.get("SK").and_then(|v| v.as_s().ok())?;
    let image_id = sk.strip_prefix("IMAGE#")?;

    Some(GalleryItem {
        image_id: image_id.to_string(),
        project_id: project_id.to_string(),
        locator: item.get("locator").and_then(|v| v.as_s().ok()).map(|s| s.to_string()).unwrap_or_default(),
        label: item.get("label").and_then(|v| v.as_s().ok()).map(|s| s.to_string()).unwrap_or_default(),
        position: item.get("position").and_then(|v| v.as_n().ok()).and_then(|n| n.parse().ok()).unwrap_or(u32::MAX),
        uploaded_at: item.get("uploaded_at").and_then(|v| v.as_s().ok()).map(|s| s.to_string()).unwrap_or_default(),
    })
}

/// Display order: position, then upload time, then id so ties are stable
pub fn sort_by_position(items: &mut [GalleryItem]) {
    items.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| a.uploaded_at.cmp(&b.uploaded_at))
            .then_with(|| a.image_id.cmp(&b.image_id))
    });
}

/// Load all gallery items for a project, sorted by position
pub async fn load_items_for_project(
    client: &DynamoClient,
    table_name: &str,
    project_id: &str,
) -> Result<Vec<GalleryItem>, String> {
    let mut items = Vec::new();
    let mut start_key: Option<HashMap<String, AttributeValue>> = None;

    loop {
        let result = client
            .query()
            .table_name(table_name)
            .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(project_pk(project_id)))
            .expression_attribute_values(":sk_prefix", AttributeValue::S("IMAGE#".to_string()))
            .set_exclusive_start_key(start_key.take())
            .send()
            .await
            .map_err(|e| format!("DynamoDB query error: {}", e))?;

        items.extend(result.items().iter().filter_map(|row| item_from_row(project_id, row)));

        match result.last_evaluated_key() {
            Some(key) if !key.is_empty() => start_key = Some(key.clone()),
            _ => break,
        }
    }

    sort_by_position(&mut items);
    Ok(items)
}

/// Write a new gallery row. Fails if the id already exists so ids are never reused.
pub async fn create_item(
    client: &DynamoClient,
    table_name: &str,
    item: &GalleryItem,
) -> Result<(), String> {
    client
        .put_item()
        .table_name(table_name)
        .item("PK", AttributeValue::S(project_pk(&item.project_id)))
        .item("SK", AttributeValue::S(image_sk(&item.image_id)))
        .item("locator", AttributeValue::S(item.locator.clone()))
        .item("label", AttributeValue::S(item.label.clone()))
        .item("position", AttributeValue::N(item.position.to_string()))
        .item("uploaded_at", AttributeValue::S(item.uploaded_at.clone()))
        .condition_expression("attribute_not_exists(SK)")
        .send()
        .await
        .map_err(|e| format!("DynamoDB put_item error: {}", e))?;

    Ok(())
}

/// Get a specific gallery item
pub async fn get_item(
    client: &DynamoClient,
    table_name: &str,
    project_id: &str,
    image_id: &str,
) -> Result<GalleryItem, String> {
    let result = client
        .get_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(project_pk(project_id)))
        .key("SK", AttributeValue::S(image_sk(image_id)))
        .send()
        .await
        .map_err(|e| format!("DynamoDB get_item error: {}", e))?;

    result
        .item()
        .and_then(|row| item_from_row(project_id, row))
        .ok_or_else(|| "Image not found".to_string())
}

/// Apply a partial update without reading the row back.
/// The row must already exist: a late write never resurrects a deleted item.
pub async fn apply_update(
    client: &DynamoClient,
    table_name: &str,
    project_id: &str,
    image_id: &str,
    payload: &UpdateGalleryItemPayload,
) -> Result<(), String> {
    let mut update_expr = vec![];
    let mut expr_names = HashMap::new();
    let mut expr_values = HashMap::new();

    if let Some(label) = &payload.label {
        update_expr.push("#label = :label");
        expr_names.insert("#label".to_string(), "label".to_string());
        expr_values.insert(":label".to_string(), AttributeValue::S(label.clone()));
    }

    // POSITION is a DynamoDB reserved word
    if let Some(position) = payload.position {
        update_expr.push("#position = :position");
        expr_names.insert("#position".to_string(), "position".to_string());
        expr_values.insert(":position".to_string(), AttributeValue::N(position.to_string()));
    }

    if update_expr.is_empty() {
        return Ok(());
    }

    let mut builder = client
        .update_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(project_pk(project_id)))
        .key("SK", AttributeValue::S(image_sk(image_id)))
        .update_expression(format!("SET {}", update_expr.join(", ")))
        .condition_expression("attribute_exists(SK)");

    for (k, v) in expr_names {
        builder = builder.expression_attribute_names(k, v);
    }

    for (k, v) in expr_values {
        builder = builder.expression_attribute_values(k, v);
    }

    builder.send().await.map_err(|e| format!("DynamoDB update_item error: {}", e))?;
    Ok(())
}

/// Set only the position of an item (convenience function)
pub async fn update_position(
    client: &DynamoClient,
    table_name: &str,
    project_id: &str,
    image_id: &str,
    position: u32,
) -> Result<(), String> {
    let payload = UpdateGalleryItemPayload {
        label: None,
        position: Some(position),
    };

    apply_update(client, table_name, project_id, image_id, &payload).await
}

/// Set only the label of an item (convenience function)
pub async fn update_label(
    client: &DynamoClient,
    table_name: &str,
    project_id: &str,
    image_id: &str,
    label: &str,
) -> Result<(), String> {
    let payload = UpdateGalleryItemPayload {
        label: Some(label.to_string()),
        position: None,
    };

    apply_update(client, table_name, project_id, image_id, &payload).await
}

/// Delete a gallery row. Remaining rows are not renumbered here.
pub async fn delete_item(
    client: &DynamoClient,
    table_name: &str,
    project_id: &str,
    image_id: &str,
) -> Result<(), String> {
    client
        .delete_item()
        .table_name(table_name)
        .key("PK", AttributeValue::S(project_pk(project_id)))
        .key("SK", AttributeValue::S(image_sk(image_id)))
        .send()
        .await
        .map_err(|e| format!("DynamoDB delete_item error: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sk: &str, position: Option<&str>, uploaded_at: &str) -> HashMap<String, AttributeValue> {
        let mut row = HashMap::new();
        row.insert("PK".to_string(), AttributeValue::S("PROJECT#p1".to_string()));
        row.insert("SK".to_string(), AttributeValue::S(sk.to_string()));
        row.insert("locator".to_string(), AttributeValue::S(format!("projects/p1/{}.jpg", sk)));
        row.insert("label".to_string(), AttributeValue::S("alt".to_string()));
        row.insert("uploaded_at".to_string(), AttributeValue::S(uploaded_at.to_string()));
        if let Some(p) = position {
            row.insert("position".to_string(), AttributeValue::N(p.to_string()));
        }
        row
    }

    #[test]
    fn parses_image_rows() {
        let item = item_from_row("p1", &row("IMAGE#abc", Some("3"), "2024-01-01T00:00:00Z")).unwrap();
        assert_eq!(item.image_id, "abc");
        assert_eq!(item.project_id, "p1");
        assert_eq!(item.position, 3);
        assert_eq!(item.label, "alt");
    }

    #[test]
    fn skips_non_image_rows() {
        assert!(item_from_row("p1", &row("PROJECT#p1", Some("0"), "")).is_none());
    }

    #[test]
    fn rows_without_position_sort_last() {
        let mut items = vec![
            item_from_row("p1", &row("IMAGE#x", None, "2024-01-01T00:00:00Z")).unwrap(),
            item_from_row("p1", &row("IMAGE#y", Some("1"), "2024-01-01T00:00:00Z")).unwrap(),
            item_from_row("p1", &row("IMAGE#z", Some("1"), "2023-01-01T00:00:00Z")).unwrap(),
        ];
        sort_by_position(&mut items);
        let ids: Vec<_> = items.iter().map(|i| i.image_id.as_str()).collect();
        assert_eq!(ids, ["z", "y", "x"]);
    }
}
