use crate::record::{AttrValue, Record, ENTITY_ID_ATTR, TIMESTAMP_ATTR};
use crate::store::{EntityRangeQuery, IndexQuery, RecordStore};
use anyhow::{anyhow, Result};
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the DynamoDB client
#[derive(Debug, Clone)]
pub struct DynamoSettings {
    pub region: String,
    pub table: String,
    /// Overrides the AWS endpoint, e.g. for DynamoDB Local
    pub endpoint_url: Option<String>,
    /// Per-operation timeout; the SDK default applies when unset
    pub timeout: Option<Duration>,
}

/// Represents a read-only client for the battery time-series table
pub struct DynamoStore {
    client: Client,
    table: String,
}

impl DynamoStore {
    /// Creates a new store from the shared AWS configuration chain
    pub async fn connect(settings: &DynamoSettings) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()));

        if let Some(url) = &settings.endpoint_url {
            loader = loader.endpoint_url(url);
        }

        if let Some(timeout) = settings.timeout {
            loader = loader.timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(timeout)
                    .build(),
            );
        }

        let sdk_config = loader.load().await;
        debug!(
            region = %settings.region,
            table = %settings.table,
            endpoint = ?settings.endpoint_url,
            "DynamoDB client configured"
        );

        Self::from_client(Client::new(&sdk_config), &settings.table)
    }

    /// Wraps an already configured SDK client
    pub fn from_client(client: Client, table: &str) -> Self {
        DynamoStore {
            client,
            table: table.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait::async_trait]
impl RecordStore for DynamoStore {
    async fn query_entity_range(&self, query: &EntityRangeQuery) -> Result<Vec<Record>> {
        debug!(
            table = %self.table,
            entity = %query.entity_id,
            after = query.after_timestamp,
            limit = query.limit,
            "querying primary key range"
        );

        let output = self
            .client
            .query()
            .table_name(&self.table)
            .key_condition_expression("#pk = :tid AND #ts > :start_time")
            .expression_attribute_names("#pk", ENTITY_ID_ATTR)
            .expression_attribute_names("#ts", TIMESTAMP_ATTR)
            .expression_attribute_values(":tid", AttributeValue::S(query.entity_id.clone()))
            .expression_attribute_values(
                ":start_time",
                AttributeValue::N(query.after_timestamp.to_string()),
            )
            .limit(limit_to_i32(query.limit))
            .scan_index_forward(!query.newest_first)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        Ok(output.items().iter().map(record_from_item).collect())
    }

    async fn query_index(&self, query: &IndexQuery) -> Result<Vec<Record>> {
        debug!(
            table = %self.table,
            index = %query.index_name,
            key = %query.key_attribute,
            value = %query.key_value,
            limit = query.limit,
            "querying secondary index"
        );

        let output = self
            .client
            .query()
            .table_name(&self.table)
            .index_name(&query.index_name)
            .key_condition_expression("#k = :v")
            .expression_attribute_names("#k", &query.key_attribute)
            .expression_attribute_values(":v", AttributeValue::S(query.key_value.clone()))
            .limit(limit_to_i32(query.limit))
            .scan_index_forward(!query.newest_first)
            .send()
            .await
            .map_err(|e| anyhow!("{}", DisplayErrorContext(&e)))?;

        Ok(output.items().iter().map(record_from_item).collect())
    }
}

fn limit_to_i32(limit: u32) -> i32 {
    i32::try_from(limit).unwrap_or(i32::MAX)
}

/// Converts a raw DynamoDB item into a store-agnostic record
pub fn record_from_item(item: &HashMap<String, AttributeValue>) -> Record {
    let attributes = item
        .iter()
        .map(|(name, value)| (name.clone(), attr_from_dynamo(value)))
        .collect();
    Record { attributes }
}

fn attr_from_dynamo(value: &AttributeValue) -> AttrValue {
    match value {
        AttributeValue::S(s) => AttrValue::Str(s.clone()),
        AttributeValue::N(n) => AttrValue::Number(n.clone()),
        AttributeValue::Bool(b) => AttrValue::Bool(*b),
        AttributeValue::Null(_) => AttrValue::Null,
        other => AttrValue::Other(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_item() {
        let mut item = HashMap::new();
        item.insert("TagID".to_string(), AttributeValue::S("BAT-0x440".to_string()));
        item.insert("Timestamp".to_string(), AttributeValue::N("1704067200".to_string()));
        item.insert("Balanced".to_string(), AttributeValue::Bool(false));
        item.insert("Note".to_string(), AttributeValue::Null(true));
        item.insert(
            "Cells".to_string(),
            AttributeValue::L(vec![AttributeValue::N("3.31".to_string())]),
        );

        let record = record_from_item(&item);

        assert_eq!(record.entity_id(), Some("BAT-0x440"));
        assert_eq!(record.timestamp(), Some(1704067200));
        assert_eq!(record.get("Balanced"), Some(&AttrValue::Bool(false)));
        assert_eq!(record.get("Note"), Some(&AttrValue::Null));
        assert!(matches!(record.get("Cells"), Some(AttrValue::Other(_))));
    }

    #[test]
    fn test_limit_to_i32_saturates() {
        assert_eq!(limit_to_i32(5), 5);
        assert_eq!(limit_to_i32(u32::MAX), i32::MAX);
    }
}
