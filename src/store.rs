use crate::record::Record;
use anyhow::Result;

/// Primary-key range query: one entity, timestamps strictly after a bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRangeQuery {
    pub entity_id: String,
    /// Exclusive lower bound in unix seconds
    pub after_timestamp: i64,
    pub limit: u32,
    pub newest_first: bool,
}

/// Equality query against a secondary index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    pub index_name: String,
    pub key_attribute: String,
    pub key_value: String,
    pub limit: u32,
    pub newest_first: bool,
}

/// Minimal read interface over the time-series table.
///
/// Only the first page of results is returned; callers always pass a small limit.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn query_entity_range(&self, query: &EntityRangeQuery) -> Result<Vec<Record>>;

    async fn query_index(&self, query: &IndexQuery) -> Result<Vec<Record>>;
}
