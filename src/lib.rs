pub mod buckets;
pub mod config;
pub mod dynamo_store;
pub mod record;
pub mod store;
pub mod verifier;
