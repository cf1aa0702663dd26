use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

mod memory;
mod rest;

pub use memory::*;
pub use rest::*;

pub type Result<T> = std::result::Result<T, StoreError>;

/// The records of a collection, keyed by their store-generated identifier.
///
/// A `BTreeMap` so iteration follows key order, which is the record order the
/// store exposes within a session.
pub type Records = BTreeMap<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The request never completed
    #[error("request to `{collection}` failed: {source}")]
    Transport {
        collection: String,
        source: reqwest::Error,
    },
    /// The store answered with a non-success status
    #[error("`{collection}` responded with status {status}")]
    Status { collection: String, status: u16 },
    /// The response body was not the expected shape
    #[error("failed to decode response from `{collection}`: {source}")]
    Decode {
        collection: String,
        source: reqwest::Error,
    },
    /// The store cannot be reached at all
    #[error("store is unavailable: {0}")]
    Unavailable(String),
}

/// Represents a remote store of keyed record collections.
///
/// Every operation is a single attempt. There are no retries and no request
/// timeouts; a hung call hangs its caller.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Returns every record in a collection. An absent collection is an
    /// empty map, not an error.
    async fn fetch_all(&self, collection: &str) -> Result<Records>;

    /// Returns the records of a collection whose `field` equals `value`.
    async fn query_equal(&self, collection: &str, field: &str, value: &str) -> Result<Records>;

    /// Writes a new record, returning its generated key.
    async fn create(&self, collection: &str, record: Value) -> Result<String>;

    /// Merges a partial record into the record at `key`.
    async fn merge(&self, collection: &str, key: &str, partial: Value) -> Result<()>;
}
