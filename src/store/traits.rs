use crate::error::StoreError;
use crate::store::types::{Fields, Query, Snapshot};
use async_trait::async_trait;

/// Common trait for document store backends.
/// Lets the item service run against the hosted database or an in-process one.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a filtered, ordered, bounded query
    async fn query(&self, query: &Query) -> Result<Vec<Snapshot>, StoreError>;

    /// Fetch one document. A missing document is `Ok(None)`.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Insert a document and return its server-assigned id
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Overwrite the given fields of an existing document
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Atomically add `by` to a numeric field of an existing document
    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        by: i64,
    ) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Get the name of the backend
    fn backend_name(&self) -> &'static str;
}
