//! Document store access
//!
//! The query layer only needs two driver calls per listing: a count and a
//! sorted, bounded find. [`DocumentStore`] is that seam; [`MemoryStore`] is the
//! in-process implementation used by tests and the CLI.

pub mod matcher;
pub mod memory;

use async_trait::async_trait;
use bson::Document;

pub use memory::{MemoryStore, MemoryStoreError};

/// Options for a find call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Sort specification, e.g. `{ "_id": -1 }`
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn sorted(sort: Document) -> Self {
        Self {
            sort: Some(sort),
            ..Default::default()
        }
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A store that executes predicate documents against named collections.
///
/// Errors are the driver's own and are passed through the query layer untouched.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn count_documents(&self, collection: &str, filter: Document)
    -> Result<u64, Self::Error>;

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, Self::Error>;
}
