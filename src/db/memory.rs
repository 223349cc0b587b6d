//! In-memory document store
//!
//! Holds collections of BSON documents behind a lock and evaluates queries with
//! [`super::matcher`]. Fixtures can be loaded from extended JSON.

use std::collections::HashMap;

use async_trait::async_trait;
use bson::{Bson, Document};
use parking_lot::RwLock;
use serde_json::Value;
use thiserror::Error;

use super::matcher::{self, MatchError};
use super::{DocumentStore, FindOptions};

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("invalid fixture: {0}")]
    Fixture(String),
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load fixtures from an object mapping collection name to an array of
    /// extended-JSON documents (`{"$oid": ..}`, `{"$date": ..}` are understood).
    pub fn from_json(fixtures: Value) -> Result<Self, MemoryStoreError> {
        let Value::Object(collections) = fixtures else {
            return Err(MemoryStoreError::Fixture(
                "expected an object of collections".to_string(),
            ));
        };

        let store = Self::new();
        for (name, documents) in collections {
            let Value::Array(documents) = documents else {
                return Err(MemoryStoreError::Fixture(format!(
                    "collection `{name}` must be an array"
                )));
            };

            let mut parsed = Vec::with_capacity(documents.len());
            for document in documents {
                match Bson::try_from(document) {
                    Ok(Bson::Document(doc)) => parsed.push(doc),
                    Ok(other) => {
                        return Err(MemoryStoreError::Fixture(format!(
                            "collection `{name}` holds a non-document value: {other}"
                        )));
                    }
                    Err(e) => return Err(MemoryStoreError::Fixture(e.to_string())),
                }
            }
            store.insert_many(&name, parsed);
        }
        Ok(store)
    }

    pub fn insert_one(&self, collection: &str, document: Document) {
        self.insert_many(collection, [document]);
    }

    pub fn insert_many(&self, collection: &str, documents: impl IntoIterator<Item = Document>) {
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
    }

    /// Names of the loaded collections, sorted
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn matching(&self, collection: &str, filter: &Document) -> Result<Vec<Document>, MatchError> {
        let collections = self.collections.read();
        let Some(documents) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for doc in documents {
            if matcher::matches(doc, filter)? {
                out.push(doc.clone());
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    type Error = MemoryStoreError;

    async fn count_documents(&self, collection: &str, filter: Document) -> Result<u64, Self::Error> {
        let count = self.matching(collection, &filter)?.len() as u64;
        tracing::debug!(collection, filter = %filter, count, "count_documents");
        Ok(count)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> Result<Vec<Document>, Self::Error> {
        let mut documents = self.matching(collection, &filter)?;

        if let Some(sort) = &options.sort {
            documents.sort_by(|a, b| matcher::compare_by_sort(a, b, sort));
        } else if let Some((path, near)) = matcher::find_near(&filter) {
            // Without an explicit sort, $near results come back nearest first
            documents.sort_by(|a, b| {
                let da = matcher::distance_to(a, &path, &near).unwrap_or(f64::MAX);
                let db = matcher::distance_to(b, &path, &near).unwrap_or(f64::MAX);
                da.total_cmp(&db)
            });
        }

        let skip = options.skip.unwrap_or(0) as usize;
        let limit = match options.limit {
            Some(0) | None => usize::MAX,
            Some(n) => n.unsigned_abs() as usize,
        };

        let page: Vec<Document> = documents.into_iter().skip(skip).take(limit).collect();
        tracing::debug!(
            collection,
            filter = %filter,
            skip,
            returned = page.len(),
            "find"
        );
        Ok(page)
    }
}
