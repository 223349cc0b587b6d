//! Core traits for queryable document entities

use bson::Document;
use serde::de::DeserializeOwned;

use super::registry::FieldTypeRegistry;

/// Field holding the store identifier; also the cursor field
pub const ID_FIELD: &str = "_id";

/// An entity stored as documents in one collection.
///
/// Implemented per entity alongside its static [`FieldTypeRegistry`].
pub trait DocumentEntity: DeserializeOwned + Send + Sync {
    /// Collection name in the store
    const COLLECTION: &'static str;

    /// Default sort field
    const DEFAULT_SORT: &'static str = ID_FIELD;

    /// Default sort direction (1 ascending, -1 descending)
    const DEFAULT_SORT_DIR: i32 = -1;

    /// Filterable fields
    fn registry() -> &'static FieldTypeRegistry;

    /// Predicate every query on this entity must satisfy (e.g. soft-delete
    /// exclusion). Client filters are conjoined with it, never replace it.
    fn base_predicate() -> Document {
        Document::new()
    }

    /// Cursor for connection pagination
    fn cursor(&self) -> String;
}
