//! Errors raised while compiling client filters and running entity queries.

use thiserror::Error;

use crate::graphql::pagination::PaginationError;

/// Failure to turn a filter expression into a query fragment.
///
/// Unknown filter fields are never reported here; they are skipped by the composer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    /// Malformed operator value for the field's scalar kind
    #[error("invalid filter on `{field}`: {reason}")]
    InvalidFilter { field: String, reason: String },

    /// A value could not be coerced into a store object id
    #[error("invalid identifier `{value}`")]
    InvalidIdentifier { value: String },
}

impl FilterError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilter {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Failure of an entity query. Driver errors are carried unchanged in `Storage`.
#[derive(Debug, Error)]
pub enum QueryError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error("failed to decode `{collection}` document: {source}")]
    Decode {
        collection: &'static str,
        #[source]
        source: bson::de::Error,
    },

    #[error(transparent)]
    Storage(E),
}
