//! GraphQL-facing query types
//!
//! Operator inputs, pagination envelopes and the document query layer used by
//! the entity services.

pub mod filters;
pub mod orm;
pub mod pagination;

pub use pagination::{ConnectionArgs, PageInfo, PageLimits, PaginationArgs, PaginationError};
