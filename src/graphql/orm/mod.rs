//! Document query layer
//!
//! Turns per-entity field configuration plus a client filter into a store query
//! and runs it with pagination:
//! - [`registry`]: logical field name to scalar kind and storage path
//! - [`compilers`]: one compiler per scalar kind, emitting BSON fragments
//! - [`composer`]: resolves `AND`/`OR` groups and merges fragments
//! - [`EntityQuery`]: base predicate, sort, count + find, envelopes
//!
//! ```rust,ignore
//! use crate::graphql::orm::{EntityQuery, FilterExpression};
//! use crate::graphql::filters::StringFilter;
//!
//! let filter = FilterExpression::new().with("name", StringFilter::contains("plumb"))?;
//! let page = EntityQuery::<ServiceProvider>::new()
//!     .filter(Some(&filter))?
//!     .fetch_page(&store, 1, 10)
//!     .await?;
//! ```

mod builder;
pub mod compilers;
pub mod composer;
mod error;
pub mod registry;
mod traits;

pub use builder::*;
pub use composer::{FilterExpression, compose};
pub use error::{FilterError, QueryError};
pub use registry::{FieldDescriptor, FieldTypeRegistry, GeoBounds, ScalarKind};
pub use traits::*;
