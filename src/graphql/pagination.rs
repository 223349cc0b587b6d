//! Pagination envelopes for GraphQL list queries
//!
//! Two result shapes are built from the same fetched rows:
//! - [`Pagination`]: offset based (`page`/`limit`, total pages)
//! - [`Connection`]: cursor based (edges + `pageInfo`)
//!
//! Both builders are pure. Use `define_pagination!` and `define_connection!` to
//! create the per-entity GraphQL object types.

use async_graphql::{InputObject, SimpleObject};
use serde::Serialize;
use thiserror::Error;

/// Information about pagination in a connection
#[derive(SimpleObject, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// When paginating forwards, are there more items?
    pub has_next_page: bool,
    /// Cursor of the last item in this page
    pub end_cursor: Option<String>,
}

/// An edge in a connection, containing a node and cursor (internal use)
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Edge<T> {
    /// The item at the end of the edge
    pub node: T,
    /// Store id of the node
    pub cursor: String,
}

/// A cursor-paginated result (internal use)
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
    pub total_count: i64,
}

/// An offset-paginated result (internal use)
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub has_next_page: bool,
    pub page: i64,
    pub limit: i64,
}

impl<T> Connection<T> {
    /// Create an empty connection
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
            total_count: 0,
        }
    }

    /// Nodes in edge order
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }
}

/// Number of rows to skip for a 1-based page. `page` defaults to 1; no other
/// validation happens here.
pub fn get_offset(page: Option<i64>, limit: i64) -> i64 {
    (page.unwrap_or(1) - 1) * limit
}

/// Wrap one page of rows fetched with `offset`/`limit`.
///
/// A non-positive `limit` yields zero pages.
pub fn offset_page<T>(
    items: Vec<T>,
    total_count: i64,
    page: i64,
    limit: i64,
    offset: i64,
) -> Pagination<T> {
    let (current_page, total_pages) = if limit > 0 {
        (offset / limit + 1, (total_count + limit - 1) / limit)
    } else {
        (1, 0)
    };

    Pagination {
        items,
        total_count,
        total_pages,
        current_page,
        has_next_page: current_page < total_pages,
        page,
        limit,
    }
}

/// Wrap rows fetched with a `page_size` bound into a connection.
///
/// `has_next_page` is `items.len() >= page_size`: a final page holding exactly
/// `page_size` rows still reports a next page. See [`cursor_page_exact`].
pub fn cursor_page<T>(
    items: Vec<T>,
    total_count: i64,
    page_size: i64,
    cursor_of: impl Fn(&T) -> String,
) -> Connection<T> {
    let has_next_page = items.len() as i64 >= page_size;
    build_connection(items, total_count, has_next_page, cursor_of)
}

/// Look-ahead variant of [`cursor_page`]: `items` was fetched with
/// `page_size + 1`; the extra row only decides `has_next_page`.
pub fn cursor_page_exact<T>(
    mut items: Vec<T>,
    total_count: i64,
    page_size: i64,
    cursor_of: impl Fn(&T) -> String,
) -> Connection<T> {
    let page_size = page_size.max(0) as usize;
    let has_next_page = items.len() > page_size;
    items.truncate(page_size);
    build_connection(items, total_count, has_next_page, cursor_of)
}

fn build_connection<T>(
    items: Vec<T>,
    total_count: i64,
    has_next_page: bool,
    cursor_of: impl Fn(&T) -> String,
) -> Connection<T> {
    let edges: Vec<Edge<T>> = items
        .into_iter()
        .map(|node| Edge {
            cursor: cursor_of(&node),
            node,
        })
        .collect();

    let page_info = PageInfo {
        has_next_page,
        end_cursor: edges.last().map(|e| e.cursor.clone()),
    };

    Connection {
        edges,
        page_info,
        total_count,
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Bounds for client-supplied page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: i64,
    pub max_limit: i64,
    pub default_first: i64,
    pub max_first: i64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 999,
            default_first: 10,
            max_first: 99,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("limit must be between 1 and {max}, got {value}")]
    LimitOutOfRange { value: i64, max: i64 },

    #[error("first must be between 1 and {max}, got {value}")]
    FirstOutOfRange { value: i64, max: i64 },

    #[error("page must be at least 1, got {0}")]
    PageOutOfRange(i64),
}

/// Offset pagination input
#[derive(InputObject, Default, Clone, Debug)]
#[graphql(name = "PaginationInput")]
pub struct PaginationArgs {
    /// Page size (default: 10, max: 999)
    pub limit: Option<i32>,
    /// 1-based page number (default: 1)
    pub page: Option<i32>,
}

impl PaginationArgs {
    pub fn new(page: i32, limit: i32) -> Self {
        Self {
            limit: Some(limit),
            page: Some(page),
        }
    }

    pub fn limit(&self, limits: &PageLimits) -> Result<i64, PaginationError> {
        let value = self.limit.map(i64::from).unwrap_or(limits.default_limit);
        if !(1..=limits.max_limit).contains(&value) {
            return Err(PaginationError::LimitOutOfRange {
                value,
                max: limits.max_limit,
            });
        }
        Ok(value)
    }

    pub fn page(&self) -> Result<i64, PaginationError> {
        let page = self.page.map(i64::from).unwrap_or(1);
        if page < 1 {
            return Err(PaginationError::PageOutOfRange(page));
        }
        Ok(page)
    }
}

/// Cursor pagination input
#[derive(InputObject, Default, Clone, Debug)]
#[graphql(name = "ConnectionInput")]
pub struct ConnectionArgs {
    /// Return the first N items (default: 10, max: 99)
    pub first: Option<i32>,
    /// Return items after this cursor
    pub after: Option<String>,
}

impl ConnectionArgs {
    pub fn new(first: i32, after: Option<String>) -> Self {
        Self {
            first: Some(first),
            after,
        }
    }

    pub fn first(&self, limits: &PageLimits) -> Result<i64, PaginationError> {
        let value = self.first.map(i64::from).unwrap_or(limits.default_first);
        if !(1..=limits.max_first).contains(&value) {
            return Err(PaginationError::FirstOutOfRange {
                value,
                max: limits.max_first,
            });
        }
        Ok(value)
    }
}

// ============================================================================
// GraphQL object types
// ============================================================================

/// Macro to define a GraphQL connection type for a specific entity
///
/// Usage:
/// ```ignore
/// define_connection!(BookingConnection, BookingEdge, Booking);
/// ```
#[macro_export]
macro_rules! define_connection {
    ($conn_name:ident, $edge_name:ident, $node_type:ty) => {
        /// Edge containing a node and cursor
        #[derive(async_graphql::SimpleObject, Debug, Clone)]
        pub struct $edge_name {
            /// The item at the end of the edge
            pub node: $node_type,
            /// A cursor for pagination
            pub cursor: String,
        }

        /// Connection containing edges and page info
        #[derive(async_graphql::SimpleObject, Debug, Clone)]
        pub struct $conn_name {
            /// The edges in this connection
            pub edges: Vec<$edge_name>,
            /// Pagination information
            pub page_info: $crate::graphql::pagination::PageInfo,
            /// Total number of matching items
            pub total_count: i64,
        }

        impl From<$crate::graphql::pagination::Connection<$node_type>> for $conn_name {
            fn from(conn: $crate::graphql::pagination::Connection<$node_type>) -> Self {
                Self {
                    edges: conn
                        .edges
                        .into_iter()
                        .map(|e| $edge_name {
                            node: e.node,
                            cursor: e.cursor,
                        })
                        .collect(),
                    page_info: conn.page_info,
                    total_count: conn.total_count,
                }
            }
        }
    };
}

/// Macro to define a GraphQL offset-pagination type for a specific entity
///
/// Usage:
/// ```ignore
/// define_pagination!(CustomerPagination, Customer);
/// ```
#[macro_export]
macro_rules! define_pagination {
    ($page_name:ident, $node_type:ty) => {
        /// One page of items with offset-pagination metadata
        #[derive(async_graphql::SimpleObject, Debug, Clone)]
        pub struct $page_name {
            pub items: Vec<$node_type>,
            pub total_count: i64,
            pub total_pages: i64,
            pub current_page: i64,
            pub has_next_page: bool,
            pub page: i64,
            pub limit: i64,
        }

        impl From<$crate::graphql::pagination::Pagination<$node_type>> for $page_name {
            fn from(page: $crate::graphql::pagination::Pagination<$node_type>) -> Self {
                Self {
                    items: page.items,
                    total_count: page.total_count,
                    total_pages: page.total_pages,
                    current_page: page.current_page,
                    has_next_page: page.has_next_page,
                    page: page.page,
                    limit: page.limit,
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("id-{i}")).collect()
    }

    #[test]
    fn test_get_offset() {
        assert_eq!(get_offset(Some(3), 10), 20);
        assert_eq!(get_offset(None, 10), 0);
        assert_eq!(get_offset(Some(1), 25), 0);
    }

    #[test]
    fn test_offset_page_last_page() {
        let offset = get_offset(Some(3), 10);
        let page = offset_page(ids(5), 25, 3, 10, offset);

        assert_eq!(offset, 20);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next_page);
        assert_eq!(page.items.len(), 5);
    }

    #[test]
    fn test_offset_page_first_page() {
        let page = offset_page(ids(10), 25, 1, 10, get_offset(Some(1), 10));
        assert_eq!(page.current_page, 1);
        assert!(page.has_next_page);
    }

    #[test]
    fn test_offset_page_empty_result() {
        let page = offset_page(Vec::<String>::new(), 0, 1, 10, 0);
        assert_eq!(page.total_pages, 0);
        assert_eq!(page.current_page, 1);
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_offset_page_zero_limit() {
        let page = offset_page(Vec::<String>::new(), 12, 1, 0, 0);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_cursor_page_full_page_reports_next() {
        let conn = cursor_page(ids(10), 40, 10, |id| id.to_uppercase());
        assert!(conn.page_info.has_next_page);
        assert_eq!(conn.page_info.end_cursor.as_deref(), Some("ID-9"));
        assert_eq!(conn.edges.len(), 10);
        assert_eq!(conn.edges[0].node, "id-0");
        assert_eq!(conn.total_count, 40);
    }

    #[test]
    fn test_cursor_page_short_page() {
        let conn = cursor_page(ids(3), 3, 10, Clone::clone);
        assert!(!conn.page_info.has_next_page);
        assert_eq!(conn.page_info.end_cursor.as_deref(), Some("id-2"));
    }

    #[test]
    fn test_cursor_page_empty() {
        let conn = cursor_page(Vec::<String>::new(), 0, 10, Clone::clone);
        assert!(conn.edges.is_empty());
        assert_eq!(conn.page_info.end_cursor, None);
        assert!(!conn.page_info.has_next_page);
    }

    #[test]
    fn test_exactly_page_size_remaining() {
        // Last page holds exactly page_size rows: the approximation still says
        // there is more, the look-ahead read does not.
        let approx = cursor_page(ids(10), 10, 10, Clone::clone);
        assert!(approx.page_info.has_next_page);

        let exact = cursor_page_exact(ids(10), 10, 10, Clone::clone);
        assert!(!exact.page_info.has_next_page);

        let exact = cursor_page_exact(ids(11), 30, 10, Clone::clone);
        assert!(exact.page_info.has_next_page);
        assert_eq!(exact.edges.len(), 10);
        assert_eq!(exact.page_info.end_cursor.as_deref(), Some("id-9"));
    }

    #[test]
    fn test_pagination_args_defaults_and_bounds() {
        let limits = PageLimits::default();
        let args = PaginationArgs::default();
        assert_eq!(args.limit(&limits).unwrap(), 10);
        assert_eq!(args.page().unwrap(), 1);

        let args = PaginationArgs::new(0, 1000);
        assert_eq!(
            args.limit(&limits),
            Err(PaginationError::LimitOutOfRange {
                value: 1000,
                max: 999
            })
        );
        assert_eq!(args.page(), Err(PaginationError::PageOutOfRange(0)));
    }

    #[test]
    fn test_connection_args_bounds() {
        let limits = PageLimits::default();
        assert_eq!(ConnectionArgs::default().first(&limits).unwrap(), 10);
        assert!(ConnectionArgs::new(100, None).first(&limits).is_err());
        assert!(ConnectionArgs::new(0, None).first(&limits).is_err());
    }
}
