//! Service providers
//!
//! Listings come in three shapes: cursor connection, offset page and a
//! proximity search around a client point. Soft-deleted providers are always
//! excluded.

use std::sync::Arc;

use async_graphql::{ComplexObject, ID, InputObject, SimpleObject};
use bson::oid::ObjectId;
use bson::{Document, doc};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::expression;
use crate::db::DocumentStore;
use crate::graphql::filters::{BooleanFilter, DateFilter, IdFilter, LocationFilter, StringFilter};
use crate::graphql::orm::{
    DocumentEntity, EntityQuery, FieldDescriptor, FieldTypeRegistry, FilterError, QueryError,
};
use crate::graphql::pagination::{
    Connection, ConnectionArgs, PageLimits, Pagination, PaginationArgs, cursor_page,
};
use crate::{define_connection, define_pagination};

/// Proximity searches never reach further than this, in meters
pub const MAX_SEARCH_DISTANCE: f64 = 50_000.0;

/// Sort and cursor field for proximity listings
const RATING_FIELD: &str = "reviewInformation.rate";

static SERVICE_PROVIDER_FIELDS: Lazy<FieldTypeRegistry> = Lazy::new(|| {
    FieldTypeRegistry::new([
        FieldDescriptor::id("id").stored_as("_id"),
        FieldDescriptor::id("categoryId").stored_as("profileDetail.categoryIds"),
        FieldDescriptor::string("email"),
        FieldDescriptor::string("name"),
        FieldDescriptor::boolean("active"),
        FieldDescriptor::location("location")
            .stored_as("profileDetail.location")
            .max_distance(MAX_SEARCH_DISTANCE),
        FieldDescriptor::date("createdAt"),
        FieldDescriptor::date("updatedAt"),
        FieldDescriptor::boolean("deleted"),
    ])
});

/// GeoJSON point as stored
#[derive(SimpleObject, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeoPoint {
    #[graphql(name = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: Vec<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDetail {
    #[serde(default)]
    pub category_ids: Vec<ObjectId>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

#[derive(SimpleObject, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ReviewInformation {
    #[serde(default)]
    pub rate: f64,
    #[serde(default)]
    pub count: i64,
}

#[derive(SimpleObject, Serialize, Deserialize, Debug, Clone)]
#[graphql(complex)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProvider {
    #[graphql(skip)]
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub active: bool,
    #[graphql(skip)]
    #[serde(default)]
    pub profile_detail: ProfileDetail,
    #[serde(default)]
    pub review_information: ReviewInformation,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[ComplexObject]
impl ServiceProvider {
    async fn id(&self) -> ID {
        ID(self.id.to_hex())
    }

    async fn category_ids(&self) -> Vec<ID> {
        self.profile_detail
            .category_ids
            .iter()
            .map(|id| ID(id.to_hex()))
            .collect()
    }

    async fn bio(&self) -> Option<String> {
        self.profile_detail.bio.clone()
    }

    async fn location(&self) -> Option<GeoPoint> {
        self.profile_detail.location.clone()
    }
}

impl DocumentEntity for ServiceProvider {
    const COLLECTION: &'static str = "serviceproviders";

    fn registry() -> &'static FieldTypeRegistry {
        &SERVICE_PROVIDER_FIELDS
    }

    fn base_predicate() -> Document {
        doc! { "deleted": { "$ne": true } }
    }

    fn cursor(&self) -> String {
        self.id.to_hex()
    }
}

/// Filter input for service provider queries
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderFilterInput {
    pub id: Option<IdFilter>,
    pub category_id: Option<IdFilter>,
    pub email: Option<StringFilter>,
    pub name: Option<StringFilter>,
    pub active: Option<BooleanFilter>,
    pub location: Option<LocationFilter>,
    pub created_at: Option<DateFilter>,
    pub updated_at: Option<DateFilter>,
    #[graphql(name = "AND")]
    #[serde(rename = "AND")]
    pub and: Option<Vec<ServiceProviderFilterInput>>,
    #[graphql(name = "OR")]
    #[serde(rename = "OR")]
    pub or: Option<Vec<ServiceProviderFilterInput>>,
}

define_connection!(ServiceProviderConnection, ServiceProviderEdge, ServiceProvider);
define_pagination!(ServiceProviderPagination, ServiceProvider);

pub struct ServiceProviderService<S> {
    store: Arc<S>,
    limits: PageLimits,
}

impl<S: DocumentStore> ServiceProviderService<S> {
    pub fn new(store: Arc<S>, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    fn query(
        filter: Option<&ServiceProviderFilterInput>,
    ) -> Result<EntityQuery<ServiceProvider>, FilterError> {
        let filter = expression(filter)?;
        EntityQuery::<ServiceProvider>::new().filter(filter.as_ref())
    }

    pub async fn get_service_providers_count(
        &self,
        filter: Option<&ServiceProviderFilterInput>,
    ) -> Result<i64, QueryError<S::Error>> {
        Self::query(filter)?.count(self.store.as_ref()).await
    }

    pub async fn get_service_provider(
        &self,
        filter: &ServiceProviderFilterInput,
    ) -> Result<Option<ServiceProvider>, QueryError<S::Error>> {
        Self::query(Some(filter))?
            .fetch_one(self.store.as_ref())
            .await
    }

    pub async fn get_service_provider_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ServiceProvider>, QueryError<S::Error>> {
        EntityQuery::<ServiceProvider>::new()
            .where_clause("email", email)
            .fetch_one(self.store.as_ref())
            .await
    }

    /// Cursor listing, newest first
    pub async fn get_paginated_service_providers(
        &self,
        args: &ConnectionArgs,
        filter: Option<&ServiceProviderFilterInput>,
    ) -> Result<Connection<ServiceProvider>, QueryError<S::Error>> {
        let first = args.first(&self.limits)?;
        Self::query(filter)?
            .fetch_connection(self.store.as_ref(), first, args.after.as_deref())
            .await
    }

    /// Offset listing, newest first
    pub async fn get_service_providers_pagination(
        &self,
        args: &PaginationArgs,
        filter: Option<&ServiceProviderFilterInput>,
    ) -> Result<Pagination<ServiceProvider>, QueryError<S::Error>> {
        let limit = args.limit(&self.limits)?;
        let page = args.page()?;
        Self::query(filter)?
            .fetch_page(self.store.as_ref(), page, limit)
            .await
    }

    /// Providers near the filter's `location`, nearest first.
    ///
    /// The cursor is the provider rating; `after` keeps providers rated strictly
    /// below it.
    pub async fn get_paginated_service_providers_by_location(
        &self,
        args: &ConnectionArgs,
        filter: &ServiceProviderFilterInput,
    ) -> Result<Connection<ServiceProvider>, QueryError<S::Error>> {
        let has_point = filter
            .location
            .as_ref()
            .is_some_and(|location| location.near.is_some());
        if !has_point {
            return Err(FilterError::invalid("location", "a `near` point is required").into());
        }

        let first = args.first(&self.limits)?;
        let count_query = Self::query(Some(filter))?;
        let mut find_query = Self::query(Some(filter))?.limit(first);
        if let Some(after) = args.after.as_deref() {
            let rate: f64 = after.parse().map_err(|_| {
                FilterError::invalid("after", format!("expected a rating, got `{after}`"))
            })?;
            find_query = find_query.where_clause(RATING_FIELD, doc! { "$lt": rate });
        }

        tracing::debug!(first, after = ?args.after, "Listing service providers by location");

        let (total, items) = futures::try_join!(
            count_query.count(self.store.as_ref()),
            find_query.fetch_all(self.store.as_ref()),
        )?;

        Ok(cursor_page(items, total, first, |provider| {
            provider.review_information.rate.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::graphql::filters::Coordinates;
    use serde_json::json;

    const PLUMBING: &str = "65c000000000000000000001";

    fn provider(id: u8, name: &str, lng: f64, lat: f64, rate: f64) -> serde_json::Value {
        json!({
            "_id": { "$oid": format!("65b0000000000000000000{id:02x}") },
            "name": name,
            "email": format!("{}@example.com", name.to_lowercase()),
            "active": true,
            "profileDetail": {
                "categoryIds": [ { "$oid": PLUMBING } ],
                "location": { "type": "Point", "coordinates": [lng, lat] }
            },
            "reviewInformation": { "rate": rate, "count": 3 },
            "createdAt": { "$date": "2024-01-01T00:00:00Z" },
            "updatedAt": { "$date": "2024-01-01T00:00:00Z" }
        })
    }

    fn service() -> ServiceProviderService<MemoryStore> {
        let mut far = provider(4, "Hamburg", 9.9937, 53.5511, 5.0);
        far["profileDetail"]["categoryIds"] = json!([]);
        let mut deleted = provider(5, "Gone", 13.4, 52.52, 5.0);
        deleted["deleted"] = json!(true);

        let store = MemoryStore::from_json(json!({
            "serviceproviders": [
                provider(1, "Mitte", 13.4050, 52.5200, 4.5),
                provider(2, "Potsdam", 13.0645, 52.3906, 3.0),
                provider(3, "Spandau", 13.2000, 52.5350, 4.0),
                far,
                deleted
            ]
        }))
        .unwrap();
        ServiceProviderService::new(Arc::new(store), PageLimits::default())
    }

    #[test]
    fn test_category_alias_matches_array_field() {
        let filter = ServiceProviderFilterInput {
            category_id: Some(IdFilter::eq(PLUMBING)),
            ..Default::default()
        };
        let count =
            tokio_test::block_on(service().get_service_providers_count(Some(&filter))).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_location_is_bounded_server_side() {
        let filter = ServiceProviderFilterInput {
            location: Some(LocationFilter::near(52.52, 13.405)),
            ..Default::default()
        };
        let conn = tokio_test::block_on(
            service().get_paginated_service_providers_by_location(&ConnectionArgs::default(), &filter),
        )
        .unwrap();

        // Hamburg is ~255 km away
        let names: Vec<&str> = conn.nodes().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Mitte", "Spandau", "Potsdam"]);
        assert_eq!(conn.total_count, 3);
        assert_eq!(conn.page_info.end_cursor.as_deref(), Some("3"));
    }

    #[test]
    fn test_location_listing_after_rating() {
        let filter = ServiceProviderFilterInput {
            location: Some(LocationFilter {
                near: Some(Coordinates {
                    latitude: 52.52,
                    longitude: 13.405,
                }),
            }),
            ..Default::default()
        };
        let args = ConnectionArgs::new(10, Some("4.5".to_string()));
        let conn = tokio_test::block_on(
            service().get_paginated_service_providers_by_location(&args, &filter),
        )
        .unwrap();

        let names: Vec<&str> = conn.nodes().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Spandau", "Potsdam"]);
        assert!(!conn.page_info.has_next_page);
    }

    #[test]
    fn test_location_listing_requires_point() {
        let err = tokio_test::block_on(service().get_paginated_service_providers_by_location(
            &ConnectionArgs::default(),
            &ServiceProviderFilterInput::default(),
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            QueryError::Filter(FilterError::InvalidFilter { ref field, .. }) if field == "location"
        ));
    }

    #[test]
    fn test_connection_pages_newest_first() {
        let service = service();
        let first = tokio_test::block_on(
            service.get_paginated_service_providers(&ConnectionArgs::new(2, None), None),
        )
        .unwrap();
        let names: Vec<&str> = first.nodes().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Hamburg", "Spandau"]);
        assert!(first.page_info.has_next_page);

        let next = tokio_test::block_on(service.get_paginated_service_providers(
            &ConnectionArgs::new(2, first.page_info.end_cursor.clone()),
            None,
        ))
        .unwrap();
        let names: Vec<&str> = next.nodes().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Potsdam", "Mitte"]);
        assert_eq!(next.total_count, 4);
    }
}
