//! Bookings
//!
//! Cursor-paginated listing plus single lookups restricted to a set of statuses.

use std::fmt;
use std::sync::Arc;

use async_graphql::{ComplexObject, Enum, ID, InputObject, SimpleObject};
use bson::oid::ObjectId;
use bson::{Bson, doc};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::expression;
use crate::db::DocumentStore;
use crate::define_connection;
use crate::graphql::filters::{DateFilter, IdFilter};
use crate::graphql::orm::{
    DocumentEntity, EntityQuery, FieldDescriptor, FieldTypeRegistry, QueryError,
};
use crate::graphql::pagination::{Connection, ConnectionArgs, PageLimits};

/// Booking lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum, Serialize, Deserialize)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Completed,
    Canceled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::Completed,
        BookingStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Accepted => "ACCEPTED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter for the booking status, typed by variant.
///
/// Serializes to the same operator map as an untyped enum filter.
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[graphql(name = "BookingStatusFilterInput")]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookingStatusFilter {
    /// Equals
    pub eq: Option<BookingStatus>,
    /// Not equals
    pub ne: Option<BookingStatus>,
    /// Either of two statuses
    pub between: Option<Vec<BookingStatus>>,
}

impl BookingStatusFilter {
    pub fn eq(status: BookingStatus) -> Self {
        Self {
            eq: Some(status),
            ..Default::default()
        }
    }

    pub fn between(first: BookingStatus, second: BookingStatus) -> Self {
        Self {
            between: Some(vec![first, second]),
            ..Default::default()
        }
    }
}

static BOOKING_FIELDS: Lazy<FieldTypeRegistry> = Lazy::new(|| {
    FieldTypeRegistry::new([
        FieldDescriptor::id("id").stored_as("_id"),
        FieldDescriptor::id("customerId"),
        FieldDescriptor::id("serviceProviderId"),
        FieldDescriptor::enumeration("status", BookingStatus::ALL.map(|s| s.as_str())),
        FieldDescriptor::date("dateTime"),
        FieldDescriptor::date("createdAt"),
        FieldDescriptor::date("updatedAt"),
    ])
});

#[derive(SimpleObject, Serialize, Deserialize, Debug, Clone)]
#[graphql(complex)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[graphql(skip)]
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[graphql(skip)]
    pub customer_id: ObjectId,
    #[graphql(skip)]
    pub service_provider_id: ObjectId,
    pub status: BookingStatus,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date_time: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[ComplexObject]
impl Booking {
    async fn id(&self) -> ID {
        ID(self.id.to_hex())
    }

    async fn customer_id(&self) -> ID {
        ID(self.customer_id.to_hex())
    }

    async fn service_provider_id(&self) -> ID {
        ID(self.service_provider_id.to_hex())
    }
}

impl DocumentEntity for Booking {
    const COLLECTION: &'static str = "bookings";

    fn registry() -> &'static FieldTypeRegistry {
        &BOOKING_FIELDS
    }

    fn cursor(&self) -> String {
        self.id.to_hex()
    }
}

/// Filter input for booking queries
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookingFilterInput {
    pub id: Option<IdFilter>,
    pub customer_id: Option<IdFilter>,
    pub service_provider_id: Option<IdFilter>,
    pub status: Option<BookingStatusFilter>,
    pub date_time: Option<DateFilter>,
    pub created_at: Option<DateFilter>,
    pub updated_at: Option<DateFilter>,
    #[graphql(name = "AND")]
    #[serde(rename = "AND")]
    pub and: Option<Vec<BookingFilterInput>>,
    #[graphql(name = "OR")]
    #[serde(rename = "OR")]
    pub or: Option<Vec<BookingFilterInput>>,
}

define_connection!(BookingConnection, BookingEdge, Booking);

pub struct BookingService<S> {
    store: Arc<S>,
    limits: PageLimits,
}

impl<S: DocumentStore> BookingService<S> {
    pub fn new(store: Arc<S>, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    pub async fn get_bookings_count(&self) -> Result<i64, QueryError<S::Error>> {
        EntityQuery::<Booking>::new()
            .count(self.store.as_ref())
            .await
    }

    /// Cursor listing, newest first
    pub async fn get_paginated_bookings(
        &self,
        args: &ConnectionArgs,
        filter: Option<&BookingFilterInput>,
    ) -> Result<Connection<Booking>, QueryError<S::Error>> {
        let first = args.first(&self.limits)?;
        let filter = expression(filter)?;

        EntityQuery::<Booking>::new()
            .filter(filter.as_ref())?
            .fetch_connection(self.store.as_ref(), first, args.after.as_deref())
            .await
    }

    /// First booking matching the filter whose status is one of `statuses`.
    /// An empty status list does not restrict the status.
    pub async fn get_booking(
        &self,
        filter: &BookingFilterInput,
        statuses: &[BookingStatus],
    ) -> Result<Option<Booking>, QueryError<S::Error>> {
        let filter = expression(Some(filter))?;
        let mut query = EntityQuery::<Booking>::new().filter(filter.as_ref())?;

        if !statuses.is_empty() {
            let allowed: Vec<Bson> = statuses.iter().map(|s| Bson::from(s.as_str())).collect();
            query = query.where_clause("status", doc! { "$in": allowed });
        }

        query.fetch_one(self.store.as_ref()).await
    }
}
