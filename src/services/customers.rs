//! Customers
//!
//! Offset-paginated listing with soft-deleted customers always excluded.

use std::sync::Arc;

use async_graphql::{ComplexObject, ID, InputObject, SimpleObject};
use bson::oid::ObjectId;
use bson::{Document, doc};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::expression;
use crate::db::DocumentStore;
use crate::define_pagination;
use crate::graphql::filters::{BooleanFilter, DateFilter, IdFilter, StringFilter};
use crate::graphql::orm::{
    DocumentEntity, EntityQuery, FieldDescriptor, FieldTypeRegistry, QueryError,
    compilers::parse_object_id,
};
use crate::graphql::pagination::{PageLimits, Pagination, PaginationArgs};

static CUSTOMER_FIELDS: Lazy<FieldTypeRegistry> = Lazy::new(|| {
    FieldTypeRegistry::new([
        FieldDescriptor::id("id").stored_as("_id"),
        FieldDescriptor::string("name"),
        FieldDescriptor::string("email"),
        FieldDescriptor::boolean("active"),
        FieldDescriptor::boolean("verified"),
        FieldDescriptor::date("createdAt"),
        FieldDescriptor::date("updatedAt"),
    ])
});

#[derive(SimpleObject, Serialize, Deserialize, Debug, Clone)]
#[graphql(complex)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[graphql(skip)]
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub verified: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[ComplexObject]
impl Customer {
    async fn id(&self) -> ID {
        ID(self.id.to_hex())
    }
}

impl DocumentEntity for Customer {
    const COLLECTION: &'static str = "customers";

    fn registry() -> &'static FieldTypeRegistry {
        &CUSTOMER_FIELDS
    }

    fn base_predicate() -> Document {
        doc! { "deleted": { "$ne": true } }
    }

    fn cursor(&self) -> String {
        self.id.to_hex()
    }
}

/// Filter input for customer queries
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CustomerFilterInput {
    pub id: Option<IdFilter>,
    pub name: Option<StringFilter>,
    pub email: Option<StringFilter>,
    pub active: Option<BooleanFilter>,
    pub verified: Option<BooleanFilter>,
    pub created_at: Option<DateFilter>,
    pub updated_at: Option<DateFilter>,
    #[graphql(name = "AND")]
    #[serde(rename = "AND")]
    pub and: Option<Vec<CustomerFilterInput>>,
    #[graphql(name = "OR")]
    #[serde(rename = "OR")]
    pub or: Option<Vec<CustomerFilterInput>>,
}

define_pagination!(CustomerPagination, Customer);

pub struct CustomerService<S> {
    store: Arc<S>,
    limits: PageLimits,
}

impl<S: DocumentStore> CustomerService<S> {
    pub fn new(store: Arc<S>, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    pub async fn get_paginated_customers(
        &self,
        args: &PaginationArgs,
        filter: Option<&CustomerFilterInput>,
    ) -> Result<Pagination<Customer>, QueryError<S::Error>> {
        let limit = args.limit(&self.limits)?;
        let page = args.page()?;
        let filter = expression(filter)?;

        EntityQuery::<Customer>::new()
            .filter(filter.as_ref())?
            .fetch_page(self.store.as_ref(), page, limit)
            .await
    }

    /// First customer matching the filter
    pub async fn get_customer(
        &self,
        filter: &CustomerFilterInput,
    ) -> Result<Option<Customer>, QueryError<S::Error>> {
        let filter = expression(Some(filter))?;
        EntityQuery::<Customer>::new()
            .filter(filter.as_ref())?
            .fetch_one(self.store.as_ref())
            .await
    }

    pub async fn get_customer_by_id(&self, id: &str) -> Result<Option<Customer>, QueryError<S::Error>> {
        let id = parse_object_id(id)?;
        EntityQuery::<Customer>::new()
            .where_clause("_id", id)
            .fetch_one(self.store.as_ref())
            .await
    }

    /// Most recently created customer with this email
    pub async fn get_customer_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Customer>, QueryError<S::Error>> {
        EntityQuery::<Customer>::new()
            .where_clause("email", email)
            .order_by(doc! { "createdAt": -1 })
            .fetch_one(self.store.as_ref())
            .await
    }

    pub async fn get_customers_count(&self) -> Result<i64, QueryError<S::Error>> {
        EntityQuery::<Customer>::new()
            .count(self.store.as_ref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use serde_json::json;

    fn store() -> Arc<MemoryStore> {
        let store = MemoryStore::from_json(json!({
            "customers": [
                {
                    "_id": { "$oid": "65a000000000000000000001" },
                    "name": "Ada Lovelace", "email": "ada@example.com",
                    "active": true, "verified": true,
                    "createdAt": { "$date": "2024-01-01T00:00:00Z" },
                    "updatedAt": { "$date": "2024-01-01T00:00:00Z" }
                },
                {
                    "_id": { "$oid": "65a000000000000000000002" },
                    "name": "Brian Kernighan", "email": "bwk@example.com",
                    "active": false, "verified": true,
                    "createdAt": { "$date": "2024-02-01T00:00:00Z" },
                    "updatedAt": { "$date": "2024-02-01T00:00:00Z" }
                },
                {
                    "_id": { "$oid": "65a000000000000000000003" },
                    "name": "Removed", "email": "ada@example.com",
                    "active": true, "deleted": true,
                    "createdAt": { "$date": "2024-03-01T00:00:00Z" },
                    "updatedAt": { "$date": "2024-03-01T00:00:00Z" }
                }
            ]
        }))
        .unwrap();
        Arc::new(store)
    }

    #[test]
    fn test_deleted_customers_are_never_returned() {
        let service = CustomerService::new(store(), PageLimits::default());
        tokio_test::block_on(async {
            assert_eq!(service.get_customers_count().await.unwrap(), 2);

            let customer = service
                .get_customer_by_email("ada@example.com")
                .await
                .unwrap()
                .unwrap();
            assert_eq!(customer.name, "Ada Lovelace");

            let removed = service
                .get_customer_by_id("65a000000000000000000003")
                .await
                .unwrap();
            assert!(removed.is_none());
        });
    }

    #[test]
    fn test_get_customer_by_filter() {
        let service = CustomerService::new(store(), PageLimits::default());
        let filter = CustomerFilterInput {
            active: Some(BooleanFilter::is_false()),
            ..Default::default()
        };
        let customer = tokio_test::block_on(service.get_customer(&filter))
            .unwrap()
            .unwrap();
        assert_eq!(customer.email, "bwk@example.com");
    }

    #[test]
    fn test_invalid_id_lookup() {
        let service = CustomerService::new(store(), PageLimits::default());
        let err = tokio_test::block_on(service.get_customer_by_id("42")).unwrap_err();
        assert!(matches!(err, QueryError::Filter(_)));
    }
}
