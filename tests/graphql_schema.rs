//! GraphQL surface tests
//!
//! Mounts the services in a small schema the way an API layer would and checks
//! that filter inputs and pagination envelopes round through GraphQL.

mod common;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Schema};
use marketplace_query::db::MemoryStore;
use marketplace_query::graphql::{ConnectionArgs, PaginationArgs};
use marketplace_query::services::bookings::BookingConnection;
use marketplace_query::services::customers::CustomerPagination;
use marketplace_query::services::service_providers::ServiceProviderConnection;
use marketplace_query::services::{
    BookingFilterInput, CustomerFilterInput, ServiceProviderFilterInput, Services,
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

struct Query;

#[Object]
impl Query {
    async fn customers(
        &self,
        ctx: &Context<'_>,
        pagination: Option<PaginationArgs>,
        filter: Option<CustomerFilterInput>,
    ) -> async_graphql::Result<CustomerPagination> {
        let services = ctx.data::<Services<MemoryStore>>()?;
        let page = services
            .customers
            .get_paginated_customers(&pagination.unwrap_or_default(), filter.as_ref())
            .await?;
        Ok(page.into())
    }

    async fn service_providers_by_location(
        &self,
        ctx: &Context<'_>,
        connection: Option<ConnectionArgs>,
        filter: ServiceProviderFilterInput,
    ) -> async_graphql::Result<ServiceProviderConnection> {
        let services = ctx.data::<Services<MemoryStore>>()?;
        let conn = services
            .service_providers
            .get_paginated_service_providers_by_location(&connection.unwrap_or_default(), &filter)
            .await?;
        Ok(conn.into())
    }

    async fn bookings(
        &self,
        ctx: &Context<'_>,
        connection: Option<ConnectionArgs>,
        filter: Option<BookingFilterInput>,
    ) -> async_graphql::Result<BookingConnection> {
        let services = ctx.data::<Services<MemoryStore>>()?;
        let conn = services
            .bookings
            .get_paginated_bookings(&connection.unwrap_or_default(), filter.as_ref())
            .await?;
        Ok(conn.into())
    }
}

type TestSchema = Schema<Query, EmptyMutation, EmptySubscription>;

fn schema() -> TestSchema {
    Schema::build(Query, EmptyMutation, EmptySubscription)
        .data(common::services())
        .finish()
}

async fn execute(query: &str) -> Value {
    let response = schema().execute(query).await;
    assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
    response.data.into_json().unwrap()
}

#[tokio::test]
async fn test_customer_page_with_or_group() {
    let data = execute(
        r#"{
            customers(
                pagination: { page: 1, limit: 1 }
                filter: { OR: [{ name: { beginsWith: "ada" } }, { name: { beginsWith: "grace" } }] }
            ) {
                items { id name }
                totalCount
                totalPages
                currentPage
                hasNextPage
            }
        }"#,
    )
    .await;

    assert_eq!(
        data,
        json!({
            "customers": {
                "items": [ { "id": "65a000000000000000000003", "name": "Grace Hopper" } ],
                "totalCount": 2,
                "totalPages": 2,
                "currentPage": 1,
                "hasNextPage": true
            }
        })
    );
}

#[tokio::test]
async fn test_bookings_connection_by_status() {
    let data = execute(
        r#"{
            bookings(connection: { first: 1 }, filter: { status: { eq: PENDING } }) {
                edges { cursor node { status customerId } }
                pageInfo { hasNextPage endCursor }
                totalCount
            }
        }"#,
    )
    .await;

    assert_eq!(
        data["bookings"],
        json!({
            "edges": [ {
                "cursor": "65e000000000000000000005",
                "node": { "status": "PENDING", "customerId": "65a000000000000000000002" }
            } ],
            "pageInfo": { "hasNextPage": true, "endCursor": "65e000000000000000000005" },
            "totalCount": 2
        })
    );
}

#[tokio::test]
async fn test_providers_near_point() {
    let data = execute(
        r#"{
            serviceProvidersByLocation(
                connection: { first: 2 }
                filter: { location: { near: { latitude: 52.52, longitude: 13.405 } } }
            ) {
                edges { node { name location { type coordinates } reviewInformation { rate } } }
                totalCount
            }
        }"#,
    )
    .await;

    let conn = &data["serviceProvidersByLocation"];
    assert_eq!(conn["totalCount"], json!(4));
    assert_eq!(conn["edges"][0]["node"]["name"], json!("Mitte"));
    assert_eq!(conn["edges"][0]["node"]["location"]["type"], json!("Point"));
    assert_eq!(conn["edges"][1]["node"]["reviewInformation"]["rate"], json!(4.2));
}

#[tokio::test]
async fn test_filter_errors_surface_as_graphql_errors() {
    let response = schema()
        .execute(r#"{ bookings(filter: { customerId: { eq: "42" } }) { totalCount } }"#)
        .await;
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].message.contains("42"));

    // Status variants are checked by the schema itself
    let response = schema()
        .execute(r#"{ bookings(filter: { status: { eq: LOST } }) { totalCount } }"#)
        .await;
    assert_eq!(response.errors.len(), 1);

    let response = schema()
        .execute(r#"{ customers(pagination: { limit: 0 }) { totalCount } }"#)
        .await;
    assert!(response.errors[0].message.contains("limit"));
}
