//! Shared marketplace fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use marketplace_query::db::MemoryStore;
use marketplace_query::graphql::PageLimits;
use marketplace_query::services::Services;
use serde_json::{Value, json};

pub const PLUMBING: &str = "65c000000000000000000001";
pub const GARDENING: &str = "65c000000000000000000002";
pub const ADA: &str = "65a000000000000000000001";

pub fn customer(n: u8, name: &str, active: bool, created: &str) -> Value {
    json!({
        "_id": { "$oid": format!("65a0000000000000000000{n:02x}") },
        "name": name,
        "email": format!("{}@example.com", name.split(' ').next().unwrap_or(name).to_lowercase()),
        "active": active,
        "verified": n % 2 == 1,
        "createdAt": { "$date": created },
        "updatedAt": { "$date": created }
    })
}

pub fn provider(n: u8, name: &str, category: &str, lng: f64, lat: f64, rate: f64) -> Value {
    json!({
        "_id": { "$oid": format!("65b0000000000000000000{n:02x}") },
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase()),
        "active": true,
        "profileDetail": {
            "categoryIds": [ { "$oid": category } ],
            "bio": format!("{name} at your service"),
            "location": { "type": "Point", "coordinates": [lng, lat] }
        },
        "reviewInformation": { "rate": rate, "count": 10 },
        "createdAt": { "$date": "2024-01-01T00:00:00Z" },
        "updatedAt": { "$date": "2024-01-01T00:00:00Z" }
    })
}

pub fn booking(n: u8, customer: &str, status: &str, date: &str) -> Value {
    json!({
        "_id": { "$oid": format!("65e0000000000000000000{n:02x}") },
        "customerId": { "$oid": customer },
        "serviceProviderId": { "$oid": "65b000000000000000000001" },
        "status": status,
        "dateTime": { "$date": date },
        "createdAt": { "$date": date },
        "updatedAt": { "$date": date }
    })
}

/// Three live customers and one soft-deleted, four providers around Berlin
/// plus one in Hamburg, and six bookings.
pub fn fixtures() -> Value {
    let mut removed = customer(4, "Removed Customer", true, "2024-04-01T00:00:00Z");
    removed["deleted"] = json!(true);

    let mut retired = provider(6, "Retired", PLUMBING, 13.40, 52.52, 5.0);
    retired["deleted"] = json!(true);

    json!({
        "customers": [
            customer(1, "Ada Lovelace", true, "2024-01-01T00:00:00Z"),
            customer(2, "Brian Kernighan", false, "2024-02-01T00:00:00Z"),
            customer(3, "Grace Hopper", true, "2024-03-01T00:00:00Z"),
            removed
        ],
        "serviceproviders": [
            provider(1, "Mitte", PLUMBING, 13.4050, 52.5200, 4.8),
            provider(2, "Kreuzberg", PLUMBING, 13.4033, 52.4986, 4.2),
            provider(3, "Potsdam", GARDENING, 13.0645, 52.3906, 3.9),
            provider(4, "Spandau", PLUMBING, 13.2000, 52.5350, 4.5),
            provider(5, "Hamburg", PLUMBING, 9.9937, 53.5511, 5.0),
            retired
        ],
        "bookings": [
            booking(1, ADA, "COMPLETED", "2024-03-01T10:00:00Z"),
            booking(2, ADA, "CANCELED", "2024-03-02T10:00:00Z"),
            booking(3, ADA, "PENDING", "2024-03-03T10:00:00Z"),
            booking(4, "65a000000000000000000002", "ACCEPTED", "2024-03-04T10:00:00Z"),
            booking(5, "65a000000000000000000002", "PENDING", "2024-03-05T10:00:00Z"),
            booking(6, "65a000000000000000000003", "COMPLETED", "2024-03-06T10:00:00Z")
        ]
    })
}

pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::from_json(fixtures()).expect("fixtures load"))
}

pub fn services() -> Services<MemoryStore> {
    Services::new(store(), PageLimits::default())
}
