//! GraphQL filter input types (operator values)
//!
//! One input type per scalar kind. Each optional field is a comparison operator:
//! - eq, ne (equals, not equals)
//! - lt, lte, gt, gte (comparisons)
//! - contains, notContains, beginsWith (case-insensitive string matching)
//! - between (two values: membership for ids/strings/enums, inclusive range otherwise)
//! - near (geo proximity)
//!
//! Every type also deserializes from the untyped filter map a client sends, and
//! rejects keys that are not operators of its kind.

use async_graphql::InputObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter for object id fields
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[graphql(name = "IDFilterInput")]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IdFilter {
    /// Equals
    pub eq: Option<String>,
    /// Not equals
    pub ne: Option<String>,
    /// Greater than
    pub gt: Option<String>,
    /// Greater than or equal
    pub gte: Option<String>,
    /// Less than
    pub lt: Option<String>,
    /// Less than or equal
    pub lte: Option<String>,
    /// Either of two ids
    pub between: Option<Vec<String>>,
}

/// Filter for string fields
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[graphql(name = "StringFilterInput")]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StringFilter {
    /// Equals
    pub eq: Option<String>,
    /// Not equals
    pub ne: Option<String>,
    /// Contains substring (case-insensitive)
    pub contains: Option<String>,
    /// Does not contain substring (case-insensitive)
    pub not_contains: Option<String>,
    /// Starts with (case-insensitive)
    pub begins_with: Option<String>,
    /// Either of two values
    pub between: Option<Vec<String>>,
}

/// Filter for integer fields
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[graphql(name = "IntFilterInput")]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IntFilter {
    /// Equals
    pub eq: Option<i64>,
    /// Not equals
    pub ne: Option<i64>,
    /// Greater than
    pub gt: Option<i64>,
    /// Greater than or equal
    pub gte: Option<i64>,
    /// Less than
    pub lt: Option<i64>,
    /// Less than or equal
    pub lte: Option<i64>,
    /// Inclusive range `[min, max]`
    pub between: Option<Vec<i64>>,
}

/// Filter for float fields
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[graphql(name = "FloatFilterInput")]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FloatFilter {
    /// Equals
    pub eq: Option<f64>,
    /// Not equals
    pub ne: Option<f64>,
    /// Greater than
    pub gt: Option<f64>,
    /// Greater than or equal
    pub gte: Option<f64>,
    /// Less than
    pub lt: Option<f64>,
    /// Less than or equal
    pub lte: Option<f64>,
    /// Inclusive range `[min, max]`
    pub between: Option<Vec<f64>>,
}

/// Filter for boolean fields
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[graphql(name = "BooleanFilterInput")]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BooleanFilter {
    /// Equals
    pub eq: Option<bool>,
    /// Not equals
    pub ne: Option<bool>,
}

/// Filter for date/timestamp fields
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[graphql(name = "DateFilterInput")]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DateFilter {
    /// Equals
    pub eq: Option<DateTime<Utc>>,
    /// Not equals
    pub ne: Option<DateTime<Utc>>,
    /// After
    pub gt: Option<DateTime<Utc>>,
    /// After or on
    pub gte: Option<DateTime<Utc>>,
    /// Before
    pub lt: Option<DateTime<Utc>>,
    /// Before or on
    pub lte: Option<DateTime<Utc>>,
    /// Inclusive range `[start, end]`
    pub between: Option<Vec<DateTime<Utc>>>,
}

/// Filter for enumeration fields, compared by variant name
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[graphql(name = "EnumFilterInput")]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnumFilter {
    /// Equals
    pub eq: Option<String>,
    /// Not equals
    pub ne: Option<String>,
    /// Either of two variants
    pub between: Option<Vec<String>>,
}

/// A point on the globe
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq)]
#[graphql(name = "LocationCoordinatesInput")]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Filter for geo-point fields.
///
/// Distance bounds are configured on the field, not supplied by the client.
#[derive(InputObject, Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[graphql(name = "LocationFilterInput")]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LocationFilter {
    /// Nearest first, from this point
    pub near: Option<Coordinates>,
}

// ============================================================================
// Emptiness checks and helper constructors
// ============================================================================

impl IdFilter {
    /// Check if filter has any conditions
    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.ne.is_none()
            && self.gt.is_none()
            && self.gte.is_none()
            && self.lt.is_none()
            && self.lte.is_none()
            && self.between.is_none()
    }

    /// Create an equals filter
    pub fn eq(value: impl Into<String>) -> Self {
        Self {
            eq: Some(value.into()),
            ..Default::default()
        }
    }

    /// Create a not-equals filter
    pub fn ne(value: impl Into<String>) -> Self {
        Self {
            ne: Some(value.into()),
            ..Default::default()
        }
    }

    /// Create an either-of filter
    pub fn between(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            between: Some(vec![first.into(), second.into()]),
            ..Default::default()
        }
    }
}

impl StringFilter {
    /// Check if filter has any conditions
    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.ne.is_none()
            && self.contains.is_none()
            && self.not_contains.is_none()
            && self.begins_with.is_none()
            && self.between.is_none()
    }

    /// Create an equals filter
    pub fn eq(value: impl Into<String>) -> Self {
        Self {
            eq: Some(value.into()),
            ..Default::default()
        }
    }

    /// Create a not-equals filter
    pub fn ne(value: impl Into<String>) -> Self {
        Self {
            ne: Some(value.into()),
            ..Default::default()
        }
    }

    /// Create a contains filter (case-insensitive)
    pub fn contains(value: impl Into<String>) -> Self {
        Self {
            contains: Some(value.into()),
            ..Default::default()
        }
    }

    /// Create a does-not-contain filter (case-insensitive)
    pub fn not_contains(value: impl Into<String>) -> Self {
        Self {
            not_contains: Some(value.into()),
            ..Default::default()
        }
    }

    /// Create a starts-with filter (case-insensitive)
    pub fn begins_with(value: impl Into<String>) -> Self {
        Self {
            begins_with: Some(value.into()),
            ..Default::default()
        }
    }
}

impl IntFilter {
    /// Check if filter has any conditions
    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.ne.is_none()
            && self.gt.is_none()
            && self.gte.is_none()
            && self.lt.is_none()
            && self.lte.is_none()
            && self.between.is_none()
    }

    /// Create an equals filter
    pub fn eq(value: i64) -> Self {
        Self {
            eq: Some(value),
            ..Default::default()
        }
    }

    /// Create a greater-than-or-equal filter
    pub fn gte(value: i64) -> Self {
        Self {
            gte: Some(value),
            ..Default::default()
        }
    }

    /// Create a less-than filter
    pub fn lt(value: i64) -> Self {
        Self {
            lt: Some(value),
            ..Default::default()
        }
    }

    /// Create an inclusive range filter
    pub fn between(min: i64, max: i64) -> Self {
        Self {
            between: Some(vec![min, max]),
            ..Default::default()
        }
    }
}

impl FloatFilter {
    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.ne.is_none()
            && self.gt.is_none()
            && self.gte.is_none()
            && self.lt.is_none()
            && self.lte.is_none()
            && self.between.is_none()
    }

    /// Create a greater-than-or-equal filter
    pub fn gte(value: f64) -> Self {
        Self {
            gte: Some(value),
            ..Default::default()
        }
    }
}

impl BooleanFilter {
    /// Check if filter has any conditions
    pub fn is_empty(&self) -> bool {
        self.eq.is_none() && self.ne.is_none()
    }

    /// Create a filter for true values
    pub fn is_true() -> Self {
        Self {
            eq: Some(true),
            ..Default::default()
        }
    }

    /// Create a filter for false values
    pub fn is_false() -> Self {
        Self {
            eq: Some(false),
            ..Default::default()
        }
    }
}

impl DateFilter {
    /// Check if filter has any conditions
    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.ne.is_none()
            && self.gt.is_none()
            && self.gte.is_none()
            && self.lt.is_none()
            && self.lte.is_none()
            && self.between.is_none()
    }

    /// Create an after (greater than) filter
    pub fn after(value: DateTime<Utc>) -> Self {
        Self {
            gt: Some(value),
            ..Default::default()
        }
    }

    /// Create a before (less than) filter
    pub fn before(value: DateTime<Utc>) -> Self {
        Self {
            lt: Some(value),
            ..Default::default()
        }
    }

    /// Create an inclusive range filter
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            between: Some(vec![start, end]),
            ..Default::default()
        }
    }
}

impl EnumFilter {
    /// Check if filter has any conditions
    pub fn is_empty(&self) -> bool {
        self.eq.is_none() && self.ne.is_none() && self.between.is_none()
    }

    /// Create an equals filter
    pub fn eq(variant: impl Into<String>) -> Self {
        Self {
            eq: Some(variant.into()),
            ..Default::default()
        }
    }

    /// Create an either-of filter
    pub fn between(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            between: Some(vec![first.into(), second.into()]),
            ..Default::default()
        }
    }
}

impl LocationFilter {
    /// Create a proximity filter around a point
    pub fn near(latitude: f64, longitude: f64) -> Self {
        Self {
            near: Some(Coordinates {
                latitude,
                longitude,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.near.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_filter_reads_camel_case_keys() {
        let filter: StringFilter =
            serde_json::from_value(json!({ "beginsWith": "Al", "notContains": "x" })).unwrap();
        assert_eq!(filter.begins_with.as_deref(), Some("Al"));
        assert_eq!(filter.not_contains.as_deref(), Some("x"));
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_operator_not_valid_for_kind_is_rejected() {
        // Booleans have no ordering operators
        let result = serde_json::from_value::<BooleanFilter>(json!({ "gt": true }));
        assert!(result.is_err());

        // Strings have no ordering operators either
        let result = serde_json::from_value::<StringFilter>(json!({ "lt": "b" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_null_operators_are_absent() {
        let filter: IntFilter = serde_json::from_value(json!({ "eq": null })).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_date_filter_parses_rfc3339() {
        let filter: DateFilter =
            serde_json::from_value(json!({ "gte": "2024-01-01T00:00:00Z" })).unwrap();
        assert_eq!(filter.gte.unwrap().timestamp(), 1_704_067_200);
    }
}
