//! Scalar filter compilers
//!
//! One compiler per scalar kind. A compiler reads the client's operator value for a
//! single field and emits a BSON fragment `{ <field>: { <op>: <value>, ... } }`.
//! Absent operators are skipped; an operator value with no operators produces an
//! empty fragment, which the composer leaves out of the query entirely.
//!
//! When two operators map to the same store operator (`gte` and `between` on a
//! number, `beginsWith` and `contains` on a string) the one applied last wins.

use bson::oid::ObjectId;
use bson::{Bson, Document, Regex};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::FilterError;
use super::registry::{FieldDescriptor, GeoBounds, ScalarKind};
use crate::graphql::filters::{
    BooleanFilter, DateFilter, EnumFilter, FloatFilter, IdFilter, IntFilter, LocationFilter,
    StringFilter,
};

/// GeoJSON type used for `$near` anchors
const LOCATION_TYPE: &str = "Point";

/// Compiles one operator value into a query fragment keyed by `field`.
pub trait FilterCompiler {
    fn apply(&self, field: &str, value: &Value) -> Result<Document, FilterError>;
}

/// Dispatch an operator value to the compiler for the descriptor's scalar kind.
pub fn compile_field(descriptor: &FieldDescriptor, value: &Value) -> Result<Document, FilterError> {
    let field = descriptor.storage_name();
    match descriptor.scalar_kind {
        ScalarKind::Id => IdCompiler.apply(field, value),
        ScalarKind::String => StringCompiler.apply(field, value),
        ScalarKind::Int => IntCompiler.apply(field, value),
        ScalarKind::Float => FloatCompiler.apply(field, value),
        ScalarKind::Boolean => BooleanCompiler.apply(field, value),
        ScalarKind::Date => DateCompiler.apply(field, value),
        ScalarKind::Enum => EnumCompiler {
            variants: descriptor.variants.as_deref(),
        }
        .apply(field, value),
        ScalarKind::Location => GeoCompiler {
            bounds: descriptor.geo,
        }
        .apply(field, value),
    }
}

pub struct IdCompiler;
pub struct StringCompiler;
pub struct IntCompiler;
pub struct FloatCompiler;
pub struct BooleanCompiler;
pub struct DateCompiler;

pub struct EnumCompiler<'a> {
    pub variants: Option<&'a [String]>,
}

/// Center comes from the client, bounds from the field configuration.
pub struct GeoCompiler {
    pub bounds: GeoBounds,
}

impl FilterCompiler for IdCompiler {
    fn apply(&self, field: &str, value: &Value) -> Result<Document, FilterError> {
        compile_id(field, &parse_operators(field, value)?)
    }
}

impl FilterCompiler for StringCompiler {
    fn apply(&self, field: &str, value: &Value) -> Result<Document, FilterError> {
        compile_string(field, &parse_operators(field, value)?)
    }
}

impl FilterCompiler for IntCompiler {
    fn apply(&self, field: &str, value: &Value) -> Result<Document, FilterError> {
        compile_int(field, &parse_operators(field, value)?)
    }
}

impl FilterCompiler for FloatCompiler {
    fn apply(&self, field: &str, value: &Value) -> Result<Document, FilterError> {
        compile_float(field, &parse_operators(field, value)?)
    }
}

impl FilterCompiler for BooleanCompiler {
    fn apply(&self, field: &str, value: &Value) -> Result<Document, FilterError> {
        Ok(compile_boolean(field, &parse_operators(field, value)?))
    }
}

impl FilterCompiler for DateCompiler {
    fn apply(&self, field: &str, value: &Value) -> Result<Document, FilterError> {
        compile_date(field, &parse_operators(field, value)?)
    }
}

impl FilterCompiler for EnumCompiler<'_> {
    fn apply(&self, field: &str, value: &Value) -> Result<Document, FilterError> {
        compile_enum(field, &parse_operators(field, value)?, self.variants)
    }
}

impl FilterCompiler for GeoCompiler {
    fn apply(&self, field: &str, value: &Value) -> Result<Document, FilterError> {
        // Distance bounds are server configuration; drop any the client sent
        let mut value = value.clone();
        if let Value::Object(map) = &mut value {
            for key in ["minDistance", "maxDistance"] {
                if map.remove(key).is_some() {
                    tracing::debug!(field, key, "Ignoring client-supplied distance bound");
                }
            }
        }
        compile_location(field, &parse_operators(field, &value)?, self.bounds)
    }
}

// ============================================================================
// Typed compilation
// ============================================================================

pub fn compile_id(field: &str, filter: &IdFilter) -> Result<Document, FilterError> {
    let mut ops = Document::new();
    let ordered = [
        ("$eq", &filter.eq),
        ("$ne", &filter.ne),
        ("$gt", &filter.gt),
        ("$gte", &filter.gte),
        ("$lt", &filter.lt),
        ("$lte", &filter.lte),
    ];
    for (op, value) in ordered {
        if let Some(value) = value {
            ops.insert(op, parse_object_id(value)?);
        }
    }
    if let Some(between) = &filter.between {
        check_pair(field, between)?;
        let ids = between
            .iter()
            .map(|v| parse_object_id(v).map(Bson::ObjectId))
            .collect::<Result<Vec<_>, _>>()?;
        ops.insert("$in", ids);
    }
    Ok(fragment(field, ops))
}

pub fn compile_string(field: &str, filter: &StringFilter) -> Result<Document, FilterError> {
    let mut ops = Document::new();
    if let Some(eq) = &filter.eq {
        ops.insert("$eq", eq.as_str());
    }
    if let Some(ne) = &filter.ne {
        ops.insert("$ne", ne.as_str());
    }
    if let Some(between) = &filter.between {
        check_pair(field, between)?;
        ops.insert("$in", between.clone());
    }
    if let Some(prefix) = &filter.begins_with {
        ops.insert("$regex", case_insensitive(format!("^{}", regex::escape(prefix))));
    }
    if let Some(needle) = &filter.not_contains {
        ops.insert("$not", case_insensitive(regex::escape(needle)));
    }
    if let Some(needle) = &filter.contains {
        ops.insert("$regex", case_insensitive(regex::escape(needle)));
    }
    Ok(fragment(field, ops))
}

pub fn compile_int(field: &str, filter: &IntFilter) -> Result<Document, FilterError> {
    let mut ops = ordering_ops([
        ("$eq", filter.eq),
        ("$ne", filter.ne),
        ("$gt", filter.gt),
        ("$gte", filter.gte),
        ("$lt", filter.lt),
        ("$lte", filter.lte),
    ]);
    if let Some(between) = &filter.between {
        check_pair(field, between)?;
        ops.insert("$gte", between[0]);
        ops.insert("$lte", between[1]);
    }
    Ok(fragment(field, ops))
}

pub fn compile_float(field: &str, filter: &FloatFilter) -> Result<Document, FilterError> {
    let mut ops = ordering_ops([
        ("$eq", filter.eq),
        ("$ne", filter.ne),
        ("$gt", filter.gt),
        ("$gte", filter.gte),
        ("$lt", filter.lt),
        ("$lte", filter.lte),
    ]);
    if let Some(between) = &filter.between {
        check_pair(field, between)?;
        ops.insert("$gte", between[0]);
        ops.insert("$lte", between[1]);
    }
    Ok(fragment(field, ops))
}

pub fn compile_boolean(field: &str, filter: &BooleanFilter) -> Document {
    fragment(field, ordering_ops([("$eq", filter.eq), ("$ne", filter.ne)]))
}

pub fn compile_date(field: &str, filter: &DateFilter) -> Result<Document, FilterError> {
    let to_bson = |d: &chrono::DateTime<chrono::Utc>| bson::DateTime::from_chrono(*d);
    let mut ops = ordering_ops([
        ("$eq", filter.eq.as_ref().map(to_bson)),
        ("$ne", filter.ne.as_ref().map(to_bson)),
        ("$gt", filter.gt.as_ref().map(to_bson)),
        ("$gte", filter.gte.as_ref().map(to_bson)),
        ("$lt", filter.lt.as_ref().map(to_bson)),
        ("$lte", filter.lte.as_ref().map(to_bson)),
    ]);
    if let Some(between) = &filter.between {
        check_pair(field, between)?;
        ops.insert("$gte", to_bson(&between[0]));
        ops.insert("$lte", to_bson(&between[1]));
    }
    Ok(fragment(field, ops))
}

pub fn compile_enum(
    field: &str,
    filter: &EnumFilter,
    variants: Option<&[String]>,
) -> Result<Document, FilterError> {
    let check = |value: &String| -> Result<(), FilterError> {
        match variants {
            Some(allowed) if !allowed.iter().any(|v| v == value) => Err(FilterError::invalid(
                field,
                format!("`{value}` is not one of {}", allowed.join(", ")),
            )),
            _ => Ok(()),
        }
    };

    let mut ops = Document::new();
    if let Some(eq) = &filter.eq {
        check(eq)?;
        ops.insert("$eq", eq.as_str());
    }
    if let Some(ne) = &filter.ne {
        check(ne)?;
        ops.insert("$ne", ne.as_str());
    }
    if let Some(between) = &filter.between {
        check_pair(field, between)?;
        between.iter().try_for_each(check)?;
        ops.insert("$in", between.clone());
    }
    Ok(fragment(field, ops))
}

pub fn compile_location(
    field: &str,
    filter: &LocationFilter,
    bounds: GeoBounds,
) -> Result<Document, FilterError> {
    let Some(near) = filter.near else {
        return Ok(Document::new());
    };
    if !(-90.0..=90.0).contains(&near.latitude) {
        return Err(FilterError::invalid(
            field,
            format!("latitude {} is out of range", near.latitude),
        ));
    }
    if !(-180.0..=180.0).contains(&near.longitude) {
        return Err(FilterError::invalid(
            field,
            format!("longitude {} is out of range", near.longitude),
        ));
    }

    let mut geometry = Document::new();
    geometry.insert("type", LOCATION_TYPE);
    // GeoJSON order is [longitude, latitude]
    geometry.insert("coordinates", vec![near.longitude, near.latitude]);

    let mut near_op = Document::new();
    near_op.insert("$geometry", geometry);
    if let Some(min) = bounds.min_distance {
        near_op.insert("$minDistance", min);
    }
    if let Some(max) = bounds.max_distance {
        near_op.insert("$maxDistance", max);
    }

    let mut ops = Document::new();
    ops.insert("$near", near_op);
    Ok(fragment(field, ops))
}

// ============================================================================
// Helpers
// ============================================================================

/// Deserialize an operator value; `null` means no operators.
fn parse_operators<T: DeserializeOwned + Default>(
    field: &str,
    value: &Value,
) -> Result<T, FilterError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value.clone()).map_err(|e| FilterError::invalid(field, e.to_string()))
}

pub(crate) fn parse_object_id(value: &str) -> Result<ObjectId, FilterError> {
    ObjectId::parse_str(value).map_err(|_| FilterError::InvalidIdentifier {
        value: value.to_string(),
    })
}

fn check_pair<T>(field: &str, values: &[T]) -> Result<(), FilterError> {
    if values.len() != 2 {
        return Err(FilterError::invalid(
            field,
            format!("`between` takes exactly 2 values, got {}", values.len()),
        ));
    }
    Ok(())
}

fn ordering_ops<T: Into<Bson>, const N: usize>(ops: [(&str, Option<T>); N]) -> Document {
    let mut doc = Document::new();
    for (op, value) in ops {
        if let Some(value) = value {
            doc.insert(op, value);
        }
    }
    doc
}

fn case_insensitive(pattern: String) -> Regex {
    Regex {
        pattern,
        options: "i".to_string(),
    }
}

fn fragment(field: &str, ops: Document) -> Document {
    let mut doc = Document::new();
    if !ops.is_empty() {
        doc.insert(field, ops);
    }
    doc
}
