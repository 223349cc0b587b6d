//! Filter composer
//!
//! Turns a client filter expression into one store query document using an
//! entity's [`FieldTypeRegistry`]:
//!
//! - field keys are compiled by the matching scalar compiler under their storage
//!   name; names missing from the registry are skipped without error
//! - `AND` merges the field predicates of all its nested expressions into a single
//!   document placed in `$and`
//! - `OR` keeps one branch per nested expression in `$or`; if any branch compiles
//!   to no predicate the group matches everything and is left out
//!
//! Field keys are compiled in the order the client wrote them, so when two logical
//! names share a storage path the later one wins.
//!
//! Logical groups are one level deep. `AND`/`OR` keys inside a nested expression
//! are ignored. Flat predicates and grouped predicates on the same field end up in
//! different slots of the query, so both apply.

use bson::{Bson, Document};
use serde::Serialize;
use serde_json::{Map, Value};

use super::compilers::compile_field;
use super::error::FilterError;
use super::registry::FieldTypeRegistry;

pub const AND: &str = "AND";
pub const OR: &str = "OR";

/// Client filter: logical field name to operator value, plus `AND`/`OR` groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpression {
    entries: Map<String, Value>,
}

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a typed filter input (e.g. a GraphQL `*FilterInput`).
    pub fn from_input<T: Serialize>(input: &T) -> Result<Self, FilterError> {
        let value = serde_json::to_value(input)
            .map_err(|e| FilterError::invalid("<filter>", e.to_string()))?;
        Self::try_from(value)
    }

    /// Add or replace the operator value for one field
    pub fn with(
        mut self,
        field: impl Into<String>,
        operators: impl Serialize,
    ) -> Result<Self, FilterError> {
        let field = field.into();
        let value = serde_json::to_value(operators)
            .map_err(|e| FilterError::invalid(field.as_str(), e.to_string()))?;
        self.entries.insert(field, value);
        Ok(self)
    }

    pub fn and(mut self, group: Vec<FilterExpression>) -> Self {
        self.entries.insert(AND.to_string(), group_value(group));
        self
    }

    pub fn or(mut self, group: Vec<FilterExpression>) -> Self {
        self.entries.insert(OR.to_string(), group_value(group));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Value::is_null)
    }

    /// Field-level entries, excluding `AND`/`OR`
    fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries
            .iter()
            .filter(|(key, _)| key.as_str() != AND && key.as_str() != OR)
    }

    fn has_groups(&self) -> bool {
        [AND, OR]
            .iter()
            .any(|key| self.entries.get(*key).is_some_and(|v| !v.is_null()))
    }

    /// Nested expressions of a logical group; absent or `null` groups are empty.
    fn group(&self, key: &str) -> Result<Vec<FilterExpression>, FilterError> {
        match self.entries.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .cloned()
                .map(|item| {
                    FilterExpression::try_from(item)
                        .map_err(|_| FilterError::invalid(key, "group entries must be objects"))
                })
                .collect(),
            Some(_) => Err(FilterError::invalid(key, "expected a list of filters")),
        }
    }
}

impl TryFrom<Value> for FilterExpression {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            Value::Null => Ok(Self::default()),
            other => Err(FilterError::invalid(
                "<filter>",
                format!("expected an object, got {other}"),
            )),
        }
    }
}

fn group_value(group: Vec<FilterExpression>) -> Value {
    Value::Array(
        group
            .into_iter()
            .map(|expr| Value::Object(expr.entries))
            .collect(),
    )
}

/// Compile a filter expression into a store query. `None` matches everything.
pub fn compose(
    registry: &FieldTypeRegistry,
    filter: Option<&FilterExpression>,
) -> Result<Document, FilterError> {
    let Some(filter) = filter else {
        return Ok(Document::new());
    };

    let mut query = Document::new();

    let and_group = filter.group(AND)?;
    if !and_group.is_empty() {
        let mut combined = Document::new();
        for nested in &and_group {
            warn_if_nested(AND, nested);
            merge_into(&mut combined, compose_fields(registry, nested)?);
        }
        if !combined.is_empty() {
            query.insert("$and", vec![Bson::Document(combined)]);
        }
    }

    let or_group = filter.group(OR)?;
    if !or_group.is_empty() {
        let mut branches = Vec::with_capacity(or_group.len());
        for nested in &or_group {
            warn_if_nested(OR, nested);
            branches.push(compose_fields(registry, nested)?);
        }
        // A branch with no predicate matches everything, and so does the group
        if branches.iter().any(Document::is_empty) {
            tracing::debug!("OR group has an unconstrained branch; omitting it");
        } else {
            query.insert("$or", branches);
        }
    }

    merge_into(&mut query, compose_fields(registry, filter)?);

    tracing::debug!(query = %query, "Composed filter");
    Ok(query)
}

/// Compile the field-level keys of one expression.
fn compose_fields(
    registry: &FieldTypeRegistry,
    filter: &FilterExpression,
) -> Result<Document, FilterError> {
    let mut fragment = Document::new();
    for (name, operators) in filter.fields() {
        let Some(descriptor) = registry.describe(name) else {
            tracing::trace!(field = %name, "Skipping unregistered filter field");
            continue;
        };
        let compiled = compile_field(descriptor, operators).map_err(|e| match e {
            FilterError::InvalidFilter { reason, .. } => FilterError::invalid(name.as_str(), reason),
            other => other,
        })?;
        merge_into(&mut fragment, compiled);
    }
    Ok(fragment)
}

fn warn_if_nested(group: &str, nested: &FilterExpression) {
    if nested.has_groups() {
        tracing::warn!(group, "Nested AND/OR groups are not supported; ignoring them");
    }
}

/// Copy every key of `fragment` into `target`; later writes replace earlier ones.
fn merge_into(target: &mut Document, fragment: Document) {
    for (key, value) in fragment {
        target.insert(key, value);
    }
}
