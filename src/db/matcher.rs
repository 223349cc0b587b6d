//! Predicate evaluation for the in-memory store
//!
//! Evaluates the query language the filter compilers emit against plain BSON
//! documents: field predicates on dotted paths (traversing arrays of documents),
//! the comparison operators, `$in`, `$regex`, `$not`, `$near` and the `$and`/`$or`
//! logical slots.

use std::cmp::Ordering;

use bson::{Bson, Document};
use regex::RegexBuilder;
use thiserror::Error;

/// Mean Earth radius used for `$near` distances, in meters
pub const EARTH_RADIUS_METERS: f64 = 6_378_100.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(String),

    #[error("malformed `{operator}` operand: {reason}")]
    Malformed { operator: String, reason: String },
}

impl MatchError {
    fn malformed(operator: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            operator: operator.to_string(),
            reason: reason.into(),
        }
    }
}

/// A `$near` point: `(longitude, latitude)` plus distance bounds in meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearQuery {
    pub longitude: f64,
    pub latitude: f64,
    pub min_distance: Option<f64>,
    pub max_distance: Option<f64>,
}

/// Does `doc` satisfy `filter`? An empty filter matches everything.
pub fn matches(doc: &Document, filter: &Document) -> Result<bool, MatchError> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => return Err(MatchError::UnsupportedOperator(op.to_string())),
            path => {
                let candidates = resolve_path(doc, path);
                match condition {
                    Bson::Document(ops) if is_operator_doc(ops) => {
                        eval_operators(doc, path, &candidates, ops)?
                    }
                    literal => eq(&candidates, literal),
                }
            }
        };

        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses<'a>(operator: &str, value: &'a Bson) -> Result<Vec<&'a Document>, MatchError> {
    let Bson::Array(items) = value else {
        return Err(MatchError::malformed(operator, "expected an array"));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(doc) => Ok(doc),
            _ => Err(MatchError::malformed(operator, "expected documents")),
        })
        .collect()
}

fn is_operator_doc(doc: &Document) -> bool {
    doc.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn eval_operators(
    doc: &Document,
    path: &str,
    candidates: &[&Bson],
    ops: &Document,
) -> Result<bool, MatchError> {
    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => eq(candidates, operand),
            "$ne" => !eq(candidates, operand),
            "$gt" => ordered(candidates, operand, |o| o == Ordering::Greater),
            "$gte" => ordered(candidates, operand, |o| o != Ordering::Less),
            "$lt" => ordered(candidates, operand, |o| o == Ordering::Less),
            "$lte" => ordered(candidates, operand, |o| o != Ordering::Greater),
            "$in" => {
                let Bson::Array(values) = operand else {
                    return Err(MatchError::malformed(op, "expected an array"));
                };
                values.iter().any(|value| eq(candidates, value))
            }
            "$regex" => regex_match(candidates, operand)?,
            "$not" => match operand {
                Bson::Document(inner) => !eval_operators(doc, path, candidates, inner)?,
                Bson::RegularExpression(_) => !regex_match(candidates, operand)?,
                _ => return Err(MatchError::malformed(op, "expected an operator document")),
            },
            "$near" => {
                let near = parse_near(operand)?;
                distance_to(doc, path, &near).is_some_and(|d| within(&near, d))
            }
            other => return Err(MatchError::UnsupportedOperator(other.to_string())),
        };

        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn eq(candidates: &[&Bson], value: &Bson) -> bool {
    if candidates.is_empty() {
        return matches!(value, Bson::Null);
    }
    candidates
        .iter()
        .any(|c| compare_bson(c, value) == Some(Ordering::Equal))
}

fn ordered(candidates: &[&Bson], value: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    candidates
        .iter()
        .filter_map(|c| compare_bson(c, value))
        .any(accept)
}

fn regex_match(candidates: &[&Bson], operand: &Bson) -> Result<bool, MatchError> {
    let Bson::RegularExpression(regex) = operand else {
        return Err(MatchError::malformed("$regex", "expected a regular expression"));
    };
    let compiled = RegexBuilder::new(&regex.pattern)
        .case_insensitive(regex.options.contains('i'))
        .multi_line(regex.options.contains('m'))
        .build()
        .map_err(|e| MatchError::malformed("$regex", e.to_string()))?;

    Ok(candidates.iter().any(|c| match c {
        Bson::String(s) => compiled.is_match(s),
        _ => false,
    }))
}

/// Values reachable through a dotted path. Arrays of documents are traversed; a
/// terminal array yields itself followed by its elements.
pub fn resolve_path<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let mut parts = path.split('.');
    let mut out = Vec::new();
    if let Some(head) = parts.next() {
        if let Some(value) = doc.get(head) {
            let rest: Vec<&str> = parts.collect();
            resolve(value, &rest, &mut out);
        }
    }
    out
}

fn resolve<'a>(value: &'a Bson, path: &[&str], out: &mut Vec<&'a Bson>) {
    match path.split_first() {
        None => {
            out.push(value);
            if let Bson::Array(items) = value {
                out.extend(items.iter());
            }
        }
        Some((head, rest)) => match value {
            Bson::Document(doc) => {
                if let Some(next) = doc.get(*head) {
                    resolve(next, rest, out);
                }
            }
            Bson::Array(items) => {
                for item in items.iter().filter(|i| matches!(i, Bson::Document(_))) {
                    resolve(item, path, out);
                }
            }
            _ => {}
        },
    }
}

/// Compare two values of the same type class. Numbers compare across widths;
/// mismatched types are unordered.
pub fn compare_bson(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => Some(x.cmp(y)),
        (Bson::Int64(x), Bson::Int64(y)) => Some(x.cmp(y)),
        (Bson::Int32(x), Bson::Int64(y)) => Some(i64::from(*x).cmp(y)),
        (Bson::Int64(x), Bson::Int32(y)) => Some(x.cmp(&i64::from(*y))),
        (a, b) if as_f64(a).is_some() && as_f64(b).is_some() => {
            as_f64(a)?.partial_cmp(&as_f64(b)?)
        }
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        (a, b) if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Canonical cross-type sort order: null, numbers, strings, documents, arrays,
/// object ids, booleans, dates.
fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 1,
        Bson::String(_) | Bson::Symbol(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::Binary(_) => 5,
        Bson::ObjectId(_) => 6,
        Bson::Boolean(_) => 7,
        Bson::DateTime(_) | Bson::Timestamp(_) => 8,
        _ => 9,
    }
}

/// Order two documents by a sort specification (`{field: 1 | -1, ...}`).
pub fn compare_by_sort(a: &Document, b: &Document, sort: &Document) -> Ordering {
    for (path, direction) in sort {
        let descending = matches!(direction, Bson::Int32(d) if *d < 0)
            || matches!(direction, Bson::Int64(d) if *d < 0)
            || matches!(direction, Bson::Double(d) if *d < 0.0);

        let left = resolve_path(a, path).first().copied().unwrap_or(&Bson::Null);
        let right = resolve_path(b, path).first().copied().unwrap_or(&Bson::Null);

        let ordering = type_rank(left)
            .cmp(&type_rank(right))
            .then_with(|| compare_bson(left, right).unwrap_or(Ordering::Equal));
        let ordering = if descending { ordering.reverse() } else { ordering };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// First top-level `$near` predicate in a filter, with its field path.
pub fn find_near(filter: &Document) -> Option<(String, NearQuery)> {
    filter.iter().find_map(|(path, condition)| {
        let Bson::Document(ops) = condition else {
            return None;
        };
        let near = parse_near(ops.get("$near")?).ok()?;
        Some((path.clone(), near))
    })
}

fn parse_near(operand: &Bson) -> Result<NearQuery, MatchError> {
    let Bson::Document(near) = operand else {
        return Err(MatchError::malformed("$near", "expected a document"));
    };
    let geometry = near
        .get_document("$geometry")
        .map_err(|_| MatchError::malformed("$near", "missing `$geometry`"))?;
    let (longitude, latitude) = geometry
        .get_array("coordinates")
        .ok()
        .and_then(|coords| point(coords))
        .ok_or_else(|| MatchError::malformed("$near", "expected `[longitude, latitude]`"))?;

    Ok(NearQuery {
        longitude,
        latitude,
        min_distance: near.get("$minDistance").and_then(as_f64),
        max_distance: near.get("$maxDistance").and_then(as_f64),
    })
}

fn point(coords: &[Bson]) -> Option<(f64, f64)> {
    match coords {
        [lng, lat] => Some((as_f64(lng)?, as_f64(lat)?)),
        _ => None,
    }
}

fn stored_point(value: &Bson) -> Option<(f64, f64)> {
    match value {
        Bson::Document(geo) => point(geo.get_array("coordinates").ok()?),
        Bson::Array(coords) => point(coords),
        _ => None,
    }
}

/// Distance in meters from the stored point at `path` to the query point.
pub fn distance_to(doc: &Document, path: &str, near: &NearQuery) -> Option<f64> {
    resolve_path(doc, path)
        .into_iter()
        .find_map(stored_point)
        .map(|(lng, lat)| haversine(lng, lat, near.longitude, near.latitude))
}

fn within(near: &NearQuery, distance: f64) -> bool {
    near.min_distance.is_none_or(|min| distance >= min)
        && near.max_distance.is_none_or(|max| distance <= max)
}

fn haversine(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}
