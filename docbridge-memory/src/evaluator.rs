//! Filter evaluation for in-memory documents.
//!
//! This module interprets MongoDB-style filter documents against BSON documents and provides the
//! value ordering used for sorting. Supported operators:
//!
//! - Logical: `$and`, `$or`, `$nor`, `$not`
//! - Comparison: `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`
//! - Membership: `$in`, `$nin`
//! - Existence: `$exists`
//!
//! Field names may use dotted paths into embedded documents. A filter value that is an array
//! field matches when any element matches, as in MongoDB.

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};
use std::{cmp::Ordering, collections::HashMap};

use docbridge_core::error::{DocumentStoreError, DocumentStoreResult};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so that `1`, `1i64` and `1.0` compare equal.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Any other BSON type. Equal when the underlying values are equal, unordered otherwise.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>(),
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> From<Option<&'a Bson>> for Comparable<'a> {
    fn from(bson: Option<&'a Bson>) -> Self {
        bson.map(Comparable::from).unwrap_or(Comparable::Null)
    }
}

impl<'a> Comparable<'a> {
    /// Position of the value's type in the cross-type sort order.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
            Comparable::Other(_) => 8,
        }
    }

    /// Total ordering used for sorting: by type first, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            // NaN matches NaN, as in MongoDB.
            (Comparable::Number(a), Comparable::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            _ => None,
        }
    }
}

/// Resolves a dotted field path inside `document`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Evaluates filter documents against a single document.
pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns `true` if the document satisfies every clause of `filter`.
    pub fn matches(&self, filter: &Document) -> DocumentStoreResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => self.all(clauses(key, condition)?)?,
                "$or" => self.any(clauses(key, condition)?)?,
                "$nor" => !self.any(clauses(key, condition)?)?,
                op if op.starts_with('$') => return Err(unsupported(op)),
                field => matches_value(lookup(self.document, field), condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn all(&self, filters: Vec<&Document>) -> DocumentStoreResult<bool> {
        for filter in filters {
            if !self.matches(filter)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn any(&self, filters: Vec<&Document>) -> DocumentStoreResult<bool> {
        for filter in filters {
            if self.matches(filter)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Returns the documents of `documents` that match `filter`, in order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> DocumentStoreResult<Vec<&'a Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).matches(filter)? {
                matched.push(document);
            }
        }

        Ok(matched)
    }
}

fn clauses<'f>(operator: &str, value: &'f Bson) -> DocumentStoreResult<Vec<&'f Document>> {
    value
        .as_array()
        .ok_or_else(|| DocumentStoreError::Backend(format!("{operator} requires an array")))?
        .iter()
        .map(|clause| {
            clause
                .as_document()
                .ok_or_else(|| DocumentStoreError::Backend(format!("{operator} clauses must be documents")))
        })
        .collect()
}

fn unsupported(operator: &str) -> DocumentStoreError {
    DocumentStoreError::Backend(format!("unsupported query operator {operator}"))
}

/// Whether `condition` is an operator document such as `{ "$gt": 3 }`.
fn is_operator_document(condition: &Bson) -> bool {
    condition
        .as_document()
        .and_then(|doc| doc.keys().next())
        .is_some_and(|key| key.starts_with('$'))
}

fn matches_value(value: Option<&Bson>, condition: &Bson) -> DocumentStoreResult<bool> {
    match condition {
        Bson::Document(operators) if is_operator_document(condition) => {
            for (op, operand) in operators {
                if !matches_operator(value, op, operand)? {
                    return Ok(false);
                }
            }

            Ok(true)
        }
        _ => Ok(equals(value, condition)),
    }
}

/// Equality with MongoDB array semantics: an array field equals `expected` if the whole array
/// does or any of its elements does. A missing field equals `null`.
fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    let expected = Comparable::from(expected);

    match value {
        Some(Bson::Array(items)) => {
            Comparable::from(value) == expected
                || items.iter().any(|item| Comparable::from(item) == expected)
        }
        _ => Comparable::from(value) == expected,
    }
}

fn compare(value: Option<&Bson>, operand: &Bson, accept: fn(Ordering) -> bool) -> bool {
    let operand = Comparable::from(operand);
    let holds = |candidate: &Bson| {
        Comparable::from(candidate)
            .partial_cmp(&operand)
            .is_some_and(accept)
    };

    match value {
        Some(Bson::Array(items)) => items.iter().any(holds),
        Some(candidate) => holds(candidate),
        None => false,
    }
}

fn matches_operator(value: Option<&Bson>, op: &str, operand: &Bson) -> DocumentStoreResult<bool> {
    Ok(match op {
        "$eq" => equals(value, operand),
        "$ne" => !equals(value, operand),
        "$gt" => compare(value, operand, |o| o == Ordering::Greater),
        "$gte" => compare(value, operand, |o| o != Ordering::Less),
        "$lt" => compare(value, operand, |o| o == Ordering::Less),
        "$lte" => compare(value, operand, |o| o != Ordering::Greater),
        "$in" => members(op, operand)?.iter().any(|m| equals(value, m)),
        "$nin" => !members(op, operand)?.iter().any(|m| equals(value, m)),
        "$exists" => value.is_some() == truthy(operand),
        "$not" => !matches_value(value, operand)?,
        other => return Err(unsupported(other)),
    })
}

fn members<'o>(op: &str, operand: &'o Bson) -> DocumentStoreResult<&'o Vec<Bson>> {
    operand
        .as_array()
        .ok_or_else(|| DocumentStoreError::Backend(format!("{op} needs an array")))
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    }
}
