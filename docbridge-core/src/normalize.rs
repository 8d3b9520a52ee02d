//! Identifier normalization for caller-supplied queries.
//!
//! Callers write identifiers however is convenient for them, usually as 24-character hex
//! strings. Before a query reaches a backend, every `_id` field is rewritten to the canonical
//! identifier encoding, wherever it appears in the query:
//!
//! ```ignore
//! use bson::doc;
//! use docbridge_core::normalize::normalize;
//!
//! let query = normalize(doc! {
//!     "$or": [
//!         { "_id": "507f1f77bcf86cd799439011" },
//!         { "_id": { "$in": ["507f191e810c19729de860ea", "legacy-key"] } },
//!     ],
//! });
//! ```
//!
//! Only the `_id` field name is rewritten. Foreign keys stored under other names are left alone.
//! Under an `_id` field, a plain value and the arrays of the `$in` / `$nin` operators are
//! converted; any other operator passes through. Normalization is total: malformed queries are
//! returned as they came in.

use bson::{Bson, Document};

use crate::id::{ID_FIELD, to_canonical};

/// Set-membership operators whose arrays hold identifiers when they sit under `_id`.
const MEMBERSHIP_OPERATORS: [&str; 2] = ["$in", "$nin"];

/// Returns `query` with every identifier field rewritten to the canonical encoding.
///
/// Idempotent: normalizing an already-normalized query returns it unchanged.
pub fn normalize(query: Document) -> Document {
    query
        .into_iter()
        .map(|(key, value)| {
            let value = if key == ID_FIELD {
                normalize_id_value(value)
            } else {
                normalize_nested(value)
            };

            (key, value)
        })
        .collect()
}

/// Applies the single-value identifier rule to `value`.
pub fn normalize_value(value: Bson) -> Bson {
    to_canonical(value)
}

fn normalize_nested(value: Bson) -> Bson {
    match value {
        Bson::Document(doc) => Bson::Document(normalize(doc)),
        Bson::Array(items) => Bson::Array(items.into_iter().map(normalize_nested).collect()),
        other => other,
    }
}

/// Rewrites the value of an `_id` field.
fn normalize_id_value(value: Bson) -> Bson {
    match value {
        Bson::String(_) => to_canonical(value),
        Bson::Document(operators)
            if MEMBERSHIP_OPERATORS.iter().any(|op| operators.contains_key(op)) =>
        {
            Bson::Document(
                operators
                    .into_iter()
                    .map(|(op, operand)| {
                        let operand = match operand {
                            Bson::Array(items) if MEMBERSHIP_OPERATORS.contains(&op.as_str()) => {
                                Bson::Array(items.into_iter().map(to_canonical).collect())
                            }
                            other => other,
                        };

                        (op, operand)
                    })
                    .collect(),
            )
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    const A: &str = "507f1f77bcf86cd799439011";
    const B: &str = "507f191e810c19729de860ea";

    fn oid(hex: &str) -> ObjectId {
        ObjectId::parse_str(hex).unwrap()
    }

    #[test]
    fn converts_hex_id() {
        let query = normalize(doc! { "_id": A });
        assert_eq!(query.get_object_id("_id").unwrap(), oid(A));
        assert_eq!(query.get_object_id("_id").unwrap().to_hex(), A);
    }

    #[test]
    fn leaves_non_hex_id_untouched() {
        let query = normalize(doc! { "_id": "user-42" });
        assert_eq!(query.get_str("_id").unwrap(), "user-42");

        let query = normalize(doc! { "_id": 42 });
        assert_eq!(query.get_i32("_id").unwrap(), 42);
    }

    #[test]
    fn converts_in_elements_preserving_order() {
        let query = normalize(doc! { "_id": { "$in": [A, "plain", B] } });
        let items = query.get_document("_id").unwrap().get_array("$in").unwrap();

        assert_eq!(
            items,
            &vec![Bson::ObjectId(oid(A)), Bson::String("plain".into()), Bson::ObjectId(oid(B))]
        );
    }

    #[test]
    fn converts_nin_elements() {
        let query = normalize(doc! { "_id": { "$nin": [B] } });
        let items = query.get_document("_id").unwrap().get_array("$nin").unwrap();

        assert_eq!(items, &vec![Bson::ObjectId(oid(B))]);
    }

    #[test]
    fn converts_both_membership_operators() {
        let query = normalize(doc! { "_id": { "$in": [A], "$nin": [B] } });
        let ops = query.get_document("_id").unwrap();

        assert_eq!(ops.get_array("$in").unwrap(), &vec![Bson::ObjectId(oid(A))]);
        assert_eq!(ops.get_array("$nin").unwrap(), &vec![Bson::ObjectId(oid(B))]);
    }

    #[test]
    fn other_operators_pass_through() {
        let original = doc! { "_id": { "$ne": A } };
        assert_eq!(normalize(original.clone()), original);
    }

    #[test]
    fn malformed_membership_operand_passes_through() {
        let original = doc! { "_id": { "$in": A } };
        assert_eq!(normalize(original.clone()), original);
    }

    #[test]
    fn nested_id_object_passes_through() {
        let original = doc! { "_id": { "a": { "b": { "_id": A } } } };
        assert_eq!(normalize(original.clone()), original);
    }

    #[test]
    fn rewrites_ids_inside_logical_operators() {
        let query = normalize(doc! { "$or": [{ "_id": A }, { "name": "x" }] });
        let branches = query.get_array("$or").unwrap();

        assert_eq!(
            branches[0].as_document().unwrap().get_object_id("_id").unwrap(),
            oid(A)
        );
        assert_eq!(branches[1].as_document().unwrap().get_str("name").unwrap(), "x");
    }

    #[test]
    fn rewrites_ids_in_nested_documents() {
        let query = normalize(doc! { "owner": { "_id": A } });
        let owner = query.get_document("owner").unwrap();
        assert_eq!(owner.get_object_id("_id").unwrap(), oid(A));
    }

    #[test]
    fn foreign_keys_are_not_touched() {
        let query = normalize(doc! { "owner_id": A, "tags": [A] });
        assert_eq!(query.get_str("owner_id").unwrap(), A);
        assert_eq!(query.get_array("tags").unwrap(), &vec![Bson::String(A.into())]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let queries = vec![
            doc! { "_id": A },
            doc! { "_id": { "$in": [A, "x", 3] } },
            doc! { "$and": [{ "_id": { "$nin": [B] } }, { "age": { "$gt": 3 } }] },
            doc! { "_id": { "$in": "not-an-array" } },
            doc! {},
        ];

        for query in queries {
            let once = normalize(query);
            let twice = normalize(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn preserves_field_order() {
        let query = normalize(doc! { "b": 1, "_id": A, "a": 2 });
        let keys: Vec<&str> = query.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "_id", "a"]);
    }
}
