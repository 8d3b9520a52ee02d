//! Record identifiers.
//!
//! The canonical, store-native identifier is a 12-byte BSON ObjectId. Callers usually hold the
//! 24-character hex form instead. [`Identifier`] converts between the two and never fails loudly:
//! a value that does not look like an identifier simply stays what it was.

use bson::{Bson, oid::ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The reserved field name that holds a document's identifier.
pub const ID_FIELD: &str = "_id";

/// Length of the caller-facing hex encoding of an identifier.
pub const HEX_ID_LEN: usize = 24;

/// Canonical identifier of a record within a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(ObjectId);

impl Identifier {
    /// Generates a fresh identifier.
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// Parses the caller-facing hex form (case-insensitive).
    ///
    /// Returns `None` when `value` is not a 24-character hex string.
    pub fn parse(value: &str) -> Option<Self> {
        if !is_hex_identifier(value) {
            return None;
        }

        ObjectId::parse_str(value).ok().map(Self)
    }

    /// Extracts an identifier from a BSON value that is either a native ObjectId or a hex string.
    pub fn from_bson(value: &Bson) -> Option<Self> {
        match value {
            Bson::ObjectId(oid) => Some(Self(*oid)),
            Bson::String(s) => Self::parse(s),
            _ => None,
        }
    }

    /// The lower-case 24-character hex form.
    pub fn to_canonical_string(&self) -> String {
        self.0.to_hex()
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl From<ObjectId> for Identifier {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl From<Identifier> for ObjectId {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl From<Identifier> for Bson {
    fn from(id: Identifier) -> Self {
        Bson::ObjectId(id.0)
    }
}

/// Returns `true` if `value` has the shape of a caller-facing identifier: exactly 24 hex digits.
pub fn is_hex_identifier(value: &str) -> bool {
    value.len() == HEX_ID_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Returns `true` if `value` is already a canonical identifier or a string that looks like one.
pub fn is_identifier_like(value: &Bson) -> bool {
    match value {
        Bson::ObjectId(_) => true,
        Bson::String(s) => is_hex_identifier(s),
        _ => false,
    }
}

/// String form of an identifier value.
///
/// Canonical identifiers render as lower-case hex; strings are returned as-is and any other
/// value uses its BSON display form.
pub fn canonical_string(value: &Bson) -> String {
    match value {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Converts a single value to its canonical identifier if it looks like one.
///
/// Anything else, including hex-shaped strings the driver refuses, passes through unchanged.
pub fn to_canonical(value: Bson) -> Bson {
    match value {
        Bson::String(s) => match Identifier::parse(&s) {
            Some(id) => id.into(),
            None => Bson::String(s),
        },
        other => other,
    }
}
