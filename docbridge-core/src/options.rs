//! Cursor, update and index options.
//!
//! # Sorting
//!
//! Sort keys use the compact string encoding: a field name sorts ascending, the same name
//! prefixed with `-` sorts descending. Either a single key or a sequence of keys is accepted,
//! and non-string entries are skipped:
//!
//! ```ignore
//! use docbridge_core::options::FindOptions;
//!
//! let options = FindOptions::builder()
//!     .sort("-age")
//!     .skip(10)
//!     .limit(20)
//!     .build();
//!
//! let options = FindOptions::builder()
//!     .sort(vec!["-age", "name"])
//!     .build();
//! ```

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

impl SortDirection {
    /// The numeric form used by MongoDB-style sort documents.
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: SortDirection::Desc }
    }

    /// Parses `"field"` or `"-field"`. Returns `None` when no field name remains.
    pub fn parse(spec: &str) -> Option<Self> {
        let (field, direction) = match spec.strip_prefix('-') {
            Some(field) => (field, SortDirection::Desc),
            None => (spec, SortDirection::Asc),
        };

        if field.is_empty() {
            return None;
        }

        Some(Self { field: field.to_string(), direction })
    }

    /// Parses a sort specification given as a single string or an array of strings.
    ///
    /// Entries that are not strings, or that name no field, are ignored.
    pub fn parse_all(spec: &Bson) -> Vec<Self> {
        match spec {
            Bson::String(s) => Self::parse(s).into_iter().collect(),
            Bson::Array(items) => items
                .iter()
                .filter_map(|item| item.as_str().and_then(Self::parse))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Builds the sort document `{ field: 1 | -1, ... }` in key order.
    pub fn to_document(keys: &[SortKey]) -> Document {
        keys.iter()
            .map(|key| (key.field.clone(), Bson::Int32(key.direction.as_i32())))
            .collect()
    }
}

/// Options applied to the cursor of a `find`, in the order sort, skip, limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<SortKey>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FindOptionsBuilder {
        FindOptionsBuilder::new()
    }
}

/// Fluent builder for [`FindOptions`].
#[derive(Debug, Clone, Default)]
pub struct FindOptionsBuilder {
    options: FindOptions,
}

impl FindOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sort keys from `"field"`, `"-field"`, or a sequence of those.
    ///
    /// Replaces any previously configured sort.
    pub fn sort(mut self, spec: impl Into<Bson>) -> Self {
        self.options.sort = SortKey::parse_all(&spec.into());
        self
    }

    /// Appends an already-parsed sort key.
    pub fn sort_key(mut self, key: SortKey) -> Self {
        self.options.sort.push(key);
        self
    }

    /// Sets the number of documents to skip after sorting.
    pub fn skip(mut self, skip: u64) -> Self {
        self.options.skip = Some(skip);
        self
    }

    /// Sets the maximum number of documents to return after skipping.
    pub fn limit(mut self, limit: u64) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn build(self) -> FindOptions {
        self.options
    }
}

/// Options for `find_one_and_update`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    /// When set, the update body only applies to a newly inserted document and an existing
    /// match is returned unchanged.
    pub upsert: bool,
}

impl UpdateOptions {
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// Options for single-field index creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    pub unique: bool,
    pub sparse: bool,
}

impl IndexOptions {
    pub fn unique() -> Self {
        Self { unique: true, sparse: false }
    }

    pub fn with_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }
}

/// An update applied by `find_one_and_update`.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Merge the given fields into the matched document, leaving other fields untouched.
    Set(Document),
    /// Apply the given fields only when the update inserts a new document.
    SetOnInsert(Document),
}

impl Update {
    /// The update document in MongoDB operator form.
    pub fn to_document(&self) -> Document {
        match self {
            Update::Set(fields) => bson::doc! { "$set": fields.clone() },
            Update::SetOnInsert(fields) => bson::doc! { "$setOnInsert": fields.clone() },
        }
    }

    pub fn fields(&self) -> &Document {
        match self {
            Update::Set(fields) | Update::SetOnInsert(fields) => fields,
        }
    }
}
