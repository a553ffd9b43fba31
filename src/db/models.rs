use bson::{Bson, Document};
use chrono::Utc;

/// Static description of one entity kind and the collection that holds it.
///
/// Every service declares its entities as `static` values of this type; the
/// generic handlers read nothing else to decide how a request is served.
#[derive(Debug)]
pub struct Entity {
    /// Human-readable singular name used in messages (e.g. `Repository`).
    pub name: &'static str,
    /// MongoDB collection name.
    pub collection: &'static str,
    /// Application-level identity field (e.g. `repoId`).
    pub id_field: &'static str,
    /// Whether create requires the identity field in the body.
    pub require_id: bool,
    /// Parent field used by nested list endpoints (e.g. `repoId` for issues).
    pub scope_field: Option<&'static str>,
    /// Server-assigned fields merged over the request body on create.
    pub defaults: &'static [(&'static str, DefaultValue)],
    /// How many documents a delete-by-identity removes.
    pub delete_scope: DeleteScope,
    /// Counter incremented on another entity when this one is created.
    pub counter: Option<CounterLink>,
}

/// A server-assigned default value, materialized at create time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Int(i64),
    Bool(bool),
    Str(&'static str),
    EmptyList,
    Null,
    Now,
}

impl DefaultValue {
    pub fn to_bson(self) -> Bson {
        match self {
            DefaultValue::Int(n) => Bson::Int64(n),
            DefaultValue::Bool(b) => Bson::Boolean(b),
            DefaultValue::Str(s) => Bson::String(s.to_string()),
            DefaultValue::EmptyList => Bson::Array(Vec::new()),
            DefaultValue::Null => Bson::Null,
            DefaultValue::Now => Bson::DateTime(bson::DateTime::from_chrono(Utc::now())),
        }
    }
}

/// Deletion scope for delete-by-identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteScope {
    /// Stop after the first match.
    One,
    /// Remove every matching document.
    Many,
}

/// Denormalized counter kept on a target entity.
///
/// On create, the value of `link_field` in the new document selects the
/// target by its identity field, and `counter` is incremented by one.
#[derive(Debug)]
pub struct CounterLink {
    pub target: &'static Entity,
    pub link_field: &'static str,
    pub counter: &'static str,
}

/// Supported update operators.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Merge the given fields (`$set`).
    Set(Document),
    /// Add `by` to a numeric field, creating it when absent (`$inc`).
    Increment { field: String, by: i64 },
    /// Append a value to an array field, creating it when absent (`$push`).
    Push { field: String, value: Bson },
}

impl Update {
    pub fn set(fields: Document) -> Self {
        Update::Set(fields)
    }

    pub fn increment(field: &str, by: i64) -> Self {
        Update::Increment {
            field: field.to_string(),
            by,
        }
    }

    pub fn push(field: &str, value: impl Into<Bson>) -> Self {
        Update::Push {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Render as a MongoDB update document.
    pub fn to_document(&self) -> Document {
        let (operator, fields) = match self {
            Update::Set(fields) => ("$set", fields.clone()),
            Update::Increment { field, by } => {
                let mut fields = Document::new();
                fields.insert(field.clone(), *by);
                ("$inc", fields)
            }
            Update::Push { field, value } => {
                let mut fields = Document::new();
                fields.insert(field.clone(), value.clone());
                ("$push", fields)
            }
        };
        let mut update = Document::new();
        update.insert(operator, fields);
        update
    }
}

/// Outcome of an update; a value-identical `$set` matches but modifies nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: u64,
}
