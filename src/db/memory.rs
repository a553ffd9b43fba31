use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};

use crate::db::models::{CounterLink, DeleteScope, Update, UpdateOutcome};
use crate::db::repository::DocumentStore;
use crate::error::AppError;

type Collections = HashMap<String, Vec<Document>>;

/// Process-local DocumentStore keeping each collection as an insertion-ordered vector.
///
/// Update operators follow MongoDB semantics for top-level fields. Dotted
/// paths are stored as literal keys. Nothing is persisted.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<Collections>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, AppError> {
        self.collections
            .lock()
            .map_err(|_| AppError::Internal("in-memory store lock poisoned".into()))
    }
}

fn matches(doc: &Document, field: &str, value: &str) -> bool {
    matches!(doc.get(field), Some(Bson::String(s)) if s == value)
}

fn insert_into(collections: &mut Collections, collection: &str, doc: Document) -> ObjectId {
    let id = ObjectId::new();
    let mut stored = Document::new();
    stored.insert("_id", id);
    for (key, value) in doc {
        stored.insert(key, value);
    }
    collections
        .entry(collection.to_string())
        .or_default()
        .push(stored);
    id
}

fn update_in(
    collections: &mut Collections,
    collection: &str,
    field: &str,
    value: &str,
    update: &Update,
) -> Result<UpdateOutcome, AppError> {
    let Some(doc) = collections
        .get_mut(collection)
        .and_then(|docs| docs.iter_mut().find(|d| matches(d, field, value)))
    else {
        return Ok(UpdateOutcome::default());
    };

    let modified = apply(doc, update)?;
    Ok(UpdateOutcome {
        matched: 1,
        modified: u64::from(modified),
    })
}

/// Apply one operator in place; returns whether the document changed.
fn apply(doc: &mut Document, update: &Update) -> Result<bool, AppError> {
    match update {
        Update::Set(fields) => {
            let mut changed = false;
            for (key, value) in fields {
                if doc.get(key) != Some(value) {
                    doc.insert(key.clone(), value.clone());
                    changed = true;
                }
            }
            Ok(changed)
        }
        Update::Increment { field, by } => {
            let overflow = || {
                AppError::Database(format!(
                    "Failed to apply $inc operations: result of {field} would overflow"
                ))
            };
            let next = match doc.get(field) {
                None => Bson::Int64(*by),
                Some(Bson::Int32(n)) => match i32::try_from(*by)
                    .ok()
                    .and_then(|by32| n.checked_add(by32))
                {
                    Some(sum) => Bson::Int32(sum),
                    None => i64::from(*n)
                        .checked_add(*by)
                        .map(Bson::Int64)
                        .ok_or_else(overflow)?,
                },
                Some(Bson::Int64(n)) => {
                    n.checked_add(*by).map(Bson::Int64).ok_or_else(overflow)?
                }
                Some(Bson::Double(f)) => Bson::Double(f + *by as f64),
                Some(other) => {
                    return Err(AppError::Database(format!(
                        "Cannot apply $inc to a value of non-numeric type: {field} is {:?}",
                        other.element_type()
                    )))
                }
            };
            doc.insert(field.clone(), next);
            Ok(*by != 0)
        }
        Update::Push { field, value } => {
            match doc.get_mut(field) {
                None => {
                    doc.insert(field.clone(), Bson::Array(vec![value.clone()]));
                }
                Some(Bson::Array(items)) => items.push(value.clone()),
                Some(other) => {
                    return Err(AppError::Database(format!(
                        "The field '{field}' must be an array but is of type {:?}",
                        other.element_type()
                    )))
                }
            }
            Ok(true)
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.lock().map(|_| ())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        Ok(self.lock()?.get(collection).cloned().unwrap_or_default())
    }

    async fn find_many(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, AppError> {
        Ok(self
            .lock()?
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| matches(d, field, value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn find_first(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .lock()?
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, field, value)).cloned()))
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<ObjectId, AppError> {
        Ok(insert_into(&mut *self.lock()?, collection, doc))
    }

    async fn update_first(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        update: Update,
    ) -> Result<UpdateOutcome, AppError> {
        update_in(&mut *self.lock()?, collection, field, value, &update)
    }

    async fn delete(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        scope: DeleteScope,
    ) -> Result<u64, AppError> {
        let mut collections = self.lock()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };

        match scope {
            DeleteScope::One => match docs.iter().position(|d| matches(d, field, value)) {
                Some(index) => {
                    docs.remove(index);
                    Ok(1)
                }
                None => Ok(0),
            },
            DeleteScope::Many => {
                let before = docs.len();
                docs.retain(|d| !matches(d, field, value));
                Ok((before - docs.len()) as u64)
            }
        }
    }

    async fn delete_by_object_id(&self, collection: &str, id: ObjectId) -> Result<u64, AppError> {
        let mut collections = self.lock()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| d.get_object_id("_id").ok() != Some(id));
        Ok((before - docs.len()) as u64)
    }

    /// Increments the target, then inserts, under one lock, so the pair is atomic.
    async fn insert_linked(
        &self,
        collection: &str,
        doc: Document,
        link: &'static CounterLink,
        target_value: &str,
    ) -> Result<ObjectId, AppError> {
        let mut collections = self.lock()?;

        let outcome = update_in(
            &mut collections,
            link.target.collection,
            link.target.id_field,
            target_value,
            &Update::increment(link.counter, 1),
        )?;
        if outcome.matched == 0 {
            return Err(AppError::not_found(link.target.name));
        }

        Ok(insert_into(&mut collections, collection, doc))
    }
}
