use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::ClientSession;

use crate::db::models::{CounterLink, DeleteScope, Update, UpdateOutcome};
use crate::error::AppError;

/// Repository trait for schema-less document operations.
///
/// Every lookup is an equality match of one field against a string value,
/// which is all the CRUD surface needs. This trait allows swapping the
/// database layer in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Verify the store is reachable.
    async fn ping(&self) -> Result<(), AppError>;

    /// Every document in the collection, in insertion order.
    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, AppError>;

    /// Every document whose `field` equals `value`, in insertion order.
    async fn find_many(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, AppError>;

    /// The first document (by insertion order) whose `field` equals `value`.
    async fn find_first(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, AppError>;

    /// Insert a document and return the store-assigned `_id`.
    async fn insert(&self, collection: &str, doc: Document) -> Result<ObjectId, AppError>;

    /// Apply `update` to the first document (by insertion order) whose `field`
    /// equals `value`: the same document [`DocumentStore::find_first`] returns.
    async fn update_first(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        update: Update,
    ) -> Result<UpdateOutcome, AppError>;

    /// Delete one or every document whose `field` equals `value`.
    async fn delete(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        scope: DeleteScope,
    ) -> Result<u64, AppError>;

    /// Delete a single document by its internal `_id`.
    async fn delete_by_object_id(&self, collection: &str, id: ObjectId) -> Result<u64, AppError>;

    /// Insert a relationship document and increment the linked counter as one unit.
    ///
    /// `target_value` is the identity of the target entity. Stores without
    /// transactions use the compensating saga of [`insert_with_compensation`].
    async fn insert_linked(
        &self,
        collection: &str,
        doc: Document,
        link: &'static CounterLink,
        target_value: &str,
    ) -> Result<ObjectId, AppError>;
}

/// Insert, then increment; undo the insert when the increment does not land.
///
/// A target that does not exist yields `NotFound` for the target entity, a
/// failing increment yields its own error. In both cases the relationship
/// document is deleted again before returning.
pub async fn insert_with_compensation(
    store: &dyn DocumentStore,
    collection: &str,
    doc: Document,
    link: &CounterLink,
    target_value: &str,
) -> Result<ObjectId, AppError> {
    let id = store.insert(collection, doc).await?;

    let failure = match store
        .update_first(
            link.target.collection,
            link.target.id_field,
            target_value,
            Update::increment(link.counter, 1),
        )
        .await
    {
        Ok(outcome) if outcome.matched > 0 => return Ok(id),
        Ok(_) => AppError::not_found(link.target.name),
        Err(e) => e,
    };

    tracing::warn!(
        collection,
        %id,
        target = link.target.collection,
        target_value,
        "counter increment did not apply, removing relationship document"
    );

    if let Err(compensation) = store.delete_by_object_id(collection, id).await {
        tracing::error!(
            collection,
            %id,
            increment_error = %failure,
            compensation_error = %compensation,
            "failed to compensate relationship insert; counter is now out of sync"
        );
    }

    Err(failure)
}

/// MongoDB implementation of the DocumentStore.
pub struct MongoDocumentStore {
    client: mongodb::Client,
    db: mongodb::Database,
    transactions: bool,
}

impl MongoDocumentStore {
    /// Wrap a database handle.
    ///
    /// With `transactions` enabled, [`DocumentStore::insert_linked`] runs in a
    /// multi-document transaction, which needs a replica set or sharded cluster.
    pub fn new(client: mongodb::Client, database: &str, transactions: bool) -> Self {
        Self {
            db: client.database(database),
            client,
            transactions,
        }
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.db.collection(name)
    }

    async fn collect(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<Vec<Document>, AppError> {
        let cursor = self
            .collection(collection)
            .find(filter)
            .sort(doc! { "_id": 1 })
            .await?;

        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents)
    }

    async fn insert_linked_in_transaction(
        &self,
        collection: &str,
        doc: Document,
        link: &CounterLink,
        target_value: &str,
    ) -> Result<ObjectId, AppError> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        let inserted = match self
            .collection(collection)
            .insert_one(doc)
            .session(&mut session)
            .await
        {
            Ok(result) => result.inserted_id,
            Err(e) => {
                abort(&mut session, collection).await;
                return Err(e.into());
            }
        };

        let target = self
            .collection(link.target.collection)
            .find_one(doc! { link.target.id_field: target_value })
            .sort(doc! { "_id": 1 })
            .projection(doc! { "_id": 1 })
            .session(&mut session)
            .await;
        let target_id = match target {
            Ok(target) => target.and_then(|d| d.get("_id").cloned()),
            Err(e) => {
                abort(&mut session, collection).await;
                return Err(e.into());
            }
        };
        let Some(target_id) = target_id else {
            session.abort_transaction().await?;
            return Err(AppError::not_found(link.target.name));
        };

        let incremented = self
            .collection(link.target.collection)
            .update_one(
                doc! { "_id": target_id },
                Update::increment(link.counter, 1).to_document(),
            )
            .session(&mut session)
            .await;

        match incremented {
            Ok(_) => {
                session.commit_transaction().await?;
                object_id(inserted)
            }
            Err(e) => {
                abort(&mut session, collection).await;
                Err(e.into())
            }
        }
    }

    /// `_id` of the first match by insertion order.
    async fn first_id(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Bson>, AppError> {
        let first = self
            .collection(collection)
            .find_one(doc! { field: value })
            .sort(doc! { "_id": 1 })
            .projection(doc! { "_id": 1 })
            .await?;
        Ok(first.and_then(|d| d.get("_id").cloned()))
    }
}

/// Abort after a failed step; the step's error is what the caller reports.
async fn abort(session: &mut ClientSession, collection: &str) {
    if let Err(e) = session.abort_transaction().await {
        tracing::warn!(
            collection,
            error = %e,
            "failed to abort transaction"
        );
    }
}

fn object_id(inserted: Bson) -> Result<ObjectId, AppError> {
    inserted
        .as_object_id()
        .ok_or_else(|| AppError::Database(format!("Unexpected inserted id: {inserted}")))
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn find_all(&self, collection: &str) -> Result<Vec<Document>, AppError> {
        self.collect(collection, doc! {}).await
    }

    async fn find_many(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, AppError> {
        self.collect(collection, doc! { field: value }).await
    }

    async fn find_first(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .collection(collection)
            .find_one(doc! { field: value })
            .sort(doc! { "_id": 1 })
            .await?)
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<ObjectId, AppError> {
        let result = self.collection(collection).insert_one(doc).await?;
        object_id(result.inserted_id)
    }

    async fn update_first(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        update: Update,
    ) -> Result<UpdateOutcome, AppError> {
        let Some(id) = self.first_id(collection, field, value).await? else {
            return Ok(UpdateOutcome::default());
        };

        let result = self
            .collection(collection)
            .update_one(doc! { "_id": id }, update.to_document())
            .await?;

        Ok(UpdateOutcome {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    async fn delete(
        &self,
        collection: &str,
        field: &str,
        value: &str,
        scope: DeleteScope,
    ) -> Result<u64, AppError> {
        let filter = doc! { field: value };
        let result = match scope {
            DeleteScope::One => self.collection(collection).delete_one(filter).await?,
            DeleteScope::Many => self.collection(collection).delete_many(filter).await?,
        };
        Ok(result.deleted_count)
    }

    async fn delete_by_object_id(&self, collection: &str, id: ObjectId) -> Result<u64, AppError> {
        let result = self
            .collection(collection)
            .delete_one(doc! { "_id": id })
            .await?;
        Ok(result.deleted_count)
    }

    async fn insert_linked(
        &self,
        collection: &str,
        doc: Document,
        link: &'static CounterLink,
        target_value: &str,
    ) -> Result<ObjectId, AppError> {
        if self.transactions {
            self.insert_linked_in_transaction(collection, doc, link, target_value)
                .await
        } else {
            insert_with_compensation(self, collection, doc, link, target_value).await
        }
    }
}
