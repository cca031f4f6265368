use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbBackend,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::Value;

use super::entity;
use super::error::DocumentError;
use super::traits::{
    Document, DocumentStore, DocumentUpdate, ensure_object, merge_documents, validate_key,
};

/// Document store kept in a single JSON-column table of a relational database.
pub struct SqlDocumentStore {
    db: DatabaseConnection,
}

impl SqlDocumentStore {
    /// Connect to `url` and make sure the `document` table exists.
    pub async fn connect(url: &str) -> Result<Self, DocumentError> {
        let db = Database::connect(url).await?;
        Self::new(db).await
    }

    /// Wrap an existing connection and make sure the `document` table exists.
    pub async fn new(db: DatabaseConnection) -> Result<Self, DocumentError> {
        db.get_schema_registry("common::document::*")
            .sync(&db)
            .await?;
        Ok(Self { db })
    }

    /// Current contents of the document, holding its row lock on Postgres.
    ///
    /// `SELECT ... FOR UPDATE` cannot lock a row that does not exist yet, so a
    /// missing document is claimed by inserting an empty placeholder first.
    /// Concurrent writers then wait on that row instead of racing to insert it.
    async fn find_for_update(
        txn: &DatabaseTransaction,
        collection: &str,
        id: &str,
    ) -> Result<Option<Value>, DocumentError> {
        let select = || entity::Entity::find_by_id((collection.to_string(), id.to_string()));
        // SQLite serializes writers on its own; row locks only exist on Postgres.
        if txn.get_database_backend() != DbBackend::Postgres {
            return Ok(select().one(txn).await?.map(|m| m.data));
        }

        if let Some(model) = select().lock(LockType::Update).one(txn).await? {
            return Ok(Some(model.data));
        }
        let now = Utc::now();
        let claimed = entity::Entity::insert(entity::ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id.to_string()),
            data: Set(Value::Object(Default::default())),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::columns([entity::Column::Collection, entity::Column::Id])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(txn)
        .await?;
        if claimed > 0 {
            return Ok(None);
        }
        // Another transaction created it first and has committed by now.
        Ok(select()
            .lock(LockType::Update)
            .one(txn)
            .await?
            .map(|m| m.data))
    }

    /// Insert or overwrite the document, keeping its original `created_at`.
    async fn write(
        txn: &DatabaseTransaction,
        collection: &str,
        id: &str,
        data: Value,
    ) -> Result<(), DocumentError> {
        let now = Utc::now();
        entity::Entity::insert(entity::ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id.to_string()),
            data: Set(data),
            created_at: Set(now),
            updated_at: Set(now),
        })
        .on_conflict(
            OnConflict::columns([entity::Column::Collection, entity::Column::Id])
                .update_columns([entity::Column::Data, entity::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(txn)
        .await?;
        Ok(())
    }
}

impl From<entity::Model> for Document {
    fn from(model: entity::Model) -> Self {
        Self {
            collection: model.collection,
            id: model.id,
            data: model.data,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[async_trait]
impl DocumentStore for SqlDocumentStore {
    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        merge: bool,
    ) -> Result<(), DocumentError> {
        validate_key(collection, id)?;
        ensure_object(&data)?;

        let txn = self.db.begin().await?;
        let existing = Self::find_for_update(&txn, collection, id).await?;
        let data = if merge {
            merge_documents(existing, data)
        } else {
            data
        };
        Self::write(&txn, collection, id, data).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentError> {
        validate_key(collection, id)?;
        let model = entity::Entity::find_by_id((collection.to_string(), id.to_string()))
            .one(&self.db)
            .await?;
        Ok(model.map(Document::from))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DocumentError> {
        validate_key(collection, id)?;
        let result = entity::Entity::delete_by_id((collection.to_string(), id.to_string()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        apply: DocumentUpdate,
    ) -> Result<Value, DocumentError> {
        validate_key(collection, id)?;

        let txn = self.db.begin().await?;
        let existing = Self::find_for_update(&txn, collection, id).await?;
        let next = apply(existing);
        ensure_object(&next)?;
        Self::write(&txn, collection, id, next.clone()).await?;
        txn.commit().await?;
        Ok(next)
    }

    async fn latest(&self, collection: &str, limit: u64) -> Result<Vec<Document>, DocumentError> {
        let models = entity::Entity::find()
            .filter(entity::Column::Collection.eq(collection))
            .order_by_desc(entity::Column::CreatedAt)
            .order_by_desc(entity::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Document::from).collect())
    }

    async fn all(&self, collection: &str) -> Result<Vec<Document>, DocumentError> {
        let models = entity::Entity::find()
            .filter(entity::Column::Collection.eq(collection))
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Document::from).collect())
    }
}
