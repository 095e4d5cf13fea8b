// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::DatabaseSettings;
use crate::domain::repositories::document_store::{
    matches_filter, merge_fields, Document, DocumentStore, Filter, StoreError,
};
use crate::infrastructure::database::connection::create_pool;
use crate::infrastructure::database::entities::catalog_document;
use async_trait::async_trait;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use parking_lot::Mutex;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

fn db_err(e: DbErr) -> StoreError {
    StoreError::Database(e.to_string())
}

/// 基于 SeaORM 的文档存储
///
/// 文档以 JSON 形式保存在 `catalog_documents` 表中，按集合区分。
/// 过滤条件按 JSON 字段精确相等匹配（区分大小写），支持 Postgres 与 SQLite。
pub struct SeaOrmDocumentStore {
    settings: Option<DatabaseSettings>,
    db: Mutex<Option<DatabaseConnection>>,
}

impl SeaOrmDocumentStore {
    /// 按配置延迟连接（`connect` 时建立）
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            settings: Some(settings),
            db: Mutex::new(None),
        }
    }

    /// 使用已建立的连接
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self {
            settings: None,
            db: Mutex::new(Some(db)),
        }
    }

    fn connection(&self) -> Result<DatabaseConnection, StoreError> {
        self.db.lock().clone().ok_or(StoreError::NotConnected)
    }

    async fn first_match(
        &self,
        db: &DatabaseConnection,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<(catalog_document::Model, Document)>, StoreError> {
        let backend = db.get_database_backend();
        let mut query = catalog_document::Entity::find()
            .filter(catalog_document::Column::Collection.eq(collection))
            .order_by_asc(catalog_document::Column::CreatedAt);

        for (field, value) in filter {
            if let Some(condition) = field_condition(backend, field, value) {
                query = query.filter(condition);
            }
        }

        // SQL narrows by string/null fields; exact JSON equality is checked here
        for model in query.all(db).await.map_err(db_err)? {
            if let Value::Object(body) = &model.body {
                if matches_filter(body, filter) {
                    let body = body.clone();
                    return Ok(Some((model, body)));
                }
            }
        }
        Ok(None)
    }
}

fn field_condition(backend: DbBackend, field: &str, value: &Value) -> Option<sea_query::SimpleExpr> {
    let extract = match backend {
        DbBackend::Postgres => "body ->> CAST(? AS TEXT)",
        _ => "json_extract(body, ?)",
    };
    let path = match backend {
        DbBackend::Postgres => field.to_string(),
        _ => format!("$.{}", field),
    };

    match value {
        Value::Null => Some(Expr::cust_with_values(format!("{} IS NULL", extract), [path])),
        Value::String(s) => Some(Expr::cust_with_values(
            format!("{} = ?", extract),
            [path, s.clone()],
        )),
        _ => None,
    }
}

#[async_trait]
impl DocumentStore for SeaOrmDocumentStore {
    async fn connect(&self) -> Result<(), StoreError> {
        if self.db.lock().is_some() {
            return Ok(());
        }
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| StoreError::Connection("no database settings".to_string()))?;

        let db = create_pool(settings)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Migrator::up(&db, None)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!("Document store connected");
        *self.db.lock() = Some(db);
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let db = self.connection()?;
        Ok(self
            .first_match(&db, collection, filter)
            .await?
            .map(|(_, body)| body))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let db = self.connection()?;
        let now = Utc::now();
        let model = catalog_document::ActiveModel {
            id: Set(Uuid::new_v4()),
            collection: Set(collection.to_string()),
            body: Set(Value::Object(document)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        catalog_document::Entity::insert(model)
            .exec(&db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn update_one(&self, collection: &str, filter: &Filter, fields: Document) -> Result<u64, StoreError> {
        let db = self.connection()?;
        let Some((model, mut body)) = self.first_match(&db, collection, filter).await? else {
            return Ok(0);
        };
        if !merge_fields(&mut body, fields) {
            return Ok(0);
        }

        let mut active: catalog_document::ActiveModel = model.into();
        active.body = Set(Value::Object(body));
        active.updated_at = Set(Utc::now().into());
        active.update(&db).await.map_err(db_err)?;
        Ok(1)
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        // Injected connections are owned by the caller
        if self.settings.is_none() {
            return Ok(());
        }
        let db = self.db.lock().take();
        if let Some(db) = db {
            db.close().await.map_err(db_err)?;
        }
        Ok(())
    }
}
