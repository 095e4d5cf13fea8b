// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::product::ProductRecord;
use crate::domain::models::statistics::{UpsertOutcome, UpsertSummary};
use crate::domain::repositories::document_store::{Document, DocumentStore, Filter, StoreError};
use crate::domain::sites::profile::NaturalKeyPolicy;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// 更新时允许覆盖的字段
///
/// 身份字段（id、name、productCode、sku、category、source）从不覆盖。
const MUTABLE_FIELDS: &[&str] = &[
    "description",
    "packSize",
    "price",
    "secondaryPrice",
    "productUrl",
    "imageUrl",
    "imageFileName",
    "imagePath",
    "needsEnrichment",
    "scrapedAt",
];

/// 持久化协调器
///
/// 逐条（非批量）把记录合并进站点集合，单条失败只计数，不中断整批。
pub struct Reconciler {
    store: Arc<dyn DocumentStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 合并一批记录
    pub async fn upsert(
        &self,
        collection: &str,
        policy: NaturalKeyPolicy,
        records: &[ProductRecord],
    ) -> UpsertSummary {
        let mut summary = UpsertSummary::default();
        for record in records {
            let outcome = match self.upsert_one(collection, policy, record).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("Failed to upsert '{}' into {}: {}", record.name, collection, e);
                    UpsertOutcome::Error
                }
            };
            debug!("{} -> {:?}", record.name, outcome);
            summary.record(outcome);
        }
        summary
    }

    /// 合并单条记录
    pub async fn upsert_one(
        &self,
        collection: &str,
        policy: NaturalKeyPolicy,
        record: &ProductRecord,
    ) -> Result<UpsertOutcome, StoreError> {
        let filter = natural_key(policy, record);

        if self.store.find_one(collection, &filter).await?.is_none() {
            self.store.insert_one(collection, to_document(record)?).await?;
            return Ok(UpsertOutcome::New);
        }

        let modified = self
            .store
            .update_one(collection, &filter, mutable_fields(record)?)
            .await?;

        Ok(if modified == 0 {
            UpsertOutcome::Unchanged
        } else {
            UpsertOutcome::Updated
        })
    }
}

/// 按站点策略构造自然键过滤条件
///
/// 严格区分大小写的精确相等。`CodeAndCategory` 下编码为空的记录会互相匹配。
pub fn natural_key(policy: NaturalKeyPolicy, record: &ProductRecord) -> Filter {
    let mut filter = Filter::new();
    match policy {
        NaturalKeyPolicy::CodeAndCategory => {
            filter.insert("productCode".to_string(), optional(&record.product_code));
        }
        NaturalKeyPolicy::SkuOrNameAndCategory => match record.sku.as_deref() {
            Some(sku) if !sku.is_empty() => {
                filter.insert("sku".to_string(), Value::String(sku.to_string()));
            }
            _ => {
                filter.insert("name".to_string(), Value::String(record.name.clone()));
            }
        },
        NaturalKeyPolicy::NameAndCategory => {
            filter.insert("name".to_string(), Value::String(record.name.clone()));
        }
    }
    filter.insert("category".to_string(), Value::String(record.category.clone()));
    filter
}

fn optional(value: &Option<String>) -> Value {
    value.clone().map(Value::String).unwrap_or(Value::Null)
}

fn to_document(record: &ProductRecord) -> Result<Document, StoreError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Database(format!("record serialized to {}", other))),
    }
}

/// 提取可更新字段
pub fn mutable_fields(record: &ProductRecord) -> Result<Document, StoreError> {
    let mut document = to_document(record)?;
    document.retain(|field, _| MUTABLE_FIELDS.contains(&field.as_str()));
    Ok(document)
}
