// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// 文档（JSON 对象）
pub type Document = Map<String, Value>;

/// 查询条件：字段精确相等（区分大小写）
pub type Filter = Map<String, Value>;

/// 文档存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("连接失败: {0}")]
    Connection(String),

    #[error("尚未连接")]
    NotConnected,

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 文档存储特质
///
/// 按集合组织的最小文档存储能力。连接按任务打开并在结束时显式关闭。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 建立连接
    async fn connect(&self) -> Result<(), StoreError>;

    /// 查找第一条所有过滤字段都相等的文档
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError>;

    /// 插入文档
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// 更新第一条匹配文档的字段，返回实际修改的文档数（0 或 1）
    async fn update_one(&self, collection: &str, filter: &Filter, fields: Document) -> Result<u64, StoreError>;

    /// 断开连接
    async fn disconnect(&self) -> Result<(), StoreError>;
}

/// 判断文档是否满足过滤条件
pub fn matches_filter(document: &Document, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field).unwrap_or(&Value::Null) == expected)
}

/// 将字段合并进文档，返回是否有字段发生变化
pub fn merge_fields(document: &mut Document, fields: Document) -> bool {
    let mut changed = false;
    for (field, value) in fields {
        if document.get(&field) != Some(&value) {
            document.insert(field, value);
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_matches_filter_is_exact_and_case_sensitive() {
        let document = doc(json!({"sku": "AB-1", "category": "Dairy", "name": "Milk"}));
        assert!(matches_filter(&document, &doc(json!({"sku": "AB-1", "category": "Dairy"}))));
        assert!(!matches_filter(&document, &doc(json!({"sku": "ab-1", "category": "Dairy"}))));
        assert!(!matches_filter(&document, &doc(json!({"sku": "AB-1", "category": "dairy"}))));
    }

    #[test]
    fn test_merge_fields_reports_changes() {
        let mut document = doc(json!({"price": "1.00", "name": "Milk"}));
        assert!(!merge_fields(&mut document, doc(json!({"price": "1.00"}))));
        assert!(merge_fields(&mut document, doc(json!({"price": "1.10"}))));
        assert_eq!(document["price"], "1.10");
        assert!(merge_fields(&mut document, doc(json!({"imagePath": null}))));
    }
}
