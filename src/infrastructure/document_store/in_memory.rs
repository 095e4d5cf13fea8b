// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::document_store::{
    matches_filter, merge_fields, Document, DocumentStore, Filter, StoreError,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// 内存文档存储
///
/// 与数据库实现语义一致，用于测试与试运行。
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    connected: AtomicBool,
    unreachable: bool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 连接总是失败的存储
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// 集合内全部文档（按插入顺序）
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<(), StoreError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(StoreError::NotConnected)
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn connect(&self) -> Result<(), StoreError> {
        if self.unreachable {
            return Err(StoreError::Connection("store unreachable".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.ensure_connected()?;
        Ok(self
            .collections
            .read()
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches_filter(d, filter)).cloned()))
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.ensure_connected()?;
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    async fn update_one(&self, collection: &str, filter: &Filter, fields: Document) -> Result<u64, StoreError> {
        self.ensure_connected()?;
        let mut collections = self.collections.write();
        let target = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| matches_filter(d, filter)));
        Ok(match target {
            Some(document) => u64::from(merge_fields(document, fields)),
            None => 0,
        })
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
