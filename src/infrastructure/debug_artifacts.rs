// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::storage_repository::StorageRepository;
use crate::engines::traits::PageHandle;
use crate::utils::text::slugify;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// 调试产物写入器
///
/// 截图与原始 HTML 写到 `debug/{site}/{category-slug}/` 下。
/// 写入失败只记录日志，不影响抓取流程。
#[derive(Clone)]
pub struct DebugArtifacts {
    storage: Arc<dyn StorageRepository>,
}

impl DebugArtifacts {
    pub fn new(storage: Arc<dyn StorageRepository>) -> Self {
        Self { storage }
    }

    fn key(site: &str, category: &str, label: &str, extension: &str) -> String {
        format!(
            "debug/{}/{}/{}-{}.{}",
            site,
            slugify(category),
            label,
            Utc::now().format("%Y%m%dT%H%M%S%3f"),
            extension
        )
    }

    /// 保存页面截图，返回存储位置
    pub async fn screenshot(
        &self,
        page: &dyn PageHandle,
        site: &str,
        category: &str,
        label: &str,
    ) -> Option<String> {
        let bytes = match page.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not capture screenshot '{}': {}", label, e);
                return None;
            }
        };
        self.write(Self::key(site, category, label, "png"), &bytes).await
    }

    /// 保存当前页面的原始 HTML，返回存储位置
    pub async fn page_html(
        &self,
        page: &dyn PageHandle,
        site: &str,
        category: &str,
        label: &str,
    ) -> Option<String> {
        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Could not read page content '{}': {}", label, e);
                return None;
            }
        };
        self.write(Self::key(site, category, label, "html"), html.as_bytes())
            .await
    }

    async fn write(&self, key: String, data: &[u8]) -> Option<String> {
        match self.storage.save(&key, data).await {
            Ok(()) => {
                let location = self.storage.locate(&key);
                info!("Saved debug artifact to {}", location);
                Some(location)
            }
            Err(e) => {
                warn!("Failed to save debug artifact {}: {}", key, e);
                None
            }
        }
    }
}
