// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 列表页提取
//!
//! 对一个已加载的列表页：等待网格（尽力而为）、按容器/商品选择器对定位商品元素、
//! 逐个解析字段构造记录。名称无法解析或与本页已出现的名称重复的商品被跳过。
//! 找不到任何商品时保存原始 HTML 供排查，并返回空列表。

use crate::domain::models::product::{is_usable_name, ProductRecord};
use crate::domain::services::detail_enricher::DetailEnricher;
use crate::domain::services::image_fetcher::ImageFetcher;
use crate::domain::services::selector_resolver::resolve_field;
use crate::domain::sites::profile::SiteProfile;
use crate::engines::traits::{BrowserContext, ElementHandle, PageHandle};
use crate::infrastructure::debug_artifacts::DebugArtifacts;
use crate::utils::text::content_hash;
use crate::utils::url_utils::absolutize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 一次分类抓取的提取范围
pub struct ExtractionScope<'a> {
    pub profile: &'a SiteProfile,
    pub category: &'a str,
    pub download_images: bool,
    /// 详情页在该上下文中另开页面
    pub context: &'a dyn BrowserContext,
}

/// 跨多次提取保留的页面状态
///
/// “加载更多”在同一页面上反复提取，已处理的商品数与已见名称需要延续。
#[derive(Debug, Default)]
pub struct ExtractState {
    seen_names: HashSet<String>,
    items_consumed: usize,
}

/// 单页提取结果
#[derive(Debug, Default)]
pub struct PageExtraction {
    pub records: Vec<ProductRecord>,
    /// 网格等待是否成功
    pub grid_found: bool,
    /// 本次定位到的商品元素总数（含已处理的）
    pub items_found: usize,
}

/// 列表页提取器
pub struct PageExtractor {
    selector_timeout: Duration,
    images: Option<Arc<ImageFetcher>>,
    enricher: Option<Arc<DetailEnricher>>,
    artifacts: Option<DebugArtifacts>,
}

impl PageExtractor {
    pub fn new(selector_timeout: Duration) -> Self {
        Self {
            selector_timeout,
            images: None,
            enricher: None,
            artifacts: None,
        }
    }

    pub fn with_images(mut self, images: Arc<ImageFetcher>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn with_enricher(mut self, enricher: Arc<DetailEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn with_artifacts(mut self, artifacts: DebugArtifacts) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// 提取一个新加载的页面
    pub async fn extract(&self, page: &dyn PageHandle, scope: &ExtractionScope<'_>) -> PageExtraction {
        let mut state = ExtractState::default();
        self.extract_with(page, scope, &mut state).await
    }

    /// 在已有状态上继续提取，只处理新出现的商品
    pub async fn extract_with(
        &self,
        page: &dyn PageHandle,
        scope: &ExtractionScope<'_>,
        state: &mut ExtractState,
    ) -> PageExtraction {
        let profile = scope.profile;

        let grid_found = match page.wait_for_selector(&profile.grid_wait, self.selector_timeout).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Product grid not found for {}: {}, continuing", scope.category, e);
                false
            }
        };

        let items = self.locate_items(page, profile).await;
        if items.is_empty() {
            warn!("No product items found for {}", scope.category);
            if let Some(artifacts) = &self.artifacts {
                artifacts.page_html(page, &profile.id, scope.category, "no-items").await;
            }
            return PageExtraction {
                records: Vec::new(),
                grid_found,
                items_found: 0,
            };
        }

        let items_found = items.len();
        let mut records = Vec::new();
        for item in items.iter().skip(state.items_consumed) {
            if let Some(record) = self.build_record(item.as_ref(), scope, &mut state.seen_names).await {
                records.push(record);
            }
        }
        state.items_consumed = state.items_consumed.max(items_found);

        for record in records.iter_mut() {
            self.enrich(record, scope).await;
        }

        info!(
            "Extracted {} records from {} items in {}",
            records.len(),
            items_found,
            scope.category
        );
        PageExtraction {
            records,
            grid_found,
            items_found,
        }
    }

    /// 按容器/商品选择器对定位商品元素，最后尝试 XPath 兜底
    async fn locate_items(&self, page: &dyn PageHandle, profile: &SiteProfile) -> Vec<Box<dyn ElementHandle>> {
        for locator in &profile.item_locators {
            let container = match page.query(&locator.container).await {
                Ok(Some(container)) => container,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Container {} failed: {}", locator.container, e);
                    continue;
                }
            };
            match container.query_all(&locator.item).await {
                Ok(items) if !items.is_empty() => return items,
                Ok(_) => debug!("No items for {} in {}", locator.item, locator.container),
                Err(e) => debug!("Item selector {} failed: {}", locator.item, e),
            }
        }

        if let Some(fallback) = &profile.item_fallback {
            match page.query_all(fallback).await {
                Ok(items) if !items.is_empty() => {
                    info!("Located {} items via fallback {}", items.len(), fallback);
                    return items;
                }
                Ok(_) => {}
                Err(e) => debug!("Fallback {} failed: {}", fallback, e),
            }
        }
        Vec::new()
    }

    async fn build_record(
        &self,
        item: &dyn ElementHandle,
        scope: &ExtractionScope<'_>,
        seen_names: &mut HashSet<String>,
    ) -> Option<ProductRecord> {
        let profile = scope.profile;
        let fields = &profile.fields;

        let name = match resolve_field(item, &fields.name).await {
            Some(name) if is_usable_name(&name) => name,
            other => {
                debug!("Skipping item with unresolved name {:?}", other);
                return None;
            }
        };
        if !seen_names.insert(name.clone()) {
            debug!("Skipping duplicate '{}'", name);
            return None;
        }

        let mut record = ProductRecord::new(name, scope.category, profile.source_tag.as_str());
        record.product_url = resolve_field(item, &fields.url)
            .await
            .and_then(|href| absolutize(&profile.base_url, &href));
        record.sku = resolve_field(item, &fields.sku).await;
        record.price = resolve_field(item, &fields.price).await;
        record.secondary_price = resolve_field(item, &fields.secondary_price).await;
        record.pack_size = resolve_field(item, &fields.pack_size).await;
        record.description = resolve_field(item, &fields.description).await;
        record.image_url = resolve_field(item, &fields.image)
            .await
            .and_then(|src| absolutize(&profile.base_url, &src));

        if scope.download_images {
            self.download_image(&mut record, profile).await;
        }
        Some(record)
    }

    async fn download_image(&self, record: &mut ProductRecord, profile: &SiteProfile) {
        let (Some(images), Some(url)) = (&self.images, record.image_url.as_deref()) else {
            return;
        };
        let folder = format!("images/{}", profile.id);
        match images.download(url, &content_hash(&record.name), &folder).await {
            Some(image) => {
                record.image_file_name = Some(image.file_name);
                record.image_path = Some(image.path);
            }
            None => warn!("Image download failed for '{}'", record.name),
        }
    }

    /// 站点配置了详情页时访问详情页补全编码与描述
    async fn enrich(&self, record: &mut ProductRecord, scope: &ExtractionScope<'_>) {
        let Some(detail) = &scope.profile.detail else {
            return;
        };
        let (Some(enricher), Some(url)) = (&self.enricher, record.product_url.clone()) else {
            record.needs_enrichment = true;
            return;
        };

        let fields = enricher.enrich(scope.context, &url, detail).await;
        if fields.description.is_some() {
            record.description = fields.description;
        }
        record.needs_enrichment = fields.code.is_none();
        record.product_code = fields.code;
    }
}
