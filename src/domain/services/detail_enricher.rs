// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::selector_resolver::resolve_field;
use crate::domain::sites::profile::DetailProfile;
use crate::engines::traits::{BrowserContext, PageHandle};
use crate::utils::retry_policy::RetryPolicy;
use std::time::Duration;
use tracing::{debug, warn};

/// 详情页补全结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub code: Option<String>,
    pub description: Option<String>,
}

/// 详情页补全器
///
/// 在同一浏览上下文中另开页面访问详情页。导航超时按阶梯处理：
/// 先换一个新页面重试，再重载若干次，最后放弃并返回部分数据。
pub struct DetailEnricher {
    navigation_timeout: Duration,
    selector_timeout: Duration,
    retry: RetryPolicy,
}

impl DetailEnricher {
    pub fn new(navigation_timeout: Duration, selector_timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            navigation_timeout,
            selector_timeout,
            retry,
        }
    }

    /// 访问详情页并读取字段，任何失败都只返回空字段
    pub async fn enrich(&self, context: &dyn BrowserContext, url: &str, detail: &DetailProfile) -> DetailFields {
        match self.load(context, url).await {
            Some(page) => {
                let fields = self.read(page.as_ref(), detail).await;
                close(page).await;
                fields
            }
            None => DetailFields::default(),
        }
    }

    /// 按阶梯加载详情页，成功时返回已加载的页面
    async fn load(&self, context: &dyn BrowserContext, url: &str) -> Option<Box<dyn PageHandle>> {
        let first = self.open(context).await?;
        match first.goto(url, self.navigation_timeout).await {
            Ok(()) => return Some(first),
            Err(e) if e.is_timeout() => {
                warn!("Detail page {} timed out, retrying in a fresh page", url);
                close(first).await;
            }
            Err(e) => {
                warn!("Detail page {} failed: {}", url, e);
                close(first).await;
                return None;
            }
        }

        let page = self.open(context).await?;
        match page.goto(url, self.navigation_timeout).await {
            Ok(()) => return Some(page),
            Err(e) if e.is_timeout() => {}
            Err(e) => {
                warn!("Detail page {} failed: {}", url, e);
                close(page).await;
                return None;
            }
        }

        let mut attempt = 0;
        while self.retry.should_retry(attempt) {
            attempt += 1;
            tokio::time::sleep(self.retry.calculate_backoff(attempt)).await;
            debug!("Reloading detail page {} (attempt {})", url, attempt);
            match page.reload(self.navigation_timeout).await {
                Ok(()) => return Some(page),
                Err(e) if e.is_timeout() => continue,
                Err(e) => {
                    warn!("Detail page reload failed for {}: {}", url, e);
                    break;
                }
            }
        }

        warn!("Giving up on detail page {}, keeping partial data", url);
        close(page).await;
        None
    }

    async fn open(&self, context: &dyn BrowserContext) -> Option<Box<dyn PageHandle>> {
        match context.new_page().await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Could not open detail page: {}", e);
                None
            }
        }
    }

    async fn read(&self, page: &dyn PageHandle, detail: &DetailProfile) -> DetailFields {
        if let Some(selector) = &detail.wait_for {
            if let Err(e) = page.wait_for_selector(selector, self.selector_timeout).await {
                debug!("Detail content not ready: {}", e);
            }
        }
        DetailFields {
            code: resolve_field(page, &detail.code).await,
            description: resolve_field(page, &detail.description).await,
        }
    }
}

async fn close(page: Box<dyn PageHandle>) {
    if let Err(e) = page.close().await {
        debug!("Failed to close detail page: {}", e);
    }
}
