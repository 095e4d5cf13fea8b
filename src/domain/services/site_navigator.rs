// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::category::Category;
use crate::domain::models::product::ProductRecord;
use crate::domain::services::page_extractor::{ExtractState, ExtractionScope, PageExtractor};
use crate::domain::services::selector_resolver::first_element;
use crate::domain::sites::profile::NavigationPolicy;
use crate::engines::traits::{ElementHandle, PageHandle, SelectorSpec};
use crate::utils::errors::CrawlError;
use crate::utils::url_utils::with_query_param;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 站点遍历器
///
/// 按站点的翻页策略遍历一个分类，返回所有页面有效记录的拼接。
/// 每种策略都有与站点行为无关的硬上限，不会无限循环。
pub struct SiteNavigator {
    extractor: Arc<PageExtractor>,
    navigation_timeout: Duration,
    load_idle_timeout: Duration,
}

impl SiteNavigator {
    pub fn new(extractor: Arc<PageExtractor>, navigation_timeout: Duration, load_idle_timeout: Duration) -> Self {
        Self {
            extractor,
            navigation_timeout,
            load_idle_timeout,
        }
    }

    /// 遍历分类
    ///
    /// 第一页导航失败视为分类级错误；后续页面失败则停止并保留已得记录。
    pub async fn crawl(
        &self,
        page: &dyn PageHandle,
        category: &Category,
        scope: &ExtractionScope<'_>,
    ) -> Result<Vec<ProductRecord>, CrawlError> {
        let records = match &scope.profile.navigation {
            NavigationPolicy::NumberedPages { param, max_pages } => {
                self.numbered(page, category, scope, param, *max_pages).await?
            }
            NavigationPolicy::OffsetPages {
                param,
                page_size,
                max_pages,
                next_page,
            } => {
                self.offset(page, category, scope, param, *page_size, *max_pages, next_page)
                    .await?
            }
            NavigationPolicy::LoadMore { button, max_clicks } => {
                self.load_more(page, category, scope, button, *max_clicks).await?
            }
        };
        info!("Category {} yielded {} records", category.name, records.len());
        Ok(records)
    }

    async fn open(&self, page: &dyn PageHandle, url: &str) -> Result<(), CrawlError> {
        debug!("Navigating to {}", url);
        page.goto(url, self.navigation_timeout)
            .await
            .map_err(CrawlError::Navigation)?;
        if let Err(e) = page.wait_for_load_idle(self.load_idle_timeout).await {
            warn!("Page {} did not reach load idle: {}", url, e);
        }
        Ok(())
    }

    /// `?page=N` 翻页：第 1 页即分类 URL，空页或达到页数上限时停止
    async fn numbered(
        &self,
        page: &dyn PageHandle,
        category: &Category,
        scope: &ExtractionScope<'_>,
        param: &str,
        max_pages: u32,
    ) -> Result<Vec<ProductRecord>, CrawlError> {
        self.open(page, &category.url).await?;
        let mut records = self.extractor.extract(page, scope).await.records;
        if records.is_empty() {
            return Ok(records);
        }

        for number in 2..=max_pages {
            let url = with_query_param(&category.url, param, &number.to_string())
                .map_err(|e| CrawlError::InvalidUrl(e.to_string()))?;
            if let Err(e) = self.open(page, &url).await {
                warn!("Stopping pagination at page {}: {}", number, e);
                break;
            }
            let batch = self.extractor.extract(page, scope).await.records;
            if batch.is_empty() {
                info!("Page {} of {} is empty, stopping", number, category.name);
                break;
            }
            records.extend(batch);
        }
        Ok(records)
    }

    /// 偏移翻页：存在“下一页”入口时继续，网格缺失或达到上限时停止
    #[allow(clippy::too_many_arguments)]
    async fn offset(
        &self,
        page: &dyn PageHandle,
        category: &Category,
        scope: &ExtractionScope<'_>,
        param: &str,
        page_size: u32,
        max_pages: u32,
        next_page: &[SelectorSpec],
    ) -> Result<Vec<ProductRecord>, CrawlError> {
        let mut records = Vec::new();
        let mut offset = 0u32;

        for visited in 0..max_pages {
            let url = if visited == 0 {
                category.url.clone()
            } else {
                with_query_param(&category.url, param, &offset.to_string())
                    .map_err(|e| CrawlError::InvalidUrl(e.to_string()))?
            };

            match self.open(page, &url).await {
                Ok(()) => {}
                Err(e) if visited == 0 => return Err(e),
                Err(e) => {
                    warn!("Stopping at offset {}: {}", offset, e);
                    break;
                }
            }

            let extraction = self.extractor.extract(page, scope).await;
            records.extend(extraction.records);
            if !extraction.grid_found {
                info!("Listing grid missing at offset {}, stopping", offset);
                break;
            }
            if first_element(page, next_page).await.is_none() {
                debug!("No next page after offset {}", offset);
                break;
            }
            offset += page_size;
        }
        Ok(records)
    }

    /// “加载更多”循环：按钮消失或达到点击上限时停止
    async fn load_more(
        &self,
        page: &dyn PageHandle,
        category: &Category,
        scope: &ExtractionScope<'_>,
        button: &[SelectorSpec],
        max_clicks: u32,
    ) -> Result<Vec<ProductRecord>, CrawlError> {
        self.open(page, &category.url).await?;
        let mut state = ExtractState::default();
        let mut records = self.extractor.extract_with(page, scope, &mut state).await.records;

        for click in 1..=max_clicks {
            let Some(control) = first_visible(page, button).await else {
                debug!("Load-more control gone after {} clicks", click - 1);
                break;
            };
            if let Err(e) = control.click().await {
                warn!("Load-more click failed: {}", e);
                break;
            }
            if let Err(e) = page.wait_for_load_idle(self.load_idle_timeout).await {
                warn!("Load-more did not settle: {}", e);
            }
            let batch = self.extractor.extract_with(page, scope, &mut state).await.records;
            debug!("Load-more click {} added {} records", click, batch.len());
            records.extend(batch);
        }
        Ok(records)
    }
}

async fn first_visible(page: &dyn PageHandle, candidates: &[SelectorSpec]) -> Option<Box<dyn ElementHandle>> {
    for selector in candidates {
        for element in page.query_all(selector).await.unwrap_or_default() {
            if element.is_visible().await.unwrap_or(false) {
                return Some(element);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sites::profile::{
        FieldQuery, FieldSelectors, ItemLocator, NaturalKeyPolicy, SiteProfile,
    };
    use crate::engines::snapshot_engine::{Effect, SnapshotBrowser, SnapshotSite, Trigger};
    use crate::engines::traits::{BrowserHandle, Viewport};
    use std::collections::VecDeque;

    const LIST_URL: &str = "https://shop.test/c/snacks";

    fn profile(navigation: NavigationPolicy) -> SiteProfile {
        SiteProfile {
            id: "test-shop".to_string(),
            display_name: "Test Shop".to_string(),
            base_url: "https://shop.test".to_string(),
            source_tag: "test-shop".to_string(),
            collection: "test_products".to_string(),
            categories: vec![Category::new("Snacks", LIST_URL)],
            grid_wait: SelectorSpec::css(".grid"),
            item_locators: vec![ItemLocator::css(".grid", ".card")],
            item_fallback: None,
            fields: FieldSelectors {
                name: vec![FieldQuery::text(".name")],
                ..FieldSelectors::default()
            },
            navigation,
            natural_key: NaturalKeyPolicy::NameAndCategory,
            login: None,
            detail: None,
        }
    }

    fn grid(names: &[&str], extra: &str) -> String {
        let cards: String = names
            .iter()
            .map(|n| format!(r#"<div class="card"><span class="name">{}</span></div>"#, n))
            .collect();
        format!(r#"<div class="grid">{}</div>{}"#, cards, extra)
    }

    async fn crawl(browser: &SnapshotBrowser, profile: &SiteProfile) -> Result<Vec<ProductRecord>, CrawlError> {
        let navigator = SiteNavigator::new(
            Arc::new(PageExtractor::new(Duration::from_secs(1))),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let context = browser.new_context(Viewport::default()).await.unwrap();
        let page = context.new_page().await.unwrap();
        let scope = ExtractionScope {
            profile,
            category: "Snacks",
            download_images: false,
            context: context.as_ref(),
        };
        navigator.crawl(page.as_ref(), &profile.categories[0], &scope).await
    }

    fn names(records: &[ProductRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_numbered_pages_respect_cap() {
        // Every URL returns data
        let browser = SnapshotSite::new().fallback(grid(&["Crisps"], "")).into_browser();
        let profile = profile(NavigationPolicy::NumberedPages {
            param: "page".to_string(),
            max_pages: 4,
        });

        let records = crawl(&browser, &profile).await.unwrap();

        assert_eq!(browser.count("goto"), 4);
        assert_eq!(records.len(), 4);
        assert_eq!(browser.count(&format!("goto {}?page=4", LIST_URL)), 1);
        assert_eq!(browser.count(&format!("goto {}?page=5", LIST_URL)), 0);
    }

    #[tokio::test]
    async fn test_numbered_pages_stop_on_empty_page() {
        let browser = SnapshotSite::new()
            .page(LIST_URL, grid(&["Crisps", "Nuts"], ""))
            .page(format!("{}?page=2", LIST_URL), grid(&["Pretzels"], ""))
            .page(format!("{}?page=3", LIST_URL), grid(&[], ""))
            .into_browser();
        let profile = profile(NavigationPolicy::NumberedPages {
            param: "page".to_string(),
            max_pages: 30,
        });

        let records = crawl(&browser, &profile).await.unwrap();

        assert_eq!(names(&records), vec!["Crisps", "Nuts", "Pretzels"]);
        assert_eq!(browser.count("goto"), 3);
    }

    #[tokio::test]
    async fn test_offset_pages_follow_next_affordance() {
        let next = r#"<a class="next" href="?offset=next">Next</a>"#;
        let browser = SnapshotSite::new()
            .page(LIST_URL, grid(&["A"], next))
            .page(format!("{}?offset=60", LIST_URL), grid(&["B"], next))
            .page(format!("{}?offset=120", LIST_URL), grid(&["C"], ""))
            .into_browser();
        let profile = profile(NavigationPolicy::OffsetPages {
            param: "offset".to_string(),
            page_size: 60,
            max_pages: 10,
            next_page: vec![SelectorSpec::css("a.next")],
        });

        let records = crawl(&browser, &profile).await.unwrap();

        assert_eq!(names(&records), vec!["A", "B", "C"]);
        assert_eq!(browser.count("goto"), 3);
    }

    #[tokio::test]
    async fn test_offset_pages_stop_when_grid_missing_and_at_cap() {
        let next = r#"<a class="next">Next</a>"#;
        let browser = SnapshotSite::new()
            .page(LIST_URL, grid(&["A"], next))
            .fallback("<p>Service unavailable</p>")
            .into_browser();
        let profile = profile(NavigationPolicy::OffsetPages {
            param: "offset".to_string(),
            page_size: 60,
            max_pages: 10,
            next_page: vec![SelectorSpec::css("a.next")],
        });
        let records = crawl(&browser, &profile).await.unwrap();
        assert_eq!(names(&records), vec!["A"]);
        assert_eq!(browser.count("goto"), 2);

        let endless = SnapshotSite::new().fallback(grid(&["Same"], next)).into_browser();
        let capped = profile_with_cap(3);
        crawl(&endless, &capped).await.unwrap();
        assert_eq!(endless.count("goto"), 3);
    }

    fn profile_with_cap(max_pages: u32) -> SiteProfile {
        profile(NavigationPolicy::OffsetPages {
            param: "offset".to_string(),
            page_size: 60,
            max_pages,
            next_page: vec![SelectorSpec::css("a.next")],
        })
    }

    #[tokio::test]
    async fn test_load_more_extracts_only_new_items() {
        let button = r#"<button class="load-more">More</button>"#;
        let browser = SnapshotSite::new()
            .page(LIST_URL, grid(&["A", "B"], button))
            .on(
                Trigger::Click("button.load-more".to_string()),
                Effect::Replace(VecDeque::from(vec![
                    grid(&["A", "B", "C"], button),
                    grid(&["A", "B", "C", "D"], ""),
                ])),
            )
            .into_browser();
        let profile = profile(NavigationPolicy::LoadMore {
            button: vec![SelectorSpec::css("button.load-more")],
            max_clicks: 20,
        });

        let records = crawl(&browser, &profile).await.unwrap();

        assert_eq!(names(&records), vec!["A", "B", "C", "D"]);
        assert_eq!(browser.count("click"), 2);
        assert_eq!(browser.count("goto"), 1);
    }

    #[tokio::test]
    async fn test_load_more_respects_click_cap() {
        let button = r#"<button class="load-more">More</button>"#;
        let browser = SnapshotSite::new()
            .page(LIST_URL, grid(&["A"], button))
            .into_browser();
        let profile = profile(NavigationPolicy::LoadMore {
            button: vec![SelectorSpec::css("button.load-more")],
            max_clicks: 5,
        });

        let records = crawl(&browser, &profile).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(browser.count("click"), 5);
    }

    #[tokio::test]
    async fn test_first_page_navigation_failure_is_category_error() {
        let browser = SnapshotSite::new().time_out(LIST_URL, 1).into_browser();
        let profile = profile(NavigationPolicy::NumberedPages {
            param: "page".to_string(),
            max_pages: 3,
        });

        let err = crawl(&browser, &profile).await.unwrap_err();
        assert!(matches!(err, CrawlError::Navigation(_)));
    }
}
