// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use catalogrs::application::use_cases::scrape_job::{RunnerSettings, ScrapeJobRunner};
use catalogrs::domain::models::category::Category;
use catalogrs::domain::services::run_lock::RunLock;
use catalogrs::domain::sites::profile::{
    FieldQuery, FieldSelectors, ItemLocator, NaturalKeyPolicy, NavigationPolicy, SiteProfile,
};
use catalogrs::domain::sites::SiteRegistry;
use catalogrs::engines::snapshot_engine::{SnapshotBrowser, SnapshotSite};
use catalogrs::engines::traits::SelectorSpec;
use catalogrs::infrastructure::document_store::in_memory::InMemoryDocumentStore;
use catalogrs::infrastructure::storage::InMemoryStorage;
use catalogrs::utils::retry_policy::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;

pub const DAIRY_URL: &str = "https://shop.test/c/dairy";
pub const BAKERY_URL: &str = "https://shop.test/c/bakery";

pub fn shop_profile() -> SiteProfile {
    SiteProfile {
        id: "test-shop".to_string(),
        display_name: "Test Shop".to_string(),
        base_url: "https://shop.test".to_string(),
        source_tag: "test-shop".to_string(),
        collection: "test_shop_products".to_string(),
        categories: vec![
            Category::new("Dairy", DAIRY_URL),
            Category::new("Bakery", BAKERY_URL),
        ],
        grid_wait: SelectorSpec::css(".grid"),
        item_locators: vec![ItemLocator::css(".grid", "li.card")],
        item_fallback: None,
        fields: FieldSelectors {
            name: vec![FieldQuery::text(".name")],
            url: vec![FieldQuery::attr("a", "href")],
            price: vec![FieldQuery::text(".price")],
            ..FieldSelectors::default()
        },
        navigation: NavigationPolicy::NumberedPages {
            param: "page".to_string(),
            max_pages: 2,
        },
        natural_key: NaturalKeyPolicy::NameAndCategory,
        login: None,
        detail: None,
    }
}

pub fn grid(items: &[(&str, &str)]) -> String {
    let cards: String = items
        .iter()
        .map(|(name, price)| {
            format!(
                r#"<li class="card"><a href="/p/{slug}"><span class="name">{name}</span></a><span class="price">{price}</span></li>"#,
                slug = name.to_lowercase().replace(' ', "-"),
                name = name,
                price = price
            )
        })
        .collect();
    format!(r#"<html><body><ul class="grid">{}</ul></body></html>"#, cards)
}

/// 两个分类各一页商品的静态站点
pub fn shop_site() -> SnapshotSite {
    SnapshotSite::new()
        .page(DAIRY_URL, grid(&[("Whole Milk", "£1.45"), ("Butter", "£2.10")]))
        .page(BAKERY_URL, grid(&[("Sourdough", "£3.00")]))
}

pub fn fast_settings() -> RunnerSettings {
    RunnerSettings {
        navigation_timeout: Duration::from_millis(200),
        selector_timeout: Duration::from_millis(200),
        load_idle_timeout: Duration::from_millis(200),
        login_settle: Duration::from_millis(1),
        detail_retry: RetryPolicy::fixed(1, Duration::from_millis(1)),
        image_timeout: Duration::from_secs(1),
        ..RunnerSettings::default()
    }
}

pub struct TestRig {
    pub runner: ScrapeJobRunner,
    pub browser: SnapshotBrowser,
    pub store: Arc<InMemoryDocumentStore>,
    pub storage: Arc<InMemoryStorage>,
}

pub fn rig(site: SnapshotSite, store: InMemoryDocumentStore) -> TestRig {
    rig_with_profile(site, store, shop_profile())
}

pub fn rig_with_profile(site: SnapshotSite, store: InMemoryDocumentStore, profile: SiteProfile) -> TestRig {
    let browser = site.into_browser();
    let store = Arc::new(store);
    let storage = Arc::new(InMemoryStorage::new());
    let runner = ScrapeJobRunner::new(
        Arc::new(SiteRegistry::new(vec![profile])),
        Arc::new(browser.clone()),
        store.clone(),
        storage.clone(),
        RunLock::new(),
        fast_settings(),
    )
    .unwrap();

    TestRig {
        runner,
        browser,
        store,
        storage,
    }
}
