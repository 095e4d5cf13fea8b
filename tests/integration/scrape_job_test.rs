// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{
    fast_settings, rig, rig_with_profile, shop_profile, shop_site, TestRig, BAKERY_URL, DAIRY_URL,
};
use async_trait::async_trait;
use catalogrs::application::use_cases::scrape_job::{JobError, ScrapeJobRunner};
use catalogrs::domain::models::category::CategoryTarget;
use catalogrs::domain::models::job::{Credentials, JobOptions, JobStatus};
use catalogrs::domain::repositories::storage_repository::StorageRepository;
use catalogrs::domain::services::run_lock::RunLock;
use catalogrs::domain::sites::profile::{LoginProfile, SiteProfile};
use catalogrs::domain::sites::SiteRegistry;
use catalogrs::engines::snapshot_engine::{Effect, Trigger};
use catalogrs::engines::traits::{BrowserLauncher, EngineError, LaunchedBrowser, SelectorSpec};
use catalogrs::infrastructure::document_store::in_memory::InMemoryDocumentStore;
use catalogrs::infrastructure::storage::InMemoryStorage;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

const LOGIN_URL: &str = "https://shop.test/customer/account/login";
const ACCOUNT_URL: &str = "https://shop.test/customer/account";
const LOGIN_FORM: &str = r#"<form action="/customer/account/loginPost"><input id="email"><input id="pass" type="password"><button id="send2">Sign in</button></form>"#;

fn options(file: &str) -> JobOptions {
    JobOptions {
        output_file_name: file.to_string(),
        ..JobOptions::default()
    }
}

fn login_profile() -> SiteProfile {
    SiteProfile {
        login: Some(LoginProfile {
            login_url: LOGIN_URL.to_string(),
            login_path_pattern: "/customer/account/login".to_string(),
            email_field: vec![SelectorSpec::css("#email")],
            password_field: vec![SelectorSpec::css("#pass")],
            submit_button: SelectorSpec::css("button#send2"),
            generic_submit: vec![SelectorSpec::css("button[type='submit']")],
        }),
        ..shop_profile()
    }
}

fn with_credentials(file: &str) -> JobOptions {
    JobOptions {
        credentials: Some(Credentials {
            email: "buyer@example.com".to_string(),
            password: "hunter2".to_string(),
        }),
        ..options(file)
    }
}

struct FailingLauncher;

#[async_trait]
impl BrowserLauncher for FailingLauncher {
    async fn launch(&self, _headless: bool) -> Result<LaunchedBrowser, EngineError> {
        Err(EngineError::Launch("chrome binary not found".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// 全量任务：逐分类抓取、入库并写出带元数据的输出文件
#[tokio::test]
async fn test_full_run_persists_and_writes_output() {
    let rig = rig(shop_site(), InMemoryDocumentStore::new());

    let result = rig
        .runner
        .run("test-shop", CategoryTarget::All, options("shop.json"))
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.total_records, 3);
    assert_eq!(result.statistics.new_records_added, 3);
    assert_eq!(result.statistics.errors, 0);
    assert_eq!(result.statistics.categories_processed, vec!["Dairy", "Bakery"]);
    assert!(!result.persistence_degraded);
    assert_eq!(result.output_file_path.as_deref(), Some("memory/output/shop.json"));

    assert_eq!(rig.store.documents("test_shop_products").len(), 3);
    assert!(!rig.store.is_connected());

    let body = rig.storage.get("output/shop.json").await.unwrap().unwrap();
    let output: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(output["records"].as_array().unwrap().len(), 3);
    assert_eq!(output["metadata"]["site"], "test-shop");
    assert_eq!(output["metadata"]["totalRecords"], 3);
    assert_eq!(output["metadata"]["persistenceDegraded"], false);
    assert_eq!(output["metadata"]["categories"][1], "Bakery");

    assert_eq!(rig.browser.count("launch"), 1);
    assert_eq!(rig.browser.count("close_browser"), 1);
    // Page 2 of Dairy is empty, so pagination stops there
    assert_eq!(rig.browser.count(&format!("goto {}?page=2", DAIRY_URL)), 1);
}

/// 重复运行：已有记录保持身份且不重复插入
#[tokio::test]
async fn test_second_run_reports_unchanged_records() {
    let rig = rig(shop_site(), InMemoryDocumentStore::new());

    let first = rig
        .runner
        .run("test-shop", CategoryTarget::All, options("first.json"))
        .await
        .unwrap();
    let ids: Vec<Value> = rig
        .store
        .documents("test_shop_products")
        .iter()
        .map(|d| d["id"].clone())
        .collect();

    let second = rig
        .runner
        .run("test-shop", CategoryTarget::All, options("second.json"))
        .await
        .unwrap();

    assert_eq!(first.statistics.new_records_added, 3);
    assert_eq!(second.statistics.new_records_added, 0);
    assert_eq!(
        second.statistics.existing_records_updated + second.statistics.records_unchanged,
        3
    );

    let documents = rig.store.documents("test_shop_products");
    assert_eq!(documents.len(), 3);
    let after: Vec<Value> = documents.iter().map(|d| d["id"].clone()).collect();
    assert_eq!(ids, after);
}

/// 单个分类失败只计入错误数，其余分类继续
#[tokio::test]
async fn test_failed_category_is_counted_and_others_continue() {
    let site = shop_site().time_out(DAIRY_URL, 1);
    let rig = rig(site, InMemoryDocumentStore::new());

    let result = rig
        .runner
        .run("test-shop", CategoryTarget::All, options("partial.json"))
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::CompletedWithErrors);
    assert_eq!(result.statistics.errors, 1);
    assert_eq!(result.total_records, 1);
    assert_eq!(result.records[0].name, "Sourdough");
    assert_eq!(result.statistics.categories_processed, vec!["Dairy", "Bakery"]);

    let keys = rig.storage.keys();
    assert!(keys
        .iter()
        .any(|k| k.starts_with("debug/test-shop/dairy/category-error-") && k.ends_with(".png")));
}

/// 数据库不可用：降级为仅写文件，结果中标记降级
#[tokio::test]
async fn test_unreachable_store_degrades_to_file_only() {
    let rig = rig(shop_site(), InMemoryDocumentStore::unreachable());

    let result = rig
        .runner
        .run("test-shop", CategoryTarget::All, options("degraded.json"))
        .await
        .unwrap();

    assert!(result.persistence_degraded);
    assert_eq!(result.status, JobStatus::CompletedWithErrors);
    assert_eq!(result.total_records, 3);
    assert_eq!(result.statistics.new_records_added, 0);
    assert!(rig.store.documents("test_shop_products").is_empty());

    let body = rig.storage.get("output/degraded.json").await.unwrap().unwrap();
    let output: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(output["metadata"]["persistenceDegraded"], true);
    assert_eq!(output["metadata"]["persistenceEnabled"], true);
}

/// 关闭持久化时不连接数据库
#[tokio::test]
async fn test_persistence_disabled_skips_store() {
    let rig = rig(shop_site(), InMemoryDocumentStore::unreachable());
    let options = JobOptions {
        persist_to_store: false,
        ..options("file-only.json")
    };

    let result = rig
        .runner
        .run("test-shop", CategoryTarget::All, options)
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::Completed);
    assert!(!result.persistence_degraded);
    assert_eq!(result.total_records, 3);
}

/// 已有任务运行时拒绝新任务，且不改变当前任务名
#[tokio::test]
async fn test_conflict_while_another_job_runs() {
    let rig = rig(shop_site(), InMemoryDocumentStore::new());
    let guard = rig.runner.run_lock().try_start("other-site:all").unwrap();

    let err = rig
        .runner
        .run("test-shop", CategoryTarget::All, options("conflict.json"))
        .await
        .unwrap_err();

    match err {
        JobError::Conflict { current } => assert_eq!(current, "other-site:all"),
        other => panic!("expected conflict, got {:?}", other),
    }
    let status = rig.runner.run_lock().status();
    assert!(status.in_progress);
    assert_eq!(status.current_job_name.as_deref(), Some("other-site:all"));
    assert!(rig.browser.journal().is_empty());

    drop(guard);
    let result = rig
        .runner
        .run("test-shop", CategoryTarget::All, options("after.json"))
        .await
        .unwrap();
    assert_eq!(result.total_records, 3);
    assert!(!rig.runner.run_lock().status().in_progress);
}

/// 未知分类在加锁与启动浏览器之前失败
#[tokio::test]
async fn test_unknown_category_fails_before_lock() {
    let rig = rig(shop_site(), InMemoryDocumentStore::new());

    let err = rig
        .runner
        .run(
            "test-shop",
            CategoryTarget::Named("Toys".to_string()),
            options("toys.json"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::UnknownCategory { ref category, .. } if category == "Toys"));
    assert!(!rig.runner.run_lock().status().in_progress);
    assert!(rig.browser.journal().is_empty());

    let err = rig
        .runner
        .run("nowhere", CategoryTarget::All, options("x.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::UnknownSite(_)));
}

/// 单分类任务返回与全量任务相同的结果结构
#[tokio::test]
async fn test_single_category_run() {
    let rig = rig(shop_site(), InMemoryDocumentStore::new());

    let result = rig
        .runner
        .run(
            "test-shop",
            CategoryTarget::Named("Bakery".to_string()),
            options("bakery.json"),
        )
        .await
        .unwrap();

    assert_eq!(result.site, "test-shop");
    assert_eq!(result.total_records, 1);
    assert_eq!(result.statistics.categories_processed, vec!["Bakery"]);
    assert_eq!(result.records[0].category, "Bakery");
    assert_eq!(result.records[0].source, "test-shop");
    assert!(rig.storage.keys().contains(&"output/bakery.json".to_string()));
}

/// 外部提供的浏览器在任务结束时保持打开
#[tokio::test]
async fn test_shared_browser_is_left_open() {
    let rig = rig(shop_site(), InMemoryDocumentStore::new());
    let shared = Arc::new(rig.browser.clone());
    let runner = rig.runner.with_shared_browser(shared);

    runner
        .run("test-shop", CategoryTarget::All, options("shared.json"))
        .await
        .unwrap();

    assert_eq!(rig.browser.count("launch"), 0);
    assert_eq!(rig.browser.count("close_browser"), 0);
    assert_eq!(rig.browser.count("close_context"), 1);
}

/// 连接到外部浏览器时只关闭自己创建的上下文
#[tokio::test]
async fn test_attached_browser_is_not_closed() {
    let rig = rig(shop_site().attached(), InMemoryDocumentStore::new());

    let result = rig
        .runner
        .run("test-shop", CategoryTarget::All, options("attached.json"))
        .await
        .unwrap();

    assert_eq!(result.total_records, 3);
    assert_eq!(rig.browser.count("launch"), 1);
    assert_eq!(rig.browser.count("close_context"), 1);
    assert_eq!(rig.browser.count("close_browser"), 0);
}

/// 登录只在第一个分类前执行一次
#[tokio::test]
async fn test_login_runs_once_per_job() {
    let site = shop_site()
        .page(LOGIN_URL, LOGIN_FORM)
        .page(ACCOUNT_URL, "<h1>My account</h1>")
        .on(
            Trigger::Click("button#send2".to_string()),
            Effect::Navigate(ACCOUNT_URL.to_string()),
        );
    let rig = rig_with_profile(site, InMemoryDocumentStore::new(), login_profile());

    let result = rig
        .runner
        .run("test-shop", CategoryTarget::All, with_credentials("login.json"))
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.total_records, 3);
    assert_eq!(rig.browser.count(&format!("goto {}", LOGIN_URL)), 1);
    assert_eq!(rig.browser.count("type #email"), 1);
}

/// 登录策略耗尽只让当前分类失败，下一个分类重新尝试登录
#[tokio::test]
async fn test_exhausted_login_fails_category_and_retries_on_next() {
    let login_only_inputs = r#"<form><input id="email"><input id="pass" type="password"></form>"#;
    let site = shop_site().page(LOGIN_URL, login_only_inputs);
    let rig = rig_with_profile(site, InMemoryDocumentStore::new(), login_profile());

    let result = rig
        .runner
        .run("test-shop", CategoryTarget::All, with_credentials("locked-out.json"))
        .await
        .unwrap();

    assert_eq!(result.status, JobStatus::CompletedWithErrors);
    assert_eq!(result.statistics.errors, 2);
    assert_eq!(result.total_records, 0);
    assert_eq!(result.statistics.categories_processed, vec!["Dairy", "Bakery"]);

    assert_eq!(rig.browser.count(&format!("goto {}", LOGIN_URL)), 2);
    assert_eq!(rig.browser.count("type #email"), 2);
    assert_eq!(rig.browser.count("press Enter #pass"), 2);
    assert_eq!(rig.browser.count(&format!("goto {}", DAIRY_URL)), 0);
    assert_eq!(rig.browser.count(&format!("goto {}", BAKERY_URL)), 0);

    let keys = rig.storage.keys();
    for category in ["dairy", "bakery"] {
        let prefix = format!("debug/test-shop/{}/login-error-", category);
        assert!(keys.iter().any(|k| k.starts_with(&prefix)), "missing {}", prefix);
    }
    assert!(!rig.runner.run_lock().status().in_progress);
}

/// 浏览器启动失败时任务报错，运行锁与数据库连接都被释放
#[tokio::test]
async fn test_launch_failure_releases_lock_and_store() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let storage = Arc::new(InMemoryStorage::new());
    let runner = ScrapeJobRunner::new(
        Arc::new(SiteRegistry::new(vec![shop_profile()])),
        Arc::new(FailingLauncher),
        store.clone(),
        storage.clone(),
        RunLock::new(),
        fast_settings(),
    )
    .unwrap();

    let err = runner
        .run("test-shop", CategoryTarget::All, options("never.json"))
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Engine(EngineError::Launch(_))));
    assert!(!runner.run_lock().status().in_progress);
    assert!(!store.is_connected());
    assert!(storage.keys().is_empty());

    let retry = runner.run_lock().try_start("test-shop:all");
    assert!(retry.is_ok());
}

/// 调用方放弃等待后任务仍在后台完成并释放资源
#[tokio::test]
async fn test_abandoned_request_still_cleans_up() {
    let TestRig {
        runner,
        browser,
        store,
        storage,
    } = rig(
        shop_site().slow(DAIRY_URL, Duration::from_millis(300)),
        InMemoryDocumentStore::new(),
    );
    let runner = Arc::new(runner);

    let request = runner
        .clone()
        .run_detached("test-shop".to_string(), CategoryTarget::All, options("abandoned.json"));
    let abandoned = tokio::time::timeout(Duration::from_millis(50), request).await;
    assert!(abandoned.is_err());
    assert!(runner.run_lock().status().in_progress);

    for _ in 0..100 {
        if !runner.run_lock().status().in_progress {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(!runner.run_lock().status().in_progress);
    assert_eq!(browser.count("close_browser"), 1);
    assert!(!store.is_connected());
    assert!(storage.keys().contains(&"output/abandoned.json".to_string()));
}
