// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{rig, shop_site};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum_test::TestServer;
use catalogrs::application::use_cases::scrape_job::ScrapeJobRunner;
use catalogrs::config::settings::Settings;
use catalogrs::infrastructure::document_store::in_memory::InMemoryDocumentStore;
use catalogrs::presentation::routes;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

fn server() -> (TestServer, Arc<ScrapeJobRunner>) {
    let runner = Arc::new(rig(shop_site(), InMemoryDocumentStore::new()).runner);
    let settings = Arc::new(Settings::new().unwrap());
    let server = TestServer::new(routes::app(runner.clone(), settings)).unwrap();
    (server, runner)
}

/// 健康检查测试
#[tokio::test]
async fn test_health_check() {
    let (server, _) = server();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");
}

/// 版本端点不依赖共享状态
#[tokio::test]
async fn test_version_route_without_state() {
    let app = routes::routes();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/version")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

/// 站点列表包含分类与登录需求
#[tokio::test]
async fn test_list_sites() {
    let (server, _) = server();

    let response = server.get("/v1/sites").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let sites: Value = response.json();
    assert_eq!(sites[0]["id"], "test-shop");
    assert_eq!(sites[0]["categories"], json!(["Dairy", "Bakery"]));
    assert_eq!(sites[0]["requiresLogin"], false);
}

/// 触发单分类抓取并返回完整结果
#[tokio::test]
async fn test_scrape_single_category() {
    let (server, _) = server();

    let response = server
        .post("/v1/sites/test-shop/scrape")
        .json(&json!({ "category": "Dairy", "outputFileName": "dairy.json" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let result: Value = response.json();
    assert_eq!(result["status"], "completed");
    assert_eq!(result["totalRecords"], 2);
    assert_eq!(result["statistics"]["categoriesProcessed"], json!(["Dairy"]));
    assert_eq!(result["outputFilePath"], "memory/output/dairy.json");
}

/// 运行中的任务导致 409，并返回当前任务名
#[tokio::test]
async fn test_scrape_conflict() {
    let (server, runner) = server();
    let _guard = runner.run_lock().try_start("test-shop:Bakery").unwrap();

    let status: Value = server.get("/v1/jobs/status").await.json();
    assert_eq!(status["inProgress"], true);
    assert_eq!(status["currentJobName"], "test-shop:Bakery");

    let response = server
        .post("/v1/sites/test-shop/scrape")
        .json(&json!({}))
        .await;

    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["currentJob"], "test-shop:Bakery");
}

/// 未知站点与未知分类返回 404
#[tokio::test]
async fn test_scrape_unknown_targets() {
    let (server, runner) = server();

    let response = server
        .post("/v1/sites/nowhere/scrape")
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server
        .post("/v1/sites/test-shop/scrape")
        .json(&json!({ "category": "Toys" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert!(!runner.run_lock().status().in_progress);
}

/// 请求校验失败返回 400
#[tokio::test]
async fn test_scrape_rejects_invalid_request() {
    let (server, _) = server();

    let response = server
        .post("/v1/sites/test-shop/scrape")
        .json(&json!({ "email": "buyer@example.com" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = server
        .post("/v1/sites/test-shop/scrape")
        .json(&json!({ "outputFileName": "../escape.json" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}
