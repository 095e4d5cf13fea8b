// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::application::use_cases::scrape_job::ScrapeJobRunner;
use crate::config::settings::Settings;
use crate::presentation::handlers::{scrape_job_handler, site_handler};
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// 创建应用路由
///
/// # 返回值
///
/// 返回配置好的路由
pub fn routes() -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version));

    let job_routes = Router::new()
        .route("/v1/sites", get(site_handler::list_sites))
        .route("/v1/sites/{site}/scrape", post(scrape_job_handler::run_scrape))
        .route("/v1/jobs/status", get(site_handler::job_status));

    Router::new().merge(public_routes).merge(job_routes)
}

/// 组装带共享状态的完整应用
pub fn app(runner: Arc<ScrapeJobRunner>, settings: Arc<Settings>) -> Router {
    routes()
        .layer(Extension(runner))
        .layer(Extension(settings))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
