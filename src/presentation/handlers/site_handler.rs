// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::application::use_cases::scrape_job::ScrapeJobRunner;
use crate::domain::services::run_lock::RunLockStatus;

/// 站点概要
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    pub categories: Vec<String>,
    pub requires_login: bool,
}

/// 列出已注册站点及其分类
pub async fn list_sites(Extension(runner): Extension<Arc<ScrapeJobRunner>>) -> Json<Vec<SiteSummary>> {
    let sites = runner
        .registry()
        .profiles()
        .iter()
        .map(|profile| SiteSummary {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            base_url: profile.base_url.clone(),
            categories: profile.categories.iter().map(|c| c.name.clone()).collect(),
            requires_login: profile.login.is_some(),
        })
        .collect();
    Json(sites)
}

/// 当前任务状态
pub async fn job_status(Extension(runner): Extension<Arc<ScrapeJobRunner>>) -> Json<RunLockStatus> {
    Json(runner.run_lock().status())
}
