// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::{Extension, Json, Path};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::application::dto::scrape_job_request::ScrapeJobRequestDto;
use crate::application::use_cases::scrape_job::ScrapeJobRunner;
use crate::config::settings::Settings;
use crate::domain::models::job::JobResult;
use crate::presentation::errors::AppError;

/// 触发站点抓取
///
/// 同步执行并返回结果；已有任务运行时返回 409。客户端断开不会中断任务，
/// 浏览器和存储照常释放。
pub async fn run_scrape(
    Extension(runner): Extension<Arc<ScrapeJobRunner>>,
    Extension(settings): Extension<Arc<Settings>>,
    Path(site): Path<String>,
    Json(payload): Json<ScrapeJobRequestDto>,
) -> Result<Json<JobResult>, AppError> {
    payload.validate()?;
    let (target, options) = payload.into_job(&site, settings.browser.headless);
    info!("Scrape requested for {} ({:?})", site, target);

    let result = runner.run_detached(site, target, options).await?;
    Ok(Json(result))
}
