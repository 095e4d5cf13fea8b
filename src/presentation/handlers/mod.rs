// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// HTTP请求处理器模块
///
/// 站点列表、任务状态与抓取触发
pub mod scrape_job_handler;
pub mod site_handler;
