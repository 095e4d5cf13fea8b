// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 抓取与提取引擎的核心逻辑：
/// - 选择器解析（selector_resolver）：候选列表按序尝试，首个命中即返回
/// - 列表页提取（page_extractor）与详情页补全（detail_enricher）
/// - 站点遍历（site_navigator）：三种翻页策略
/// - 登录（authenticator）、图片下载（image_fetcher）
/// - 持久化协调（reconciler）与进程级运行锁（run_lock）
pub mod authenticator;
pub mod detail_enricher;
pub mod image_fetcher;
pub mod page_extractor;
pub mod reconciler;
pub mod run_lock;
pub mod selector_resolver;
pub mod site_navigator;
