// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：商品记录、分类、统计与任务
/// - 仓库接口（repositories）：文档存储与文件存储抽象
/// - 服务（services）：抓取、提取与持久化协调
/// - 站点配置（sites）：以数据表达的站点差异
pub mod models;
pub mod repositories;
pub mod services;
pub mod sites;
