// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库实体模块
///
/// 商品文档以 JSON 主体存放，按集合名区分站点
pub mod catalog_document;
