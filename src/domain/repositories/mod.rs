// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义文档存储与文件存储的数据访问抽象
pub mod document_store;
pub mod storage_repository;
