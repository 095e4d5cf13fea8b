// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，依赖于领域层的抽象接口。
///
/// 包含的子模块：
/// - 数据库（database）：连接池与文档实体映射
/// - 调试产物（debug_artifacts）：失败时的截图与页面HTML
/// - 文档存储（document_store）：内存与 SeaORM 两种实现
/// - 输出文件（output_writer）：任务结果 JSON 文件
/// - 存储（storage）：本地与内存文件存储
pub mod database;
pub mod debug_artifacts;
pub mod document_store;
pub mod output_writer;
pub mod storage;
