// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::product::ProductRecord;
use crate::domain::models::statistics::RunStatistics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 登录凭据
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// 任务选项
///
/// 任务开始后不可变；按分类执行时传入副本，避免分类之间互相影响。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOptions {
    pub credentials: Option<Credentials>,
    pub headless: bool,
    pub download_images: bool,
    pub persist_to_store: bool,
    pub output_file_name: String,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            credentials: None,
            headless: true,
            download_images: false,
            persist_to_store: true,
            output_file_name: "products.json".to_string(),
        }
    }
}

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 所有分类均成功
    Completed,
    /// 部分分类失败，或持久化降级
    CompletedWithErrors,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::CompletedWithErrors => write!(f, "completed_with_errors"),
        }
    }
}

/// 任务结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub status: JobStatus,
    pub site: String,
    pub total_records: usize,
    pub statistics: RunStatistics,
    pub output_file_path: Option<String>,
    /// 数据库不可用时降级为仅写文件
    pub persistence_degraded: bool,
    pub records: Vec<ProductRecord>,
}

/// 输出文件元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMetadata {
    pub site: String,
    pub total_records: usize,
    pub timestamp: DateTime<Utc>,
    pub images_enabled: bool,
    pub persistence_enabled: bool,
    pub persistence_degraded: bool,
    pub statistics: RunStatistics,
    pub categories: Vec<String>,
}

/// 输出文件内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputDocument {
    pub records: Vec<ProductRecord>,
    pub metadata: OutputMetadata,
}
