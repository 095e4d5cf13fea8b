// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 单条记录的写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// 新插入
    New,
    /// 已存在且有字段变化
    Updated,
    /// 已存在且无变化
    Unchanged,
    /// 查询或写入失败
    Error,
}

/// 一批记录的写入汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertSummary {
    pub new: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub errors: u64,
}

impl UpsertSummary {
    pub fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::New => self.new += 1,
            UpsertOutcome::Updated => self.updated += 1,
            UpsertOutcome::Unchanged => self.unchanged += 1,
            UpsertOutcome::Error => self.errors += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.new + self.updated + self.unchanged + self.errors
    }
}

/// 运行统计
///
/// 在一次任务中逐步累加，结束时调用 [`RunStatistics::finish`] 固化耗时。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatistics {
    pub total_processed: u64,
    pub new_records_added: u64,
    pub existing_records_updated: u64,
    pub records_unchanged: u64,
    pub errors: u64,
    /// 已处理分类（按处理顺序）
    pub categories_processed: Vec<String>,
    /// 耗时（秒）
    pub elapsed_seconds: f64,
}

impl RunStatistics {
    /// 合并一批写入结果
    pub fn absorb(&mut self, summary: &UpsertSummary) {
        self.new_records_added += summary.new;
        self.existing_records_updated += summary.updated;
        self.records_unchanged += summary.unchanged;
        self.errors += summary.errors;
    }

    /// 记录一个分类级错误
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.elapsed_seconds = elapsed.as_secs_f64();
    }
}
