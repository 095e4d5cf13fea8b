// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Default)]
struct LockState {
    in_progress: bool,
    current_job_name: Option<String>,
}

/// 运行锁快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLockStatus {
    pub in_progress: bool,
    pub current_job_name: Option<String>,
}

/// 进程级运行锁
///
/// 同一时刻最多运行一个抓取任务。并发的启动请求立即被拒绝，不排队。
/// 作为可注入服务在组件之间共享。
#[derive(Debug, Clone, Default)]
pub struct RunLock {
    state: Arc<Mutex<LockState>>,
}

/// 持有期间任务处于运行状态，释放时自动解锁
#[derive(Debug)]
pub struct RunGuard {
    state: Arc<Mutex<LockState>>,
}

impl RunLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试开始一个任务
    ///
    /// 已有任务运行时返回 `Err(当前任务名)`，且不修改当前任务名。
    pub fn try_start(&self, job_name: &str) -> Result<RunGuard, String> {
        let mut state = self.state.lock();
        if state.in_progress {
            return Err(state.current_job_name.clone().unwrap_or_default());
        }
        state.in_progress = true;
        state.current_job_name = Some(job_name.to_string());
        Ok(RunGuard {
            state: self.state.clone(),
        })
    }

    pub fn status(&self) -> RunLockStatus {
        let state = self.state.lock();
        RunLockStatus {
            in_progress: state.in_progress,
            current_job_name: state.current_job_name.clone(),
        }
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.in_progress = false;
        state.current_job_name = None;
    }
}
