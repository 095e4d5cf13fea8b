// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::EngineError;
use thiserror::Error;

/// 登录错误类型
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("登录页面不可用: {0}")]
    Navigation(#[source] EngineError),

    #[error("未找到凭据输入框: {0}")]
    MissingField(String),

    #[error("所有提交策略均失败，仍停留在登录页: {0}")]
    StillOnLoginPage(String),

    #[error("浏览器错误: {0}")]
    Engine(#[from] EngineError),
}

/// 分类级抓取错误
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("导航失败: {0}")]
    Navigation(#[source] EngineError),

    #[error("登录失败: {0}")]
    Auth(#[from] AuthError),

    #[error("浏览器错误: {0}")]
    Engine(#[from] EngineError),

    #[error("无效URL: {0}")]
    InvalidUrl(String),
}

/// 站点配置加载错误
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("未知站点: {0}")]
    UnknownSite(String),

    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("解析配置文件失败: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("配置文件 {path} 的站点标识为 {found}，应为 {expected}")]
    IdMismatch {
        path: String,
        expected: String,
        found: String,
    },
}
