// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 超时
    #[error("Timeout: {0}")]
    Timeout(String),
    /// 元素不存在
    #[error("Element not found: {0}")]
    NotFound(String),
    /// 当前引擎不支持该操作
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    /// 浏览器启动或连接失败
    #[error("Browser launch failed: {0}")]
    Launch(String),
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 判断是否为超时错误
    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Timeout(_))
    }
}

/// 元素定位表达式
///
/// 站点选择器以数据形式配置，CSS 与 XPath 由同一个解析器统一处理。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorSpec {
    /// CSS 选择器
    Css(String),
    /// XPath 表达式
    XPath(String),
}

impl SelectorSpec {
    pub fn css(selector: impl Into<String>) -> Self {
        SelectorSpec::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        SelectorSpec::XPath(expression.into())
    }

    /// 原始表达式文本
    pub fn expression(&self) -> &str {
        match self {
            SelectorSpec::Css(s) | SelectorSpec::XPath(s) => s,
        }
    }
}

impl fmt::Display for SelectorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorSpec::Css(s) => write!(f, "css:{}", s),
            SelectorSpec::XPath(s) => write!(f, "xpath:{}", s),
        }
    }
}

/// 视口尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// 可查询范围
///
/// 页面与元素都可以作为选择器的查询范围。
#[async_trait]
pub trait QueryScope: Send + Sync {
    /// 查询第一个匹配元素
    async fn query(&self, selector: &SelectorSpec) -> Result<Option<Box<dyn ElementHandle>>, EngineError>;

    /// 查询全部匹配元素（按文档顺序）
    async fn query_all(&self, selector: &SelectorSpec) -> Result<Vec<Box<dyn ElementHandle>>, EngineError>;
}

/// 元素句柄
#[async_trait]
pub trait ElementHandle: QueryScope {
    /// 元素可见文本
    async fn text(&self) -> Result<Option<String>, EngineError>;

    /// 元素属性值
    async fn attribute(&self, name: &str) -> Result<Option<String>, EngineError>;

    /// 点击元素
    async fn click(&self) -> Result<(), EngineError>;

    /// 在元素中输入文本
    async fn type_text(&self, text: &str) -> Result<(), EngineError>;

    /// 聚焦元素后按键
    async fn press_key(&self, key: &str) -> Result<(), EngineError>;

    /// 元素是否可见
    async fn is_visible(&self) -> Result<bool, EngineError>;
}

/// 页面句柄
#[async_trait]
pub trait PageHandle: QueryScope {
    /// 导航到指定URL
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), EngineError>;

    /// 重新加载当前页面
    async fn reload(&self, timeout: Duration) -> Result<(), EngineError>;

    /// 等待页面加载空闲
    async fn wait_for_load_idle(&self, timeout: Duration) -> Result<(), EngineError>;

    /// 等待选择器出现
    async fn wait_for_selector(&self, selector: &SelectorSpec, timeout: Duration) -> Result<(), EngineError>;

    /// 当前URL
    async fn url(&self) -> Result<String, EngineError>;

    /// 在页面上下文执行脚本
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, EngineError>;

    /// 页面截图（PNG）
    async fn screenshot(&self) -> Result<Vec<u8>, EngineError>;

    /// 当前页面HTML
    async fn content(&self) -> Result<String, EngineError>;

    /// 关闭页面
    async fn close(&self) -> Result<(), EngineError>;
}

/// 浏览上下文
///
/// 同一上下文内的页面共享 Cookie 与会话状态。
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// 打开新页面
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, EngineError>;

    /// 关闭上下文
    async fn close(&self) -> Result<(), EngineError>;
}

/// 浏览器句柄
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    /// 创建新的浏览上下文
    async fn new_context(&self, viewport: Viewport) -> Result<Box<dyn BrowserContext>, EngineError>;

    /// 关闭浏览器
    async fn close(&self) -> Result<(), EngineError>;
}

/// 启动结果
pub struct LaunchedBrowser {
    pub handle: Arc<dyn BrowserHandle>,
    /// 连接到已有实例时为 false，调用方不应关闭它
    pub owned: bool,
}

/// 浏览器启动器
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// 启动浏览器或连接已有实例
    async fn launch(&self, headless: bool) -> Result<LaunchedBrowser, EngineError>;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
