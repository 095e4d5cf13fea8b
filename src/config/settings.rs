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

use crate::engines::traits::Viewport;
use crate::utils::retry_policy::RetryPolicy;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// 应用程序配置
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 服务器配置
    pub server: ServerSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 文件存储配置
    pub storage: StorageSettings,
    /// 抓取行为配置
    pub crawl: CrawlSettings,
    /// 站点配置
    #[serde(default)]
    pub sites: SitesSettings,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// 浏览器配置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 默认是否无头运行（请求可覆盖）
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub navigation_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    /// 远程调试地址，设置后连接已有浏览器
    pub remote_debugging_url: Option<String>,
}

impl BrowserSettings {
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.viewport_width,
            height: self.viewport_height,
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 文件存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// 图片、调试产物与输出文件的根目录
    pub local_path: String,
}

/// 抓取行为配置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// 详情页导航超时后的最大重载次数
    pub detail_max_reloads: u32,
    /// 第一次详情页重载前的等待（毫秒）
    pub detail_reload_delay_ms: u64,
    /// 重载等待的倍增系数，1.0 表示固定间隔
    pub detail_backoff_multiplier: f64,
    /// 重载等待上限（毫秒）
    pub detail_max_backoff_ms: u64,
    /// 重载等待的抖动比例 (0.0-1.0)
    pub detail_jitter_factor: f64,
    /// 登录策略执行后的等待（毫秒）
    pub login_settle_ms: u64,
    pub load_idle_timeout_secs: u64,
    pub image_timeout_secs: u64,
}

impl CrawlSettings {
    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn load_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.load_idle_timeout_secs)
    }

    pub fn detail_reload_delay(&self) -> Duration {
        Duration::from_millis(self.detail_reload_delay_ms)
    }

    /// 详情页重载阶梯使用的重试策略
    pub fn detail_retry(&self) -> RetryPolicy {
        RetryPolicy::exponential(
            self.detail_max_reloads,
            self.detail_reload_delay(),
            Duration::from_millis(self.detail_max_backoff_ms),
            self.detail_backoff_multiplier,
            self.detail_jitter_factor,
        )
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_secs(self.image_timeout_secs)
    }
}

/// 站点配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SitesSettings {
    /// 覆盖内置站点配置的 YAML 目录
    pub profile_dir: Option<PathBuf>,
}

impl Settings {
    /// 加载配置
    ///
    /// 依次合并内置默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 和 `CATALOGRS__` 前缀的环境变量。
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("CATALOGRS").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("browser.headless", true)?
            .set_default("browser.viewport_width", 1920)?
            .set_default("browser.viewport_height", 1080)?
            .set_default("browser.navigation_timeout_secs", 60)?
            .set_default("browser.selector_timeout_secs", 15)?
            .set_default("database.url", "sqlite://catalogrs.db?mode=rwc")?
            .set_default("database.max_connections", 5)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            .set_default("storage.local_path", "./storage")?
            .set_default("crawl.detail_max_reloads", 2)?
            .set_default("crawl.detail_reload_delay_ms", 2000)?
            .set_default("crawl.detail_backoff_multiplier", 2.0)?
            .set_default("crawl.detail_max_backoff_ms", 10000)?
            .set_default("crawl.detail_jitter_factor", 0.1)?
            .set_default("crawl.login_settle_ms", 3000)?
            .set_default("crawl.load_idle_timeout_secs", 30)?
            .set_default("crawl.image_timeout_secs", 30)
    }
}
