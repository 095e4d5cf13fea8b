// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 基于静态 HTML 的浏览器能力实现
//!
//! 页面内容来自预先捕获的 HTML（例如调试目录中的原始页面转储），交互通过
//! 脚本化效果模拟：点击、脚本执行或按键可以跳转到其他URL，或依次替换页面内容。
//! 静态 HTML 无法执行 XPath，需要用到的表达式通过 [`SnapshotSite::xpath`] 映射为等价的
//! CSS 选择器。所有调用都会记录到日志中，便于回放与断言。

use crate::engines::traits::{
    BrowserContext, BrowserHandle, BrowserLauncher, ElementHandle, EngineError, LaunchedBrowser,
    PageHandle, QueryScope, SelectorSpec, Viewport,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

const EMPTY_PAGE: &str = "<html><head></head><body></body></html>";

/// 交互触发条件
#[derive(Debug, Clone)]
pub enum Trigger {
    /// 点击由该 CSS 选择器匹配到的元素
    Click(String),
    /// 执行包含该片段的脚本
    Script(String),
    /// 按下指定按键
    Key(String),
}

/// 交互效果
#[derive(Debug, Clone)]
pub enum Effect {
    /// 跳转到指定URL
    Navigate(String),
    /// 依次替换当前页面内容，耗尽后不再生效
    Replace(VecDeque<String>),
}

#[derive(Debug)]
struct Interaction {
    trigger: Trigger,
    effect: Effect,
}

struct SiteShared {
    pages: HashMap<String, String>,
    fallback: Option<String>,
    xpaths: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    attached: bool,
    interactions: Mutex<Vec<Interaction>>,
    timeouts: Mutex<HashMap<String, u32>>,
    journal: Mutex<Vec<String>>,
}

impl SiteShared {
    fn record(&self, entry: String) {
        self.journal.lock().push(entry);
    }

    fn html_for(&self, url: &str) -> String {
        self.pages
            .get(url)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(|| EMPTY_PAGE.to_string())
    }

    fn selector(&self, selector: &SelectorSpec) -> Result<Selector, EngineError> {
        let css = match selector {
            SelectorSpec::Css(css) => css,
            SelectorSpec::XPath(xpath) => self
                .xpaths
                .get(xpath)
                .ok_or_else(|| EngineError::Unsupported(format!("unmapped xpath {}", xpath)))?,
        };
        Selector::parse(css).map_err(|e| EngineError::Other(format!("invalid selector {}: {:?}", css, e)))
    }

    fn take_timeout(&self, url: &str) -> bool {
        let mut timeouts = self.timeouts.lock();
        match timeouts.get_mut(url) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

/// 静态站点定义
pub struct SnapshotSite {
    pages: HashMap<String, String>,
    fallback: Option<String>,
    xpaths: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    attached: bool,
    interactions: Vec<Interaction>,
    timeouts: HashMap<String, u32>,
}

impl Default for SnapshotSite {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotSite {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            fallback: None,
            xpaths: HashMap::new(),
            delays: HashMap::new(),
            attached: false,
            interactions: Vec::new(),
            timeouts: HashMap::new(),
        }
    }

    /// 注册URL对应的HTML
    pub fn page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// 未注册URL返回的HTML
    pub fn fallback(mut self, html: impl Into<String>) -> Self {
        self.fallback = Some(html.into());
        self
    }

    /// 注册交互
    pub fn on(mut self, trigger: Trigger, effect: Effect) -> Self {
        self.interactions.push(Interaction { trigger, effect });
        self
    }

    /// 把 XPath 表达式映射为等价的 CSS 选择器
    pub fn xpath(mut self, expression: impl Into<String>, css: impl Into<String>) -> Self {
        self.xpaths.insert(expression.into(), css.into());
        self
    }

    /// 访问该URL时导航耗时 `delay`
    pub fn slow(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    /// 模拟连接到外部已有的浏览器（启动器不拥有该实例）
    pub fn attached(mut self) -> Self {
        self.attached = true;
        self
    }

    /// 前 `count` 次访问该URL时模拟导航超时
    pub fn time_out(mut self, url: impl Into<String>, count: u32) -> Self {
        self.timeouts.insert(url.into(), count);
        self
    }

    pub fn into_browser(self) -> SnapshotBrowser {
        SnapshotBrowser {
            site: Arc::new(SiteShared {
                pages: self.pages,
                fallback: self.fallback,
                xpaths: self.xpaths,
                delays: self.delays,
                attached: self.attached,
                interactions: Mutex::new(self.interactions),
                timeouts: Mutex::new(self.timeouts),
                journal: Mutex::new(Vec::new()),
            }),
        }
    }
}

/// 静态浏览器
#[derive(Clone)]
pub struct SnapshotBrowser {
    site: Arc<SiteShared>,
}

impl SnapshotBrowser {
    /// 调用日志快照
    pub fn journal(&self) -> Vec<String> {
        self.site.journal.lock().clone()
    }

    /// 统计以指定前缀开头的日志条目数
    pub fn count(&self, prefix: &str) -> usize {
        self.site
            .journal
            .lock()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    /// 直接打开一个页面（不经过上下文）
    pub fn open_page(&self) -> SnapshotPage {
        SnapshotPage::new(self.site.clone())
    }
}

#[async_trait]
impl BrowserLauncher for SnapshotBrowser {
    async fn launch(&self, headless: bool) -> Result<LaunchedBrowser, EngineError> {
        self.site.record(format!("launch headless={}", headless));
        Ok(LaunchedBrowser {
            handle: Arc::new(self.clone()),
            owned: !self.site.attached,
        })
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}

#[async_trait]
impl BrowserHandle for SnapshotBrowser {
    async fn new_context(&self, viewport: Viewport) -> Result<Box<dyn BrowserContext>, EngineError> {
        self.site
            .record(format!("new_context {}x{}", viewport.width, viewport.height));
        Ok(Box::new(SnapshotContext {
            site: self.site.clone(),
        }))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.site.record("close_browser".to_string());
        Ok(())
    }
}

struct SnapshotContext {
    site: Arc<SiteShared>,
}

#[async_trait]
impl BrowserContext for SnapshotContext {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, EngineError> {
        self.site.record("new_page".to_string());
        Ok(Box::new(SnapshotPage::new(self.site.clone())))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.site.record("close_context".to_string());
        Ok(())
    }
}

struct PageState {
    url: String,
    html: String,
}

struct PageShared {
    site: Arc<SiteShared>,
    state: Mutex<PageState>,
}

impl PageShared {
    fn apply(&self, trigger_matches: impl Fn(&Trigger) -> bool) {
        let mut interactions = self.site.interactions.lock();
        let Some(interaction) = interactions.iter_mut().find(|i| trigger_matches(&i.trigger)) else {
            return;
        };
        let mut state = self.state.lock();
        match &mut interaction.effect {
            Effect::Navigate(url) => {
                state.html = self.site.html_for(url);
                state.url = url.clone();
            }
            Effect::Replace(queue) => {
                if let Some(next) = queue.pop_front() {
                    state.html = next;
                }
            }
        }
    }
}

/// 静态页面
pub struct SnapshotPage {
    shared: Arc<PageShared>,
}

impl SnapshotPage {
    fn new(site: Arc<SiteShared>) -> Self {
        Self {
            shared: Arc::new(PageShared {
                site,
                state: Mutex::new(PageState {
                    url: "about:blank".to_string(),
                    html: EMPTY_PAGE.to_string(),
                }),
            }),
        }
    }
}

fn select_outer_html(html: &str, parsed_selector: &Selector, fragment: bool) -> Vec<String> {
    let document = if fragment {
        Html::parse_fragment(html)
    } else {
        Html::parse_document(html)
    };
    let matches = if fragment {
        match top_element(&document) {
            // Descendants only, mirroring Element.querySelectorAll
            Some(top) => top
                .select(parsed_selector)
                .filter(|e| e.id() != top.id())
                .map(|e| e.html())
                .collect(),
            None => Vec::new(),
        }
    } else {
        document.select(parsed_selector).map(|e| e.html()).collect()
    };
    matches
}

fn top_element(fragment: &Html) -> Option<ElementRef<'_>> {
    fragment.root_element().children().find_map(ElementRef::wrap)
}

fn elements(shared: &Arc<PageShared>, selector: &SelectorSpec, outer: Vec<String>) -> Vec<Box<dyn ElementHandle>> {
    outer
        .into_iter()
        .map(|html| {
            Box::new(SnapshotElement {
                page: shared.clone(),
                matched_by: selector.clone(),
                html,
            }) as Box<dyn ElementHandle>
        })
        .collect()
}

#[async_trait]
impl QueryScope for SnapshotPage {
    async fn query(&self, selector: &SelectorSpec) -> Result<Option<Box<dyn ElementHandle>>, EngineError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn query_all(&self, selector: &SelectorSpec) -> Result<Vec<Box<dyn ElementHandle>>, EngineError> {
        let parsed = self.shared.site.selector(selector)?;
        let html = self.shared.state.lock().html.clone();
        let outer = select_outer_html(&html, &parsed, false);
        Ok(elements(&self.shared, selector, outer))
    }
}

#[async_trait]
impl PageHandle for SnapshotPage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), EngineError> {
        let site = &self.shared.site;
        site.record(format!("goto {}", url));
        if let Some(delay) = site.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        {
            let mut state = self.shared.state.lock();
            state.url = url.to_string();
            state.html = EMPTY_PAGE.to_string();
        }
        if site.take_timeout(url) {
            return Err(EngineError::Timeout(format!("navigation to {}", url)));
        }
        self.shared.state.lock().html = site.html_for(url);
        Ok(())
    }

    async fn reload(&self, _timeout: Duration) -> Result<(), EngineError> {
        let site = &self.shared.site;
        let url = self.shared.state.lock().url.clone();
        site.record(format!("reload {}", url));
        if site.take_timeout(&url) {
            return Err(EngineError::Timeout("reload".to_string()));
        }
        self.shared.state.lock().html = site.html_for(&url);
        Ok(())
    }

    async fn wait_for_load_idle(&self, _timeout: Duration) -> Result<(), EngineError> {
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &SelectorSpec, _timeout: Duration) -> Result<(), EngineError> {
        match self.query(selector).await {
            Ok(Some(_)) => Ok(()),
            _ => Err(EngineError::Timeout(format!("waiting for {}", selector))),
        }
    }

    async fn url(&self) -> Result<String, EngineError> {
        Ok(self.shared.state.lock().url.clone())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, EngineError> {
        self.shared.site.record(format!("evaluate {}", script));
        self.shared
            .apply(|t| matches!(t, Trigger::Script(fragment) if script.contains(fragment.as_str())));
        Ok(serde_json::Value::Null)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, EngineError> {
        self.shared.site.record("screenshot".to_string());
        Ok(b"\x89PNG snapshot".to_vec())
    }

    async fn content(&self) -> Result<String, EngineError> {
        Ok(self.shared.state.lock().html.clone())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.shared.site.record("close_page".to_string());
        Ok(())
    }
}

/// 静态元素
pub struct SnapshotElement {
    page: Arc<PageShared>,
    matched_by: SelectorSpec,
    html: String,
}

impl SnapshotElement {
    fn with_top<T>(&self, f: impl FnOnce(ElementRef<'_>) -> T) -> Option<T> {
        let fragment = Html::parse_fragment(&self.html);
        top_element(&fragment).map(f)
    }
}

#[async_trait]
impl QueryScope for SnapshotElement {
    async fn query(&self, selector: &SelectorSpec) -> Result<Option<Box<dyn ElementHandle>>, EngineError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn query_all(&self, selector: &SelectorSpec) -> Result<Vec<Box<dyn ElementHandle>>, EngineError> {
        let parsed = self.page.site.selector(selector)?;
        let outer = select_outer_html(&self.html, &parsed, true);
        Ok(elements(&self.page, selector, outer))
    }
}

#[async_trait]
impl ElementHandle for SnapshotElement {
    async fn text(&self) -> Result<Option<String>, EngineError> {
        Ok(self.with_top(|top| top.text().collect::<Vec<_>>().join(" ")))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, EngineError> {
        Ok(self
            .with_top(|top| top.value().attr(name).map(str::to_string))
            .flatten())
    }

    async fn click(&self) -> Result<(), EngineError> {
        let expression = self.matched_by.expression().to_string();
        self.page.site.record(format!("click {}", expression));
        self.page
            .apply(|t| matches!(t, Trigger::Click(sel) if *sel == expression));
        Ok(())
    }

    async fn type_text(&self, _text: &str) -> Result<(), EngineError> {
        self.page
            .site
            .record(format!("type {}", self.matched_by.expression()));
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), EngineError> {
        self.page
            .site
            .record(format!("press {} {}", key, self.matched_by.expression()));
        self.page.apply(|t| matches!(t, Trigger::Key(k) if k == key));
        Ok(())
    }

    async fn is_visible(&self) -> Result<bool, EngineError> {
        Ok(self
            .with_top(|top| {
                let hidden_attr = top.value().attr("hidden").is_some();
                let style = top.value().attr("style").unwrap_or_default().replace(' ', "");
                !hidden_attr && !style.contains("display:none")
            })
            .unwrap_or(false))
    }
}
