// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::{
    BrowserContext, BrowserHandle, BrowserLauncher, ElementHandle, EngineError, LaunchedBrowser,
    PageHandle, QueryScope, SelectorSpec, Viewport,
};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// 无请求持续多久视为网络空闲
const NETWORK_QUIET: Duration = Duration::from_millis(500);
const SCOPE_ATTR: &str = "data-catalogrs-scope";

fn other<E: std::fmt::Display>(e: E) -> EngineError {
    EngineError::Other(e.to_string())
}

/// Chromium 启动器
///
/// 基于 chromiumoxide 的浏览器能力实现。配置了远程调试地址时连接已有实例，
/// 否则本地启动 Chrome。
pub struct ChromiumLauncher {
    remote_debugging_url: Option<String>,
    request_timeout: Duration,
    window: Viewport,
}

impl ChromiumLauncher {
    pub fn new(remote_debugging_url: Option<String>, request_timeout: Duration, window: Viewport) -> Self {
        Self {
            remote_debugging_url,
            request_timeout,
            window,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, headless: bool) -> Result<LaunchedBrowser, EngineError> {
        let remote_debugging_url = self
            .remote_debugging_url
            .clone()
            .or_else(|| std::env::var("CHROMIUM_REMOTE_DEBUGGING_URL").ok());

        let (browser, mut handler) = if let Some(ref url) = remote_debugging_url {
            tracing::info!("Connecting to remote Chrome instance at: {}", url);
            Browser::connect(url)
                .await
                .map_err(|e| EngineError::Launch(format!("Failed to connect to remote Chrome: {}", e)))?
        } else {
            let mut builder = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(self.request_timeout)
                .window_size(self.window.width, self.window.height)
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage");

            if !headless {
                builder = builder.with_head();
            }

            let config = builder.build().map_err(EngineError::Launch)?;
            Browser::launch(config)
                .await
                .map_err(|e| EngineError::Launch(e.to_string()))?
        };

        // Drive the CDP event loop until the connection drops
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        tracing::info!(headless, "Chromium browser ready");

        Ok(LaunchedBrowser {
            handle: Arc::new(ChromiumBrowser {
                browser: Arc::new(Mutex::new(browser)),
                handler_task,
            }),
            owned: remote_debugging_url.is_none(),
        })
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}

/// Chromium 浏览器句柄
pub struct ChromiumBrowser {
    browser: Arc<Mutex<Browser>>,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserHandle for ChromiumBrowser {
    async fn new_context(&self, viewport: Viewport) -> Result<Box<dyn BrowserContext>, EngineError> {
        let context_id = {
            let browser = self.browser.lock().await;
            browser
                .execute(CreateBrowserContextParams::default())
                .await
                .map_err(other)?
                .result
                .browser_context_id
        };

        Ok(Box::new(ChromiumContext {
            browser: self.browser.clone(),
            context_id,
            viewport,
        }))
    }

    async fn close(&self) -> Result<(), EngineError> {
        let mut browser = self.browser.lock().await;
        let result = browser.close().await.map(|_| ()).map_err(other);
        self.handler_task.abort();
        result
    }
}

impl Drop for ChromiumBrowser {
    // Detaching from a remote instance must not leave the CDP loop running
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

/// 隔离的浏览上下文
pub struct ChromiumContext {
    browser: Arc<Mutex<Browser>>,
    context_id: BrowserContextId,
    viewport: Viewport,
}

#[async_trait]
impl BrowserContext for ChromiumContext {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, EngineError> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.context_id.clone())
            .build()
            .map_err(EngineError::Other)?;

        let page = {
            let browser = self.browser.lock().await;
            browser.new_page(params).await.map_err(other)?
        };

        page.execute(SetDeviceMetricsOverrideParams::new(
            self.viewport.width as i64,
            self.viewport.height as i64,
            1.0,
            false,
        ))
        .await
        .map_err(other)?;

        let network = Arc::new(parking_lot::Mutex::new(NetworkIdle::new(Instant::now())));
        let listener = track_network(&page, network.clone()).await?;

        Ok(Box::new(ChromiumPage {
            page,
            network,
            listener,
        }))
    }

    async fn close(&self) -> Result<(), EngineError> {
        let browser = self.browser.lock().await;
        browser
            .execute(DisposeBrowserContextParams::new(self.context_id.clone()))
            .await
            .map(|_| ())
            .map_err(other)
    }
}

/// 在途请求跟踪，用于判断网络空闲
#[derive(Debug)]
struct NetworkIdle {
    in_flight: HashSet<String>,
    last_activity: Instant,
}

impl NetworkIdle {
    fn new(now: Instant) -> Self {
        Self {
            in_flight: HashSet::new(),
            last_activity: now,
        }
    }

    fn started(&mut self, request_id: &str, now: Instant) {
        self.in_flight.insert(request_id.to_string());
        self.last_activity = now;
    }

    fn finished(&mut self, request_id: &str, now: Instant) {
        self.in_flight.remove(request_id);
        self.last_activity = now;
    }

    /// 新导航开始时丢弃上一页未结束的请求
    fn reset(&mut self, now: Instant) {
        self.in_flight.clear();
        self.last_activity = now;
    }

    fn is_idle(&self, quiet: Duration, now: Instant) -> bool {
        self.in_flight.is_empty() && now.saturating_duration_since(self.last_activity) >= quiet
    }
}

async fn track_network(
    page: &Page,
    network: Arc<parking_lot::Mutex<NetworkIdle>>,
) -> Result<JoinHandle<()>, EngineError> {
    let mut sent = page.event_listener::<EventRequestWillBeSent>().await.map_err(other)?;
    let mut finished = page.event_listener::<EventLoadingFinished>().await.map_err(other)?;
    let mut failed = page.event_listener::<EventLoadingFailed>().await.map_err(other)?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(event) = sent.next() => {
                    network.lock().started(event.request_id.inner(), Instant::now());
                }
                Some(event) = finished.next() => {
                    network.lock().finished(event.request_id.inner(), Instant::now());
                }
                Some(event) = failed.next() => {
                    network.lock().finished(event.request_id.inner(), Instant::now());
                }
                else => break,
            }
        }
    }))
}

/// 把元素内的相对 XPath 改写为以标记属性为锚点的文档级 XPath
fn scoped_xpath(marker: &str, expression: &str) -> String {
    let anchor = format!("//*[@{}='{}']", SCOPE_ATTR, marker);
    if expression.starts_with('/') {
        expression.to_string()
    } else if expression.starts_with("..") {
        format!("{}/{}", anchor, expression)
    } else if let Some(rest) = expression.strip_prefix('.') {
        format!("{}{}", anchor, rest)
    } else {
        format!("{}/{}", anchor, expression)
    }
}

/// Chromium 页面
pub struct ChromiumPage {
    page: Page,
    network: Arc<parking_lot::Mutex<NetworkIdle>>,
    listener: JoinHandle<()>,
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

fn boxed(page: &Page, elements: Vec<Element>) -> Vec<Box<dyn ElementHandle>> {
    elements
        .into_iter()
        .map(|element| {
            Box::new(ChromiumElement {
                element,
                page: page.clone(),
            }) as Box<dyn ElementHandle>
        })
        .collect()
}

#[async_trait]
impl QueryScope for ChromiumPage {
    async fn query(&self, selector: &SelectorSpec) -> Result<Option<Box<dyn ElementHandle>>, EngineError> {
        let found = match selector {
            SelectorSpec::Css(css) => self.page.find_element(css.as_str()).await,
            SelectorSpec::XPath(xpath) => self.page.find_xpath(xpath.as_str()).await,
        };
        // chromiumoxide reports "no match" as an error
        Ok(found.ok().map(|element| {
            Box::new(ChromiumElement {
                element,
                page: self.page.clone(),
            }) as Box<dyn ElementHandle>
        }))
    }

    async fn query_all(&self, selector: &SelectorSpec) -> Result<Vec<Box<dyn ElementHandle>>, EngineError> {
        let found = match selector {
            SelectorSpec::Css(css) => self.page.find_elements(css.as_str()).await,
            SelectorSpec::XPath(xpath) => self.page.find_xpaths(xpath.as_str()).await,
        };
        Ok(found.map(|elements| boxed(&self.page, elements)).unwrap_or_default())
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), EngineError> {
        self.network.lock().reset(Instant::now());
        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .map_err(|_| EngineError::Timeout(format!("navigation to {}", url)))?
            .map(|_| ())
            .map_err(other)
    }

    async fn reload(&self, timeout: Duration) -> Result<(), EngineError> {
        self.network.lock().reset(Instant::now());
        tokio::time::timeout(timeout, self.page.reload())
            .await
            .map_err(|_| EngineError::Timeout("reload".to_string()))?
            .map(|_| ())
            .map_err(other)
    }

    async fn wait_for_load_idle(&self, timeout: Duration) -> Result<(), EngineError> {
        tokio::time::timeout(timeout, async {
            loop {
                let ready = self
                    .page
                    .evaluate("document.readyState === 'complete'")
                    .await
                    .ok()
                    .and_then(|r| r.value().and_then(|v| v.as_bool()))
                    .unwrap_or(false);
                if ready && self.network.lock().is_idle(NETWORK_QUIET, Instant::now()) {
                    break;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .map_err(|_| EngineError::Timeout("load idle".to_string()))
    }

    async fn wait_for_selector(&self, selector: &SelectorSpec, timeout: Duration) -> Result<(), EngineError> {
        tokio::time::timeout(timeout, async {
            loop {
                if let Ok(Some(_)) = self.query(selector).await {
                    break;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .map_err(|_| EngineError::Timeout(format!("waiting for {}", selector)))
    }

    async fn url(&self) -> Result<String, EngineError> {
        Ok(self.page.url().await.map_err(other)?.unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, EngineError> {
        let result = self.page.evaluate(script).await.map_err(other)?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, EngineError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page.screenshot(params).await.map_err(other)
    }

    async fn content(&self) -> Result<String, EngineError> {
        self.page.content().await.map_err(other)
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.page.clone().close().await.map_err(other)
    }
}

/// Chromium 元素
pub struct ChromiumElement {
    element: Element,
    page: Page,
}

impl ChromiumElement {
    /// CDP 只支持文档级 XPath，先给元素打上临时标记再以它为锚点查询
    async fn find_xpaths(&self, expression: &str) -> Result<Vec<Element>, EngineError> {
        let marker = uuid::Uuid::new_v4().simple().to_string();
        self.element
            .call_js_fn(
                format!("function() {{ this.setAttribute('{}', '{}'); }}", SCOPE_ATTR, marker),
                false,
            )
            .await
            .map_err(other)?;

        let found = self.page.find_xpaths(scoped_xpath(&marker, expression)).await;

        if let Err(e) = self
            .element
            .call_js_fn(format!("function() {{ this.removeAttribute('{}'); }}", SCOPE_ATTR), false)
            .await
        {
            tracing::debug!("Failed to clear xpath scope marker: {}", e);
        }
        Ok(found.unwrap_or_default())
    }
}

#[async_trait]
impl QueryScope for ChromiumElement {
    async fn query(&self, selector: &SelectorSpec) -> Result<Option<Box<dyn ElementHandle>>, EngineError> {
        let found = match selector {
            SelectorSpec::Css(css) => self.element.find_element(css.as_str()).await.ok(),
            SelectorSpec::XPath(xpath) => self.find_xpaths(xpath).await?.into_iter().next(),
        };
        Ok(found.map(|element| {
            Box::new(ChromiumElement {
                element,
                page: self.page.clone(),
            }) as Box<dyn ElementHandle>
        }))
    }

    async fn query_all(&self, selector: &SelectorSpec) -> Result<Vec<Box<dyn ElementHandle>>, EngineError> {
        let found = match selector {
            SelectorSpec::Css(css) => self.element.find_elements(css.as_str()).await.unwrap_or_default(),
            SelectorSpec::XPath(xpath) => self.find_xpaths(xpath).await?,
        };
        Ok(boxed(&self.page, found))
    }
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn text(&self) -> Result<Option<String>, EngineError> {
        self.element.inner_text().await.map_err(other)
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, EngineError> {
        self.element.attribute(name).await.map_err(other)
    }

    async fn click(&self) -> Result<(), EngineError> {
        self.element.click().await.map(|_| ()).map_err(other)
    }

    async fn type_text(&self, text: &str) -> Result<(), EngineError> {
        self.element.click().await.map_err(other)?;
        self.element.type_str(text).await.map(|_| ()).map_err(other)
    }

    async fn press_key(&self, key: &str) -> Result<(), EngineError> {
        self.element.focus().await.map_err(other)?;
        self.element.press_key(key).await.map(|_| ()).map_err(other)
    }

    async fn is_visible(&self) -> Result<bool, EngineError> {
        let returns = self
            .element
            .call_js_fn(
                "function() { const r = this.getBoundingClientRect(); \
                 const s = window.getComputedStyle(this); \
                 return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }",
                false,
            )
            .await
            .map_err(other)?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}
