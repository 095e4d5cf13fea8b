// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 登录流程
//!
//! 打开登录页、填写凭据，然后按固定优先级尝试提交策略。每个策略执行后
//! 等待一小段时间并检查 URL，第一个让页面离开登录页的策略即视为成功。

use crate::domain::models::job::Credentials;
use crate::domain::services::selector_resolver::first_element;
use crate::domain::sites::profile::LoginProfile;
use crate::engines::traits::{EngineError, PageHandle};
use crate::infrastructure::debug_artifacts::DebugArtifacts;
use crate::utils::errors::AuthError;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

const FORM_SUBMIT_SCRIPT: &str = "(() => { const form = document.querySelector('form'); \
     if (!form) { return false; } form.submit(); return true; })()";

/// 提交策略（按优先级排列）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStrategy {
    /// 点击已知的登录按钮
    KnownButton,
    /// 脚本提交第一个表单
    FormSubmit,
    /// 扫描通用提交按钮并点击第一个可见的
    GenericButton,
    /// 在密码框中按回车
    EnterKey,
}

impl LoginStrategy {
    pub const ORDER: [LoginStrategy; 4] = [
        LoginStrategy::KnownButton,
        LoginStrategy::FormSubmit,
        LoginStrategy::GenericButton,
        LoginStrategy::EnterKey,
    ];
}

impl fmt::Display for LoginStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LoginStrategy::KnownButton => write!(f, "known-button"),
            LoginStrategy::FormSubmit => write!(f, "form-submit"),
            LoginStrategy::GenericButton => write!(f, "generic-button"),
            LoginStrategy::EnterKey => write!(f, "enter-key"),
        }
    }
}

/// 登录器
pub struct Authenticator {
    navigation_timeout: Duration,
    load_idle_timeout: Duration,
    settle: Duration,
    artifacts: Option<DebugArtifacts>,
}

impl Authenticator {
    pub fn new(navigation_timeout: Duration, load_idle_timeout: Duration, settle: Duration) -> Self {
        Self {
            navigation_timeout,
            load_idle_timeout,
            settle,
            artifacts: None,
        }
    }

    /// 失败时保存截图
    pub fn with_artifacts(mut self, artifacts: DebugArtifacts) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// 执行登录，返回生效的策略
    ///
    /// 任何失败都会先保存截图，再把错误返回给调用方。
    pub async fn login(
        &self,
        page: &dyn PageHandle,
        profile: &LoginProfile,
        credentials: &Credentials,
        site: &str,
        category: &str,
    ) -> Result<LoginStrategy, AuthError> {
        match self.run(page, profile, credentials).await {
            Ok(strategy) => {
                info!("Logged in to {} via {}", site, strategy);
                Ok(strategy)
            }
            Err(e) => {
                warn!("Login to {} failed: {}", site, e);
                if let Some(artifacts) = &self.artifacts {
                    artifacts.screenshot(page, site, category, "login-error").await;
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        page: &dyn PageHandle,
        profile: &LoginProfile,
        credentials: &Credentials,
    ) -> Result<LoginStrategy, AuthError> {
        page.goto(&profile.login_url, self.navigation_timeout)
            .await
            .map_err(AuthError::Navigation)?;
        if let Err(e) = page.wait_for_load_idle(self.load_idle_timeout).await {
            warn!("Login page did not settle: {}", e);
        }

        let email = first_element(page, &profile.email_field)
            .await
            .ok_or_else(|| AuthError::MissingField("email".to_string()))?;
        email.type_text(&credentials.email).await?;

        let password = first_element(page, &profile.password_field)
            .await
            .ok_or_else(|| AuthError::MissingField("password".to_string()))?;
        password.type_text(&credentials.password).await?;

        for strategy in LoginStrategy::ORDER {
            match self.attempt(page, profile, strategy).await {
                Ok(true) => {}
                Ok(false) => {
                    info!("Login strategy {} not applicable", strategy);
                    continue;
                }
                Err(e) => {
                    warn!("Login strategy {} failed: {}", strategy, e);
                    continue;
                }
            }

            tokio::time::sleep(self.settle).await;
            let url = page.url().await?;
            if !url.contains(&profile.login_path_pattern) {
                return Ok(strategy);
            }
            info!("Still on login page after {}", strategy);
        }

        Err(AuthError::StillOnLoginPage(page.url().await?))
    }

    /// 执行单个策略，返回是否实际执行了操作
    async fn attempt(
        &self,
        page: &dyn PageHandle,
        profile: &LoginProfile,
        strategy: LoginStrategy,
    ) -> Result<bool, EngineError> {
        match strategy {
            LoginStrategy::KnownButton => match page.query(&profile.submit_button).await? {
                Some(button) => button.click().await.map(|_| true),
                None => Ok(false),
            },
            LoginStrategy::FormSubmit => {
                let submitted = page.evaluate(FORM_SUBMIT_SCRIPT).await?;
                Ok(submitted != serde_json::Value::Bool(false))
            }
            LoginStrategy::GenericButton => {
                for selector in &profile.generic_submit {
                    for button in page.query_all(selector).await.unwrap_or_default() {
                        if button.is_visible().await.unwrap_or(false) {
                            button.click().await?;
                            return Ok(true);
                        }
                    }
                }
                Ok(false)
            }
            LoginStrategy::EnterKey => match first_element(page, &profile.password_field).await {
                Some(field) => field.press_key("Enter").await.map(|_| true),
                None => Ok(false),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::snapshot_engine::{Effect, SnapshotBrowser, SnapshotSite, Trigger};
    use crate::engines::traits::SelectorSpec;
    use crate::infrastructure::storage::InMemoryStorage;
    use std::sync::Arc;

    const LOGIN_URL: &str = "https://shop.test/customer/account/login";
    const ACCOUNT_URL: &str = "https://shop.test/customer/account";

    fn profile() -> LoginProfile {
        LoginProfile {
            login_url: LOGIN_URL.to_string(),
            login_path_pattern: "/login".to_string(),
            email_field: vec![SelectorSpec::css("#email")],
            password_field: vec![SelectorSpec::css("#pass")],
            submit_button: SelectorSpec::css("button#send2"),
            generic_submit: vec![SelectorSpec::css("button[type='submit']")],
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "buyer@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn authenticator() -> Authenticator {
        Authenticator::new(Duration::from_secs(1), Duration::from_secs(1), Duration::from_millis(1))
    }

    fn login_page(extra: &str) -> String {
        format!(
            r#"<form action="/login/post"><input id="email"><input id="pass" type="password">{}</form>"#,
            extra
        )
    }

    async fn run(browser: &SnapshotBrowser, auth: &Authenticator) -> Result<LoginStrategy, AuthError> {
        let page = browser.open_page();
        auth.login(&page, &profile(), &credentials(), "cater-choice", "Frozen").await
    }

    #[tokio::test]
    async fn test_form_submit_stops_before_later_strategies() {
        let browser = SnapshotSite::new()
            .page(LOGIN_URL, login_page(r#"<button type="submit">Sign in</button>"#))
            .page(ACCOUNT_URL, "<h1>My account</h1>")
            .on(
                Trigger::Script("form.submit()".to_string()),
                Effect::Navigate(ACCOUNT_URL.to_string()),
            )
            .into_browser();

        let strategy = run(&browser, &authenticator()).await.unwrap();

        assert_eq!(strategy, LoginStrategy::FormSubmit);
        assert_eq!(browser.count("type #email"), 1);
        assert_eq!(browser.count("type #pass"), 1);
        assert_eq!(browser.count("evaluate"), 1);
        assert_eq!(browser.count("click"), 0);
        assert_eq!(browser.count("press Enter"), 0);
    }

    #[tokio::test]
    async fn test_known_button_wins_first() {
        let browser = SnapshotSite::new()
            .page(LOGIN_URL, login_page(r#"<button id="send2">Sign in</button>"#))
            .on(
                Trigger::Click("button#send2".to_string()),
                Effect::Navigate(ACCOUNT_URL.to_string()),
            )
            .into_browser();

        assert_eq!(run(&browser, &authenticator()).await.unwrap(), LoginStrategy::KnownButton);
        assert_eq!(browser.count("evaluate"), 0);
    }

    #[tokio::test]
    async fn test_hidden_generic_buttons_are_skipped_for_enter_key() {
        let browser = SnapshotSite::new()
            .page(
                LOGIN_URL,
                login_page(r#"<button type="submit" style="display: none">Go</button>"#),
            )
            .on(Trigger::Key("Enter".to_string()), Effect::Navigate(ACCOUNT_URL.to_string()))
            .into_browser();

        assert_eq!(run(&browser, &authenticator()).await.unwrap(), LoginStrategy::EnterKey);
        assert_eq!(browser.count("click"), 0);
        assert_eq!(browser.count("press Enter #pass"), 1);
    }

    #[tokio::test]
    async fn test_exhausted_strategies_capture_screenshot() {
        let storage = Arc::new(InMemoryStorage::new());
        let auth = authenticator().with_artifacts(DebugArtifacts::new(storage.clone()));
        let browser = SnapshotSite::new().page(LOGIN_URL, login_page("")).into_browser();

        let err = run(&browser, &auth).await.unwrap_err();

        assert!(matches!(err, AuthError::StillOnLoginPage(_)));
        assert_eq!(browser.count("screenshot"), 1);
        assert!(storage.keys()[0].starts_with("debug/cater-choice/frozen/login-error-"));
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let browser = SnapshotSite::new().page(LOGIN_URL, "<p>maintenance</p>").into_browser();
        let err = run(&browser, &authenticator()).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingField(ref f) if f == "email"));
    }
}
