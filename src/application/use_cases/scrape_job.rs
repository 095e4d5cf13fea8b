// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 抓取任务编排
//!
//! 获取运行锁后按顺序处理分类：遍历、提取、合并入库、累计统计。
//! 单个分类的失败被记录为统计错误，不会中止整个任务。最后写出合并的
//! 输出文件；运行锁在任何退出路径上都会释放。

use crate::config::settings::Settings;
use crate::domain::models::category::{Category, CategoryTarget};
use crate::domain::models::job::{JobOptions, JobResult, JobStatus, OutputDocument, OutputMetadata};
use crate::domain::models::product::ProductRecord;
use crate::domain::models::statistics::RunStatistics;
use crate::domain::repositories::document_store::DocumentStore;
use crate::domain::repositories::storage_repository::{StorageError, StorageRepository};
use crate::domain::services::authenticator::Authenticator;
use crate::domain::services::detail_enricher::DetailEnricher;
use crate::domain::services::image_fetcher::ImageFetcher;
use crate::domain::services::page_extractor::{ExtractionScope, PageExtractor};
use crate::domain::services::reconciler::Reconciler;
use crate::domain::services::run_lock::RunLock;
use crate::domain::services::site_navigator::SiteNavigator;
use crate::domain::sites::profile::SiteProfile;
use crate::domain::sites::SiteRegistry;
use crate::engines::traits::{BrowserContext, BrowserHandle, BrowserLauncher, EngineError, PageHandle, Viewport};
use crate::infrastructure::debug_artifacts::DebugArtifacts;
use crate::infrastructure::output_writer::OutputWriter;
use crate::utils::errors::CrawlError;
use crate::utils::retry_policy::RetryPolicy;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, instrument, warn, Instrument};

/// 任务级错误
#[derive(Error, Debug)]
pub enum JobError {
    #[error("已有任务正在运行: {current}")]
    Conflict { current: String },

    #[error("未知站点: {0}")]
    UnknownSite(String),

    #[error("站点 {site} 没有分类 {category}")]
    UnknownCategory { site: String, category: String },

    #[error("浏览器错误: {0}")]
    Engine(#[from] EngineError),

    #[error("写入输出文件失败: {0}")]
    Output(#[from] StorageError),

    #[error("初始化失败: {0}")]
    Setup(String),

    #[error("任务异常中止: {0}")]
    Interrupted(String),
}

/// 编排器运行参数
#[derive(Debug, Clone)]
pub struct RunnerSettings {
    pub viewport: Viewport,
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    pub load_idle_timeout: Duration,
    pub login_settle: Duration,
    pub detail_retry: RetryPolicy,
    pub image_timeout: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            navigation_timeout: Duration::from_secs(60),
            selector_timeout: Duration::from_secs(15),
            load_idle_timeout: Duration::from_secs(30),
            login_settle: Duration::from_secs(3),
            detail_retry: RetryPolicy::default(),
            image_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&Settings> for RunnerSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            viewport: settings.browser.viewport(),
            navigation_timeout: settings.browser.navigation_timeout(),
            selector_timeout: settings.browser.selector_timeout(),
            load_idle_timeout: settings.crawl.load_idle_timeout(),
            login_settle: settings.crawl.login_settle(),
            detail_retry: settings.crawl.detail_retry(),
            image_timeout: settings.crawl.image_timeout(),
        }
    }
}

/// 抓取任务编排器
pub struct ScrapeJobRunner {
    registry: Arc<SiteRegistry>,
    launcher: Arc<dyn BrowserLauncher>,
    /// 外部提供的浏览器不归本任务所有，结束时不关闭
    shared_browser: Option<Arc<dyn BrowserHandle>>,
    store: Arc<dyn DocumentStore>,
    run_lock: RunLock,
    viewport: Viewport,
    navigator: SiteNavigator,
    authenticator: Authenticator,
    reconciler: Reconciler,
    artifacts: DebugArtifacts,
    output: OutputWriter,
    settings: RunnerSettings,
}

impl ScrapeJobRunner {
    pub fn new(
        registry: Arc<SiteRegistry>,
        launcher: Arc<dyn BrowserLauncher>,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn StorageRepository>,
        run_lock: RunLock,
        settings: RunnerSettings,
    ) -> Result<Self, JobError> {
        let artifacts = DebugArtifacts::new(storage.clone());
        let images = ImageFetcher::new(storage.clone(), settings.image_timeout)
            .map_err(|e| JobError::Setup(e.to_string()))?;
        let enricher = Arc::new(DetailEnricher::new(
            settings.navigation_timeout,
            settings.selector_timeout,
            settings.detail_retry.clone(),
        ));

        let extractor = Arc::new(
            PageExtractor::new(settings.selector_timeout)
                .with_images(Arc::new(images))
                .with_enricher(enricher)
                .with_artifacts(artifacts.clone()),
        );
        let navigator = SiteNavigator::new(
            extractor,
            settings.navigation_timeout,
            settings.load_idle_timeout,
        );
        let authenticator = Authenticator::new(
            settings.navigation_timeout,
            settings.load_idle_timeout,
            settings.login_settle,
        )
        .with_artifacts(artifacts.clone());

        Ok(Self {
            registry,
            launcher,
            shared_browser: None,
            reconciler: Reconciler::new(store.clone()),
            store,
            run_lock,
            viewport: settings.viewport,
            navigator,
            authenticator,
            artifacts,
            output: OutputWriter::new(storage),
            settings,
        })
    }

    /// 使用外部提供的浏览器（任务结束时不关闭）
    pub fn with_shared_browser(mut self, browser: Arc<dyn BrowserHandle>) -> Self {
        self.shared_browser = Some(browser);
        self
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    pub fn run_lock(&self) -> &RunLock {
        &self.run_lock
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// 执行一次站点抓取
    ///
    /// 单分类与全量任务返回同样的结果结构。未知分类在加锁前即失败。
    #[instrument(skip(self, options), fields(headless = options.headless))]
    pub async fn run(&self, site: &str, target: CategoryTarget, options: JobOptions) -> Result<JobResult, JobError> {
        let profile = self
            .registry
            .get(site)
            .map_err(|_| JobError::UnknownSite(site.to_string()))?;
        let (categories, label) = match &target {
            CategoryTarget::All => (profile.categories.clone(), "all".to_string()),
            CategoryTarget::Named(name) => {
                let category = profile.category(name).cloned().ok_or_else(|| JobError::UnknownCategory {
                    site: site.to_string(),
                    category: name.clone(),
                })?;
                (vec![category], name.clone())
            }
        };

        let job_name = format!("{}:{}", profile.id, label);
        let _guard = self
            .run_lock
            .try_start(&job_name)
            .map_err(|current| JobError::Conflict { current })?;
        info!("Starting job {} over {} categories", job_name, categories.len());
        let started = Instant::now();

        let mut degraded = false;
        if options.persist_to_store {
            if let Err(e) = self.store.connect().await {
                warn!("Document store unavailable, continuing without persistence: {}", e);
                degraded = true;
            }
        }
        let persisting = options.persist_to_store && !degraded;

        let crawled = self.crawl(profile, &categories, &options, persisting).await;

        if persisting {
            if let Err(e) = self.store.disconnect().await {
                warn!("Failed to disconnect document store: {}", e);
            }
        }

        let (records, mut statistics) = crawled.inspect_err(|e| error!("Job {} failed: {}", job_name, e))?;
        statistics.finish(started.elapsed());

        let document = OutputDocument {
            metadata: OutputMetadata {
                site: profile.id.clone(),
                total_records: records.len(),
                timestamp: Utc::now(),
                images_enabled: options.download_images,
                persistence_enabled: options.persist_to_store,
                persistence_degraded: degraded,
                statistics: statistics.clone(),
                categories: statistics.categories_processed.clone(),
            },
            records,
        };
        let output_file_path = self.output.write(&options.output_file_name, &document).await?;

        let status = if statistics.errors > 0 || degraded {
            JobStatus::CompletedWithErrors
        } else {
            JobStatus::Completed
        };
        info!(
            "Job {} finished: {} records, {} errors in {:.1}s",
            job_name,
            document.records.len(),
            statistics.errors,
            statistics.elapsed_seconds
        );

        Ok(JobResult {
            status,
            site: profile.id.clone(),
            total_records: document.records.len(),
            statistics,
            output_file_path: Some(output_file_path),
            persistence_degraded: degraded,
            records: document.records,
        })
    }

    /// 在独立任务中运行，调用方被取消时任务仍会走完清理路径
    pub async fn run_detached(
        self: Arc<Self>,
        site: String,
        target: CategoryTarget,
        options: JobOptions,
    ) -> Result<JobResult, JobError> {
        let job = tokio::spawn(async move { self.run(&site, target, options).await }.in_current_span());
        job.await.map_err(|e| JobError::Interrupted(e.to_string()))?
    }

    /// 获取浏览器与上下文，逐个分类抓取，结束时按所有权释放资源
    async fn crawl(
        &self,
        profile: &SiteProfile,
        categories: &[Category],
        options: &JobOptions,
        persisting: bool,
    ) -> Result<(Vec<ProductRecord>, RunStatistics), JobError> {
        let (browser, owned) = match &self.shared_browser {
            Some(browser) => (browser.clone(), false),
            None => {
                let launched = self.launcher.launch(options.headless).await?;
                if !launched.owned {
                    info!("Using an externally managed browser, it will be left open");
                }
                (launched.handle, launched.owned)
            }
        };

        let result = match browser.new_context(self.viewport).await {
            Ok(context) => {
                let result = self
                    .crawl_in_context(context.as_ref(), profile, categories, options, persisting)
                    .await;
                if let Err(e) = context.close().await {
                    warn!("Failed to close browser context: {}", e);
                }
                result
            }
            Err(e) => Err(JobError::Engine(e)),
        };

        if owned {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
        }
        result
    }

    async fn crawl_in_context(
        &self,
        context: &dyn BrowserContext,
        profile: &SiteProfile,
        categories: &[Category],
        options: &JobOptions,
        persisting: bool,
    ) -> Result<(Vec<ProductRecord>, RunStatistics), JobError> {
        let page = context.new_page().await?;
        let mut statistics = RunStatistics::default();
        let mut records = Vec::new();
        let mut logged_in = false;

        for category in categories {
            // Each category gets its own copy of the options
            let category_options = options.clone();
            match self
                .crawl_category(page.as_ref(), context, profile, category, &category_options, &mut logged_in)
                .await
            {
                Ok(batch) => {
                    statistics.total_processed += batch.len() as u64;
                    if persisting {
                        let summary = self
                            .reconciler
                            .upsert(&profile.collection, profile.natural_key, &batch)
                            .await;
                        info!(
                            "{}: {} new, {} updated, {} unchanged, {} errors",
                            category.name, summary.new, summary.updated, summary.unchanged, summary.errors
                        );
                        statistics.absorb(&summary);
                    }
                    records.extend(batch);
                }
                Err(e) => {
                    error!("Category {} failed: {}", category.name, e);
                    self.artifacts
                        .screenshot(page.as_ref(), &profile.id, &category.name, "category-error")
                        .await;
                    statistics.record_error();
                }
            }
            statistics.categories_processed.push(category.name.clone());
        }

        if let Err(e) = page.close().await {
            warn!("Failed to close page: {}", e);
        }
        Ok((records, statistics))
    }

    #[instrument(skip_all, fields(category = %category.name))]
    async fn crawl_category(
        &self,
        page: &dyn PageHandle,
        context: &dyn BrowserContext,
        profile: &SiteProfile,
        category: &Category,
        options: &JobOptions,
        logged_in: &mut bool,
    ) -> Result<Vec<ProductRecord>, CrawlError> {
        if let (Some(login), Some(credentials), false) = (&profile.login, &options.credentials, *logged_in) {
            self.authenticator
                .login(page, login, credentials, &profile.id, &category.name)
                .await?;
            *logged_in = true;
        }

        let scope = ExtractionScope {
            profile,
            category: &category.name,
            download_images: options.download_images,
            context,
        };
        self.navigator.crawl(page, category, &scope).await
    }
}
