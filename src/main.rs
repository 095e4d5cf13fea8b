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

use catalogrs::application::use_cases::scrape_job::{RunnerSettings, ScrapeJobRunner};
use catalogrs::config::settings::Settings;
use catalogrs::domain::services::run_lock::RunLock;
use catalogrs::domain::sites::SiteRegistry;
use catalogrs::engines::chromium_engine::ChromiumLauncher;
use catalogrs::infrastructure::document_store::sea_orm_store::SeaOrmDocumentStore;
use catalogrs::infrastructure::storage::LocalStorage;
use catalogrs::presentation::routes;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use catalogrs::utils::telemetry;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting catalogrs...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    // 3. Site profiles (built-in, optionally overridden from disk)
    let registry = SiteRegistry::load(settings.sites.profile_dir.as_deref())?;
    info!(
        sites = registry.profiles().len(),
        "Site profiles loaded"
    );

    // 4. Browser, document store and file storage
    let launcher = ChromiumLauncher::new(
        settings.browser.remote_debugging_url.clone(),
        settings.browser.navigation_timeout(),
        settings.browser.viewport(),
    );
    let store = SeaOrmDocumentStore::new(settings.database.clone());
    let storage = LocalStorage::new(settings.storage.local_path.clone());

    let runner = ScrapeJobRunner::new(
        Arc::new(registry),
        Arc::new(launcher),
        Arc::new(store),
        Arc::new(storage),
        RunLock::new(),
        RunnerSettings::from(&settings),
    )?;

    // 5. HTTP server
    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app = routes::app(Arc::new(runner), Arc::new(settings));

    info!("Listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
