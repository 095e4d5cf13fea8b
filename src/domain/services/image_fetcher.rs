// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::storage_repository::StorageRepository;
use crate::utils::url_utils::path_extension;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_EXTENSION: &str = ".jpg";
const MAX_EXTENSION_LEN: usize = 5;

/// 已下载的图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedImage {
    pub file_name: String,
    pub path: String,
}

/// 图片下载器
pub struct ImageFetcher {
    client: reqwest::Client,
    storage: Arc<dyn StorageRepository>,
}

impl ImageFetcher {
    pub fn new(storage: Arc<dyn StorageRepository>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; catalogrs/0.1)")
            .timeout(timeout)
            .build()?;
        Ok(Self { client, storage })
    }

    /// 下载图片到 `{dest_folder}/{content_hash}{ext}`
    ///
    /// 响应非 2xx 或内容类型不是 `image/*` 时返回 `None`，不写文件。
    /// 同名文件直接覆盖。
    pub async fn download(&self, url: &str, content_hash: &str, dest_folder: &str) -> Option<DownloadedImage> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Image request failed for {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Image request for {} returned {}", url, response.status());
            return None;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("image") {
            warn!("Skipping {}: content-type '{}' is not an image", url, content_type);
            return None;
        }

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read image body from {}: {}", url, e);
                return None;
            }
        };

        let file_name = format!("{}{}", content_hash, image_extension(url));
        let key = format!("{}/{}", dest_folder.trim_end_matches('/'), file_name);
        if let Err(e) = self.storage.save(&key, &bytes).await {
            warn!("Failed to store image {}: {}", key, e);
            return None;
        }

        debug!("Stored image {} ({} bytes)", key, bytes.len());
        Some(DownloadedImage {
            file_name,
            path: self.storage.locate(&key),
        })
    }
}

/// 从 URL 路径推导扩展名，缺失或过长时使用 `.jpg`
pub fn image_extension(url: &str) -> String {
    match path_extension(url) {
        Some(ext) if ext.len() > 1 && ext.len() <= MAX_EXTENSION_LEN => ext,
        _ => DEFAULT_EXTENSION.to_string(),
    }
}
