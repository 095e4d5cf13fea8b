// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::category::CategoryTarget;
use crate::domain::models::job::{Credentials, JobOptions};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

static OUTPUT_FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,127}\.json$").expect("valid file name regex"));

/// 抓取任务请求
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "credentials_pair"))]
pub struct ScrapeJobRequestDto {
    /// 分类名称，缺省或 `all` 表示全部分类
    #[validate(length(min = 1, max = 200))]
    pub category: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "password cannot be empty"))]
    pub password: Option<String>,
    pub headless: Option<bool>,
    pub download_images: Option<bool>,
    pub persist_to_store: Option<bool>,
    #[validate(regex(path = *OUTPUT_FILE_NAME, message = "invalid output file name"))]
    pub output_file_name: Option<String>,
}

fn credentials_pair(dto: &ScrapeJobRequestDto) -> Result<(), ValidationError> {
    if dto.email.is_some() != dto.password.is_some() {
        let mut error = ValidationError::new("credentials");
        error.message = Some("email and password are required together".into());
        return Err(error);
    }
    Ok(())
}

impl ScrapeJobRequestDto {
    /// 转换为抓取目标与任务选项
    pub fn into_job(self, site: &str, default_headless: bool) -> (CategoryTarget, JobOptions) {
        let target = CategoryTarget::from_option(self.category.as_deref());
        let credentials = match (self.email, self.password) {
            (Some(email), Some(password)) => Some(Credentials { email, password }),
            _ => None,
        };
        let defaults = JobOptions::default();
        let options = JobOptions {
            credentials,
            headless: self.headless.unwrap_or(default_headless),
            download_images: self.download_images.unwrap_or(defaults.download_images),
            persist_to_store: self.persist_to_store.unwrap_or(defaults.persist_to_store),
            output_file_name: self
                .output_file_name
                .unwrap_or_else(|| format!("{}-products.json", site)),
        };
        (target, options)
    }
}
