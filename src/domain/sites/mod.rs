// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 站点配置
//!
//! 分类、选择器、翻页策略与自然键都以数据表达。内置三套配置，
//! 可以通过 `{profile_dir}/{site}.yaml` 整体覆盖。

pub mod adams;
pub mod booker;
pub mod cater_choice;
pub mod profile;

use crate::utils::errors::ProfileError;
use profile::SiteProfile;
use std::path::Path;
use tracing::info;

/// 内置站点配置
pub fn builtin_profiles() -> Vec<SiteProfile> {
    vec![cater_choice::profile(), adams::profile(), booker::profile()]
}

/// 站点注册表
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    profiles: Vec<SiteProfile>,
}

impl SiteRegistry {
    pub fn new(profiles: Vec<SiteProfile>) -> Self {
        Self { profiles }
    }

    /// 加载内置配置，并用目录中的 YAML 文件覆盖同名站点
    pub fn load(profile_dir: Option<&Path>) -> Result<Self, ProfileError> {
        let mut profiles = builtin_profiles();

        if let Some(dir) = profile_dir {
            for profile in profiles.iter_mut() {
                let path = dir.join(format!("{}.yaml", profile.id));
                if !path.exists() {
                    continue;
                }
                let raw = std::fs::read_to_string(&path)?;
                let loaded: SiteProfile = serde_yaml::from_str(&raw)?;
                if loaded.id != profile.id {
                    return Err(ProfileError::IdMismatch {
                        path: path.display().to_string(),
                        expected: profile.id.clone(),
                        found: loaded.id,
                    });
                }
                *profile = loaded;
                info!("Loaded site profile override from {}", path.display());
            }
        }

        Ok(Self { profiles })
    }

    pub fn get(&self, id: &str) -> Result<&SiteProfile, ProfileError> {
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| ProfileError::UnknownSite(id.to_string()))
    }

    pub fn profiles(&self) -> &[SiteProfile] {
        &self.profiles
    }
}
