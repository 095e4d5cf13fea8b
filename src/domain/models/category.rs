// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 商品分类
///
/// 一个列表页入口，由站点配置静态提供。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// 分类名称
    pub name: String,
    /// 列表页URL
    pub url: String,
}

impl Category {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// 抓取目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryTarget {
    /// 站点配置的全部分类
    All,
    /// 指定名称的单个分类
    Named(String),
}

impl CategoryTarget {
    /// 从可选分类名构造，`None` 或 `"all"` 表示全部
    pub fn from_option(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            None | Some("") => CategoryTarget::All,
            Some(n) if n.eq_ignore_ascii_case("all") => CategoryTarget::All,
            Some(n) => CategoryTarget::Named(n.to_string()),
        }
    }
}
