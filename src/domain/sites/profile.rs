// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::category::Category;
use crate::engines::traits::SelectorSpec;
use serde::{Deserialize, Serialize};

/// 单个字段的候选查询
///
/// `attribute` 为空时取元素文本，否则取对应属性值。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldQuery {
    pub selector: SelectorSpec,
    #[serde(default)]
    pub attribute: Option<String>,
}

impl FieldQuery {
    pub fn text(css: &str) -> Self {
        Self {
            selector: SelectorSpec::css(css),
            attribute: None,
        }
    }

    pub fn attr(css: &str, attribute: &str) -> Self {
        Self {
            selector: SelectorSpec::css(css),
            attribute: Some(attribute.to_string()),
        }
    }

    pub fn xpath_text(xpath: &str) -> Self {
        Self {
            selector: SelectorSpec::xpath(xpath),
            attribute: None,
        }
    }
}

/// 按语义字段组织的候选列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSelectors {
    pub name: Vec<FieldQuery>,
    #[serde(default)]
    pub url: Vec<FieldQuery>,
    #[serde(default)]
    pub sku: Vec<FieldQuery>,
    #[serde(default)]
    pub price: Vec<FieldQuery>,
    #[serde(default)]
    pub secondary_price: Vec<FieldQuery>,
    #[serde(default)]
    pub pack_size: Vec<FieldQuery>,
    #[serde(default)]
    pub image: Vec<FieldQuery>,
    #[serde(default)]
    pub description: Vec<FieldQuery>,
}

/// 商品列表定位：容器选择器 + 容器内商品选择器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLocator {
    pub container: SelectorSpec,
    pub item: SelectorSpec,
}

impl ItemLocator {
    pub fn css(container: &str, item: &str) -> Self {
        Self {
            container: SelectorSpec::css(container),
            item: SelectorSpec::css(item),
        }
    }
}

/// 翻页策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationPolicy {
    /// `?page=N` 翻页，从第 2 页开始追加
    NumberedPages {
        #[serde(default = "default_page_param")]
        param: String,
        max_pages: u32,
    },
    /// `offset` 偏移翻页，存在“下一页”入口时继续
    OffsetPages {
        #[serde(default = "default_offset_param")]
        param: String,
        page_size: u32,
        max_pages: u32,
        next_page: Vec<SelectorSpec>,
    },
    /// 反复点击“加载更多”
    LoadMore {
        button: Vec<SelectorSpec>,
        max_clicks: u32,
    },
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_offset_param() -> String {
    "offset".to_string()
}

/// 自然键策略
///
/// 决定新记录与已存储文档的匹配方式，按站点固定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NaturalKeyPolicy {
    /// `(productCode, category)`，空编码的记录会互相匹配
    CodeAndCategory,
    /// `(sku, category)`；sku 为空时退回 `(name, category)`
    SkuOrNameAndCategory,
    /// `(name, category)`
    NameAndCategory,
}

/// 登录配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginProfile {
    pub login_url: String,
    /// 当前URL包含该片段即视为仍在登录页
    pub login_path_pattern: String,
    pub email_field: Vec<SelectorSpec>,
    pub password_field: Vec<SelectorSpec>,
    /// 已知的登录按钮
    pub submit_button: SelectorSpec,
    /// 通用提交按钮候选
    pub generic_submit: Vec<SelectorSpec>,
}

/// 详情页补全配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailProfile {
    pub code: Vec<FieldQuery>,
    #[serde(default)]
    pub description: Vec<FieldQuery>,
    #[serde(default)]
    pub wait_for: Option<SelectorSpec>,
}

/// 站点配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    /// 站点标识（URL与目录中使用）
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    /// 写入记录 `source` 字段的来源标识
    pub source_tag: String,
    /// 文档集合名
    pub collection: String,
    pub categories: Vec<Category>,
    /// 列表网格出现的等待选择器
    pub grid_wait: SelectorSpec,
    pub item_locators: Vec<ItemLocator>,
    /// 所有定位方式都失败时的最后手段
    #[serde(default)]
    pub item_fallback: Option<SelectorSpec>,
    pub fields: FieldSelectors,
    pub navigation: NavigationPolicy,
    pub natural_key: NaturalKeyPolicy,
    #[serde(default)]
    pub login: Option<LoginProfile>,
    #[serde(default)]
    pub detail: Option<DetailProfile>,
}

impl SiteProfile {
    /// 按名称查找分类（精确匹配）
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }
}
