// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 商品名称占位符，解析到该值视为未解析
pub const PLACEHOLDER_NAME: &str = "Unknown Product";

/// 判断名称是否可用（非空且不是占位符）
pub fn is_usable_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(PLACEHOLDER_NAME)
}

/// 抓取到的商品记录
///
/// 三个站点的记录结构相近，差异字段均为可选。记录在列表页提取时创建，
/// 可能经过一次详情页补全，之后交给持久化协调器，不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// 记录唯一标识符
    pub id: Uuid,
    /// 商品名称
    pub name: String,
    /// 商品编码（详情页补全）
    pub product_code: Option<String>,
    /// SKU
    pub sku: Option<String>,
    /// 商品描述
    pub description: Option<String>,
    /// 规格/包装
    pub pack_size: Option<String>,
    /// 价格
    pub price: Option<String>,
    /// 第二价格（如单价、含税价）
    pub secondary_price: Option<String>,
    /// 详情页URL
    pub product_url: Option<String>,
    /// 图片源URL
    pub image_url: Option<String>,
    /// 本地图片文件名
    pub image_file_name: Option<String>,
    /// 本地图片路径
    pub image_path: Option<String>,
    /// 所属分类
    pub category: String,
    /// 来源站点标识
    pub source: String,
    /// 是否需要进一步补全
    pub needs_enrichment: bool,
    /// 抓取时间
    pub scraped_at: DateTime<Utc>,
}

impl ProductRecord {
    /// 创建一条新记录，仅填写身份与来源字段
    pub fn new(name: impl Into<String>, category: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            product_code: None,
            sku: None,
            description: None,
            pack_size: None,
            price: None,
            secondary_price: None,
            product_url: None,
            image_url: None,
            image_file_name: None,
            image_path: None,
            category: category.into(),
            source: source.into(),
            needs_enrichment: false,
            scraped_at: Utc::now(),
        }
    }
}
