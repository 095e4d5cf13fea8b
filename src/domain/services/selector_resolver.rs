// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 选择器解析器
//!
//! 按顺序尝试候选选择器，第一个产出非空值的候选胜出，后续候选不再执行。
//! 单个候选的失败（非法选择器、无匹配、元素异常）都被吞掉，视为“尝试下一个”。

use crate::domain::sites::profile::FieldQuery;
use crate::engines::traits::{ElementHandle, QueryScope, SelectorSpec};
use crate::utils::text::normalize_whitespace;
use tracing::debug;

/// 在查询范围内按顺序解析字段值
///
/// `attribute` 为 `None` 时读取元素文本，否则读取属性值。
/// 所有候选都失败时返回 `None`，由调用方决定是否致命。
pub async fn resolve<S: QueryScope + ?Sized>(
    scope: &S,
    candidates: &[SelectorSpec],
    attribute: Option<&str>,
) -> Option<String> {
    for selector in candidates {
        if let Some(value) = try_candidate(scope, selector, attribute).await {
            return Some(value);
        }
    }
    None
}

/// 按字段查询列表解析（每个候选自带属性配置）
pub async fn resolve_field<S: QueryScope + ?Sized>(scope: &S, queries: &[FieldQuery]) -> Option<String> {
    for query in queries {
        if let Some(value) = try_candidate(scope, &query.selector, query.attribute.as_deref()).await {
            return Some(value);
        }
    }
    None
}

/// 返回第一个匹配到元素的候选（不读取值）
pub async fn first_element<S: QueryScope + ?Sized>(
    scope: &S,
    candidates: &[SelectorSpec],
) -> Option<Box<dyn ElementHandle>> {
    for selector in candidates {
        match scope.query(selector).await {
            Ok(Some(element)) => return Some(element),
            Ok(None) => debug!("No element for {}", selector),
            Err(e) => debug!("Selector {} failed: {}", selector, e),
        }
    }
    None
}

async fn try_candidate<S: QueryScope + ?Sized>(
    scope: &S,
    selector: &SelectorSpec,
    attribute: Option<&str>,
) -> Option<String> {
    let element = match scope.query(selector).await {
        Ok(Some(element)) => element,
        Ok(None) => {
            debug!("No element for {}", selector);
            return None;
        }
        Err(e) => {
            debug!("Selector {} failed: {}", selector, e);
            return None;
        }
    };

    let raw = match attribute {
        Some(name) => element.attribute(name).await,
        None => element.text().await,
    };

    match raw {
        Ok(Some(value)) => {
            let value = normalize_whitespace(&value);
            (!value.is_empty()).then_some(value)
        }
        Ok(None) => None,
        Err(e) => {
            debug!("Reading {} failed: {}", selector, e);
            None
        }
    }
}
