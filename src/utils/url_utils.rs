// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 基于站点根地址解析链接，失败时返回 `None`
///
/// `data:` 与 `javascript:` 链接不是可抓取资源，直接忽略。
pub fn absolutize(base_url: &str, path: &str) -> Option<String> {
    let path = path.trim();
    if path.is_empty() || path.starts_with("data:") || path.starts_with("javascript:") {
        return None;
    }
    let base = Url::parse(base_url).ok()?;
    resolve_url(&base, path).ok().map(|u| u.to_string())
}

/// 设置（或替换）查询参数
///
/// 同名参数只保留一个，其余参数顺序保持不变。
pub fn with_query_param(url: &str, key: &str, value: &str) -> Result<String, ParseError> {
    let mut parsed = Url::parse(url)?;
    let retained: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = parsed.query_pairs_mut();
        pairs.clear();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(key, value);
    }

    Ok(parsed.to_string())
}

/// 从URL路径中推导文件扩展名（包含点号）
///
/// 查询字符串与片段不参与计算；没有扩展名时返回 `None`。
pub fn path_extension(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let file = path.rsplit('/').next()?;
    let dot = file.rfind('.')?;
    let ext = &file[dot..];
    if ext.len() <= 1 {
        return None;
    }
    Some(ext.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_url() {
        let base = Url::parse("http://example.com/a/b").unwrap();
        let path = "http://t.co/c";
        assert_eq!(resolve_url(&base, path).unwrap().as_str(), "http://t.co/c");
    }

    #[test]
    fn test_resolve_root_relative_url() {
        let base = Url::parse("http://example.com/a/b").unwrap();
        assert_eq!(
            resolve_url(&base, "/c").unwrap().as_str(),
            "http://example.com/c"
        );
    }

    #[test]
    fn test_absolutize_skips_data_urls() {
        assert_eq!(absolutize("https://shop.test", "data:image/png;base64,AAA"), None);
        assert_eq!(absolutize("https://shop.test", "   "), None);
        assert_eq!(
            absolutize("https://shop.test/catalog/", "item/7").as_deref(),
            Some("https://shop.test/catalog/item/7")
        );
    }

    #[test]
    fn test_with_query_param_replaces_existing() {
        let url = with_query_param("https://shop.test/c?sort=asc&page=1", "page", "3").unwrap();
        assert_eq!(url, "https://shop.test/c?sort=asc&page=3");

        let url = with_query_param("https://shop.test/c", "offset", "60").unwrap();
        assert_eq!(url, "https://shop.test/c?offset=60");
    }

    #[test]
    fn test_path_extension() {
        assert_eq!(
            path_extension("https://cdn.test/a/b/photo.PNG?w=300").as_deref(),
            Some(".png")
        );
        assert_eq!(path_extension("https://cdn.test/a/b/photo"), None);
        assert_eq!(path_extension("https://cdn.test/a.b/photo"), None);
    }
}
