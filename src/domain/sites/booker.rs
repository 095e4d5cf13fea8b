// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::category::Category;
use crate::domain::sites::profile::{
    FieldQuery, FieldSelectors, ItemLocator, NaturalKeyPolicy, NavigationPolicy, SiteProfile,
};
use crate::engines::traits::SelectorSpec;

const BASE_URL: &str = "https://www.booker.co.uk";

/// Booker：单页“加载更多”
pub fn profile() -> SiteProfile {
    let category = |name: &str, path: &str| Category::new(name, format!("{}{}", BASE_URL, path));

    SiteProfile {
        id: "booker".to_string(),
        display_name: "Booker".to_string(),
        base_url: BASE_URL.to_string(),
        source_tag: "booker".to_string(),
        collection: "booker_products".to_string(),
        categories: vec![
            category("Confectionery", "/products/confectionery"),
            category("Soft Drinks", "/products/soft-drinks"),
            category("Catering Supplies", "/products/catering-supplies"),
        ],
        grid_wait: SelectorSpec::css(".product-list"),
        item_locators: vec![
            ItemLocator::css(".product-list", ".product-list-item"),
            ItemLocator::css(".search-results", ".product"),
        ],
        item_fallback: Some(SelectorSpec::xpath("//div[contains(@class,'product-tile')]")),
        fields: FieldSelectors {
            name: vec![
                FieldQuery::text(".product-name"),
                FieldQuery::text("h4 a"),
                FieldQuery::attr("img", "alt"),
            ],
            url: vec![
                FieldQuery::attr(".product-name a", "href"),
                FieldQuery::attr("h4 a", "href"),
            ],
            sku: vec![FieldQuery::text(".product-code")],
            price: vec![
                FieldQuery::text(".product-price .wsp"),
                FieldQuery::text(".product-price"),
            ],
            secondary_price: vec![FieldQuery::text(".product-price .rrp")],
            pack_size: vec![FieldQuery::text(".product-pack")],
            image: vec![
                FieldQuery::attr(".product-image img", "src"),
                FieldQuery::attr("img", "data-src"),
            ],
            ..FieldSelectors::default()
        },
        navigation: NavigationPolicy::LoadMore {
            button: vec![
                SelectorSpec::css("button.load-more"),
                SelectorSpec::css(".load-more button"),
                SelectorSpec::css("a.load-more"),
            ],
            max_clicks: 20,
        },
        natural_key: NaturalKeyPolicy::NameAndCategory,
        login: None,
        detail: None,
    }
}
