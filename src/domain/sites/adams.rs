// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::category::Category;
use crate::domain::sites::profile::{
    FieldQuery, FieldSelectors, ItemLocator, NaturalKeyPolicy, NavigationPolicy, SiteProfile,
};
use crate::engines::traits::SelectorSpec;

const BASE_URL: &str = "https://www.adamsfoodservice.co.uk";

/// Adams：偏移翻页，每页 60 条
pub fn profile() -> SiteProfile {
    let category = |name: &str, path: &str| Category::new(name, format!("{}{}", BASE_URL, path));

    SiteProfile {
        id: "adams".to_string(),
        display_name: "Adams Foodservice".to_string(),
        base_url: BASE_URL.to_string(),
        source_tag: "adams".to_string(),
        collection: "adams_products".to_string(),
        categories: vec![
            category("Bakery", "/collections/bakery"),
            category("Dairy", "/collections/dairy"),
            category("Meat & Poultry", "/collections/meat-poultry"),
            category("Fruit & Veg", "/collections/fruit-veg"),
            category("Dry Goods", "/collections/dry-goods"),
        ],
        grid_wait: SelectorSpec::css(".product-grid"),
        item_locators: vec![
            ItemLocator::css(".product-grid", ".product-card"),
            ItemLocator::css(".collection-products", ".grid__item"),
            ItemLocator::css("main", "[data-product-id]"),
        ],
        item_fallback: Some(SelectorSpec::xpath("//div[@data-product-id]")),
        fields: FieldSelectors {
            name: vec![
                FieldQuery::text(".product-card__title"),
                FieldQuery::text(".card__heading a"),
                FieldQuery::attr("[data-product-title]", "data-product-title"),
            ],
            url: vec![
                FieldQuery::attr("a.product-card__link", "href"),
                FieldQuery::attr(".card__heading a", "href"),
            ],
            sku: vec![
                FieldQuery::text(".product-card__sku"),
                FieldQuery::attr("[data-sku]", "data-sku"),
            ],
            price: vec![
                FieldQuery::text(".price__sale .price-item"),
                FieldQuery::text(".product-card__price"),
                FieldQuery::text(".price-item--regular"),
            ],
            secondary_price: vec![FieldQuery::text(".product-card__unit-price")],
            pack_size: vec![
                FieldQuery::text(".product-card__pack"),
                FieldQuery::text(".product-card__size"),
            ],
            image: vec![
                FieldQuery::attr(".product-card__image img", "src"),
                FieldQuery::attr(".product-card__image img", "data-src"),
                FieldQuery::attr("img", "src"),
            ],
            description: vec![FieldQuery::text(".product-card__description")],
        },
        navigation: NavigationPolicy::OffsetPages {
            param: "offset".to_string(),
            page_size: 60,
            max_pages: 50,
            next_page: vec![
                SelectorSpec::css("a.pagination__next"),
                SelectorSpec::css(".pagination .next a"),
                SelectorSpec::css("a[rel='next']"),
            ],
        },
        natural_key: NaturalKeyPolicy::SkuOrNameAndCategory,
        login: None,
        detail: None,
    }
}
