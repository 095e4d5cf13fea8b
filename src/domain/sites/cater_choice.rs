// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::category::Category;
use crate::domain::sites::profile::{
    DetailProfile, FieldQuery, FieldSelectors, ItemLocator, LoginProfile, NaturalKeyPolicy,
    NavigationPolicy, SiteProfile,
};
use crate::engines::traits::SelectorSpec;

const BASE_URL: &str = "https://www.cater-choice.com";

/// Cater Choice：需要登录才显示价格，编码只在详情页出现
pub fn profile() -> SiteProfile {
    let category = |name: &str, path: &str| Category::new(name, format!("{}{}", BASE_URL, path));

    SiteProfile {
        id: "cater-choice".to_string(),
        display_name: "Cater Choice".to_string(),
        base_url: BASE_URL.to_string(),
        source_tag: "cater-choice".to_string(),
        collection: "cater_choice_products".to_string(),
        categories: vec![
            category("Ambient", "/ambient"),
            category("Chilled", "/chilled"),
            category("Frozen", "/frozen"),
            category("Drinks", "/drinks"),
            category("Non Food", "/non-food"),
        ],
        grid_wait: SelectorSpec::css(".products-grid, .products.list"),
        item_locators: vec![
            ItemLocator::css(".products-grid", "li.product-item"),
            ItemLocator::css(".products.list", ".product-item"),
            ItemLocator::css("#product-list", ".product"),
        ],
        item_fallback: Some(SelectorSpec::xpath(
            "//li[contains(concat(' ', normalize-space(@class), ' '), ' product-item ')]",
        )),
        fields: FieldSelectors {
            name: vec![
                FieldQuery::text(".product-item-link"),
                FieldQuery::text(".product-item-name a"),
                FieldQuery::text("h2.product-name"),
                FieldQuery::attr("img.product-image-photo", "alt"),
            ],
            url: vec![
                FieldQuery::attr(".product-item-link", "href"),
                FieldQuery::attr("a.product-item-photo", "href"),
                FieldQuery::attr("a", "href"),
            ],
            price: vec![
                FieldQuery::text(".price-excluding-tax .price"),
                FieldQuery::text(".price-wrapper .price"),
                FieldQuery::text(".price"),
            ],
            secondary_price: vec![FieldQuery::text(".price-including-tax .price")],
            pack_size: vec![
                FieldQuery::text(".product-pack-size"),
                FieldQuery::text(".pack-size"),
                FieldQuery::text(".product-item-size"),
            ],
            image: vec![
                FieldQuery::attr("img.product-image-photo", "src"),
                FieldQuery::attr("img.product-image-photo", "data-src"),
                FieldQuery::attr("img", "src"),
            ],
            ..FieldSelectors::default()
        },
        navigation: NavigationPolicy::NumberedPages {
            param: "page".to_string(),
            max_pages: 30,
        },
        natural_key: NaturalKeyPolicy::CodeAndCategory,
        login: Some(LoginProfile {
            login_url: format!("{}/customer/account/login", BASE_URL),
            login_path_pattern: "/login".to_string(),
            email_field: vec![
                SelectorSpec::css("#email"),
                SelectorSpec::css("input[name='login[username]']"),
                SelectorSpec::css("input[type='email']"),
            ],
            password_field: vec![
                SelectorSpec::css("#pass"),
                SelectorSpec::css("input[name='login[password]']"),
                SelectorSpec::css("input[type='password']"),
            ],
            submit_button: SelectorSpec::css("button#send2"),
            generic_submit: vec![
                SelectorSpec::css("button[type='submit']"),
                SelectorSpec::css("input[type='submit']"),
                SelectorSpec::css("button.action.login"),
                SelectorSpec::css(".login-button"),
            ],
        }),
        detail: Some(DetailProfile {
            code: vec![
                FieldQuery::text(".product-code .value"),
                FieldQuery::text("[itemprop='sku']"),
                FieldQuery::text(".sku .value"),
            ],
            description: vec![
                FieldQuery::text("#description .value"),
                FieldQuery::text(".product.attribute.description"),
                FieldQuery::attr("meta[name='description']", "content"),
            ],
            wait_for: Some(SelectorSpec::css(".product-info-main")),
        }),
    }
}
