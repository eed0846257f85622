//! Shopper-facing menu and banner reads, and the home screen view model.

use serde::Serialize;
use tracing::{error, trace};

use crate::api::{Query, Table, TableClient};
use crate::cart::{Cart, CartBar};
use crate::models::{decode_rows_lenient, Category, HeroBanner, MenuItem};

/// Items shown in the recommended strip.
pub const RECOMMENDED_LIMIT: usize = 4;

/// Available items, recommended first. Failures are logged and read as an
/// empty menu.
pub async fn load_available_items<C: TableClient>(client: &C) -> Vec<MenuItem> {
    let query = Query::table(Table::MenuItems)
        .eq("is_available", true)
        .order("is_recommended", false);
    let rows = match client.select(&query).await {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "menu load failed");
            return vec![];
        }
    };
    let items: Vec<MenuItem> = decode_rows_lenient(Table::MenuItems.as_str(), rows);
    trace!(count = items.len(), "menu loaded");
    items
}

/// Active banners in display order. Failures read as no banners.
pub async fn load_active_banners<C: TableClient>(client: &C) -> Vec<HeroBanner> {
    let query = Query::table(Table::HeroBanners)
        .eq("is_active", true)
        .order("order", true);
    let rows = match client.select(&query).await {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, "hero banner load failed");
            return vec![];
        }
    };
    decode_rows_lenient(Table::HeroBanners.as_str(), rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryChip {
    pub label: &'static str,
    pub icon: Option<&'static str>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuCard {
    #[serde(flatten)]
    pub item: MenuItem,
    pub icon: &'static str,
    pub quantity_in_cart: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub categories: Vec<CategoryChip>,
    pub section_title: String,
    pub recommended: Vec<MenuCard>,
    pub items: Vec<MenuCard>,
    pub banners: Vec<HeroBanner>,
    pub cart_badge: u32,
    pub cart_bar: Option<CartBar>,
}

fn card(item: &MenuItem, cart: &Cart) -> MenuCard {
    MenuCard {
        item: item.clone(),
        icon: item.category.icon(),
        quantity_in_cart: cart.quantity_of(&item.id),
    }
}

/// Build the home screen from loaded data. `selected` of `None` is "All".
pub fn home_view(
    items: &[MenuItem],
    banners: Vec<HeroBanner>,
    selected: Option<Category>,
    cart: &Cart,
) -> HomeView {
    let mut categories = vec![CategoryChip {
        label: "All",
        icon: None,
        selected: selected.is_none(),
    }];
    categories.extend(Category::ALL.into_iter().map(|c| CategoryChip {
        label: c.as_str(),
        icon: Some(c.icon()),
        selected: selected == Some(c),
    }));

    let recommended = if selected.is_none() {
        items
            .iter()
            .filter(|item| item.is_recommended)
            .take(RECOMMENDED_LIMIT)
            .map(|item| card(item, cart))
            .collect()
    } else {
        vec![]
    };

    let filtered = items
        .iter()
        .filter(|item| selected.map_or(true, |c| item.category == c))
        .map(|item| card(item, cart))
        .collect();

    HomeView {
        categories,
        section_title: selected
            .map(|c| c.as_str().to_string())
            .unwrap_or_else(|| "All Items".to_string()),
        recommended,
        items: filtered,
        banners,
        cart_badge: cart.total_items(),
        cart_bar: cart.bar(),
    }
}
