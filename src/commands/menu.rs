use serde_json::Value;

use super::to_json;
use crate::api::TableClient;
use crate::menu;
use crate::models::Category;
use crate::state::AppState;
use crate::value_str;

/// `None` and "All" both mean no filter.
fn parse_category_payload(arg0: Option<Value>) -> Result<Option<Category>, String> {
    let payload = match arg0 {
        Some(Value::String(category)) => serde_json::json!({ "category": category }),
        Some(v) => v,
        None => serde_json::json!({}),
    };
    match value_str(&payload, &["category", "selectedCategory", "selected_category"]) {
        None => Ok(None),
        Some(c) if c.eq_ignore_ascii_case("all") => Ok(None),
        Some(c) => c.parse().map(Some),
    }
}

pub async fn menu_get_home<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let selected = parse_category_payload(arg0)?;
    let client = state.client.as_ref();
    let (items, banners) = tokio::join!(
        menu::load_available_items(client),
        menu::load_active_banners(client)
    );
    let view = {
        let cart = state.cart()?;
        menu::home_view(&items, banners, selected, &cart)
    };
    to_json(&view)
}

pub async fn banners_get_active<C: TableClient>(state: &AppState<C>) -> Result<Value, String> {
    let banners = menu::load_active_banners(state.client.as_ref()).await;
    to_json(&banners)
}
