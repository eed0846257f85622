//! Command handlers invoked by the front end over the bridge.
//!
//! Every handler takes up to two positional arguments and returns JSON or a
//! user-facing error string. Names are snake_case, grouped by area prefix.

pub mod admin;
pub mod app;
pub mod cart;
pub mod menu;
pub mod orders;
pub mod tracking;

use serde::Serialize;
use serde_json::Value;

use crate::api::TableClient;
use crate::state::AppState;

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| format!("Failed to encode response: {e}"))
}

/// Route a command by name.
pub async fn dispatch<C: TableClient>(
    state: &AppState<C>,
    cmd: &str,
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    match cmd {
        "app_get_info" => app::app_get_info(state),
        "config_save_credentials" => app::config_save_credentials(arg0, arg1),
        "config_clear_credentials" => app::config_clear_credentials(),
        "nav_route" => app::nav_route(arg0),
        "nav_go" => app::nav_go(state, arg0),
        "nav_set_admin_tab" => app::nav_set_admin_tab(state, arg0),

        "menu_get_home" => menu::menu_get_home(state, arg0).await,
        "banners_get_active" => menu::banners_get_active(state).await,

        "cart_get" => cart::cart_get(state),
        "cart_add" => cart::cart_add(state, arg0),
        "cart_update_quantity" => cart::cart_update_quantity(state, arg0, arg1),
        "cart_remove" => cart::cart_remove(state, arg0),
        "cart_clear" => cart::cart_clear(state),

        "order_place" => orders::order_place(state, arg0).await,
        "order_get_confirmation" => orders::order_get_confirmation(state, arg0).await,

        "tracking_get" => tracking::tracking_get(state).await,

        "admin_menu_list" => admin::admin_menu_list(state).await,
        "admin_menu_create" => admin::admin_menu_create(state, arg0).await,
        "admin_menu_update" => admin::admin_menu_update(state, arg0, arg1).await,
        "admin_menu_delete" => admin::admin_menu_delete(state, arg0).await,
        "admin_menu_toggle_availability" => {
            admin::admin_menu_toggle_availability(state, arg0, arg1).await
        }
        "admin_banners_list" => admin::admin_banners_list(state).await,
        "admin_banners_create" => admin::admin_banners_create(state, arg0).await,
        "admin_banners_update" => admin::admin_banners_update(state, arg0, arg1).await,
        "admin_banners_delete" => admin::admin_banners_delete(state, arg0).await,
        "admin_banners_toggle_active" => {
            admin::admin_banners_toggle_active(state, arg0, arg1).await
        }
        "admin_orders_list" => admin::admin_orders_list(state, arg0).await,
        "admin_tracking_get" => admin::admin_tracking_get(state).await,
        "admin_tracking_update" => admin::admin_tracking_update(state, arg0).await,
        "admin_tracking_create_batch" => admin::admin_tracking_create_batch(state, arg0).await,

        other => Err(format!("Unknown command: {other}")),
    }
}
