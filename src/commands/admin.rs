//! Admin panel commands. Each returns `{ message, data }` on success so the
//! panel can raise its confirmation alert, or the failure alert as the error.

use serde::Deserialize;
use serde_json::{json, Value};

use super::to_json;
use crate::admin::{self, banners::BannerForm, menu::MenuItemForm, AdminError};
use crate::api::TableClient;
use crate::state::AppState;
use crate::{parse_channel_payload, value_str};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MenuToggleAvailabilityPayload {
    #[serde(alias = "itemId", alias = "item_id")]
    id: String,
    #[serde(alias = "is_available", alias = "currentlyAvailable")]
    is_available: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BannerToggleActivePayload {
    #[serde(alias = "bannerId", alias = "banner_id")]
    id: String,
    #[serde(alias = "is_active", alias = "currentlyActive")]
    is_active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackingUpdatePayload {
    #[serde(default, alias = "batch_id")]
    batch_id: Option<String>,
    #[serde(alias = "currentStep", alias = "current_step")]
    step: i32,
    #[serde(default, alias = "status_message", alias = "message")]
    status_message: String,
}

fn admin_error(e: AdminError) -> String {
    e.to_string()
}

/// `"id"` or `{ id }`, plus a form object either merged in or passed second.
fn split_id_and_form(
    arg0: Option<Value>,
    arg1: Option<Value>,
    id_keys: &[&str],
) -> Result<(String, Value), String> {
    let arg0 = match arg0 {
        Some(Value::String(id)) => Some(json!({ "id": id })),
        other => other,
    };
    let payload = parse_channel_payload(arg0, arg1);
    let id = value_str(&payload, id_keys).ok_or("Missing id")?;
    let form = match payload.get("form") {
        Some(form) => form.clone(),
        None => payload,
    };
    Ok((id, form))
}

fn parse_id_payload(arg0: Option<Value>, id_keys: &[&str]) -> Result<String, String> {
    let payload = match arg0 {
        Some(Value::String(id)) => json!({ "id": id }),
        Some(v) => v,
        None => json!({}),
    };
    value_str(&payload, id_keys).ok_or_else(|| "Missing id".into())
}

fn parse_form<T: serde::de::DeserializeOwned>(arg0: Option<Value>, what: &str) -> Result<T, String> {
    let payload = match arg0 {
        Some(Value::Object(mut obj)) => match obj.remove("form") {
            Some(form) => form,
            None => Value::Object(obj),
        },
        Some(v) => v,
        None => json!({}),
    };
    serde_json::from_value(payload).map_err(|e| format!("Invalid {what} payload: {e}"))
}

fn parse_toggle_payload<T: serde::de::DeserializeOwned>(
    arg0: Option<Value>,
    arg1: Option<Value>,
    flag: &str,
    what: &str,
) -> Result<T, String> {
    let arg0 = match arg0 {
        Some(Value::String(id)) => Some(json!({ "id": id })),
        other => other,
    };
    let arg1 = match arg1 {
        Some(Value::Bool(b)) => Some(json!({ flag: b })),
        other => other,
    };
    serde_json::from_value(parse_channel_payload(arg0, arg1))
        .map_err(|e| format!("Invalid {what} payload: {e}"))
}

const ITEM_ID_KEYS: &[&str] = &["id", "itemId", "item_id"];
const BANNER_ID_KEYS: &[&str] = &["id", "bannerId", "banner_id"];

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

pub async fn admin_menu_list<C: TableClient>(state: &AppState<C>) -> Result<Value, String> {
    let items = admin::menu::list_items(state.client.as_ref())
        .await
        .map_err(admin_error)?;
    to_json(&items)
}

pub async fn admin_menu_create<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let form: MenuItemForm = parse_form(arg0, "menu item")?;
    let outcome = admin::menu::create_item(state.client.as_ref(), &form)
        .await
        .map_err(admin_error)?;
    to_json(&outcome)
}

pub async fn admin_menu_update<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    let (id, form) = split_id_and_form(arg0, arg1, ITEM_ID_KEYS)?;
    let form: MenuItemForm = parse_form(Some(form), "menu item")?;
    let outcome = admin::menu::update_item(state.client.as_ref(), &id, &form)
        .await
        .map_err(admin_error)?;
    to_json(&outcome)
}

pub async fn admin_menu_delete<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let id = parse_id_payload(arg0, ITEM_ID_KEYS)?;
    let outcome = admin::menu::delete_item(state.client.as_ref(), &id)
        .await
        .map_err(admin_error)?;
    to_json(&outcome)
}

pub async fn admin_menu_toggle_availability<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    let payload: MenuToggleAvailabilityPayload =
        parse_toggle_payload(arg0, arg1, "isAvailable", "availability")?;
    let next =
        admin::menu::toggle_availability(state.client.as_ref(), &payload.id, payload.is_available)
            .await
            .map_err(admin_error)?;
    Ok(json!({ "id": payload.id.trim(), "isAvailable": next }))
}

// ---------------------------------------------------------------------------
// Banners
// ---------------------------------------------------------------------------

pub async fn admin_banners_list<C: TableClient>(state: &AppState<C>) -> Result<Value, String> {
    let banners = admin::banners::list_banners(state.client.as_ref())
        .await
        .map_err(admin_error)?;
    to_json(&banners)
}

pub async fn admin_banners_create<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let form: BannerForm = parse_form(arg0, "banner")?;
    let outcome = admin::banners::create_banner(state.client.as_ref(), &form)
        .await
        .map_err(admin_error)?;
    to_json(&outcome)
}

pub async fn admin_banners_update<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    let (id, form) = split_id_and_form(arg0, arg1, BANNER_ID_KEYS)?;
    let form: BannerForm = parse_form(Some(form), "banner")?;
    let outcome = admin::banners::update_banner(state.client.as_ref(), &id, &form)
        .await
        .map_err(admin_error)?;
    to_json(&outcome)
}

pub async fn admin_banners_delete<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let id = parse_id_payload(arg0, BANNER_ID_KEYS)?;
    let outcome = admin::banners::delete_banner(state.client.as_ref(), &id)
        .await
        .map_err(admin_error)?;
    to_json(&outcome)
}

pub async fn admin_banners_toggle_active<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    let payload: BannerToggleActivePayload =
        parse_toggle_payload(arg0, arg1, "isActive", "banner toggle")?;
    let next = admin::banners::toggle_active(state.client.as_ref(), &payload.id, payload.is_active)
        .await
        .map_err(admin_error)?;
    Ok(json!({ "id": payload.id.trim(), "isActive": next }))
}

// ---------------------------------------------------------------------------
// Orders and tracking
// ---------------------------------------------------------------------------

/// All orders, or only those of `batchId` when given.
pub async fn admin_orders_list<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let payload = match arg0 {
        Some(Value::String(batch_id)) => json!({ "batchId": batch_id }),
        Some(v) => v,
        None => json!({}),
    };
    let client = state.client.as_ref();
    let cards = match value_str(&payload, &["batchId", "batch_id"]) {
        Some(batch_id) => admin::orders::list_batch_orders(client, &batch_id).await,
        None => admin::orders::list_orders(client).await,
    }
    .map_err(admin_error)?;
    to_json(&cards)
}

pub async fn admin_tracking_get<C: TableClient>(state: &AppState<C>) -> Result<Value, String> {
    let panel = admin::tracking::load_panel(state.client.as_ref())
        .await
        .map_err(admin_error)?;
    to_json(&panel)
}

pub async fn admin_tracking_update<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let payload: TrackingUpdatePayload = serde_json::from_value(arg0.unwrap_or_else(|| json!({})))
        .map_err(|e| format!("Invalid tracking update payload: {e}"))?;
    let outcome = admin::tracking::update_status(
        state.client.as_ref(),
        payload.batch_id.as_deref(),
        payload.step,
        &payload.status_message,
    )
    .await
    .map_err(admin_error)?;
    to_json(&outcome)
}

pub async fn admin_tracking_create_batch<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let payload = match arg0 {
        Some(Value::String(label)) => json!({ "slotLabel": label }),
        Some(v) => v,
        None => json!({}),
    };
    let slot_label = value_str(&payload, &["slotLabel", "slot_label"]).unwrap_or_default();
    let outcome = admin::tracking::create_batch(state.client.as_ref(), &slot_label)
        .await
        .map_err(admin_error)?;
    to_json(&outcome)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTables;
    use std::sync::Arc;
    use std::time::Duration;

    fn state() -> AppState<MemoryTables> {
        AppState::new(Arc::new(MemoryTables::new()), Duration::from_secs(10), None)
    }

    #[tokio::test]
    async fn menu_item_lifecycle_returns_confirmation_messages() {
        let state = state();
        let created = admin_menu_create(
            &state,
            Some(json!({ "name": "Paneer Roll", "price": "80", "category": "Snacks" })),
        )
        .await
        .expect("create");
        assert_eq!(created["message"], "Item added successfully!");
        let id = created["data"]["id"].as_str().expect("id").to_string();

        let toggled = admin_menu_toggle_availability(&state, Some(json!(id)), Some(json!(true)))
            .await
            .expect("toggle");
        assert_eq!(toggled["isAvailable"], false);

        let updated = admin_menu_update(
            &state,
            Some(json!({ "id": id, "name": "Paneer Kathi Roll", "price": 90, "category": "Snacks" })),
            None,
        )
        .await
        .expect("update");
        assert_eq!(updated["message"], "Item updated successfully!");

        let list = admin_menu_list(&state).await.expect("list");
        assert_eq!(list[0]["name"], "Paneer Kathi Roll");
        assert_eq!(list[0]["is_available"], false);

        let deleted = admin_menu_delete(&state, Some(json!({ "itemId": id })))
            .await
            .expect("delete");
        assert_eq!(deleted["message"], "Item deleted successfully!");
    }

    #[tokio::test]
    async fn invalid_form_is_reported_as_alert() {
        let state = state();
        let err = admin_menu_create(&state, Some(json!({ "name": "Tea", "price": "free" })))
            .await
            .expect_err("bad price");
        assert_eq!(err, "Price must be a valid amount");
    }

    #[tokio::test]
    async fn store_failures_surface_the_panel_alert() {
        let state = state();
        state.client.set_failing(true);
        assert_eq!(
            admin_orders_list(&state, None).await.expect_err("fail"),
            "Failed to load orders"
        );
        assert_eq!(
            admin_banners_list(&state).await.expect_err("fail"),
            "Failed to load banners"
        );
    }

    #[tokio::test]
    async fn tracking_panel_flow() {
        let state = state();
        let created = admin_tracking_create_batch(&state, Some(json!("Lunch 1:00-1:30 PM")))
            .await
            .expect("create");
        assert_eq!(created["message"], "New batch created successfully!");

        let updated = admin_tracking_update(
            &state,
            Some(json!({ "step": 2, "statusMessage": "Order sent to kitchen" })),
        )
        .await
        .expect("update");
        assert_eq!(updated["data"]["current_step"], 2);

        let panel = admin_tracking_get(&state).await.expect("panel");
        assert_eq!(panel["options"][1]["selected"], true);
    }
}
