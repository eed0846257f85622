use serde::Deserialize;
use serde_json::Value;

use super::to_json;
use crate::api::TableClient;
use crate::cart::Cart;
use crate::models::MenuItem;
use crate::state::AppState;
use crate::{parse_channel_payload, value_str};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartQuantityPayload {
    #[serde(alias = "itemId", alias = "item_id")]
    id: String,
    quantity: i64,
}

/// Cart totals plus the floating bar, as every cart command returns them.
fn cart_snapshot(cart: &Cart) -> Result<Value, String> {
    let mut snapshot = to_json(&cart.summary())?;
    if let Value::Object(map) = &mut snapshot {
        map.insert("bar".into(), to_json(&cart.bar())?);
    }
    Ok(snapshot)
}

fn parse_cart_item_payload(arg0: Option<Value>) -> Result<MenuItem, String> {
    let payload = match arg0 {
        Some(Value::Object(mut obj)) => match obj.remove("item") {
            Some(item) => item,
            None => Value::Object(obj),
        },
        Some(v) => v,
        None => return Err("Missing menu item".into()),
    };
    serde_json::from_value(payload).map_err(|e| format!("Invalid menu item payload: {e}"))
}

fn parse_item_id_payload(arg0: Option<Value>) -> Result<String, String> {
    let payload = match arg0 {
        Some(Value::String(id)) => serde_json::json!({ "id": id }),
        Some(v) => v,
        None => serde_json::json!({}),
    };
    value_str(&payload, &["id", "itemId", "item_id"]).ok_or_else(|| "Missing item id".into())
}

fn parse_cart_quantity_payload(
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<CartQuantityPayload, String> {
    let arg0 = match arg0 {
        Some(Value::String(id)) => Some(serde_json::json!({ "id": id })),
        other => other,
    };
    let arg1 = match arg1 {
        Some(Value::Number(n)) => Some(serde_json::json!({ "quantity": n })),
        other => other,
    };
    let mut parsed: CartQuantityPayload = serde_json::from_value(parse_channel_payload(arg0, arg1))
        .map_err(|e| format!("Invalid cart quantity payload: {e}"))?;
    parsed.id = parsed.id.trim().to_string();
    if parsed.id.is_empty() {
        return Err("Missing item id".into());
    }
    Ok(parsed)
}

pub fn cart_get<C: TableClient>(state: &AppState<C>) -> Result<Value, String> {
    let cart = state.cart()?;
    cart_snapshot(&cart)
}

pub fn cart_add<C: TableClient>(state: &AppState<C>, arg0: Option<Value>) -> Result<Value, String> {
    let item = parse_cart_item_payload(arg0)?;
    state.with_cart(|cart| {
        cart.add(&item);
        cart_snapshot(cart)
    })?
}

pub fn cart_update_quantity<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    let payload = parse_cart_quantity_payload(arg0, arg1)?;
    state.with_cart(|cart| {
        cart.update_quantity(&payload.id, payload.quantity);
        cart_snapshot(cart)
    })?
}

pub fn cart_remove<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let id = parse_item_id_payload(arg0)?;
    state.with_cart(|cart| {
        cart.remove(&id);
        cart_snapshot(cart)
    })?
}

pub fn cart_clear<C: TableClient>(state: &AppState<C>) -> Result<Value, String> {
    state.with_cart(|cart| {
        cart.clear();
        cart_snapshot(cart)
    })?
}
