use serde_json::Value;
use tracing::warn;

use super::to_json;
use crate::api::TableClient;
use crate::orders::{self, DeliveryDetails};
use crate::state::AppState;
use crate::value_str;

fn parse_delivery_payload(arg0: Option<Value>) -> Result<DeliveryDetails, String> {
    let payload = match arg0 {
        Some(Value::Object(mut obj)) => match obj.remove("details") {
            Some(details) => details,
            None => Value::Object(obj),
        },
        Some(v) => v,
        None => serde_json::json!({}),
    };
    serde_json::from_value(payload).map_err(|e| format!("Invalid delivery details: {e}"))
}

fn parse_order_id_payload(arg0: Option<Value>) -> Result<String, String> {
    let payload = match arg0 {
        Some(Value::String(order_id)) => serde_json::json!({ "orderId": order_id }),
        Some(v) => v,
        None => serde_json::json!({}),
    };
    value_str(&payload, &["orderId", "order_id", "id"]).ok_or_else(|| "Missing orderId".into())
}

/// Place an order from the session cart. On success the cart is emptied
/// and the session moves to the confirmation screen.
pub async fn order_place<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let details = parse_delivery_payload(arg0)?;
    match state.place_order(&details).await {
        Ok(order) => to_json(&order),
        Err(e) => {
            warn!(session_id = %state.session_id, error = %e, "order not placed");
            Err(e.to_string())
        }
    }
}

pub async fn order_get_confirmation<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let order_id = parse_order_id_payload(arg0)?;
    let view = orders::confirmation_view(state.client.as_ref(), &order_id).await;
    to_json(&view)
}
