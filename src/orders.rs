//! Order placement against the active delivery batch.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::{select_first, ApiError, Query, Table, TableClient};
use crate::models::{CartItem, Order, PAYMENT_MODE};
use crate::tracking;

/// Delivery details typed into the cart screen.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
    #[serde(default, alias = "user_name", alias = "name")]
    pub user_name: String,
    #[serde(default)]
    pub hostel: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub phone: String,
}

impl DeliveryDetails {
    pub fn trimmed(&self) -> DeliveryDetails {
        DeliveryDetails {
            user_name: self.user_name.trim().to_string(),
            hostel: self.hostel.trim().to_string(),
            room: self.room.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        [&self.user_name, &self.hostel, &self.room, &self.phone]
            .iter()
            .all(|field| !field.trim().is_empty())
    }
}

/// Reasons an order is not placed. `Display` is the alert shown to the user.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Please fill all details")]
    MissingDetails,
    #[error("Your cart is empty")]
    EmptyCart,
    #[error("No active delivery slot found")]
    NoActiveBatch,
    #[error("Your order is already being placed")]
    InProgress,
    #[error("Failed to place order. Please try again.")]
    Store(#[source] ApiError),
}

impl From<ApiError> for OrderError {
    fn from(err: ApiError) -> Self {
        OrderError::Store(err)
    }
}

pub fn order_total(items: &[CartItem]) -> f64 {
    items.iter().map(CartItem::line_total).sum()
}

/// Insert an order for `items` against the active batch.
///
/// Details and cart are checked locally before any remote call. The caller
/// owns the cart and clears it once this returns `Ok`.
pub async fn place_order<C: TableClient>(
    client: &C,
    items: &[CartItem],
    details: &DeliveryDetails,
) -> Result<Order, OrderError> {
    let details = details.trimmed();
    if !details.is_complete() {
        return Err(OrderError::MissingDetails);
    }
    if items.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let batch = match tracking::fetch_active_batch(client).await {
        Ok(Some(batch)) => batch,
        Ok(None) => {
            warn!("order refused: no active batch");
            return Err(OrderError::NoActiveBatch);
        }
        Err(e) => {
            error!(error = %e, "order placement: active batch lookup failed");
            return Err(e.into());
        }
    };

    let total_amount = order_total(items);
    let row = json!({
        "batch_id": batch.id,
        "user_name": details.user_name,
        "hostel": details.hostel,
        "room": details.room,
        "phone": details.phone,
        "items": items,
        "total_amount": total_amount,
        "payment_mode": PAYMENT_MODE,
    });

    let created = client.insert(Table::Orders, row).await.map_err(|e| {
        error!(error = %e, batch_id = %batch.id, "order insert failed");
        OrderError::from(e)
    })?;
    let order: Order = serde_json::from_value(created).map_err(|e| {
        error!(error = %e, "order insert returned an unreadable row");
        OrderError::Store(ApiError::Decode(format!("orders row: {e}")))
    })?;

    info!(
        order_id = %order.id,
        batch_id = %order.batch_id,
        lines = order.items.len(),
        total_amount = order.total_amount,
        "order placed"
    );
    Ok(order)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationView {
    pub order_id: String,
    pub slot_label: Option<String>,
}

/// Slot label for a just-placed order. Lookup failures leave it empty.
pub async fn confirmation_view<C: TableClient>(client: &C, order_id: &str) -> ConfirmationView {
    let slot_label = match lookup_slot_label(client, order_id).await {
        Ok(label) => label,
        Err(e) => {
            error!(order_id = %order_id, error = %e, "confirmation: batch lookup failed");
            None
        }
    };
    ConfirmationView {
        order_id: order_id.to_string(),
        slot_label,
    }
}

async fn lookup_slot_label<C: TableClient>(
    client: &C,
    order_id: &str,
) -> Result<Option<String>, ApiError> {
    let order = select_first(client, Query::table(Table::Orders).eq("id", order_id)).await?;
    let Some(batch_id) = order
        .as_ref()
        .and_then(|o| o.get("batch_id"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
    else {
        return Ok(None);
    };
    Ok(tracking::fetch_batch(client, batch_id)
        .await?
        .map(|batch| batch.slot_label))
}
