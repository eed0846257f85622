use chrono::Local;
use serde::Serialize;

use super::{require_id, AdminError};
use crate::api::{ApiError, Query, Table, TableClient};
use crate::models::{decode_rows, Order};

/// An order as the kitchen list shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCard {
    #[serde(flatten)]
    pub order: Order,
    pub placed_at: Option<String>,
    pub delivery_label: String,
    pub item_lines: Vec<String>,
}

impl From<Order> for OrderCard {
    fn from(order: Order) -> Self {
        let placed_at = order.created_at.map(|at| {
            at.with_timezone(&Local)
                .format("%b %-d, %-I:%M %p")
                .to_string()
        });
        let delivery_label = format!("{} - Room {}", order.hostel, order.room);
        let item_lines = order
            .items
            .iter()
            .map(|item| format!("{} x{}", item.name, item.quantity))
            .collect();
        OrderCard {
            order,
            placed_at,
            delivery_label,
            item_lines,
        }
    }
}

async fn load_cards<C: TableClient>(client: &C, query: Query) -> Result<Vec<OrderCard>, AdminError> {
    let rows = client
        .select(&query)
        .await
        .map_err(AdminError::store("Failed to load orders"))?;
    let orders: Vec<Order> = decode_rows(Table::Orders.as_str(), rows)
        .map_err(|e| AdminError::store("Failed to load orders")(ApiError::Decode(e)))?;
    Ok(orders.into_iter().map(OrderCard::from).collect())
}

/// All orders, newest first.
pub async fn list_orders<C: TableClient>(client: &C) -> Result<Vec<OrderCard>, AdminError> {
    load_cards(client, Query::table(Table::Orders).order("created_at", false)).await
}

/// Orders placed against one batch, newest first.
pub async fn list_batch_orders<C: TableClient>(
    client: &C,
    batch_id: &str,
) -> Result<Vec<OrderCard>, AdminError> {
    let batch_id = require_id(batch_id)?;
    load_cards(
        client,
        Query::table(Table::Orders)
            .eq("batch_id", batch_id)
            .order("created_at", false),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTables;
    use serde_json::json;

    fn seed_order(tables: &MemoryTables, id: &str, batch_id: &str) {
        tables.seed(
            Table::Orders,
            json!({
                "id": id,
                "batch_id": batch_id,
                "user_name": "Kiran",
                "hostel": "H4",
                "room": "101",
                "phone": "555",
                "items": [
                    { "id": "a", "name": "Paneer Roll", "price": 60, "quantity": 2 },
                    { "id": "b", "name": "Lassi", "price": 40, "quantity": 1 }
                ],
                "total_amount": 160,
                "payment_mode": "Pay on delivery"
            }),
        );
    }

    #[tokio::test]
    async fn orders_list_newest_first_with_summaries() {
        let tables = MemoryTables::new();
        seed_order(&tables, "first", "b1");
        seed_order(&tables, "second", "b2");

        let cards = list_orders(&tables).await.expect("list");
        let ids: Vec<&str> = cards.iter().map(|c| c.order.id.as_str()).collect();
        assert_eq!(ids, vec!["second", "first"]);
        assert_eq!(cards[0].delivery_label, "H4 - Room 101");
        assert_eq!(cards[0].item_lines, vec!["Paneer Roll x2", "Lassi x1"]);
        assert!(cards[0].placed_at.is_some());
    }

    #[tokio::test]
    async fn batch_filter_limits_to_one_wave() {
        let tables = MemoryTables::new();
        seed_order(&tables, "o1", "b1");
        seed_order(&tables, "o2", "b2");
        seed_order(&tables, "o3", "b1");

        let cards = list_batch_orders(&tables, "b1").await.expect("list");
        let ids: Vec<&str> = cards.iter().map(|c| c.order.id.as_str()).collect();
        assert_eq!(ids, vec!["o3", "o1"]);
    }

    #[tokio::test]
    async fn load_failure_is_alerted() {
        let tables = MemoryTables::new();
        tables.set_failing(true);
        let err = list_orders(&tables).await.expect_err("should fail");
        assert_eq!(err.to_string(), "Failed to load orders");
    }
}
