//! Admin side of batch tracking: create delivery waves and move the active
//! one through its steps.
//!
//! Steps may be skipped or moved backwards. Only values outside 1-5 are
//! refused.

use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::{now_rfc3339, AdminError, AdminOutcome};
use crate::api::{ApiError, Query, Table, TableClient};
use crate::models::OrderBatch;
use crate::tracking::{fetch_active_batch, fetch_batch, BatchStep, FIRST_STEP, LAST_STEP};

pub const NEW_BATCH_MESSAGE: &str = "Accepting orders for this slot";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOption {
    pub step: i32,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingPanel {
    pub batch: Option<OrderBatch>,
    pub options: Vec<StepOption>,
}

pub fn step_options(current: Option<i32>) -> Vec<StepOption> {
    BatchStep::ALL
        .into_iter()
        .map(|s| StepOption {
            step: s.number(),
            label: s.admin_label(),
            selected: current == Some(s.number()),
        })
        .collect()
}

pub async fn load_panel<C: TableClient>(client: &C) -> Result<TrackingPanel, AdminError> {
    let batch = fetch_active_batch(client)
        .await
        .map_err(AdminError::store("Failed to load batch"))?;
    let options = step_options(batch.as_ref().map(|b| b.current_step));
    Ok(TrackingPanel { batch, options })
}

/// Set step and message on `batch_id`, or on the active batch when `None`.
pub async fn update_status<C: TableClient>(
    client: &C,
    batch_id: Option<&str>,
    step: i32,
    status_message: &str,
) -> Result<AdminOutcome<OrderBatch>, AdminError> {
    if !(FIRST_STEP..=LAST_STEP).contains(&step) {
        return Err(AdminError::Invalid(format!(
            "Step must be between {FIRST_STEP} and {LAST_STEP}"
        )));
    }

    let target = match batch_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => fetch_batch(client, id).await,
        None => fetch_active_batch(client).await,
    }
    .map_err(AdminError::store("Failed to update tracking status"))?
    .ok_or_else(|| AdminError::Invalid("No active batch to update".into()))?;

    let patch = json!({
        "current_step": step,
        "status_message": status_message.trim(),
        "updated_at": now_rfc3339(),
    });
    let rows = client
        .update(&Query::table(Table::OrderBatches).eq("id", target.id.as_str()), patch)
        .await
        .map_err(AdminError::store("Failed to update tracking status"))?;
    let updated = match rows.into_iter().next() {
        Some(row) => serde_json::from_value::<OrderBatch>(row).map_err(|e| {
            AdminError::store("Failed to update tracking status")(ApiError::Decode(e.to_string()))
        })?,
        None => {
            return Err(AdminError::Invalid(
                "Batch no longer exists; reload the panel".into(),
            ))
        }
    };

    if step < target.current_step {
        info!(
            batch_id = %updated.id,
            from = target.current_step,
            to = step,
            "batch step moved backwards"
        );
    }
    info!(batch_id = %updated.id, step, "batch status updated");
    Ok(AdminOutcome::new(
        "Tracking status updated successfully!",
        updated,
    ))
}

/// Open a new delivery wave. It becomes the active batch.
pub async fn create_batch<C: TableClient>(
    client: &C,
    slot_label: &str,
) -> Result<AdminOutcome<OrderBatch>, AdminError> {
    let slot_label = slot_label.trim();
    if slot_label.is_empty() {
        return Err(AdminError::Invalid("Please enter a slot label".into()));
    }
    let created = client
        .insert(
            Table::OrderBatches,
            json!({
                "slot_label": slot_label,
                "current_step": FIRST_STEP,
                "status_message": NEW_BATCH_MESSAGE,
            }),
        )
        .await
        .map_err(AdminError::store("Failed to create new batch"))?;
    let batch: OrderBatch = serde_json::from_value(created).map_err(|e| {
        AdminError::store("Failed to create new batch")(ApiError::Decode(e.to_string()))
    })?;
    info!(batch_id = %batch.id, slot_label = %batch.slot_label, "batch created");
    Ok(AdminOutcome::new("New batch created successfully!", batch))
}
