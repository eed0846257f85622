//! Delivery batch tracking.
//!
//! Every order placed while a batch is active shares that batch's status, so
//! "tracking an order" means reading the active batch (the most recently
//! created `order_batches` row) and laying its `current_step` over the fixed
//! five-step delivery sequence.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{select_first, ApiError, Query, Table, TableClient};
use crate::models::OrderBatch;

pub const FIRST_STEP: i32 = 1;
pub const LAST_STEP: i32 = 5;
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchStep {
    Collecting,
    Placed,
    Preparing,
    OutForDelivery,
    Delivered,
}

impl BatchStep {
    pub const ALL: [BatchStep; 5] = [
        BatchStep::Collecting,
        BatchStep::Placed,
        BatchStep::Preparing,
        BatchStep::OutForDelivery,
        BatchStep::Delivered,
    ];

    pub fn number(self) -> i32 {
        match self {
            BatchStep::Collecting => 1,
            BatchStep::Placed => 2,
            BatchStep::Preparing => 3,
            BatchStep::OutForDelivery => 4,
            BatchStep::Delivered => 5,
        }
    }

    pub fn from_number(step: i32) -> Option<BatchStep> {
        BatchStep::ALL.into_iter().find(|s| s.number() == step)
    }

    /// Label shown to shoppers.
    pub fn label(self) -> &'static str {
        match self {
            BatchStep::Collecting => "Collecting Orders",
            BatchStep::Placed => "Order Placed",
            BatchStep::Preparing => "Preparing Food",
            BatchStep::OutForDelivery => "Out for Delivery",
            BatchStep::Delivered => "Delivered",
        }
    }

    /// Label on the admin panel's step picker.
    pub fn admin_label(self) -> &'static str {
        match self {
            BatchStep::Placed => "Order Placed at Restaurant",
            other => other.label(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepState {
    Completed,
    Current,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub step: i32,
    pub label: &'static str,
    pub state: StepState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingView {
    pub batch_id: Option<String>,
    pub slot_label: Option<String>,
    pub current_step: i32,
    pub status_message: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
    pub steps: Vec<StepView>,
}

/// Step the tracker treats as current. A missing batch or a zero step reads
/// as the first step; other stored values are used as-is.
pub fn effective_step(batch: Option<&OrderBatch>) -> i32 {
    match batch.map(|b| b.current_step) {
        Some(step) if step != 0 => step,
        _ => FIRST_STEP,
    }
}

pub fn step_state(step: i32, current: i32) -> StepState {
    match step.cmp(&current) {
        std::cmp::Ordering::Less => StepState::Completed,
        std::cmp::Ordering::Equal => StepState::Current,
        std::cmp::Ordering::Greater => StepState::Upcoming,
    }
}

pub fn tracking_view(batch: Option<&OrderBatch>) -> TrackingView {
    let current = effective_step(batch);
    TrackingView {
        batch_id: batch.map(|b| b.id.clone()),
        slot_label: batch.map(|b| b.slot_label.clone()),
        current_step: current,
        status_message: batch.map(|b| b.status_message.clone()),
        last_update: batch.and_then(|b| b.updated_at.or(b.created_at)),
        steps: BatchStep::ALL
            .into_iter()
            .map(|s| StepView {
                step: s.number(),
                label: s.label(),
                state: step_state(s.number(), current),
            })
            .collect(),
    }
}

fn active_batch_query() -> Query {
    Query::table(Table::OrderBatches).order("created_at", false)
}

/// The active batch: the most recently created one, if any.
pub async fn fetch_active_batch<C: TableClient>(client: &C) -> Result<Option<OrderBatch>, ApiError> {
    match select_first(client, active_batch_query()).await? {
        Some(row) => serde_json::from_value(row)
            .map(Some)
            .map_err(|e| ApiError::Decode(format!("order_batches row: {e}"))),
        None => Ok(None),
    }
}

pub async fn fetch_batch<C: TableClient>(
    client: &C,
    batch_id: &str,
) -> Result<Option<OrderBatch>, ApiError> {
    let query = Query::table(Table::OrderBatches).eq("id", batch_id);
    match select_first(client, query).await? {
        Some(row) => serde_json::from_value(row)
            .map(Some)
            .map_err(|e| ApiError::Decode(format!("order_batches row: {e}"))),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Background re-fetch of the active batch while the tracking screen is
/// shown. Dropping or stopping the handle cancels the task.
pub struct TrackingPoller {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    latest: watch::Receiver<Option<OrderBatch>>,
}

impl TrackingPoller {
    /// Fetch immediately, then every `interval`.
    pub fn start<C: TableClient>(client: Arc<C>, interval: Duration) -> Self {
        let cadence = interval.max(MIN_POLL_INTERVAL);
        let cancel = CancellationToken::new();
        let (tx, latest) = watch::channel(None);
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            info!(interval_secs = cadence.as_secs(), "batch status polling started");
            let mut ticker = tokio::time::interval(cadence);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match fetch_active_batch(client.as_ref()).await {
                    Ok(Some(batch)) => {
                        debug!(
                            batch_id = %batch.id,
                            step = batch.current_step,
                            "batch status refreshed"
                        );
                        tx.send_if_modified(|current| {
                            if current.as_ref() == Some(&batch) {
                                false
                            } else {
                                *current = Some(batch);
                                true
                            }
                        });
                    }
                    // Keep whatever was last shown.
                    Ok(None) => debug!("no active batch yet"),
                    Err(error) => warn!(error = %error, "batch status refresh failed"),
                }
            }
            info!("batch status polling stopped");
        });

        TrackingPoller {
            cancel,
            task,
            latest,
        }
    }

    /// Receiver that observes each newly fetched batch.
    pub fn subscribe(&self) -> watch::Receiver<Option<OrderBatch>> {
        self.latest.clone()
    }

    pub fn latest(&self) -> Option<OrderBatch> {
        self.latest.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for TrackingPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
