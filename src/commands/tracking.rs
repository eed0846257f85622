use serde_json::Value;
use tracing::warn;

use super::to_json;
use crate::api::TableClient;
use crate::state::AppState;
use crate::tracking;

/// Current batch progress. When the store cannot be reached the last batch
/// the poller saw is shown instead.
pub async fn tracking_get<C: TableClient>(state: &AppState<C>) -> Result<Value, String> {
    let batch = match tracking::fetch_active_batch(state.client.as_ref()).await {
        Ok(Some(batch)) => Some(batch),
        Ok(None) => state.latest_batch(),
        Err(e) => {
            warn!(error = %e, "tracking fetch failed, using last known batch");
            state.latest_batch()
        }
    };
    to_json(&tracking::tracking_view(batch.as_ref()))
}
