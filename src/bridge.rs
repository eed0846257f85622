//! JSON-lines bridge between the web front end and the command handlers.
//!
//! Each input line is a request `{ "id", "cmd", "args" }`. Each output line
//! is either a response `{ "id", "ok", "data" | "error" }` or an event
//! `{ "event", "payload" }`. Requests run concurrently, so responses may come
//! back out of order; the `id` pairs them up.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::api::TableClient;
use crate::commands;
use crate::state::{AppState, Event};

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    cmd: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Value,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Response {
    fn from_result(id: Value, result: Result<Value, String>) -> Self {
        match result {
            Ok(data) => Response {
                id,
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(error) => Response {
                id,
                ok: false,
                data: None,
                error: Some(error),
            },
        }
    }
}

/// Positional arguments: an array supplies up to two, anything else is the
/// first.
fn split_args(args: Value) -> (Option<Value>, Option<Value>) {
    match args {
        Value::Null => (None, None),
        Value::Array(items) => {
            let mut it = items.into_iter();
            (
                it.next().filter(|v| !v.is_null()),
                it.next().filter(|v| !v.is_null()),
            )
        }
        other => (Some(other), None),
    }
}

fn encode<T: Serialize>(message: &T) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(line) => Some(line),
        Err(e) => {
            error!(error = %e, "bridge: failed to encode message");
            None
        }
    }
}

/// Serve requests from `input` until it closes. In-flight requests finish
/// before this returns.
pub async fn serve<C, R, W>(
    state: Arc<AppState<C>>,
    mut events: mpsc::UnboundedReceiver<Event>,
    input: R,
    mut output: W,
) -> anyhow::Result<()>
where
    C: TableClient,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        while let Some(line) = out_rx.recv().await {
            if let Err(e) = output.write_all(line.as_bytes()).await {
                warn!(error = %e, "bridge: output closed");
                break;
            }
            if let Err(e) = output.write_all(b"\n").await {
                warn!(error = %e, "bridge: output closed");
                break;
            }
            let _ = output.flush().await;
        }
    });

    let forward = |event: Event| {
        if let Some(line) = encode(&event) {
            let _ = out_tx.send(line);
        }
    };

    let mut in_flight = JoinSet::new();
    let mut lines = input.lines();
    info!(session_id = %state.session_id, "bridge ready");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            Some(event) = events.recv() => {
                forward(event);
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "bridge: malformed request");
                let response =
                    Response::from_result(Value::Null, Err(format!("Invalid request: {e}")));
                if let Some(line) = encode(&response) {
                    let _ = out_tx.send(line);
                }
                continue;
            }
        };

        let state = state.clone();
        let out_tx = out_tx.clone();
        in_flight.spawn(async move {
            let Request { id, cmd, args } = request;
            let (arg0, arg1) = split_args(args);
            debug!(cmd = %cmd, "bridge: request");
            let result = commands::dispatch(&state, &cmd, arg0, arg1).await;
            if let Err(e) = &result {
                debug!(cmd = %cmd, error = %e, "bridge: command failed");
            }
            if let Some(line) = encode(&Response::from_result(id, result)) {
                let _ = out_tx.send(line);
            }
        });

        // Reap finished requests without waiting.
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    while let Ok(event) = events.try_recv() {
        forward(event);
    }
    drop(forward);
    drop(out_tx);
    let _ = writer.await;
    info!("bridge input closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Table;
    use crate::testing::MemoryTables;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::BufReader;

    #[test]
    fn split_args_handles_arrays_objects_and_null() {
        assert_eq!(split_args(Value::Null), (None, None));
        assert_eq!(
            split_args(json!(["a", { "quantity": 2 }])),
            (Some(json!("a")), Some(json!({ "quantity": 2 })))
        );
        assert_eq!(split_args(json!([null, 1])), (None, Some(json!(1))));
        assert_eq!(split_args(json!({ "id": "x" })), (Some(json!({ "id": "x" })), None));
    }

    async fn run_lines(input: &str) -> Vec<Value> {
        let tables = Arc::new(MemoryTables::new());
        tables.seed(
            Table::MenuItems,
            json!({
                "id": "m-1", "name": "Veg Biryani", "price": 120, "category": "Biryani",
                "is_available": true, "is_recommended": false
            }),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(AppState::new(tables, Duration::from_secs(10), Some(tx)));
        let (client, server) = tokio::io::duplex(64 * 1024);
        serve(state, rx, BufReader::new(input.as_bytes()), server)
            .await
            .expect("serve");

        let mut lines = BufReader::new(client).lines();
        let mut out = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            out.push(serde_json::from_str(&line).expect("json line"));
        }
        out
    }

    #[tokio::test]
    async fn requests_get_paired_responses() {
        let out = run_lines(concat!(
            r#"{"id":1,"cmd":"cart_get"}"#,
            "\n\n",
            r#"{"id":2,"cmd":"cart_teleport"}"#,
            "\n",
            "not json\n",
        ))
        .await;

        let responses: Vec<&Value> = out.iter().filter(|v| v.get("ok").is_some()).collect();
        assert_eq!(responses.len(), 3);
        let first = responses.iter().find(|v| v["id"] == 1).expect("id 1");
        assert_eq!(first["ok"], true);
        assert_eq!(first["data"]["totalItems"], 0);
        let second = responses.iter().find(|v| v["id"] == 2).expect("id 2");
        assert_eq!(second["error"], "Unknown command: cart_teleport");
        let bad = responses.iter().find(|v| v["id"].is_null()).expect("malformed");
        assert_eq!(bad["ok"], false);
    }

    #[tokio::test]
    async fn cart_changes_are_pushed_as_events() {
        let out = run_lines(concat!(
            r#"{"id":"a","cmd":"cart_add","args":{"id":"m-1","name":"Veg Biryani","price":120,"category":"Biryani","is_available":true,"is_recommended":false}}"#,
            "\n",
        ))
        .await;
        let event = out
            .iter()
            .find(|v| v["event"] == "cart_changed")
            .expect("cart event");
        assert_eq!(event["payload"]["totalAmount"], 120.0);
    }
}
