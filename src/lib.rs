//! Campus Bites - storefront host
//!
//! Serves the shopper storefront and the `/admin` panel to a web front end.
//! The front end talks to this process over a JSON-lines bridge on stdio
//! (see [`bridge`]); all persistent data lives in four tables on the hosted
//! store, reached through [`api::RestClient`].

use anyhow::Context;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod admin;
pub mod api;
mod bridge;
pub mod cart;
mod commands;
pub mod config;
mod diagnostics;
pub mod menu;
pub mod models;
pub mod navigation;
pub mod orders;
mod state;
mod storage;
pub mod tracking;

#[cfg(test)]
mod testing;

pub use state::{AppState, Event};

/// Merge the two positional command arguments into one payload. Objects are
/// merged with the second winning; otherwise the first present value is used.
pub(crate) fn parse_channel_payload(
    arg0: Option<serde_json::Value>,
    arg1: Option<serde_json::Value>,
) -> serde_json::Value {
    match (arg0, arg1) {
        (Some(serde_json::Value::Object(mut obj0)), Some(serde_json::Value::Object(obj1))) => {
            for (k, v) in obj1 {
                obj0.insert(k, v);
            }
            serde_json::Value::Object(obj0)
        }
        (Some(v), _) => v,
        (None, Some(v)) => v,
        _ => serde_json::json!({}),
    }
}

pub(crate) fn value_str(v: &serde_json::Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = v.get(*key).and_then(|x| x.as_str()) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Save store credentials from the command line: `configure <url> <anon-key>`.
fn configure_from_args(args: &[String]) -> anyhow::Result<bool> {
    match args {
        [_, cmd, url, key, ..] if cmd == "configure" => {
            storage::save_store_credentials(&api::normalize_store_url(url), key)
                .map_err(anyhow::Error::msg)?;
            println!("Store credentials saved.");
            Ok(true)
        }
        [_, cmd, ..] if cmd == "configure" => {
            anyhow::bail!("usage: campus-bites configure <store-url> <anon-key>")
        }
        _ => Ok(false),
    }
}

pub fn run() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if configure_from_args(&args)? {
        return Ok(());
    }

    // Structured logging: stderr (stdout carries the bridge) + rolling file
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,campus_bites_lib=debug"));

    diagnostics::prune_old_logs();

    let log_dir = diagnostics::get_log_dir();
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&log_dir, diagnostics::LOG_FILE_PREFIX);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Starting Campus Bites v{}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::load()
        .map_err(anyhow::Error::msg)
        .context("set CAMPUS_BITES_SUPABASE_URL and CAMPUS_BITES_SUPABASE_ANON_KEY, or run `campus-bites configure`")?;
    info!(?config, "configuration loaded");

    let client = api::RestClient::new(&config.store_url, &config.anon_key, config.http_timeout)
        .context("failed to build store client")?;
    info!(store_url = client.base_url(), "store client ready");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let result = runtime.block_on(async move {
        let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
        let state = Arc::new(AppState::new(
            Arc::new(client),
            config.poll_interval,
            Some(events_tx),
        ));
        bridge::serve(
            state,
            events_rx,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
        .await
    });

    if let Err(e) = &result {
        error!(error = %e, "bridge stopped with an error");
    }
    info!("Campus Bites shutting down");
    // `_guard` flushes the file log on drop.
    drop(_guard);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_channel_payload_merges_objects() {
        let merged = parse_channel_payload(Some(json!({ "id": "a", "x": 1 })), Some(json!({ "x": 2 })));
        assert_eq!(merged, json!({ "id": "a", "x": 2 }));
        assert_eq!(parse_channel_payload(None, Some(json!(5))), json!(5));
        assert_eq!(parse_channel_payload(None, None), json!({}));
    }

    #[test]
    fn value_str_skips_blank_and_missing_keys() {
        let v = json!({ "a": "  ", "b": " hit ", "c": 3 });
        assert_eq!(value_str(&v, &["a", "c", "b"]), Some("hit".into()));
        assert_eq!(value_str(&v, &["missing"]), None);
    }

    #[test]
    fn configure_args_are_recognised() {
        let args: Vec<String> = vec!["campus-bites".into()];
        assert!(!configure_from_args(&args).expect("no subcommand"));

        let args: Vec<String> = vec!["campus-bites".into(), "configure".into()];
        assert!(configure_from_args(&args).is_err());
    }
}
