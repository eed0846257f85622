use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::to_json;
use crate::admin::AdminTab;
use crate::api::{self, TableClient};
use crate::diagnostics;
use crate::navigation::{self, Screen};
use crate::state::AppState;
use crate::{parse_channel_payload, storage, value_str};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsPayload {
    #[serde(default, alias = "url", alias = "supabaseUrl", alias = "supabase_url")]
    store_url: String,
    #[serde(default, alias = "anon_key", alias = "key", alias = "supabaseAnonKey")]
    anon_key: String,
    #[serde(default, alias = "connection_string")]
    connection_string: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AdminTabPayload {
    tab: AdminTab,
}

fn parse_credentials_payload(
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<(String, String), String> {
    let arg0 = match arg0 {
        Some(Value::String(url)) => Some(json!({ "storeUrl": url })),
        other => other,
    };
    let arg1 = match arg1 {
        Some(Value::String(key)) => Some(json!({ "anonKey": key })),
        other => other,
    };
    let parsed: CredentialsPayload = serde_json::from_value(parse_channel_payload(arg0, arg1))
        .map_err(|e| format!("Invalid credentials payload: {e}"))?;

    let connection = parsed.connection_string.as_deref().unwrap_or_default();
    let store_url = Some(parsed.store_url)
        .filter(|u| !u.trim().is_empty())
        .or_else(|| api::extract_url_from_connection_string(connection))
        .unwrap_or_default();
    let anon_key = Some(parsed.anon_key)
        .filter(|k| !k.trim().is_empty())
        .or_else(|| api::extract_key_from_connection_string(connection))
        .unwrap_or_default();
    Ok((api::normalize_store_url(&store_url), anon_key.trim().to_string()))
}

fn parse_admin_tab_payload(arg0: Option<Value>) -> Result<AdminTab, String> {
    let payload = match arg0 {
        Some(Value::String(tab)) => json!({ "tab": tab.to_lowercase() }),
        Some(v) => v,
        None => json!({}),
    };
    let parsed: AdminTabPayload =
        serde_json::from_value(payload).map_err(|e| format!("Invalid admin tab payload: {e}"))?;
    Ok(parsed.tab)
}

fn parse_screen_payload(arg0: Option<Value>) -> Result<Screen, String> {
    let payload = match arg0 {
        Some(Value::String(screen)) => json!({ "screen": screen.to_lowercase() }),
        Some(v) => v,
        None => return Err("Missing screen".into()),
    };
    serde_json::from_value(payload).map_err(|e| format!("Invalid screen payload: {e}"))
}

pub fn app_get_info<C: TableClient>(state: &AppState<C>) -> Result<Value, String> {
    let mut info = diagnostics::get_about_info();
    let (screen, admin_tab) = {
        let nav = state.navigator()?;
        (nav.screen().clone(), nav.admin_tab())
    };
    if let Value::Object(map) = &mut info {
        map.insert("screen".into(), to_json(&screen)?);
        map.insert("adminTab".into(), json!(admin_tab));
        map.insert("sessionId".into(), json!(state.session_id));
        map.insert(
            "logDir".into(),
            json!(diagnostics::get_log_dir().display().to_string()),
        );
    }
    Ok(info)
}

/// Persist store credentials. They are read at the next start.
pub fn config_save_credentials(
    arg0: Option<Value>,
    arg1: Option<Value>,
) -> Result<Value, String> {
    let (store_url, anon_key) = parse_credentials_payload(arg0, arg1)?;
    storage::save_store_credentials(&store_url, &anon_key)?;
    info!(store_url = %store_url, "store credentials updated");
    Ok(json!({ "success": true, "storeUrl": store_url, "restartRequired": true }))
}

pub fn config_clear_credentials() -> Result<Value, String> {
    storage::factory_reset()?;
    Ok(json!({ "success": true }))
}

pub fn nav_route(arg0: Option<Value>) -> Result<Value, String> {
    let payload = match arg0 {
        Some(Value::String(path)) => json!({ "path": path }),
        Some(v) => v,
        None => json!({}),
    };
    let path = value_str(&payload, &["path", "pathname"]).unwrap_or_else(|| "/".into());
    Ok(json!({ "surface": navigation::route_for_path(&path) }))
}

pub fn nav_go<C: TableClient>(state: &AppState<C>, arg0: Option<Value>) -> Result<Value, String> {
    let screen = parse_screen_payload(arg0)?;
    let screen = state.navigate(screen)?;
    to_json(&screen)
}

pub fn nav_set_admin_tab<C: TableClient>(
    state: &AppState<C>,
    arg0: Option<Value>,
) -> Result<Value, String> {
    let tab = parse_admin_tab_payload(arg0)?;
    let previous = {
        let mut nav = state.navigator()?;
        let previous = nav.admin_tab();
        nav.set_admin_tab(tab);
        previous
    };
    if previous != tab {
        info!(from = previous.label(), to = tab.label(), "admin tab changed");
    }
    Ok(json!({ "tab": tab, "label": tab.label() }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_credentials_payload_supports_legacy_tuple() {
        let (url, key) =
            parse_credentials_payload(Some(json!("demo.supabase.co/")), Some(json!(" k-1 ")))
                .expect("tuple payload should parse");
        assert_eq!(url, "https://demo.supabase.co");
        assert_eq!(key, "k-1");
    }

    #[test]
    fn parse_credentials_payload_reads_connection_string() {
        let (url, key) = parse_credentials_payload(
            Some(json!({
                "connectionString": r#"{"url":"https://campus.supabase.co","anonKey":"k-2"}"#
            })),
            None,
        )
        .expect("connection string should parse");
        assert_eq!(url, "https://campus.supabase.co");
        assert_eq!(key, "k-2");
    }

    #[test]
    fn parse_admin_tab_payload_supports_string_and_object() {
        assert_eq!(
            parse_admin_tab_payload(Some(json!("Banners"))).expect("string"),
            AdminTab::Banners
        );
        assert_eq!(
            parse_admin_tab_payload(Some(json!({ "tab": "tracking" }))).expect("object"),
            AdminTab::Tracking
        );
        assert!(parse_admin_tab_payload(Some(json!("kitchen"))).is_err());
    }

    #[test]
    fn parse_screen_payload_supports_bare_names() {
        assert_eq!(parse_screen_payload(Some(json!("Cart"))).expect("cart"), Screen::Cart);
        assert!(parse_screen_payload(Some(json!("confirmation"))).is_err());
        assert!(parse_screen_payload(None).is_err());
    }

    #[test]
    fn app_info_reports_screen_and_admin_tab() {
        use crate::testing::MemoryTables;
        use std::sync::Arc;
        use std::time::Duration;

        let state = AppState::new(Arc::new(MemoryTables::new()), Duration::from_secs(10), None);
        nav_set_admin_tab(&state, Some(json!("menu"))).expect("tab");
        nav_go(&state, Some(json!("cart"))).expect("screen");

        let info = app_get_info(&state).expect("info");
        assert_eq!(info["adminTab"], json!(AdminTab::Menu));
        assert_eq!(info["screen"]["screen"], "cart");
        assert_eq!(info["sessionId"], state.session_id.as_str());
    }

    #[test]
    fn nav_route_picks_surface() {
        assert_eq!(nav_route(Some(json!("/admin"))).expect("admin")["surface"], "admin");
        assert_eq!(nav_route(None).expect("root")["surface"], "storefront");
    }
}
