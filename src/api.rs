//! Hosted table store client.
//!
//! All storefront state lives in four remote tables behind a PostgREST
//! endpoint. This module provides the generic query/update surface
//! ([`TableClient`]) the rest of the crate talks to, and the reqwest-backed
//! implementation ([`RestClient`]).

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default timeout for store requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Store not configured: {0}")]
    NotConfigured(String),
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
    #[error("Cannot reach the store at {0}")]
    Unreachable(String),
    #[error("Connection to {0} timed out")]
    Timeout(String),
    #[error("Network error communicating with {url}: {message}")]
    Network { url: String, message: String },
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("Invalid JSON from the store: {0}")]
    Decode(String),
    #[error("Refusing to {0} rows without a filter")]
    Unfiltered(&'static str),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Convert a `reqwest::Error` into a user-friendly error.
fn friendly_error(url: &str, err: &reqwest::Error) -> ApiError {
    if err.is_connect() {
        return ApiError::Unreachable(url.to_string());
    }
    if err.is_timeout() {
        return ApiError::Timeout(url.to_string());
    }
    if err.is_builder() {
        return ApiError::InvalidUrl(url.to_string());
    }
    ApiError::Network {
        url: url.to_string(),
        message: err.to_string(),
    }
}

/// Default message for an HTTP status when the body carries none.
fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Store API key is invalid or expired".to_string(),
        403 => "Request rejected by the store's access policy".to_string(),
        404 => "Store table not found".to_string(),
        409 => "Row conflicts with existing data".to_string(),
        s if s >= 500 => "Store server error".to_string(),
        _ => "Unexpected response from the store".to_string(),
    }
}

/// Build a status error, preferring the PostgREST `message`/`details` body.
fn status_error(status: StatusCode, body_text: &str) -> ApiError {
    let trimmed = body_text.trim();
    let message = match serde_json::from_str::<Value>(trimmed) {
        Ok(json) => {
            let message = json
                .get("message")
                .or_else(|| json.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status_message(status));
            match json.get("details").and_then(Value::as_str) {
                Some(details) if !details.trim().is_empty() => format!("{message}: {details}"),
                _ => message,
            }
        }
        Err(_) if !trimmed.is_empty() => format!("{}: {trimmed}", status_message(status)),
        Err(_) => status_message(status),
    };
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

// ---------------------------------------------------------------------------
// URL and credential normalisation
// ---------------------------------------------------------------------------

/// Normalise the store URL:
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
/// - strip a trailing `/rest/v1` segment
pub fn normalize_store_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if url.is_empty() {
        return url;
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }

    if url.ends_with("/rest/v1") {
        url.truncate(url.len() - "/rest/v1".len());
    }

    while url.ends_with('/') {
        url.pop();
    }

    url
}

/// Decode a connection string: raw JSON, or base64/base64url-encoded JSON.
fn decode_connection_string_payload(raw: &str) -> Option<Value> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.starts_with('{') {
        return serde_json::from_str::<Value>(&compact).ok();
    }
    if compact.len() < 20 {
        return None;
    }

    let base64 = compact.replace('-', "+").replace('_', "/");
    let padded = format!(
        "{}{}",
        base64,
        "=".repeat((4usize.wrapping_sub(base64.len() % 4)) % 4)
    );
    let decoded = BASE64_STANDARD.decode(padded).ok()?;
    serde_json::from_slice::<Value>(&decoded).ok()
}

pub fn extract_key_from_connection_string(raw: &str) -> Option<String> {
    decode_connection_string_payload(raw)
        .and_then(|v| {
            v.get("key")
                .or_else(|| v.get("anonKey"))
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
}

pub fn extract_url_from_connection_string(raw: &str) -> Option<String> {
    decode_connection_string_payload(raw)
        .and_then(|v| v.get("url").and_then(Value::as_str).map(normalize_store_url))
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Query builder
// ---------------------------------------------------------------------------

/// The remote tables the storefront uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    MenuItems,
    Orders,
    OrderBatches,
    HeroBanners,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::MenuItems => "menu_items",
            Table::Orders => "orders",
            Table::OrderBatches => "order_batches",
            Table::HeroBanners => "hero_banners",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub column: String,
    pub ascending: bool,
}

/// A select/update/delete target: one table plus equality filters, ordering
/// and an optional row limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub ordering: Vec<Ordering>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Query {
            table,
            filters: Vec::new(),
            ordering: Vec::new(),
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.ordering.push(Ordering {
            column: column.to_string(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query parameters for this query.
    pub fn to_params(&self, include_select: bool) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if include_select {
            params.push(("select".to_string(), "*".to_string()));
        }
        for filter in &self.filters {
            params.push((
                filter.column.clone(),
                format!("eq.{}", filter_literal(&filter.value)),
            ));
        }
        if !self.ordering.is_empty() {
            let order = self
                .ordering
                .iter()
                .map(|o| {
                    format!(
                        "{}.{}",
                        o.column,
                        if o.ascending { "asc" } else { "desc" }
                    )
                })
                .collect::<Vec<String>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

fn filter_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Generic request/response access to the remote tables.
///
/// Writes return the affected rows as the store represents them.
pub trait TableClient: Send + Sync + 'static {
    fn select(&self, query: &Query) -> impl Future<Output = ApiResult<Vec<Value>>> + Send;

    fn insert(&self, table: Table, row: Value) -> impl Future<Output = ApiResult<Value>> + Send;

    fn update(
        &self,
        query: &Query,
        patch: Value,
    ) -> impl Future<Output = ApiResult<Vec<Value>>> + Send;

    fn delete(&self, query: &Query) -> impl Future<Output = ApiResult<()>> + Send;
}

/// First row of a select, if any (`maybeSingle` semantics).
pub async fn select_first<C: TableClient>(client: &C, query: Query) -> ApiResult<Option<Value>> {
    let rows = client.select(&query.limit(1)).await?;
    Ok(rows.into_iter().next())
}

// ---------------------------------------------------------------------------
// REST implementation
// ---------------------------------------------------------------------------

pub struct RestClient {
    base_url: String,
    anon_key: String,
    http: Client,
}

impl RestClient {
    pub fn new(store_url: &str, anon_key: &str, timeout: Duration) -> ApiResult<Self> {
        let base_url = normalize_store_url(store_url);
        if base_url.is_empty() {
            return Err(ApiError::NotConfigured("missing URL".into()));
        }
        Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;

        let anon_key = extract_key_from_connection_string(anon_key)
            .unwrap_or_else(|| anon_key.trim().to_string());
        if anon_key.is_empty() {
            return Err(ApiError::NotConfigured("missing anon key".into()));
        }

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::NotConfigured(format!("HTTP client error: {e}")))?;

        Ok(RestClient {
            base_url,
            anon_key,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn table_url(&self, query: &Query, include_select: bool) -> ApiResult<Url> {
        let mut url = Url::parse(&format!(
            "{}/rest/v1/{}",
            self.base_url,
            query.table.as_str()
        ))
        .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        {
            let mut qp = url.query_pairs_mut();
            for (k, v) in query.to_params(include_select) {
                qp.append_pair(&k, &v);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Content-Type", "application/json")
    }

    async fn send(&self, req: RequestBuilder) -> ApiResult<String> {
        let resp = req
            .send()
            .await
            .map_err(|e| friendly_error(&self.base_url, &e))?;
        let status = resp.status();
        let body_text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error(status, &body_text));
        }
        Ok(body_text)
    }
}

/// Parse a response body into rows. Empty bodies are no rows.
fn parse_rows(body_text: &str) -> ApiResult<Vec<Value>> {
    if body_text.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(body_text).map_err(|e| ApiError::Decode(e.to_string()))? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        single => Ok(vec![single]),
    }
}

impl TableClient for RestClient {
    async fn select(&self, query: &Query) -> ApiResult<Vec<Value>> {
        let url = self.table_url(query, true)?;
        debug!(table = query.table.as_str(), "store select");
        let body = self.send(self.request(Method::GET, url)).await?;
        parse_rows(&body)
    }

    async fn insert(&self, table: Table, row: Value) -> ApiResult<Value> {
        let url = self.table_url(&Query::table(table), true)?;
        debug!(table = table.as_str(), "store insert");
        let body = self
            .send(
                self.request(Method::POST, url)
                    .header("Prefer", "return=representation")
                    .json(&row),
            )
            .await?;
        parse_rows(&body)?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Decode(format!("{} insert returned no row", table.as_str())))
    }

    async fn update(&self, query: &Query, patch: Value) -> ApiResult<Vec<Value>> {
        if query.filters.is_empty() {
            return Err(ApiError::Unfiltered("update"));
        }
        let url = self.table_url(query, false)?;
        debug!(table = query.table.as_str(), "store update");
        let body = self
            .send(
                self.request(Method::PATCH, url)
                    .header("Prefer", "return=representation")
                    .json(&patch),
            )
            .await?;
        let rows = parse_rows(&body)?;
        if rows.is_empty() {
            warn!(
                table = query.table.as_str(),
                "store update matched no rows"
            );
        }
        Ok(rows)
    }

    async fn delete(&self, query: &Query) -> ApiResult<()> {
        if query.filters.is_empty() {
            return Err(ApiError::Unfiltered("delete"));
        }
        let url = self.table_url(query, false)?;
        debug!(table = query.table.as_str(), "store delete");
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_store_url_adds_scheme_and_strips_rest_suffix() {
        assert_eq!(
            normalize_store_url("abc.supabase.co/rest/v1/"),
            "https://abc.supabase.co"
        );
        assert_eq!(
            normalize_store_url("localhost:54321/"),
            "http://localhost:54321"
        );
        assert_eq!(normalize_store_url("   "), "");
    }

    #[test]
    fn connection_string_decodes_json_and_base64url() {
        let json = r#"{"url":"demo.supabase.co","key":"anon-123"}"#;
        assert_eq!(
            extract_url_from_connection_string(json).as_deref(),
            Some("https://demo.supabase.co")
        );
        assert_eq!(
            extract_key_from_connection_string(json).as_deref(),
            Some("anon-123")
        );

        let encoded = BASE64_STANDARD
            .encode(json)
            .replace('+', "-")
            .replace('/', "_")
            .trim_end_matches('=')
            .to_string();
        assert_eq!(
            extract_key_from_connection_string(&encoded).as_deref(),
            Some("anon-123")
        );
        assert!(extract_key_from_connection_string("short").is_none());
    }

    #[test]
    fn query_params_follow_postgrest_syntax() {
        let query = Query::table(Table::MenuItems)
            .eq("is_available", true)
            .eq("category", "Snacks")
            .order("is_recommended", false)
            .order("name", true)
            .limit(4);
        assert_eq!(
            query.to_params(true),
            vec![
                ("select".to_string(), "*".to_string()),
                ("is_available".to_string(), "eq.true".to_string()),
                ("category".to_string(), "eq.Snacks".to_string()),
                ("order".to_string(), "is_recommended.desc,name.asc".to_string()),
                ("limit".to_string(), "4".to_string()),
            ]
        );
        assert_eq!(
            Query::table(Table::Orders).eq("id", "o-1").to_params(false),
            vec![("id".to_string(), "eq.o-1".to_string())]
        );
    }

    #[test]
    fn table_url_encodes_query_pairs() {
        let client = RestClient::new("demo.supabase.co/", "anon", DEFAULT_TIMEOUT)
            .expect("client should build");
        assert_eq!(client.base_url(), "https://demo.supabase.co");
        let url = client
            .table_url(
                &Query::table(Table::OrderBatches)
                    .order("created_at", false)
                    .limit(1),
                true,
            )
            .expect("url should build");
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/rest/v1/order_batches?select=*&order=created_at.desc&limit=1"
        );
    }

    #[test]
    fn rest_client_requires_credentials() {
        assert!(matches!(
            RestClient::new("", "anon", DEFAULT_TIMEOUT),
            Err(ApiError::NotConfigured(_))
        ));
        assert!(matches!(
            RestClient::new("demo.supabase.co", "  ", DEFAULT_TIMEOUT),
            Err(ApiError::NotConfigured(_))
        ));
    }

    #[test]
    fn status_error_prefers_postgrest_message() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"message":"invalid input syntax","details":"price is not numeric","code":"22P02"}"#,
        );
        assert_eq!(
            err.to_string(),
            "invalid input syntax: price is not numeric (HTTP 400)"
        );
        let err = status_error(StatusCode::UNAUTHORIZED, "");
        assert_eq!(err.to_string(), "Store API key is invalid or expired (HTTP 401)");
    }

    #[test]
    fn parse_rows_accepts_array_object_and_empty() {
        assert_eq!(parse_rows("").expect("empty").len(), 0);
        assert_eq!(parse_rows("[{\"id\":1},{\"id\":2}]").expect("array").len(), 2);
        assert_eq!(parse_rows("{\"id\":1}").expect("object").len(), 1);
        assert!(parse_rows("not json").is_err());
    }
}
