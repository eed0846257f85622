//! In-memory table store used by unit tests.

use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::api::{ApiError, ApiResult, Query, Table, TableClient};

#[derive(Default)]
pub struct MemoryTables {
    rows: Mutex<HashMap<Table, Vec<Value>>>,
    calls: AtomicUsize,
    inserts: AtomicUsize,
    failing: AtomicBool,
    seq: AtomicUsize,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row directly, bypassing call accounting. Missing `id` and
    /// timestamps are filled in.
    pub fn seed(&self, table: Table, row: Value) -> Value {
        let row = self.stamp(row);
        self.rows
            .lock()
            .unwrap()
            .entry(table)
            .or_default()
            .push(row.clone());
        row
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.rows
            .lock()
            .unwrap()
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of remote calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Make every following call fail with a 503.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn begin_call(&self) -> ApiResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 503,
                message: "Store server error".into(),
            });
        }
        Ok(())
    }

    // Each stamped row is one second newer than the previous one so
    // "most recent by created_at" is deterministic.
    fn stamp(&self, mut row: Value) -> Value {
        let n = self.seq.fetch_add(1, Ordering::SeqCst) as i64;
        let at = (Utc::now() + ChronoDuration::seconds(n)).to_rfc3339_opts(SecondsFormat::Micros, true);
        if let Value::Object(map) = &mut row {
            map.entry("id")
                .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
            map.entry("created_at")
                .or_insert_with(|| Value::String(at.clone()));
            map.entry("updated_at").or_insert_with(|| Value::String(at));
        }
        row
    }
}

fn matches(row: &Value, query: &Query) -> bool {
    query
        .filters
        .iter()
        .all(|f| row.get(&f.column) == Some(&f.value))
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        _ => CmpOrdering::Equal,
    }
}

impl TableClient for MemoryTables {
    async fn select(&self, query: &Query) -> ApiResult<Vec<Value>> {
        self.begin_call()?;
        let mut rows: Vec<Value> = self
            .rows(query.table)
            .into_iter()
            .filter(|row| matches(row, query))
            .collect();
        rows.sort_by(|a, b| {
            for o in &query.ordering {
                let ord = compare(a.get(&o.column), b.get(&o.column));
                let ord = if o.ascending { ord } else { ord.reverse() };
                if ord != CmpOrdering::Equal {
                    return ord;
                }
            }
            CmpOrdering::Equal
        });
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> ApiResult<Value> {
        self.begin_call()?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(self.seed(table, row))
    }

    async fn update(&self, query: &Query, patch: Value) -> ApiResult<Vec<Value>> {
        self.begin_call()?;
        if query.filters.is_empty() {
            return Err(ApiError::Unfiltered("update"));
        }
        let mut tables = self.rows.lock().unwrap();
        let mut updated = Vec::new();
        for row in tables.entry(query.table).or_default().iter_mut() {
            if !matches(row, query) {
                continue;
            }
            if let (Value::Object(target), Value::Object(changes)) = (&mut *row, &patch) {
                for (k, v) in changes {
                    target.insert(k.clone(), v.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> ApiResult<()> {
        self.begin_call()?;
        if query.filters.is_empty() {
            return Err(ApiError::Unfiltered("delete"));
        }
        let mut tables = self.rows.lock().unwrap();
        tables
            .entry(query.table)
            .or_default()
            .retain(|row| !matches(row, query));
        Ok(())
    }
}
