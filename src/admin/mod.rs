//! Admin panel operations.
//!
//! Each panel is an independent list-plus-form surface over one table. There
//! are no cross-table checks and no transactions; the last write wins.

pub mod banners;
pub mod menu;
pub mod orders;
pub mod tracking;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiError;

/// Admin failures. `Display` is the alert shown on the panel.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0}")]
    Invalid(String),
    #[error("{alert}")]
    Store {
        alert: &'static str,
        #[source]
        source: ApiError,
    },
}

impl AdminError {
    pub(crate) fn store(alert: &'static str) -> impl FnOnce(ApiError) -> AdminError {
        move |source| {
            tracing::error!(error = %source, alert, "admin store call failed");
            AdminError::Store { alert, source }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminTab {
    #[default]
    Orders,
    Tracking,
    Menu,
    Banners,
}

impl AdminTab {
    pub const ALL: [AdminTab; 4] = [
        AdminTab::Orders,
        AdminTab::Tracking,
        AdminTab::Menu,
        AdminTab::Banners,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AdminTab::Orders => "Orders",
            AdminTab::Tracking => "Tracking",
            AdminTab::Menu => "Menu",
            AdminTab::Banners => "Banners",
        }
    }
}

/// A successful admin write and the confirmation shown for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminOutcome<T> {
    pub message: &'static str,
    pub data: T,
}

impl<T> AdminOutcome<T> {
    pub fn new(message: &'static str, data: T) -> Self {
        AdminOutcome { message, data }
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn require_id(id: &str) -> Result<&str, AdminError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(AdminError::Invalid("Missing id".into()));
    }
    Ok(trimmed)
}
