//! Row types for the four storefront tables.
//!
//! Field names match the column names in the hosted store so rows can be
//! deserialized straight from the REST responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;
use std::str::FromStr;

/// Menu categories offered by the kitchen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Biryani,
    Chinese,
    Snacks,
    Drinks,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Biryani,
        Category::Chinese,
        Category::Snacks,
        Category::Drinks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Biryani => "Biryani",
            Category::Chinese => "Chinese",
            Category::Snacks => "Snacks",
            Category::Drinks => "Drinks",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Category::Biryani => "🍛",
            Category::Chinese => "🥡",
            Category::Snacks => "🍟",
            Category::Drinks => "🥤",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown category: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub category: Category,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    pub is_available: bool,
    pub is_recommended: bool,
    pub created_at: Option<DateTime<Utc>>,
}

/// A cart line. Also the shape stored in `orders.items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

impl From<&MenuItem> for CartItem {
    fn from(item: &MenuItem) -> Self {
        CartItem {
            id: item.id.clone(),
            name: item.name.clone(),
            price: item.price,
            quantity: 1,
        }
    }
}

/// Every order is settled at the door.
pub const PAYMENT_MODE: &str = "Pay on delivery";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub batch_id: String,
    pub user_name: String,
    pub hostel: String,
    pub room: String,
    pub phone: String,
    pub items: Vec<CartItem>,
    pub total_amount: f64,
    pub payment_mode: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBatch {
    pub id: String,
    pub slot_label: String,
    pub current_step: i32,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status_message: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub const DEFAULT_BANNER_BG: &str = "#1a1a1a";
pub const DEFAULT_BANNER_TEXT: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroBanner {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub image_url: String,
    #[serde(default = "default_bg_color", deserialize_with = "bg_color_or_default")]
    pub bg_color: String,
    #[serde(default = "default_text_color", deserialize_with = "text_color_or_default")]
    pub text_color: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action_text: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub action_link: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub order: i32,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_bg_color() -> String {
    DEFAULT_BANNER_BG.to_string()
}

fn default_text_color() -> String {
    DEFAULT_BANNER_TEXT.to_string()
}

// Optional text columns come back as `null` when never set.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    Ok(Option::<i32>::deserialize(deserializer)?.unwrap_or_default())
}

fn bg_color_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(default_bg_color))
}

fn text_color_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(default_text_color))
}

/// Decode a list of rows, naming the table in the error.
pub(crate) fn decode_rows<T: serde::de::DeserializeOwned>(
    table: &str,
    rows: Vec<serde_json::Value>,
) -> Result<Vec<T>, String> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| format!("decode {table} row: {e}")))
        .collect()
}

/// Decode what can be decoded. Unreadable rows are logged and skipped so one
/// bad row does not hide the rest of a shopper-facing list.
pub(crate) fn decode_rows_lenient<T: serde::de::DeserializeOwned>(
    table: &str,
    rows: Vec<serde_json::Value>,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or_default();
            match serde_json::from_value(row) {
                Ok(decoded) => Some(decoded),
                Err(e) => {
                    warn!(table, row_id = %id, error = %e, "skipping unreadable row");
                    None
                }
            }
        })
        .collect()
}
