use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{require_id, AdminError, AdminOutcome};
use crate::api::{ApiError, Query, Table, TableClient};
use crate::models::{decode_rows, Category, MenuItem};

/// Price as typed into the form: a number, or the raw text field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: Option<PriceInput>,
    #[serde(default = "default_category")]
    pub category: Category,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "is_recommended")]
    pub is_recommended: bool,
}

fn default_category() -> Category {
    Category::Biryani
}

/// Validated form fields.
struct MenuItemFields {
    name: String,
    price: f64,
    category: Category,
    description: String,
    is_recommended: bool,
}

impl MenuItemForm {
    fn validate(&self) -> Result<MenuItemFields, AdminError> {
        let name = self.name.trim();
        let price_text = match &self.price {
            Some(PriceInput::Number(n)) => Some(n.to_string()),
            Some(PriceInput::Text(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        };
        let Some(price_text) = price_text.filter(|_| !name.is_empty()) else {
            return Err(AdminError::Invalid(
                "Please fill in all required fields".into(),
            ));
        };
        let price = price_text
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| AdminError::Invalid("Price must be a valid amount".into()))?;

        Ok(MenuItemFields {
            name: name.to_string(),
            price,
            category: self.category,
            description: self.description.trim().to_string(),
            is_recommended: self.is_recommended,
        })
    }
}

/// Every item, grouped by category.
pub async fn list_items<C: TableClient>(client: &C) -> Result<Vec<MenuItem>, AdminError> {
    let rows = client
        .select(&Query::table(Table::MenuItems).order("category", true))
        .await
        .map_err(AdminError::store("Failed to load menu"))?;
    decode_rows(Table::MenuItems.as_str(), rows)
        .map_err(|e| AdminError::store("Failed to load menu")(ApiError::Decode(e)))
}

pub async fn create_item<C: TableClient>(
    client: &C,
    form: &MenuItemForm,
) -> Result<AdminOutcome<MenuItem>, AdminError> {
    let fields = form.validate()?;
    let row = json!({
        "name": fields.name,
        "price": fields.price,
        "category": fields.category,
        "description": fields.description,
        "is_recommended": fields.is_recommended,
        "is_available": true,
        "image_url": "",
    });
    let created = client
        .insert(Table::MenuItems, row)
        .await
        .map_err(AdminError::store("Failed to save item"))?;
    let item: MenuItem = serde_json::from_value(created).map_err(|e| {
        AdminError::store("Failed to save item")(ApiError::Decode(e.to_string()))
    })?;
    info!(item_id = %item.id, name = %item.name, "menu item created");
    Ok(AdminOutcome::new("Item added successfully!", item))
}

pub async fn update_item<C: TableClient>(
    client: &C,
    id: &str,
    form: &MenuItemForm,
) -> Result<AdminOutcome<()>, AdminError> {
    let id = require_id(id)?;
    let fields = form.validate()?;
    let patch = json!({
        "name": fields.name,
        "price": fields.price,
        "category": fields.category,
        "description": fields.description,
        "is_recommended": fields.is_recommended,
    });
    client
        .update(&Query::table(Table::MenuItems).eq("id", id), patch)
        .await
        .map_err(AdminError::store("Failed to save item"))?;
    info!(item_id = %id, "menu item updated");
    Ok(AdminOutcome::new("Item updated successfully!", ()))
}

/// Flip availability from the state the panel last showed. Returns the new
/// state.
pub async fn toggle_availability<C: TableClient>(
    client: &C,
    id: &str,
    currently_available: bool,
) -> Result<bool, AdminError> {
    let id = require_id(id)?;
    let next = !currently_available;
    client
        .update(
            &Query::table(Table::MenuItems).eq("id", id),
            json!({ "is_available": next }),
        )
        .await
        .map_err(AdminError::store("Failed to update availability"))?;
    info!(item_id = %id, is_available = next, "menu item availability toggled");
    Ok(next)
}

pub async fn delete_item<C: TableClient>(
    client: &C,
    id: &str,
) -> Result<AdminOutcome<()>, AdminError> {
    let id = require_id(id)?;
    client
        .delete(&Query::table(Table::MenuItems).eq("id", id))
        .await
        .map_err(AdminError::store("Failed to delete item"))?;
    info!(item_id = %id, "menu item deleted");
    Ok(AdminOutcome::new("Item deleted successfully!", ()))
}
