//! Session cart.
//!
//! Lines are kept in insertion order. A line never holds a quantity below 1:
//! reducing a line to zero removes it.

use serde::Serialize;

use crate::models::{CartItem, MenuItem};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

/// Snapshot of the cart as the front end renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub total_items: u32,
    pub total_amount: f64,
}

/// Floating "View Cart" bar. Absent when the cart is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartBar {
    pub label: String,
    pub total_amount: f64,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one unit of `item`, inserting a new line when needed.
    pub fn add(&mut self, item: &MenuItem) {
        match self.items.iter_mut().find(|line| line.id == item.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(1),
            None => self.items.push(CartItem::from(item)),
        }
    }

    /// Set the quantity of line `id`. Zero or below removes the line; an
    /// unknown id is ignored.
    pub fn update_quantity(&mut self, id: &str, quantity: i64) {
        if quantity <= 0 {
            self.remove(id);
            return;
        }
        if let Some(line) = self.items.iter_mut().find(|line| line.id == id) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    pub fn remove(&mut self, id: &str) {
        self.items.retain(|line| line.id != id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn quantity_of(&self, id: &str) -> u32 {
        self.items
            .iter()
            .find(|line| line.id == id)
            .map(|line| line.quantity)
            .unwrap_or(0)
    }

    pub fn total_items(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    pub fn total_amount(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn summary(&self) -> CartSummary {
        CartSummary {
            items: self.items.clone(),
            total_items: self.total_items(),
            total_amount: self.total_amount(),
        }
    }

    pub fn bar(&self) -> Option<CartBar> {
        let total_items = self.total_items();
        if total_items == 0 {
            return None;
        }
        let noun = if total_items == 1 { "item" } else { "items" };
        Some(CartBar {
            label: format!("View Cart ({total_items} {noun})"),
            total_amount: self.total_amount(),
        })
    }
}
