use serde::{Deserialize, Serialize};

use super::filter::ProductQuery;

/// A catalog row as delivered by the gateway.
///
/// Every field falls back to its empty value so partially populated rows
/// (e.g. a `select=id,name` projection) still decode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category: String,
    pub image_url: String,
    pub stock: i32,
    pub created_at: String, // Opaque, assigned by the store
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }

    pub fn with_stock(mut self, stock: i32) -> Self {
        self.stock = stock;
        self
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Client-side equivalent of the gateway filter: case-insensitive
    /// substring on name OR description, exact category equality.
    pub fn matches(&self, query: &ProductQuery) -> bool {
        if let Some(text) = &query.text {
            let needle = text.to_lowercase();
            let hit = self.name.to_lowercase().contains(&needle)
                || self.description.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }

        match &query.category {
            Some(category) => &self.category == category,
            None => true,
        }
    }
}

/// Partial update sent to the gateway. Only `stock` is ever written.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockPatch {
    pub stock: i32,
}
