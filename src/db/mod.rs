//! Local record store
//!
//! A small embedded database named `coffee-shop-db` with two tables:
//!
//! - `cartItems`: cart lines keyed by product name
//! - `checkoutData`: submitted orders under an auto-increment key
//!
//! Registered background sync tags are kept alongside so they survive
//! between CLI invocations.

mod local;

pub use local::LocalDb;

use crate::error::ShopResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Database name
pub const DB_NAME: &str = "coffee-shop-db";

/// Schema version
pub const DB_VERSION: u32 = 1;

/// Cart table name
pub const CART_TABLE: &str = "cartItems";

/// Checkout table name
pub const CHECKOUT_TABLE: &str = "checkoutData";

/// A cart line, unique by product name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl CartItem {
    /// A new line with quantity 1
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
            quantity: 1,
        }
    }

    /// Price times quantity
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

/// Customer details entered at checkout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone_number: String,
}

/// One product in a submitted order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            name: item.name.clone(),
            price: item.price,
            quantity: item.quantity,
        }
    }
}

/// A submitted order awaiting background sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSubmission {
    pub form_data: FormData,
    pub cart_items: Vec<OrderLine>,
    pub total_price: f64,
    pub reference: Uuid,
    pub submitted_at: DateTime<Utc>,
}

/// Record store contract
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the database with both tables if it does not exist yet
    async fn ensure_schema(&self) -> ShopResult<()>;

    /// Cart line by product name
    async fn get_cart_item(&self, name: &str) -> ShopResult<Option<CartItem>>;

    /// Every cart line, ordered by name
    async fn cart_items(&self) -> ShopResult<Vec<CartItem>>;

    /// Insert a new cart line; fails with `RecordExists` if the name is taken
    async fn insert_cart_item(&self, item: CartItem) -> ShopResult<()>;

    /// Insert or replace a cart line
    async fn put_cart_item(&self, item: CartItem) -> ShopResult<()>;

    /// Delete a cart line; returns whether it existed
    async fn delete_cart_item(&self, name: &str) -> ShopResult<bool>;

    /// Store a submission under the next key
    async fn insert_checkout(&self, submission: CheckoutSubmission) -> ShopResult<u64>;

    /// Submission by key
    async fn get_checkout(&self, id: u64) -> ShopResult<Option<CheckoutSubmission>>;

    /// Every submission with its key, oldest first
    async fn checkouts(&self) -> ShopResult<Vec<(u64, CheckoutSubmission)>>;

    /// Delete a submission; returns whether it existed
    async fn delete_checkout(&self, id: u64) -> ShopResult<bool>;

    /// Register a sync tag; returns false if it was already registered
    async fn register_sync_tag(&self, tag: &str) -> ShopResult<bool>;

    /// Registered sync tags in registration order
    async fn sync_tags(&self) -> ShopResult<Vec<String>>;

    /// Remove a sync tag registration; returns whether it was registered
    async fn consume_sync_tag(&self, tag: &str) -> ShopResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_total_multiplies_quantity() {
        let mut item = CartItem::new("Cappuccino", 3.5);
        assert_eq!(item.line_total(), 3.5);
        item.quantity = 3;
        assert_eq!(item.line_total(), 10.5);
    }

    #[test]
    fn submission_uses_camel_case_fields() {
        let submission = CheckoutSubmission {
            form_data: FormData {
                phone_number: "555-0100".to_string(),
                ..Default::default()
            },
            cart_items: vec![],
            total_price: 0.0,
            reference: Uuid::nil(),
            submitted_at: Utc::now(),
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["formData"]["phoneNumber"], "555-0100");
        assert!(json.get("cartItems").is_some());
        assert!(json.get("totalPrice").is_some());
    }
}
