//! Cart controller
//!
//! Cart lines live in the `cartItems` table keyed by product name. Adding a
//! product already in the cart bumps its quantity; checkout stores the order
//! in `checkoutData` and registers a background sync for it.

use crate::db::{CartItem, CheckoutSubmission, FormData, OrderLine, RecordStore};
use crate::error::{ShopError, ShopResult};
use crate::sync::SyncRegistry;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Cart operations over the record store
pub struct CartController {
    db: Arc<dyn RecordStore>,
    sync: SyncRegistry,
    checkout_tag: String,
}

impl CartController {
    pub fn new(db: Arc<dyn RecordStore>, checkout_tag: impl Into<String>) -> Self {
        Self {
            sync: SyncRegistry::new(Arc::clone(&db)),
            db,
            checkout_tag: checkout_tag.into(),
        }
    }

    /// Add one unit of a product and return the updated line.
    ///
    /// The read and the write are separate operations; two processes adding
    /// the same product at once may lose one increment.
    pub async fn add_to_cart(&self, name: &str, price: f64) -> ShopResult<CartItem> {
        if name.trim().is_empty() {
            return Err(ShopError::User("product name cannot be empty".to_string()));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(ShopError::User(format!("invalid price for {}: {}", name, price)));
        }

        match self.db.get_cart_item(name).await? {
            Some(mut existing) => {
                existing.quantity += 1;
                self.db.put_cart_item(existing.clone()).await?;
                info!("Item quantity updated in cart: {} (x{})", name, existing.quantity);
                Ok(existing)
            }
            None => {
                let item = CartItem::new(name, price);
                self.db.insert_cart_item(item.clone()).await?;
                info!("Item added to cart: {}", name);
                Ok(item)
            }
        }
    }

    /// Remove a product's line entirely
    pub async fn remove_item(&self, name: &str) -> ShopResult<()> {
        if self.db.delete_cart_item(name).await? {
            info!("Item removed from cart: {}", name);
            Ok(())
        } else {
            Err(ShopError::RecordNotFound {
                table: crate::db::CART_TABLE.to_string(),
                key: name.to_string(),
            })
        }
    }

    /// Current cart lines
    pub async fn items(&self) -> ShopResult<Vec<CartItem>> {
        self.db.cart_items().await
    }

    /// Sum of price times quantity over every line
    pub async fn total(&self) -> ShopResult<f64> {
        Ok(total_of(&self.items().await?))
    }

    /// Cart as display lines followed by the total line
    pub async fn render(&self) -> ShopResult<Vec<String>> {
        let items = self.items().await?;
        let mut lines: Vec<String> = items.iter().map(render_line).collect();
        lines.push(render_total(total_of(&items)));
        Ok(lines)
    }

    /// Store the current cart as an order and register its background sync.
    ///
    /// Returns the submission's key in `checkoutData`. The cart itself is
    /// left as it is.
    pub async fn submit_order(&self, form: FormData) -> ShopResult<(u64, CheckoutSubmission)> {
        let items = self.items().await?;
        if items.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let submission = CheckoutSubmission {
            form_data: form,
            cart_items: items.iter().map(OrderLine::from).collect(),
            total_price: round_cents(total_of(&items)),
            reference: Uuid::new_v4(),
            submitted_at: Utc::now(),
        };

        let id = self.db.insert_checkout(submission.clone()).await?;
        info!("Order data submitted: {} ({})", submission.reference, id);

        self.sync.register(&self.checkout_tag).await?;
        Ok((id, submission))
    }
}

fn total_of(items: &[CartItem]) -> f64 {
    items.iter().map(CartItem::line_total).sum()
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `name  $price x qty`
pub fn render_line(item: &CartItem) -> String {
    format!("{}  ${:.2} x {}", item.name, item.price, item.quantity)
}

/// `Total: $x.yy`
pub fn render_total(total: f64) -> String {
    format!("Total: ${:.2}", total)
}
